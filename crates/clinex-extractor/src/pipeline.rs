//! Payload transformation
//!
//! The pure, synchronous stage of an extraction: provider-independent
//! payloads in, canonical [`Extraction`] out. No I/O happens here.

use clinex_core::{Extraction, PipelineConfig};

use crate::coding::{LinkCoder, OverlapCoder};
use crate::overlap::SpanMatcher;
use crate::payload::{AttributePayload, GraphPayload};
use crate::relation::{
    build_phi_relations, AttributeRelationBuilder, GraphRelationBuilder, SourceDocument,
};
use crate::summary::ExtractionSummary;
use crate::taxonomy::{COMPREHEND_MEDICAL, COMPREHEND_PHI, HEALTHCARE_NLP};

/// Transform an attribute-shaped payload. Clinical relations come first,
/// followed by PHI relations.
pub fn transform_attribute_payload(
    text: &str,
    payload: &AttributePayload,
    config: &PipelineConfig,
) -> Extraction {
    let document = SourceDocument::new(text);
    let matcher = SpanMatcher::new().with_max_error_ratio(config.max_error_ratio);
    let coder = OverlapCoder::new(&payload.coded_lists, matcher);

    let mut relations = AttributeRelationBuilder::new(&COMPREHEND_MEDICAL, coder, &document)
        .build(&payload.detections);
    let clinical = relations.len();

    if config.include_phi {
        relations.extend(build_phi_relations(&payload.phi, &COMPREHEND_PHI, &document));
    }

    tracing::debug!(
        "Transformed {} detections ({} PHI) into {} clinical and {} PHI relations",
        payload.detections.len(),
        payload.phi.len(),
        clinical,
        relations.len() - clinical
    );

    finish(Extraction::new(relations))
}

/// Transform a graph-shaped payload
pub fn transform_graph_payload(
    text: &str,
    payload: &GraphPayload,
    config: &PipelineConfig,
) -> Extraction {
    let document = SourceDocument::new(text);
    let coder = LinkCoder::new(&payload.vocabulary);

    let relations = GraphRelationBuilder::new(
        &HEALTHCARE_NLP,
        coder,
        &document,
        config.relationship_confidence_threshold,
    )
    .build(payload);

    tracing::debug!(
        "Transformed {} mentions and {} edges into {} relations",
        payload.mentions.len(),
        payload.relationships.len(),
        relations.len()
    );

    finish(Extraction::new(relations))
}

fn finish(extraction: Extraction) -> Extraction {
    tracing::debug!("{:?}", ExtractionSummary::from_extraction(&extraction));
    extraction
}
