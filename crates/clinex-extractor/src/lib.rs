//! Clinex Extractor - Clinical entity normalization pipeline
//!
//! Turns raw clinical NLP provider output into the canonical extraction
//! model:
//! - Taxonomy mapping of vendor codes
//! - Approximate span overlap and coded-term assembly
//! - Relation construction (attribute-based, graph clustering, PHI)
//! - Providers over async upstream APIs, including a replay client

pub mod coding;
pub mod overlap;
pub mod payload;
pub mod pipeline;
pub mod provider;
pub mod relation;
pub mod summary;
pub mod taxonomy;

pub use overlap::{Span, SpanMatcher};
pub use payload::{AttributePayload, Detection, GraphPayload};
pub use pipeline::{transform_attribute_payload, transform_graph_payload};
pub use provider::{
    replay_provider, AttributeProvider, ComprehendMedicalApi, GraphProvider, HealthcareNlpApi,
    ReplayClient,
};
pub use relation::RelationError;
pub use summary::ExtractionSummary;
pub use taxonomy::{Classification, Taxonomy};
