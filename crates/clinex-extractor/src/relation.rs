//! Relation construction
//!
//! Assembles canonical entities into relations. Two algorithms, chosen by
//! provider shape:
//! - Attribute-based: a primary detection plus its nested attributes
//! - Graph clustering: mentions joined by confidence-filtered relationship
//!   edges, one hop from each cluster root
//!
//! PHI detections always become singleton relations.

use std::collections::{HashMap, HashSet};

use clinex_core::{ContextSubject, Entity, Relation};
use thiserror::Error;

use crate::coding::{LinkCoder, OverlapCoder};
use crate::overlap::Span;
use crate::payload::{Detection, GraphPayload, Mention, RelationshipEdge};
use crate::taxonomy::{Classification, Taxonomy};

// ============================================================================
// Errors
// ============================================================================

/// Why a single relation could not be assembled. Never fatal for the
/// extraction: the relation is logged and skipped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RelationError {
    #[error("relation has no entities")]
    Empty,

    #[error("entity {id} spans {begin}..{end}, outside a document of {len} chars")]
    OffsetOutOfRange {
        id: String,
        begin: usize,
        end: usize,
        len: usize,
    },
}

// ============================================================================
// Source Document
// ============================================================================

/// Document text addressable by character offsets
#[derive(Debug, Clone)]
pub struct SourceDocument<'a> {
    text: &'a str,
    /// Byte index of every char boundary, including the end of the text
    boundaries: Vec<usize>,
}

impl<'a> SourceDocument<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Length in chars
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Text between two char offsets, if the range is valid
    pub fn slice(&self, begin: usize, end: usize) -> Option<&'a str> {
        if begin > end || end > self.char_len() {
            return None;
        }
        Some(&self.text[self.boundaries[begin]..self.boundaries[end]])
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Reconstruct a readable statement: subjects first (negated ones prefixed
/// with "no"), then the attached objects.
pub fn build_statement(entities: &[Entity]) -> String {
    let subjects: Vec<String> = entities
        .iter()
        .filter(|e| !e.is_relation_object)
        .map(|e| {
            if e.is_negated {
                format!("no {}", e.text.trim())
            } else {
                e.text.trim().to_string()
            }
        })
        .collect();
    let objects: Vec<&str> = entities
        .iter()
        .filter(|e| e.is_relation_object)
        .map(|e| e.text.trim())
        .collect();

    match (subjects.is_empty(), objects.is_empty()) {
        (false, false) => format!("{} - {}", subjects.join(" "), objects.join(", ")),
        (false, true) => subjects.join(" "),
        _ => objects.join(", "),
    }
}

/// Build a relation from ordered entities. Category and type come from the
/// first entity; the original statement spans every entity.
pub fn assemble(
    entities: Vec<Entity>,
    document: &SourceDocument<'_>,
    context_subject: Option<ContextSubject>,
    keywords: Vec<String>,
) -> Result<Relation, RelationError> {
    let first = entities.first().ok_or(RelationError::Empty)?;
    let (category, entity_type) = (first.category, first.entity_type);

    let out_of_range = |e: &Entity| RelationError::OffsetOutOfRange {
        id: e.extraction_id.clone(),
        begin: e.begin_offset,
        end: e.end_offset,
        len: document.char_len(),
    };

    if let Some(bad) = entities
        .iter()
        .find(|e| e.begin_offset > e.end_offset || e.end_offset > document.char_len())
    {
        return Err(out_of_range(bad));
    }

    let begin = entities.iter().map(|e| e.begin_offset).min().unwrap_or(0);
    let end = entities.iter().map(|e| e.end_offset).max().unwrap_or(0);
    let original_statement = document
        .slice(begin, end)
        .ok_or_else(|| out_of_range(first))?
        .to_string();

    Ok(Relation {
        statement: build_statement(&entities),
        original_statement,
        entities,
        category,
        entity_type,
        keywords,
        context_subject,
    })
}

// ============================================================================
// Attribute-based
// ============================================================================

/// Builds relations from primary detections with nested attributes
pub struct AttributeRelationBuilder<'a> {
    taxonomy: &'static Taxonomy,
    coder: OverlapCoder<'a>,
    document: &'a SourceDocument<'a>,
}

impl<'a> AttributeRelationBuilder<'a> {
    pub fn new(
        taxonomy: &'static Taxonomy,
        coder: OverlapCoder<'a>,
        document: &'a SourceDocument<'a>,
    ) -> Self {
        Self {
            taxonomy,
            coder,
            document,
        }
    }

    /// One relation per primary detection that carries attributes.
    /// Detections without attributes are not reportable and are dropped.
    pub fn build(&self, detections: &[Detection]) -> Vec<Relation> {
        let mut relations = Vec::new();

        for detection in detections {
            if detection.attributes.is_empty() {
                tracing::trace!("Detection {} has no attributes, dropped", detection.id);
                continue;
            }

            let subject = self.entity(detection, false);
            let context_subject = subject.context_subject;

            let mut entities = Vec::with_capacity(detection.attributes.len() + 1);
            entities.push(subject);
            entities.extend(
                detection
                    .attributes
                    .iter()
                    .map(|attribute| self.entity(attribute, true)),
            );

            match assemble(entities, self.document, Some(context_subject), Vec::new()) {
                Ok(relation) => relations.push(relation),
                Err(e) => tracing::warn!("Skipping relation for detection {}: {}", detection.id, e),
            }
        }

        relations
    }

    fn entity(&self, detection: &Detection, is_relation_object: bool) -> Entity {
        let Classification {
            category,
            entity_type,
            is_negated,
            context_subject,
        } = self.taxonomy.classify(
            Some(&detection.category),
            &detection.detection_type,
            &detection.traits,
        );

        let span = Span::new(&detection.text, detection.begin_offset, detection.end_offset);

        Entity {
            extraction_id: detection.id.clone(),
            text: detection.text.clone(),
            begin_offset: detection.begin_offset,
            end_offset: detection.end_offset,
            category,
            entity_type,
            is_negated,
            context_subject,
            is_relation_object,
            coded_terms: self.coder.terms_for(&span),
        }
    }
}

// ============================================================================
// Graph clustering
// ============================================================================

/// Builds relations by clustering mentions over relationship edges
pub struct GraphRelationBuilder<'a> {
    taxonomy: &'static Taxonomy,
    coder: LinkCoder<'a>,
    document: &'a SourceDocument<'a>,
    threshold: f32,
}

impl<'a> GraphRelationBuilder<'a> {
    pub fn new(
        taxonomy: &'static Taxonomy,
        coder: LinkCoder<'a>,
        document: &'a SourceDocument<'a>,
        threshold: f32,
    ) -> Self {
        Self {
            taxonomy,
            coder,
            document,
            threshold,
        }
    }

    /// One relation per cluster root, roots visited in document order
    pub fn build(&self, payload: &GraphPayload) -> Vec<Relation> {
        let mut by_id: HashMap<&str, &Mention> = HashMap::new();
        for mention in &payload.mentions {
            by_id.entry(mention.mention_id.as_str()).or_insert(mention);
        }

        // Edges at the threshold survive
        let edges: Vec<&RelationshipEdge> = payload
            .relationships
            .iter()
            .filter(|edge| edge.confidence >= self.threshold)
            .collect();
        tracing::debug!(
            "{} of {} relationship edges pass threshold {}",
            edges.len(),
            payload.relationships.len(),
            self.threshold
        );

        let mut ordered: Vec<&Mention> = payload.mentions.iter().collect();
        ordered.sort_by_key(|m| m.begin_offset.unwrap_or(0));

        let mut consumed: HashSet<&str> = HashSet::new();
        let mut relations = Vec::new();

        for root in ordered {
            if consumed.contains(root.mention_id.as_str()) {
                continue;
            }

            let mut cluster = self.cluster(root, &by_id, &edges);
            for entity in &cluster {
                if let Some(mention) = by_id.get(entity.extraction_id.as_str()).copied() {
                    consumed.insert(mention.mention_id.as_str());
                }
            }

            // Stable: subjects keep their order ahead of objects
            cluster.sort_by_key(|e| e.is_relation_object);
            let context_subject = cluster.first().map(|e| e.context_subject);

            match assemble(cluster, self.document, context_subject, Vec::new()) {
                Ok(relation) => relations.push(relation),
                Err(e) => tracing::warn!("Skipping cluster rooted at {}: {}", root.mention_id, e),
            }
        }

        relations
    }

    /// The root plus every mention one surviving edge away. A mention
    /// reached twice keeps its first role.
    fn cluster(
        &self,
        root: &Mention,
        by_id: &HashMap<&str, &Mention>,
        edges: &[&RelationshipEdge],
    ) -> Vec<Entity> {
        let mut cluster = vec![self.entity(root, false)];
        let mut members: HashSet<&str> = HashSet::from([root.mention_id.as_str()]);
        let mut root_is_object = false;

        for edge in edges {
            let (other_id, other_is_object) = if edge.subject_id == root.mention_id {
                (edge.object_id.as_str(), true)
            } else if edge.object_id == root.mention_id {
                (edge.subject_id.as_str(), false)
            } else {
                continue;
            };

            let Some(other) = by_id.get(other_id).copied() else {
                tracing::warn!(
                    "Relationship {} -> {} references unknown mention {}",
                    edge.subject_id,
                    edge.object_id,
                    other_id
                );
                continue;
            };

            if !members.insert(other.mention_id.as_str()) {
                continue;
            }

            root_is_object = !other_is_object;
            cluster.push(self.entity(other, other_is_object));
        }

        cluster[0].is_relation_object = root_is_object;
        cluster
    }

    fn entity(&self, mention: &Mention, is_relation_object: bool) -> Entity {
        let classification = self.taxonomy.classify(None, &mention.mention_type, &[]);
        let (begin_offset, end_offset) = mention.offsets();

        Entity {
            extraction_id: mention.mention_id.clone(),
            text: mention.text.clone(),
            begin_offset,
            end_offset,
            category: classification.category,
            entity_type: classification.entity_type,
            is_negated: classification.is_negated,
            context_subject: ContextSubject::from_code(mention.subject.as_deref()),
            is_relation_object,
            coded_terms: self.coder.terms_for(&mention.linked_entities),
        }
    }
}

// ============================================================================
// PHI
// ============================================================================

/// One singleton relation per protected health information detection
pub fn build_phi_relations(
    detections: &[Detection],
    taxonomy: &'static Taxonomy,
    document: &SourceDocument<'_>,
) -> Vec<Relation> {
    detections
        .iter()
        .filter_map(|detection| {
            let (category, entity_type) =
                taxonomy.classify_phi(&detection.category, &detection.detection_type);

            let entity = Entity {
                extraction_id: detection.id.clone(),
                text: detection.text.clone(),
                begin_offset: detection.begin_offset,
                end_offset: detection.end_offset,
                category,
                entity_type,
                is_negated: false,
                context_subject: ContextSubject::Default,
                is_relation_object: false,
                coded_terms: Vec::new(),
            };

            assemble(vec![entity], document, None, Vec::new())
                .map_err(|e| tracing::warn!("Skipping PHI detection {}: {}", detection.id, e))
                .ok()
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::SpanMatcher;
    use crate::payload::{CodedEntityList, VocabularyEntry};
    use crate::taxonomy::{COMPREHEND_MEDICAL, COMPREHEND_PHI, HEALTHCARE_NLP};
    use clinex_core::{Category, EntityType};

    const NO_LISTS: &[CodedEntityList] = &[];
    const NO_VOCABULARY: &[VocabularyEntry] = &[];

    fn attribute_relations(text: &str, detections: &[Detection]) -> Vec<Relation> {
        let document = SourceDocument::new(text);
        let coder = OverlapCoder::new(NO_LISTS, SpanMatcher::new());
        AttributeRelationBuilder::new(&COMPREHEND_MEDICAL, coder, &document).build(detections)
    }

    fn mention(id: &str, text: &str, begin: usize, mention_type: &str) -> Mention {
        Mention {
            mention_id: id.to_string(),
            text: text.to_string(),
            begin_offset: Some(begin),
            mention_type: mention_type.to_string(),
            subject: None,
            linked_entities: Vec::new(),
        }
    }

    fn edge(subject: &str, object: &str, confidence: f32) -> RelationshipEdge {
        RelationshipEdge {
            subject_id: subject.to_string(),
            object_id: object.to_string(),
            confidence,
        }
    }

    fn graph_relations(text: &str, payload: &GraphPayload) -> Vec<Relation> {
        let document = SourceDocument::new(text);
        let coder = LinkCoder::new(NO_VOCABULARY);
        GraphRelationBuilder::new(&HEALTHCARE_NLP, coder, &document, 0.9).build(payload)
    }

    fn ids(relation: &Relation) -> Vec<&str> {
        relation
            .entities
            .iter()
            .map(|e| e.extraction_id.as_str())
            .collect()
    }

    // "A B C" with one-char mentions
    fn abc_payload(relationships: Vec<RelationshipEdge>) -> GraphPayload {
        GraphPayload {
            mentions: vec![
                mention("A", "a", 0, "MEDICINE"),
                mention("B", "b", 2, "MED_DOSE"),
                mention("C", "c", 4, "PROBLEM"),
            ],
            relationships,
            vocabulary: Vec::new(),
        }
    }

    #[test]
    fn test_source_document_slices_by_chars() {
        let document = SourceDocument::new("naïve café");
        assert_eq!(document.char_len(), 10);
        assert_eq!(document.slice(6, 10), Some("café"));
        assert_eq!(document.slice(0, 11), None);
        assert_eq!(document.slice(4, 3), None);
    }

    #[test]
    fn test_statement_with_objects_and_negation() {
        let text = "no chest pain today";
        let detections = vec![
            Detection::new("0", "chest pain", 3, 13, "MEDICAL_CONDITION", "DX_NAME")
                .with_trait("NEGATION")
                .with_attribute(Detection::new("1", "today", 14, 19, "TIME_EXPRESSION", "DATE")),
        ];

        let relations = attribute_relations(text, &detections);
        assert_eq!(relations[0].statement, "no chest pain - today");
        assert_eq!(relations[0].original_statement, "chest pain today");
    }

    #[test]
    fn test_detection_without_attributes_yields_nothing() {
        let detections = vec![Detection::new("0", "aspirin", 0, 7, "MEDICATION", "GENERIC_NAME")];
        assert!(attribute_relations("aspirin", &detections).is_empty());
    }

    #[test]
    fn test_detection_with_attributes_yields_one_relation() {
        let text = "aspirin 81mg daily by mouth";
        let detections = vec![Detection::new("0", "aspirin", 0, 7, "MEDICATION", "GENERIC_NAME")
            .with_attribute(Detection::new("1", "81mg", 8, 12, "MEDICATION", "DOSAGE"))
            .with_attribute(Detection::new("2", "daily", 13, 18, "MEDICATION", "FREQUENCY"))
            .with_attribute(Detection::new(
                "3",
                "by mouth",
                19,
                27,
                "MEDICATION",
                "ROUTE_OR_MODE",
            ))];

        let relations = attribute_relations(text, &detections);
        assert_eq!(relations.len(), 1);

        let relation = &relations[0];
        assert_eq!(relation.entities.len(), 4);
        assert!(!relation.entities[0].is_relation_object);
        assert!(relation.entities[1..].iter().all(|e| e.is_relation_object));
        assert_eq!(relation.category, Category::Medication);
        assert_eq!(relation.entity_type, EntityType::GenericName);
        assert_eq!(relation.entities[3].entity_type, EntityType::Route);
        assert_eq!(relation.original_statement, text);
    }

    #[test]
    fn test_out_of_range_relation_is_skipped() {
        let text = "aspirin 81mg";
        let detections = vec![
            Detection::new("0", "aspirin", 0, 7, "MEDICATION", "GENERIC_NAME")
                .with_attribute(Detection::new("1", "81mg", 8, 40, "MEDICATION", "DOSAGE")),
            Detection::new("2", "aspirin", 0, 7, "MEDICATION", "GENERIC_NAME")
                .with_attribute(Detection::new("3", "81mg", 8, 12, "MEDICATION", "DOSAGE")),
        ];

        let relations = attribute_relations(text, &detections);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].entities[0].extraction_id, "2");
    }

    #[test]
    fn test_assemble_rejects_empty() {
        let document = SourceDocument::new("text");
        assert_eq!(
            assemble(Vec::new(), &document, None, Vec::new()).unwrap_err(),
            RelationError::Empty
        );
    }

    #[test]
    fn test_low_confidence_edge_splits_clusters() {
        let payload = abc_payload(vec![edge("A", "B", 0.95), edge("B", "C", 0.5)]);
        let relations = graph_relations("a b c", &payload);

        assert_eq!(relations.len(), 2);
        assert_eq!(ids(&relations[0]), vec!["A", "B"]);
        assert_eq!(ids(&relations[1]), vec!["C"]);
    }

    #[test]
    fn test_edge_at_threshold_is_kept() {
        let kept = graph_relations("a b c", &abc_payload(vec![edge("A", "B", 0.9)]));
        assert_eq!(ids(&kept[0]), vec!["A", "B"]);

        let dropped = graph_relations("a b c", &abc_payload(vec![edge("A", "B", 0.89)]));
        assert_eq!(dropped.len(), 3);
    }

    #[test]
    fn test_clustering_is_one_hop() {
        let payload = abc_payload(vec![edge("A", "B", 0.95), edge("B", "C", 0.95)]);
        let relations = graph_relations("a b c", &payload);

        // C is not pulled into A's cluster through B; it roots its own
        assert_eq!(relations.len(), 2);
        assert_eq!(ids(&relations[0]), vec!["A", "B"]);
        assert_eq!(ids(&relations[1]), vec!["B", "C"]);
        assert!(!relations[1].entities[0].is_relation_object);
        assert!(relations[1].entities[1].is_relation_object);
    }

    #[test]
    fn test_subject_sorts_ahead_of_objects() {
        // A is only ever an edge object, so the subject B leads the relation
        let payload = abc_payload(vec![edge("B", "A", 0.99)]);
        let relations = graph_relations("a b c", &payload);

        let relation = &relations[0];
        assert_eq!(ids(relation), vec!["B", "A"]);
        assert!(!relation.entities[0].is_relation_object);
        assert!(relation.entities[1].is_relation_object);
        assert_eq!(relation.category, Category::Medication);
        assert_eq!(relation.entity_type, EntityType::Dosage);
        assert_eq!(relation.original_statement, "a b");
    }

    #[test]
    fn test_singleton_cluster() {
        let relations = graph_relations("a b c", &abc_payload(Vec::new()));
        assert_eq!(relations.len(), 3);
        assert!(relations.iter().all(|r| r.entities.len() == 1));
        assert_eq!(relations[2].category, Category::MedicalCondition);
    }

    #[test]
    fn test_bidirectional_edges_keep_first_role() {
        let payload = abc_payload(vec![edge("A", "B", 0.95), edge("B", "A", 0.95)]);
        let relations = graph_relations("a b c", &payload);

        assert_eq!(ids(&relations[0]), vec!["A", "B"]);
        assert!(!relations[0].entities[0].is_relation_object);
        assert!(relations[0].entities[1].is_relation_object);
    }

    #[test]
    fn test_dangling_edge_is_ignored() {
        let payload = abc_payload(vec![edge("A", "Z", 0.99)]);
        let relations = graph_relations("a b c", &payload);
        assert_eq!(relations.len(), 3);
        assert_eq!(ids(&relations[0]), vec!["A"]);
    }

    #[test]
    fn test_mentions_visited_in_document_order() {
        let mut payload = abc_payload(Vec::new());
        payload.mentions.reverse();
        let relations = graph_relations("a b c", &payload);
        assert_eq!(ids(&relations[0]), vec!["A"]);
        assert_eq!(ids(&relations[2]), vec!["C"]);
    }

    #[test]
    fn test_context_subject_from_first_entity() {
        let mut payload = abc_payload(vec![edge("A", "B", 0.95)]);
        payload.mentions[0].subject = Some("FAMILY_MEMBER".to_string());
        let relations = graph_relations("a b c", &payload);
        assert_eq!(relations[0].context_subject, Some(ContextSubject::Family));
        assert!(relations[0].keywords.is_empty());
    }

    #[test]
    fn test_phi_relations_are_singletons() {
        let text = "John Smith, age 54";
        let document = SourceDocument::new(text);
        let detections = vec![
            Detection::new("0", "John Smith", 0, 10, "PROTECTED_HEALTH_INFORMATION", "NAME"),
            Detection::new("1", "54", 16, 18, "PROTECTED_HEALTH_INFORMATION", "AGE"),
        ];

        let relations = build_phi_relations(&detections, &COMPREHEND_PHI, &document);
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].category, Category::ProtectedHealthInformation);
        assert_eq!(relations[0].entity_type, EntityType::Name);
        assert_eq!(relations[1].entity_type, EntityType::Age);
        assert_eq!(relations[1].original_statement, "54");
        assert!(relations[0].context_subject.is_none());
    }
}
