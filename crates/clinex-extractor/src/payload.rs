//! Provider-independent raw detection payloads
//!
//! Vendor wire responses are converted into these shapes before the
//! transformation stage runs, so every stage can be driven by synthetic
//! inputs.

use serde::{Deserialize, Serialize};

/// A provider detection, possibly carrying nested attribute detections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Detection {
    pub id: String,
    pub text: String,
    pub begin_offset: usize,
    pub end_offset: usize,
    pub category: String,
    #[serde(rename = "type")]
    pub detection_type: String,
    pub traits: Vec<String>,
    pub attributes: Vec<Detection>,
}

impl Detection {
    /// Create a detection without traits or attributes
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        begin_offset: usize,
        end_offset: usize,
        category: impl Into<String>,
        detection_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            begin_offset,
            end_offset,
            category: category.into(),
            detection_type: detection_type.into(),
            traits: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Add a trait flag
    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.traits.push(name.into());
        self
    }

    /// Attach an attribute detection
    pub fn with_attribute(mut self, attribute: Detection) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Standard vocabulary an overlap-based coded list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VocabularySystem {
    Icd10Cm,
    RxNorm,
}

impl VocabularySystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icd10Cm => "ICD-10-CM",
            Self::RxNorm => "RxNorm",
        }
    }
}

impl std::fmt::Display for VocabularySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A vocabulary concept attached to a coded detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Concept {
    pub code: String,
    pub description: String,
    /// Absent when the service reported no score
    pub score: Option<f32>,
}

/// A span returned by a vocabulary inference request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodedDetection {
    pub text: String,
    pub begin_offset: usize,
    pub end_offset: usize,
    pub concepts: Vec<Concept>,
}

/// One vocabulary system's independently computed coded entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodedEntityList {
    pub system: VocabularySystem,
    pub entities: Vec<CodedDetection>,
}

impl CodedEntityList {
    pub fn new(system: VocabularySystem, entities: Vec<CodedDetection>) -> Self {
        Self { system, entities }
    }
}

/// Everything an attribute-shaped provider returned for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributePayload {
    pub detections: Vec<Detection>,
    pub coded_lists: Vec<CodedEntityList>,
    pub phi: Vec<Detection>,
}

/// A graph-provider mention
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mention {
    pub mention_id: String,
    pub text: String,
    pub begin_offset: Option<usize>,
    #[serde(rename = "type")]
    pub mention_type: String,
    pub subject: Option<String>,
    pub linked_entities: Vec<String>,
}

impl Mention {
    /// Offsets of the mention; begin defaults to 0 and the end is derived
    /// from the text length in chars
    pub fn offsets(&self) -> (usize, usize) {
        let begin = self.begin_offset.unwrap_or(0);
        (begin, begin + self.text.chars().count())
    }
}

/// A directed relationship edge between two mentions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipEdge {
    pub subject_id: String,
    pub object_id: String,
    pub confidence: f32,
}

/// An entry in a graph provider's vocabulary table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyEntry {
    pub entity_id: String,
    pub preferred_term: String,
    pub vocabulary_codes: Vec<String>,
}

/// Everything a graph-shaped provider returned for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphPayload {
    pub mentions: Vec<Mention>,
    pub relationships: Vec<RelationshipEdge>,
    pub vocabulary: Vec<VocabularyEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_offsets_derive_end_from_chars() {
        let mention = Mention {
            mention_id: "1".to_string(),
            text: "café".to_string(),
            begin_offset: Some(10),
            ..Default::default()
        };
        assert_eq!(mention.offsets(), (10, 14));

        let unplaced = Mention {
            text: "insulin".to_string(),
            ..Default::default()
        };
        assert_eq!(unplaced.offsets(), (0, 7));
    }

    #[test]
    fn test_detection_builder() {
        let detection = Detection::new("0", "aspirin", 0, 7, "MEDICATION", "GENERIC_NAME")
            .with_trait("NEGATION")
            .with_attribute(Detection::new("1", "81mg", 8, 12, "MEDICATION", "DOSAGE"));

        assert_eq!(detection.traits, vec!["NEGATION"]);
        assert_eq!(detection.attributes.len(), 1);
    }
}
