//! Comprehend Medical wire format
//!
//! Serde mirrors of the DetectEntitiesV2, InferICD10CM, InferRxNorm and
//! DetectPHI responses, and their conversion into [`AttributePayload`].

use clinex_core::{ClinexError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::{
    AttributePayload, CodedDetection, CodedEntityList, Concept, Detection, VocabularySystem,
};

/// Response body shared by all four entity operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComprehendResponse {
    /// Absent when the service produced no result
    pub entities: Option<Vec<ComprehendEntity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl ComprehendResponse {
    pub fn new(entities: Vec<ComprehendEntity>) -> Self {
        Self {
            entities: Some(entities),
            model_version: None,
        }
    }
}

/// One detected entity or attribute
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ComprehendEntity {
    pub id: u64,
    pub text: String,
    pub begin_offset: usize,
    pub end_offset: usize,
    pub score: Option<f32>,
    pub category: Option<String>,
    #[serde(rename = "Type")]
    pub entity_type: Option<String>,
    pub traits: Vec<ComprehendTrait>,
    pub attributes: Vec<ComprehendEntity>,
    /// Raw concepts, parsed one at a time by [`ComprehendConcept::parse`]
    #[serde(rename = "ICD10CMConcepts", skip_serializing_if = "Vec::is_empty")]
    pub icd10_cm_concepts: Vec<Value>,
    #[serde(rename = "RxNormConcepts", skip_serializing_if = "Vec::is_empty")]
    pub rx_norm_concepts: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ComprehendTrait {
    pub name: String,
    pub score: Option<f32>,
}

/// A vocabulary concept. Older RxNorm responses name the fields
/// `ConceptName` and `ConceptId`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ComprehendConcept {
    #[serde(alias = "ConceptName")]
    pub description: Option<String>,
    #[serde(alias = "ConceptId")]
    pub code: Option<String>,
    pub score: Option<f32>,
}

impl ComprehendConcept {
    /// Convert one raw concept. A concept without a code, or with fields of
    /// the wrong type, is an invalid payload.
    pub fn parse(value: Value) -> Result<Concept> {
        let concept: Self = serde_json::from_value(value)
            .map_err(|e| ClinexError::InvalidPayload(format!("concept: {e}")))?;

        let code = concept
            .code
            .filter(|code| !code.trim().is_empty())
            .ok_or_else(|| {
                ClinexError::InvalidPayload("concept without a code".to_string())
            })?;

        Ok(Concept {
            code,
            description: concept.description.unwrap_or_default(),
            score: concept.score,
        })
    }
}

impl ComprehendEntity {
    /// Convert into a detection. Attributes without their own category
    /// inherit the parent's.
    fn into_detection(self, parent_category: Option<&str>) -> Detection {
        let category = self
            .category
            .or_else(|| parent_category.map(str::to_string))
            .unwrap_or_default();

        let attributes = self
            .attributes
            .into_iter()
            .map(|attribute| attribute.into_detection(Some(&category)))
            .collect();

        Detection {
            id: self.id.to_string(),
            text: self.text,
            begin_offset: self.begin_offset,
            end_offset: self.end_offset,
            detection_type: self.entity_type.unwrap_or_default(),
            traits: self.traits.into_iter().map(|t| t.name).collect(),
            attributes,
            category,
        }
    }

    fn into_coded(self, system: VocabularySystem) -> CodedDetection {
        let raw = match system {
            VocabularySystem::Icd10Cm => self.icd10_cm_concepts,
            VocabularySystem::RxNorm => self.rx_norm_concepts,
        };

        let concepts = raw
            .into_iter()
            .filter_map(|value| match ComprehendConcept::parse(value) {
                Ok(concept) => Some(concept),
                Err(e) => {
                    tracing::debug!("Dropping {} concept for '{}': {}", system, self.text, e);
                    None
                }
            })
            .collect();

        CodedDetection {
            text: self.text,
            begin_offset: self.begin_offset,
            end_offset: self.end_offset,
            concepts,
        }
    }
}

/// Assemble the provider-independent payload. The primary response must
/// carry an entity list; the others default to empty.
pub fn attribute_payload(
    detected: ComprehendResponse,
    icd10_cm: ComprehendResponse,
    rx_norm: ComprehendResponse,
    phi: Option<ComprehendResponse>,
) -> Result<AttributePayload> {
    let detections = detected
        .entities
        .ok_or_else(|| ClinexError::EmptyResponse("DetectEntitiesV2".to_string()))?
        .into_iter()
        .map(|e| e.into_detection(None))
        .collect();

    let coded = |response: ComprehendResponse, system| {
        CodedEntityList::new(
            system,
            response
                .entities
                .unwrap_or_default()
                .into_iter()
                .map(|e| e.into_coded(system))
                .collect(),
        )
    };

    Ok(AttributePayload {
        detections,
        coded_lists: vec![
            coded(icd10_cm, VocabularySystem::Icd10Cm),
            coded(rx_norm, VocabularySystem::RxNorm),
        ],
        phi: phi
            .and_then(|r| r.entities)
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.into_detection(None))
            .collect(),
    })
}
