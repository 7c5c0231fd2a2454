//! Healthcare Natural Language wire format
//!
//! Serde mirror of the `analyzeEntities` response and its conversion into
//! [`GraphPayload`].

use clinex_core::{ClinexError, Result};
use serde::{Deserialize, Serialize};

use crate::payload::{GraphPayload, Mention, RelationshipEdge, VocabularyEntry};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeEntitiesResponse {
    /// Absent when the service produced no result
    pub entity_mentions: Option<Vec<EntityMention>>,
    #[serde(default)]
    pub entities: Vec<HealthcareEntity>,
    #[serde(default)]
    pub relationships: Vec<EntityRelationship>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityMention {
    pub mention_id: String,
    #[serde(rename = "type")]
    pub mention_type: String,
    pub text: TextSpan,
    pub subject: Option<Feature>,
    pub linked_entities: Vec<LinkedEntity>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextSpan {
    pub content: String,
    pub begin_offset: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Feature {
    pub value: String,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkedEntity {
    pub entity_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthcareEntity {
    pub entity_id: String,
    pub preferred_term: String,
    pub vocabulary_codes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityRelationship {
    pub subject_id: String,
    pub object_id: String,
    pub confidence: f32,
}

/// Assemble the provider-independent payload. The mention list must be
/// present; entities and relationships default to empty.
pub fn graph_payload(response: AnalyzeEntitiesResponse) -> Result<GraphPayload> {
    let mentions = response
        .entity_mentions
        .ok_or_else(|| ClinexError::EmptyResponse("analyzeEntities".to_string()))?;

    Ok(GraphPayload {
        mentions: mentions
            .into_iter()
            .map(|m| Mention {
                mention_id: m.mention_id,
                text: m.text.content,
                begin_offset: m.text.begin_offset,
                mention_type: m.mention_type,
                subject: m.subject.map(|s| s.value),
                linked_entities: m.linked_entities.into_iter().map(|l| l.entity_id).collect(),
            })
            .collect(),
        relationships: response
            .relationships
            .into_iter()
            .map(|r| RelationshipEdge {
                subject_id: r.subject_id,
                object_id: r.object_id,
                confidence: r.confidence,
            })
            .collect(),
        vocabulary: response
            .entities
            .into_iter()
            .map(|e| VocabularyEntry {
                entity_id: e.entity_id,
                preferred_term: e.preferred_term,
                vocabulary_codes: e.vocabulary_codes,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_analyze_entities() {
        let response: AnalyzeEntitiesResponse = serde_json::from_value(json!({
            "entityMentions": [{
                "mentionId": "1",
                "type": "MEDICINE",
                "text": { "content": "insulin", "beginOffset": 4 },
                "subject": { "value": "PATIENT", "confidence": 0.98 },
                "linkedEntities": [{ "entityId": "UMLS/C0021641" }],
                "confidence": 0.93
            }, {
                "mentionId": "2",
                "type": "MED_FREQUENCY",
                "text": { "content": "nightly" }
            }],
            "entities": [{
                "entityId": "UMLS/C0021641",
                "preferredTerm": "Insulin",
                "vocabularyCodes": ["MSH/D007328", "RXNORM/5856"]
            }],
            "relationships": [{ "subjectId": "1", "objectId": "2", "confidence": 0.96 }]
        }))
        .unwrap();

        let payload = graph_payload(response).unwrap();
        assert_eq!(payload.mentions.len(), 2);
        assert_eq!(payload.mentions[0].offsets(), (4, 11));
        assert_eq!(payload.mentions[0].subject.as_deref(), Some("PATIENT"));
        assert_eq!(payload.mentions[0].linked_entities, vec!["UMLS/C0021641"]);
        assert_eq!(payload.mentions[1].begin_offset, None);
        assert_eq!(payload.relationships[0].confidence, 0.96);
        assert_eq!(payload.vocabulary[0].vocabulary_codes.len(), 2);
    }

    #[test]
    fn test_missing_mentions_is_empty_response() {
        let response: AnalyzeEntitiesResponse =
            serde_json::from_value(json!({ "entities": [] })).unwrap();
        assert!(matches!(
            graph_payload(response),
            Err(ClinexError::EmptyResponse(_))
        ));
    }
}
