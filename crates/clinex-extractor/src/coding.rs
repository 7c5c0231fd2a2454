//! Coded-term assembly
//!
//! Gathers standard vocabulary codes for one canonical entity, either from
//! explicit provider links or by overlapping the entity's span against
//! independently returned coded-entity lists.

use std::collections::HashMap;

use clinex_core::CodedTerm;

use crate::overlap::{Span, SpanMatcher};
use crate::payload::{CodedEntityList, Concept, VocabularyEntry};

// ============================================================================
// Overlap-based
// ============================================================================

/// Resolves coded terms by span overlap against per-vocabulary lists
pub struct OverlapCoder<'a> {
    lists: &'a [CodedEntityList],
    matcher: SpanMatcher,
}

impl<'a> OverlapCoder<'a> {
    pub fn new(lists: &'a [CodedEntityList], matcher: SpanMatcher) -> Self {
        Self { lists, matcher }
    }

    /// Every concept of every overlapping coded entity, lists in order.
    /// Repeated concepts are kept.
    pub fn terms_for(&self, span: &Span<'_>) -> Vec<CodedTerm> {
        let mut terms = Vec::new();

        for list in self.lists {
            for coded in &list.entities {
                let candidate = Span::new(&coded.text, coded.begin_offset, coded.end_offset);
                if !self.matcher.overlaps(span, &candidate) {
                    continue;
                }

                for concept in &coded.concepts {
                    match concept_term(concept) {
                        Some(term) => terms.push(term),
                        None => tracing::debug!(
                            "Skipping malformed {} concept {:?} for '{}'",
                            list.system,
                            concept.code,
                            coded.text
                        ),
                    }
                }
            }
        }

        terms
    }
}

fn concept_term(concept: &Concept) -> Option<CodedTerm> {
    let code = concept.code.trim();
    let score_in_range = concept
        .score
        .map_or(true, |score| (0.0..=1.0).contains(&score));
    if code.is_empty() || !score_in_range {
        return None;
    }

    Some(CodedTerm {
        norm_codes: vec![code.to_string()],
        term: concept.description.clone(),
        confidence: concept.score,
        nlp_system_entity_code: None,
    })
}

// ============================================================================
// Link-based
// ============================================================================

/// Resolves coded terms from explicit entity links
pub struct LinkCoder<'a> {
    vocabulary: HashMap<&'a str, &'a VocabularyEntry>,
}

impl<'a> LinkCoder<'a> {
    pub fn new(entries: &'a [VocabularyEntry]) -> Self {
        let vocabulary = entries
            .iter()
            .map(|entry| (entry.entity_id.as_str(), entry))
            .collect();
        Self { vocabulary }
    }

    /// One term per link found in the vocabulary table; unknown links are
    /// skipped
    pub fn terms_for(&self, links: &[String]) -> Vec<CodedTerm> {
        links
            .iter()
            .filter_map(|link| match self.vocabulary.get(link.as_str()) {
                Some(entry) => Some(CodedTerm {
                    norm_codes: entry.vocabulary_codes.clone(),
                    term: entry.preferred_term.clone(),
                    confidence: None,
                    nlp_system_entity_code: Some(entry.entity_id.clone()),
                }),
                None => {
                    tracing::debug!("Linked entity {} missing from vocabulary", link);
                    None
                }
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{CodedDetection, VocabularySystem};

    fn concept(code: &str, description: &str, score: f32) -> Concept {
        Concept {
            code: code.to_string(),
            description: description.to_string(),
            score: Some(score),
        }
    }

    fn coded(text: &str, begin: usize, concepts: Vec<Concept>) -> CodedDetection {
        CodedDetection {
            text: text.to_string(),
            begin_offset: begin,
            end_offset: begin + text.chars().count(),
            concepts,
        }
    }

    #[test]
    fn test_terms_from_two_vocabularies() {
        let lists = vec![
            CodedEntityList::new(
                VocabularySystem::Icd10Cm,
                vec![coded("diabetes", 10, vec![concept("E11.9", "Type 2 diabetes", 0.71)])],
            ),
            CodedEntityList::new(
                VocabularySystem::RxNorm,
                vec![coded("Diabetes", 10, vec![concept("1234", "diabetes kit", 0.42)])],
            ),
        ];
        let coder = OverlapCoder::new(&lists, SpanMatcher::new());

        let terms = coder.terms_for(&Span::new("diabetes", 10, 18));
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].norm_codes, vec!["E11.9"]);
        assert_eq!(terms[0].confidence, Some(0.71));
        assert_eq!(terms[1].norm_codes, vec!["1234"]);
        assert_eq!(terms[1].confidence, Some(0.42));
    }

    #[test]
    fn test_repeated_candidates_are_not_deduplicated() {
        let lists = vec![CodedEntityList::new(
            VocabularySystem::Icd10Cm,
            vec![
                coded("cough", 0, vec![concept("R05", "Cough", 0.9)]),
                coded("cough.", 0, vec![concept("R05", "Cough", 0.6)]),
            ],
        )];
        let coder = OverlapCoder::new(&lists, SpanMatcher::new());

        let terms = coder.terms_for(&Span::new("cough", 0, 5));
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1].confidence, Some(0.6));
    }

    #[test]
    fn test_no_overlap_yields_no_terms() {
        let lists = vec![CodedEntityList::new(
            VocabularySystem::RxNorm,
            vec![coded("aspirin", 40, vec![concept("1191", "aspirin", 0.99)])],
        )];
        let coder = OverlapCoder::new(&lists, SpanMatcher::new());

        assert!(coder.terms_for(&Span::new("aspirin", 0, 7)).is_empty());
    }

    #[test]
    fn test_malformed_concepts_are_skipped() {
        let lists = vec![CodedEntityList::new(
            VocabularySystem::Icd10Cm,
            vec![coded(
                "fever",
                0,
                vec![
                    concept("", "missing code", 0.9),
                    concept("R50.9", "Fever", f32::NAN),
                    concept("R50.9", "Fever", 1.4),
                    concept("R50.9", "Fever, unspecified", 0.8),
                ],
            )],
        )];
        let coder = OverlapCoder::new(&lists, SpanMatcher::new());

        let terms = coder.terms_for(&Span::new("fever", 0, 5));
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].term, "Fever, unspecified");
    }

    #[test]
    fn test_missing_score_is_not_fabricated() {
        let lists = vec![CodedEntityList::new(
            VocabularySystem::Icd10Cm,
            vec![coded(
                "metformin",
                0,
                vec![Concept {
                    code: "X1".to_string(),
                    description: "no score".to_string(),
                    score: None,
                }],
            )],
        )];
        let coder = OverlapCoder::new(&lists, SpanMatcher::new());

        let terms = coder.terms_for(&Span::new("metformin", 0, 9));
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].norm_codes, vec!["X1"]);
        assert_eq!(terms[0].confidence, None);
    }

    #[test]
    fn test_link_terms() {
        let entries = vec![VocabularyEntry {
            entity_id: "UMLS/C0025598".to_string(),
            preferred_term: "Metformin".to_string(),
            vocabulary_codes: vec!["RXNORM/6809".to_string(), "MSH/D008687".to_string()],
        }];
        let coder = LinkCoder::new(&entries);

        let terms = coder.terms_for(&["UMLS/C0025598".to_string(), "UMLS/unknown".to_string()]);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].norm_codes.len(), 2);
        assert_eq!(terms[0].term, "Metformin");
        assert_eq!(terms[0].confidence, None);
        assert_eq!(
            terms[0].nlp_system_entity_code.as_deref(),
            Some("UMLS/C0025598")
        );
    }
}
