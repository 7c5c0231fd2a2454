//! Extraction summary
//!
//! Counts over a finished extraction, used for logging and the CLI
//! `--summary` report.

use std::collections::BTreeMap;

use clinex_core::{Category, EntityType, Extraction};
use serde::{Deserialize, Serialize};

/// Counts describing one or more extractions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// Documents folded into this summary
    pub documents: usize,
    pub relations: usize,
    pub entities: usize,
    /// Entities per canonical category
    pub by_category: BTreeMap<Category, usize>,
    /// Entities with category or type Unidentified
    pub unidentified: usize,
    pub negated: usize,
    /// Entities carrying at least one coded term
    pub coded: usize,
}

impl ExtractionSummary {
    /// Summarize a single extraction
    pub fn from_extraction(extraction: &Extraction) -> Self {
        let mut summary = Self {
            documents: 1,
            relations: extraction.len(),
            ..Default::default()
        };

        for entity in extraction.entities() {
            summary.entities += 1;
            *summary.by_category.entry(entity.category).or_default() += 1;

            if entity.category == Category::Unidentified
                || entity.entity_type == EntityType::Unidentified
            {
                summary.unidentified += 1;
            }
            if entity.is_negated {
                summary.negated += 1;
            }
            if !entity.coded_terms.is_empty() {
                summary.coded += 1;
            }
        }

        summary
    }

    /// Fold another summary into this one
    pub fn merge(&mut self, other: &ExtractionSummary) {
        self.documents += other.documents;
        self.relations += other.relations;
        self.entities += other.entities;
        for (category, count) in &other.by_category {
            *self.by_category.entry(*category).or_default() += count;
        }
        self.unidentified += other.unidentified;
        self.negated += other.negated;
        self.coded += other.coded;
    }

    /// Share of entities carrying coded terms
    pub fn coded_coverage(&self) -> f32 {
        ratio(self.coded, self.entities)
    }

    /// Share of entities the taxonomy could not place
    pub fn unidentified_rate(&self) -> f32 {
        ratio(self.unidentified, self.entities)
    }

    /// Human-readable report
    pub fn report(&self) -> String {
        let mut report = format!(
            "=== Extraction Summary ===\n\n\
             Documents: {}\n\
             Relations: {}\n\
             Entities:  {}\n\
               Coded:        {} ({:.1}%)\n\
               Unidentified: {} ({:.1}%)\n\
               Negated:      {}\n\n\
             By category:\n",
            self.documents,
            self.relations,
            self.entities,
            self.coded,
            self.coded_coverage() * 100.0,
            self.unidentified,
            self.unidentified_rate() * 100.0,
            self.negated,
        );
        for (category, count) in &self.by_category {
            report.push_str(&format!("  {category}: {count}\n"));
        }
        report
    }
}

fn ratio(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32
    }
}
