//! Taxonomy mapping
//!
//! Maps vendor category/type codes (plus optional trait flags) onto the
//! canonical taxonomy. Each provider's taxonomy is a static table; lookups
//! are total and degrade to `Unidentified` for codes the table does not know.

use clinex_core::{Category, ContextSubject, EntityType, ProviderKind};
use serde::Serialize;

// ============================================================================
// Table Types
// ============================================================================

/// One vendor code mapping.
///
/// `vendor_category: None` matches any category (providers keyed on type
/// only). `vendor_type: None` is a category-level fallback used when no
/// exact type row matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxonomyRow {
    pub vendor_category: Option<&'static str>,
    pub vendor_type: Option<&'static str>,
    pub category: Category,
    pub entity_type: EntityType,
}

/// Refines the canonical type when a trait flag is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraitRefinement {
    pub vendor_category: &'static str,
    pub vendor_type: &'static str,
    pub trait_name: &'static str,
    pub entity_type: EntityType,
}

/// A provider taxonomy
#[derive(Debug, Serialize)]
pub struct Taxonomy {
    pub name: &'static str,
    pub rows: &'static [TaxonomyRow],
    /// Checked in order; the first matching refinement wins
    pub refinements: &'static [TraitRefinement],
    pub negation_trait: Option<&'static str>,
    pub family_trait: Option<&'static str>,
}

/// Result of classifying one detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub is_negated: bool,
    pub context_subject: ContextSubject,
}

const fn exact(
    vendor_category: &'static str,
    vendor_type: &'static str,
    category: Category,
    entity_type: EntityType,
) -> TaxonomyRow {
    TaxonomyRow {
        vendor_category: Some(vendor_category),
        vendor_type: Some(vendor_type),
        category,
        entity_type,
    }
}

const fn fallback(vendor_category: &'static str, category: Category) -> TaxonomyRow {
    TaxonomyRow {
        vendor_category: Some(vendor_category),
        vendor_type: None,
        category,
        entity_type: EntityType::Unidentified,
    }
}

const fn by_type(
    vendor_type: &'static str,
    category: Category,
    entity_type: EntityType,
) -> TaxonomyRow {
    TaxonomyRow {
        vendor_category: None,
        vendor_type: Some(vendor_type),
        category,
        entity_type,
    }
}

// ============================================================================
// Comprehend Medical
// ============================================================================

// Reference:
// https://docs.aws.amazon.com/comprehend-medical/latest/dev/comprehendmedical-entitiesv2.html
const COMPREHEND_ROWS: &[TaxonomyRow] = &[
    exact("TEST_TREATMENT_PROCEDURE", "TEST_NAME", Category::ClinicalTest, EntityType::TestName),
    exact("TEST_TREATMENT_PROCEDURE", "TEST_VALUE", Category::ClinicalTest, EntityType::TestValue),
    exact("TEST_TREATMENT_PROCEDURE", "TEST_UNIT", Category::ClinicalTest, EntityType::TestUnit),
    exact(
        "TEST_TREATMENT_PROCEDURE",
        "PROCEDURE_NAME",
        Category::Procedure,
        EntityType::Unidentified,
    ),
    exact(
        "TEST_TREATMENT_PROCEDURE",
        "TREATMENT_NAME",
        Category::Treatment,
        EntityType::Unidentified,
    ),
    fallback("MEDICAL_CONDITION", Category::MedicalCondition),
    exact("ANATOMY", "SYSTEM_ORGAN_SITE", Category::Anatomy, EntityType::Organ),
    fallback("ANATOMY", Category::Anatomy),
    exact("MEDICATION", "BRAND_NAME", Category::Medication, EntityType::BrandName),
    exact("MEDICATION", "GENERIC_NAME", Category::Medication, EntityType::GenericName),
    exact("MEDICATION", "DOSAGE", Category::Medication, EntityType::Dosage),
    exact("MEDICATION", "FORM", Category::Medication, EntityType::DosageUnit),
    exact("MEDICATION", "FREQUENCY", Category::Medication, EntityType::Frequency),
    exact("MEDICATION", "DURATION", Category::Medication, EntityType::Duration),
    exact("MEDICATION", "ROUTE_OR_MODE", Category::Medication, EntityType::Route),
    exact("MEDICATION", "STRENGTH", Category::Medication, EntityType::Strength),
    exact("MEDICATION", "RATE", Category::Medication, EntityType::Rate),
    fallback("MEDICATION", Category::Medication),
];

const COMPREHEND_REFINEMENTS: &[TraitRefinement] = &[
    TraitRefinement {
        vendor_category: "MEDICAL_CONDITION",
        vendor_type: "DX_NAME",
        trait_name: "DIAGNOSIS",
        entity_type: EntityType::Diagnosis,
    },
    TraitRefinement {
        vendor_category: "MEDICAL_CONDITION",
        vendor_type: "DX_NAME",
        trait_name: "SYMPTOM",
        entity_type: EntityType::Symptom,
    },
];

/// Clinical entities from an attribute-shaped provider
pub static COMPREHEND_MEDICAL: Taxonomy = Taxonomy {
    name: "comprehend-medical",
    rows: COMPREHEND_ROWS,
    refinements: COMPREHEND_REFINEMENTS,
    negation_trait: Some("NEGATION"),
    family_trait: Some("PERTAINS_TO_FAMILY"),
};

const fn phi(vendor_type: &'static str, entity_type: EntityType) -> TaxonomyRow {
    exact(
        "PROTECTED_HEALTH_INFORMATION",
        vendor_type,
        Category::ProtectedHealthInformation,
        entity_type,
    )
}

const COMPREHEND_PHI_ROWS: &[TaxonomyRow] = &[
    phi("NAME", EntityType::Name),
    phi("AGE", EntityType::Age),
    phi("DATE", EntityType::Date),
    phi("PHONE_OR_FAX", EntityType::Phone),
    phi("EMAIL", EntityType::Email),
    phi("ID", EntityType::Id),
    phi("URL", EntityType::Url),
    phi("ADDRESS", EntityType::Address),
    phi("PROFESSION", EntityType::Profession),
    fallback("PROTECTED_HEALTH_INFORMATION", Category::ProtectedHealthInformation),
];

/// Protected health information from an attribute-shaped provider
pub static COMPREHEND_PHI: Taxonomy = Taxonomy {
    name: "comprehend-medical-phi",
    rows: COMPREHEND_PHI_ROWS,
    refinements: &[],
    negation_trait: None,
    family_trait: None,
};

// ============================================================================
// Healthcare Natural Language
// ============================================================================

const HEALTHCARE_ROWS: &[TaxonomyRow] = &[
    by_type("ANATOMICAL_STRUCTURE", Category::Anatomy, EntityType::Organ),
    by_type("PROBLEM", Category::MedicalCondition, EntityType::Unidentified),
    by_type("SEVERITY", Category::MedicalCondition, EntityType::Severity),
    by_type("PROCEDURE", Category::Procedure, EntityType::Procedure),
    by_type("PROC_METHOD", Category::Procedure, EntityType::ProcedureMethod),
    by_type("PROCEDURE_RESULT", Category::Procedure, EntityType::ProcedureResult),
    by_type("MEDICINE", Category::Medication, EntityType::GenericName),
    by_type("MED_DOSE", Category::Medication, EntityType::Dosage),
    by_type("MED_DURATION", Category::Medication, EntityType::Duration),
    by_type("MED_FORM", Category::Medication, EntityType::DosageUnit),
    by_type("MED_FREQUENCY", Category::Medication, EntityType::Frequency),
    by_type("MED_ROUTE", Category::Medication, EntityType::Route),
    by_type("MED_STATUS", Category::Medication, EntityType::Status),
    by_type("MED_STRENGTH", Category::Medication, EntityType::Strength),
    by_type("MED_TOTALDOSE", Category::Medication, EntityType::TotalDosage),
    by_type("MED_UNIT", Category::Medication, EntityType::DosageUnit),
    by_type("LABORATORY_DATA", Category::ClinicalTest, EntityType::TestResult),
    by_type("LAB_RESULT", Category::ClinicalTest, EntityType::TestResult),
    by_type("LAB_VALUE", Category::ClinicalTest, EntityType::TestValue),
    by_type("LAB_UNIT", Category::ClinicalTest, EntityType::TestUnit),
    by_type("BODY_MEASUREMENT", Category::Biometrics, EntityType::BiometricsName),
    by_type("BM_RESULT", Category::Biometrics, EntityType::BiometricsResult),
    by_type("BM_VALUE", Category::Biometrics, EntityType::BiometricsValue),
    by_type("BM_UNIT", Category::Biometrics, EntityType::BiometricsUnit),
    by_type("MEDICAL_DEVICE", Category::MedicalDevice, EntityType::MedicalDevice),
    by_type("SUBSTANCE_ABUSE", Category::Addiction, EntityType::SubstanceAbuse),
    by_type("BODY_FUNCTION", Category::BodyFunction, EntityType::BodyFunction),
    by_type("BF_RESULT", Category::BodyFunction, EntityType::BodyFunctionResult),
    by_type("FAMILY", Category::FamilyHistory, EntityType::FamilyHistory),
];

/// Mentions from a graph-shaped provider. No trait metadata, so negation is
/// never signalled.
pub static HEALTHCARE_NLP: Taxonomy = Taxonomy {
    name: "healthcare-nlp",
    rows: HEALTHCARE_ROWS,
    refinements: &[],
    negation_trait: None,
    family_trait: None,
};

// ============================================================================
// Lookup
// ============================================================================

impl Taxonomy {
    /// Clinical taxonomy for a provider shape
    pub fn for_provider(kind: ProviderKind) -> &'static Taxonomy {
        match kind {
            ProviderKind::Aws => &COMPREHEND_MEDICAL,
            ProviderKind::Gcp => &HEALTHCARE_NLP,
        }
    }

    /// Classify a clinical detection. Never fails: unknown codes come back
    /// as `Unidentified`, absent traits mean not negated.
    pub fn classify(
        &self,
        category: Option<&str>,
        vendor_type: &str,
        traits: &[String],
    ) -> Classification {
        let has_trait = |name: &str| traits.iter().any(|t| t.trim().eq_ignore_ascii_case(name));

        let (category_out, mut entity_type) = self
            .lookup(category, vendor_type)
            .map(|row| (row.category, row.entity_type))
            .unwrap_or_default();

        let refinement = self.refinements.iter().find(|r| {
            category.is_some_and(|c| r.vendor_category.eq_ignore_ascii_case(c.trim()))
                && r.vendor_type.eq_ignore_ascii_case(vendor_type.trim())
                && has_trait(r.trait_name)
        });
        if let Some(refinement) = refinement {
            entity_type = refinement.entity_type;
        }

        let context_subject = if self.family_trait.is_some_and(has_trait) {
            ContextSubject::Family
        } else {
            ContextSubject::Default
        };

        Classification {
            category: category_out,
            entity_type,
            is_negated: self.negation_trait.is_some_and(has_trait),
            context_subject,
        }
    }

    /// Classify a protected health information detection
    pub fn classify_phi(&self, category: &str, vendor_type: &str) -> (Category, EntityType) {
        self.lookup(Some(category), vendor_type)
            .map(|row| (row.category, row.entity_type))
            .unwrap_or_default()
    }

    /// Exact type row first, then the category-level fallback
    fn lookup(&self, category: Option<&str>, vendor_type: &str) -> Option<&TaxonomyRow> {
        let category = category.map(str::trim);
        let vendor_type = vendor_type.trim();

        let category_matches = |row: &TaxonomyRow| match (row.vendor_category, category) {
            (None, _) => true,
            (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        };

        self.rows
            .iter()
            .find(|row| {
                category_matches(row)
                    && row
                        .vendor_type
                        .is_some_and(|t| t.eq_ignore_ascii_case(vendor_type))
            })
            .or_else(|| {
                self.rows
                    .iter()
                    .find(|row| row.vendor_type.is_none() && category_matches(row))
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
