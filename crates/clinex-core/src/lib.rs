//! Clinex Core - Canonical clinical extraction model
//!
//! This crate defines the provider-independent shapes every clinical NLP
//! provider is normalized onto:
//! - Canonical taxonomy (categories, types, context subjects)
//! - Entities, coded terms, relations and extractions
//! - Common error types
//! - The provider trait implemented by the extractor crate
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, LoggingConfig, PipelineConfig, ProviderConfig, ProviderKind,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for extraction operations
#[derive(Error, Debug)]
pub enum ClinexError {
    #[error("Upstream {service} failed: {message}")]
    Upstream { service: String, message: String },

    #[error("Upstream returned no result: {0}")]
    EmptyResponse(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClinexError {
    /// Build an upstream failure for the named service
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClinexError>;

// ============================================================================
// Canonical Taxonomy
// ============================================================================

/// Canonical entity category
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    Medication,
    MedicalCondition,
    Procedure,
    Treatment,
    Anatomy,
    ClinicalTest,
    Biometrics,
    MedicalDevice,
    Addiction,
    BodyFunction,
    FamilyHistory,
    ProtectedHealthInformation,
    #[default]
    Unidentified,
}

impl Category {
    /// Every category, in declaration order
    pub const ALL: [Category; 13] = [
        Self::Medication,
        Self::MedicalCondition,
        Self::Procedure,
        Self::Treatment,
        Self::Anatomy,
        Self::ClinicalTest,
        Self::Biometrics,
        Self::MedicalDevice,
        Self::Addiction,
        Self::BodyFunction,
        Self::FamilyHistory,
        Self::ProtectedHealthInformation,
        Self::Unidentified,
    ];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medication => "Medication",
            Self::MedicalCondition => "MedicalCondition",
            Self::Procedure => "Procedure",
            Self::Treatment => "Treatment",
            Self::Anatomy => "Anatomy",
            Self::ClinicalTest => "ClinicalTest",
            Self::Biometrics => "Biometrics",
            Self::MedicalDevice => "MedicalDevice",
            Self::Addiction => "Addiction",
            Self::BodyFunction => "BodyFunction",
            Self::FamilyHistory => "FamilyHistory",
            Self::ProtectedHealthInformation => "ProtectedHealthInformation",
            Self::Unidentified => "Unidentified",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical entity type (attribute sub-kind within a category)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    // Medication attributes
    BrandName,
    GenericName,
    Dosage,
    DosageUnit,
    Frequency,
    Duration,
    Route,
    Strength,
    Rate,
    Status,
    TotalDosage,

    // Clinical test attributes
    TestName,
    TestValue,
    TestUnit,
    TestResult,

    // Biometrics attributes
    BiometricsName,
    BiometricsResult,
    BiometricsValue,
    BiometricsUnit,

    // Medical condition
    Symptom,
    Diagnosis,
    Severity,

    // Anatomy
    Organ,

    // Procedure
    Procedure,
    ProcedureMethod,
    ProcedureResult,

    // Other clinical
    MedicalDevice,
    SubstanceAbuse,
    BodyFunction,
    BodyFunctionResult,
    FamilyHistory,

    // Protected health information
    Name,
    Age,
    Date,
    Phone,
    Email,
    Id,
    Url,
    Address,
    Profession,

    #[default]
    Unidentified,
}

impl EntityType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrandName => "BrandName",
            Self::GenericName => "GenericName",
            Self::Dosage => "Dosage",
            Self::DosageUnit => "DosageUnit",
            Self::Frequency => "Frequency",
            Self::Duration => "Duration",
            Self::Route => "Route",
            Self::Strength => "Strength",
            Self::Rate => "Rate",
            Self::Status => "Status",
            Self::TotalDosage => "TotalDosage",
            Self::TestName => "TestName",
            Self::TestValue => "TestValue",
            Self::TestUnit => "TestUnit",
            Self::TestResult => "TestResult",
            Self::BiometricsName => "BiometricsName",
            Self::BiometricsResult => "BiometricsResult",
            Self::BiometricsValue => "BiometricsValue",
            Self::BiometricsUnit => "BiometricsUnit",
            Self::Symptom => "Symptom",
            Self::Diagnosis => "Diagnosis",
            Self::Severity => "Severity",
            Self::Organ => "Organ",
            Self::Procedure => "Procedure",
            Self::ProcedureMethod => "ProcedureMethod",
            Self::ProcedureResult => "ProcedureResult",
            Self::MedicalDevice => "MedicalDevice",
            Self::SubstanceAbuse => "SubstanceAbuse",
            Self::BodyFunction => "BodyFunction",
            Self::BodyFunctionResult => "BodyFunctionResult",
            Self::FamilyHistory => "FamilyHistory",
            Self::Name => "Name",
            Self::Age => "Age",
            Self::Date => "Date",
            Self::Phone => "Phone",
            Self::Email => "Email",
            Self::Id => "Id",
            Self::Url => "Url",
            Self::Address => "Address",
            Self::Profession => "Profession",
            Self::Unidentified => "Unidentified",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whom a finding is attributed to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextSubject {
    Patient,
    Family,
    Other,
    #[default]
    Default,
}

impl ContextSubject {
    /// Map a provider subject code (PATIENT, FAMILY_MEMBER, OTHER).
    /// Anything else, including no code, is `Default`.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some("PATIENT") => Self::Patient,
            Some("FAMILY_MEMBER") => Self::Family,
            Some("OTHER") => Self::Other,
            _ => Self::Default,
        }
    }
}

// ============================================================================
// Extraction Model
// ============================================================================

/// Link from a detected concept to a standard vocabulary code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodedTerm {
    /// Vocabulary codes; one concept may map to several
    pub norm_codes: Vec<String>,

    /// Human-readable term
    pub term: String,

    /// Score reported by the provider, when it reports one
    pub confidence: Option<f32>,

    /// Provider-side identifier of the linked concept
    pub nlp_system_entity_code: Option<String>,
}

/// A canonical entity extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier of the originating provider detection
    pub extraction_id: String,

    /// Detected text
    pub text: String,

    /// Character offset where the mention starts
    pub begin_offset: usize,

    /// Character offset one past the end of the mention
    pub end_offset: usize,

    pub category: Category,

    #[serde(rename = "type")]
    pub entity_type: EntityType,

    pub is_negated: bool,

    pub context_subject: ContextSubject,

    /// False for the subject of a relation, true for its attributes
    pub is_relation_object: bool,

    pub coded_terms: Vec<CodedTerm>,
}

/// A reportable finding: one subject plus its related entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Participating entities, subjects first
    pub entities: Vec<Entity>,

    pub category: Category,

    #[serde(rename = "type")]
    pub entity_type: EntityType,

    /// Sentence reconstructed from the participating entities
    pub statement: String,

    /// Verbatim document text spanning all participating entities
    pub original_statement: String,

    pub keywords: Vec<String>,

    pub context_subject: Option<ContextSubject>,
}

impl Relation {
    /// The first subject-role entity, if any
    pub fn subject(&self) -> Option<&Entity> {
        self.entities.iter().find(|e| !e.is_relation_object)
    }

    /// Entities attached to the subject
    pub fn objects(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_relation_object)
    }
}

/// Full result of one document analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub relations: Vec<Relation>,
}

impl Extraction {
    /// Create an extraction from ordered relations
    pub fn new(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Relation> {
        self.relations.iter()
    }

    /// All entities across relations, in relation order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.relations.iter().flat_map(|r| r.entities.iter())
    }
}

impl<'a> IntoIterator for &'a Extraction {
    type Item = &'a Relation;
    type IntoIter = std::slice::Iter<'a, Relation>;

    fn into_iter(self) -> Self::IntoIter {
        self.relations.iter()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A clinical NLP provider normalized onto the canonical model
#[async_trait::async_trait]
pub trait ClinicalNlpProvider: Send + Sync {
    /// Analyze one document
    async fn extract(&self, text: &str) -> Result<Extraction>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
