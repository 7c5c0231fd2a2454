//! Clinical NLP providers
//!
//! Upstream services are reached through async API traits; the providers
//! here fan out the requests, convert the wire responses and run the pure
//! transformation stage.

pub mod comprehend;
pub mod healthcare;
pub mod replay;

use async_trait::async_trait;
use clinex_core::{
    AppConfig, ClinicalNlpProvider, Extraction, PipelineConfig, ProviderKind, Result,
};

use crate::pipeline::{transform_attribute_payload, transform_graph_payload};
use comprehend::{attribute_payload, ComprehendResponse};
use healthcare::{graph_payload, AnalyzeEntitiesResponse};
pub use replay::ReplayClient;

// ============================================================================
// Upstream APIs
// ============================================================================

/// Attribute-shaped upstream: entity detection plus independent vocabulary
/// inference and PHI detection
#[async_trait]
pub trait ComprehendMedicalApi: Send + Sync {
    async fn detect_entities(&self, text: &str) -> Result<ComprehendResponse>;

    async fn infer_icd10_cm(&self, text: &str) -> Result<ComprehendResponse>;

    async fn infer_rx_norm(&self, text: &str) -> Result<ComprehendResponse>;

    async fn detect_phi(&self, text: &str) -> Result<ComprehendResponse>;
}

/// Graph-shaped upstream: mentions, vocabulary and relationships in one call
#[async_trait]
pub trait HealthcareNlpApi: Send + Sync {
    async fn analyze_entities(&self, text: &str) -> Result<AnalyzeEntitiesResponse>;
}

// ============================================================================
// Attribute Provider
// ============================================================================

/// Provider over an attribute-shaped upstream
pub struct AttributeProvider<A> {
    api: A,
    config: PipelineConfig,
}

impl<A: ComprehendMedicalApi> AttributeProvider<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl<A: ComprehendMedicalApi> ClinicalNlpProvider for AttributeProvider<A> {
    async fn extract(&self, text: &str) -> Result<Extraction> {
        tracing::debug!(
            "Requesting upstream analyses for {} chars (PHI: {})",
            text.chars().count(),
            self.config.include_phi
        );

        // Any failure abandons the whole extraction
        let (detected, icd10_cm, rx_norm, phi) = tokio::try_join!(
            self.api.detect_entities(text),
            self.api.infer_icd10_cm(text),
            self.api.infer_rx_norm(text),
            async {
                if self.config.include_phi {
                    self.api.detect_phi(text).await.map(Some)
                } else {
                    Ok(None)
                }
            }
        )?;

        let payload = attribute_payload(detected, icd10_cm, rx_norm, phi)?;
        let extraction = transform_attribute_payload(text, &payload, &self.config);

        tracing::info!("{} extracted {} relations", self.name(), extraction.len());
        Ok(extraction)
    }

    fn name(&self) -> &str {
        "comprehend-medical"
    }
}

// ============================================================================
// Graph Provider
// ============================================================================

/// Provider over a graph-shaped upstream
pub struct GraphProvider<A> {
    api: A,
    config: PipelineConfig,
}

impl<A: HealthcareNlpApi> GraphProvider<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl<A: HealthcareNlpApi> ClinicalNlpProvider for GraphProvider<A> {
    async fn extract(&self, text: &str) -> Result<Extraction> {
        let response = self.api.analyze_entities(text).await?;
        let payload = graph_payload(response)?;
        let extraction = transform_graph_payload(text, &payload, &self.config);

        tracing::info!("{} extracted {} relations", self.name(), extraction.len());
        Ok(extraction)
    }

    fn name(&self) -> &str {
        "healthcare-nlp"
    }
}

/// Build the configured provider over recorded responses
pub fn replay_provider(config: &AppConfig) -> Box<dyn ClinicalNlpProvider> {
    let client = ReplayClient::new(config.provider.replay_dir.clone());
    match config.provider.kind {
        ProviderKind::Aws => {
            Box::new(AttributeProvider::new(client).with_config(config.pipeline.clone()))
        }
        ProviderKind::Gcp => {
            Box::new(GraphProvider::new(client).with_config(config.pipeline.clone()))
        }
    }
}
