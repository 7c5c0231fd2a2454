//! Replay client
//!
//! Serves recorded vendor responses from a directory, one JSON file per
//! operation. Lets the full provider path run without network access.

use std::path::PathBuf;

use async_trait::async_trait;
use clinex_core::{ClinexError, Result};
use serde::de::DeserializeOwned;

use super::comprehend::ComprehendResponse;
use super::healthcare::AnalyzeEntitiesResponse;
use super::{ComprehendMedicalApi, HealthcareNlpApi};

pub const DETECT_ENTITIES_FILE: &str = "detect_entities.json";
pub const INFER_ICD10_CM_FILE: &str = "infer_icd10cm.json";
pub const INFER_RX_NORM_FILE: &str = "infer_rxnorm.json";
pub const DETECT_PHI_FILE: &str = "detect_phi.json";
pub const ANALYZE_ENTITIES_FILE: &str = "analyze_entities.json";

/// Reads recorded responses. The document text is ignored.
#[derive(Debug, Clone)]
pub struct ReplayClient {
    dir: PathBuf,
}

impl ReplayClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// A missing or unparsable recording is an upstream failure
    async fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        tracing::debug!("Replaying {}", path.display());

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ClinexError::upstream(file, format!("{}: {e}", path.display())))?;

        serde_json::from_str(&content)
            .map_err(|e| ClinexError::upstream(file, format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl ComprehendMedicalApi for ReplayClient {
    async fn detect_entities(&self, _text: &str) -> Result<ComprehendResponse> {
        self.read(DETECT_ENTITIES_FILE).await
    }

    async fn infer_icd10_cm(&self, _text: &str) -> Result<ComprehendResponse> {
        self.read(INFER_ICD10_CM_FILE).await
    }

    async fn infer_rx_norm(&self, _text: &str) -> Result<ComprehendResponse> {
        self.read(INFER_RX_NORM_FILE).await
    }

    async fn detect_phi(&self, _text: &str) -> Result<ComprehendResponse> {
        self.read(DETECT_PHI_FILE).await
    }
}

#[async_trait]
impl HealthcareNlpApi for ReplayClient {
    async fn analyze_entities(&self, _text: &str) -> Result<AnalyzeEntitiesResponse> {
        self.read(ANALYZE_ENTITIES_FILE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_recording_is_upstream_failure() {
        let dir = tempfile::tempdir().unwrap();
        let client = ReplayClient::new(dir.path());

        let err = client.detect_entities("text").await.unwrap_err();
        assert!(matches!(
            err,
            ClinexError::Upstream { ref service, .. } if service == DETECT_ENTITIES_FILE
        ));
    }

    #[tokio::test]
    async fn test_unparsable_recording_is_upstream_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ANALYZE_ENTITIES_FILE), "not json").unwrap();
        let client = ReplayClient::new(dir.path());

        assert!(matches!(
            client.analyze_entities("text").await,
            Err(ClinexError::Upstream { .. })
        ));
    }

    #[tokio::test]
    async fn test_reads_recording() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DETECT_PHI_FILE),
            r#"{"Entities": [{"Id": 0, "Text": "Jane", "BeginOffset": 0, "EndOffset": 4,
                "Category": "PROTECTED_HEALTH_INFORMATION", "Type": "NAME"}]}"#,
        )
        .unwrap();
        let client = ReplayClient::new(dir.path());

        let response = client.detect_phi("Jane").await.unwrap();
        assert_eq!(response.entities.unwrap()[0].text, "Jane");
    }
}
