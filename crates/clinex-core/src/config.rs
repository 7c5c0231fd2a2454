//! Clinex Configuration Management
//!
//! Handles configuration from environment variables and TOML files,
//! with defaults that match the documented pipeline constants.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Relationship edges below this confidence are not clustered
pub const DEFAULT_RELATIONSHIP_CONFIDENCE_THRESHOLD: f32 = 0.9;

/// Edit budget for approximate span text matching, relative to span length
pub const DEFAULT_MAX_ERROR_RATIO: f32 = 0.2;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Upstream provider selection
    pub provider: ProviderConfig,

    /// Transformation pipeline tuning
    pub pipeline: PipelineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(kind) = std::env::var("CLINEX_PROVIDER") {
            config.provider.kind = kind.parse()?;
        }
        if let Ok(dir) = std::env::var("CLINEX_REPLAY_DIR") {
            config.provider.replay_dir = PathBuf::from(dir);
        }

        if let Ok(value) = std::env::var("CLINEX_RELATIONSHIP_THRESHOLD") {
            config.pipeline.relationship_confidence_threshold =
                parse_value("CLINEX_RELATIONSHIP_THRESHOLD", value)?;
        }
        if let Ok(value) = std::env::var("CLINEX_MAX_ERROR_RATIO") {
            config.pipeline.max_error_ratio = parse_value("CLINEX_MAX_ERROR_RATIO", value)?;
        }
        if let Ok(value) = std::env::var("CLINEX_INCLUDE_PHI") {
            config.pipeline.include_phi = parse_value("CLINEX_INCLUDE_PHI", value)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(value) = std::env::var("LOG_JSON") {
            config.logging.json_format = parse_value("LOG_JSON", value)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.provider.kind != defaults.provider.kind {
            self.provider.kind = env_config.provider.kind;
        }
        if env_config.provider.replay_dir != defaults.provider.replay_dir {
            self.provider.replay_dir = env_config.provider.replay_dir;
        }
        if env_config.pipeline.relationship_confidence_threshold
            != defaults.pipeline.relationship_confidence_threshold
        {
            self.pipeline.relationship_confidence_threshold =
                env_config.pipeline.relationship_confidence_threshold;
        }
        if env_config.pipeline.max_error_ratio != defaults.pipeline.max_error_ratio {
            self.pipeline.max_error_ratio = env_config.pipeline.max_error_ratio;
        }
        if env_config.pipeline.include_phi != defaults.pipeline.include_phi {
            self.pipeline.include_phi = env_config.pipeline.include_phi;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format != defaults.logging.json_format {
            self.logging.json_format = env_config.logging.json_format;
        }

        Ok(self)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.pipeline.relationship_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.relationship_confidence_threshold".to_string(),
                value: threshold.to_string(),
            });
        }

        let ratio = self.pipeline.max_error_ratio;
        if !(0.0..1.0).contains(&ratio) {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.max_error_ratio".to_string(),
                value: ratio.to_string(),
            });
        }

        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Upstream provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Which provider shape to normalize
    pub kind: ProviderKind,

    /// Directory holding recorded upstream responses
    pub replay_dir: PathBuf,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Aws,
            replay_dir: PathBuf::from("responses"),
        }
    }
}

/// Supported provider shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Attribute-shaped detections (Comprehend Medical)
    Aws,
    /// Relationship-graph detections (Healthcare Natural Language)
    Gcp,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" | "comprehend" => Ok(Self::Aws),
            "gcp" | "healthcare" => Ok(Self::Gcp),
            _ => Err(ConfigError::InvalidValue {
                key: "CLINEX_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Transformation pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum confidence for a relationship edge to count
    pub relationship_confidence_threshold: f32,

    /// Edit budget for approximate span matching (fraction of span length)
    pub max_error_ratio: f32,

    /// Request and emit protected health information relations
    pub include_phi: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relationship_confidence_threshold: DEFAULT_RELATIONSHIP_CONFIDENCE_THRESHOLD,
            max_error_ratio: DEFAULT_MAX_ERROR_RATIO,
            include_phi: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for crate::ClinexError {
    fn from(err: ConfigError) -> Self {
        crate::ClinexError::ConfigError(err.to_string())
    }
}
