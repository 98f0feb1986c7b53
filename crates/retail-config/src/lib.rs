//! Configuration for the retail purchase stream pipeline

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input and output channel names
    pub topics: TopicConfig,

    /// Correlation join settings
    pub join: JoinConfig,

    /// Partition count shared by the rewards channel and the reward
    /// state changelog; the co-partitioning check enforces agreement
    pub partition_count: u32,

    /// Audit filter settings
    pub audit: AuditConfig,

    /// High-value export price threshold, strict greater-than
    pub high_value_threshold: f64,
}

impl PipelineConfig {
    /// Load configuration from an optional YAML file with `RETAIL_`
    /// environment variable overrides layered on top
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(figment::providers::Serialized::defaults(
            PipelineConfig::default(),
        ));

        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed("RETAIL_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 {
            return Err(ConfigError::ValidationError(
                "partition_count must be greater than 0".to_string(),
            ));
        }

        if self.join.window_width_ms == 0 {
            return Err(ConfigError::ValidationError(
                "join window width must be greater than 0".to_string(),
            ));
        }

        if self.audit.employee_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "audit employee id must not be empty".to_string(),
            ));
        }

        if self.audit.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "audit max_retries must be greater than 0".to_string(),
            ));
        }

        if !self.high_value_threshold.is_finite() {
            return Err(ConfigError::ValidationError(
                "high_value_threshold must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topics: TopicConfig::default(),
            join: JoinConfig::default(),
            partition_count: 1,
            audit: AuditConfig::default(),
            high_value_threshold: 20.0,
        }
    }
}

/// Channel names for the source and each derived stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Source log of raw purchases
    pub purchase: String,
    /// Spending-pattern projection
    pub patterns: String,
    /// Per-customer reward ledger
    pub rewards: String,
    /// Coffee-department branch
    pub coffee: String,
    /// Electronics-department branch
    pub electronics: String,
    /// Windowed coffee/electronics correlation
    pub correlated: String,
    /// High-value masked export
    pub purchase_masked: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            purchase: "purchase".to_string(),
            patterns: "patterns".to_string(),
            rewards: "rewards".to_string(),
            coffee: "coffee".to_string(),
            electronics: "electronics".to_string(),
            correlated: "coffee-and-electronics".to_string(),
            purchase_masked: "purchase-masked".to_string(),
        }
    }
}

/// Correlation join settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Symmetric window width in milliseconds; no grace period
    pub window_width_ms: u64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            // 20 minutes
            window_width_ms: 1_200_000,
        }
    }
}

/// Audit filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Employee id whose purchases are forwarded to the audit store
    pub employee_id: String,
    /// Maximum retries for a failed audit save
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds)
    pub base_backoff_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            employee_id: "E100".to_string(),
            max_retries: 5,
            base_backoff_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.topics.purchase, "purchase");
        assert_eq!(config.join.window_width_ms, 1_200_000);
        assert_eq!(config.audit.employee_id, "E100");
        assert_eq!(config.high_value_threshold, 20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig::default();
        config.partition_count = 0;
        assert!(config.validate().is_err());

        config.partition_count = 4;
        config.join.window_width_ms = 0;
        assert!(config.validate().is_err());

        config.join.window_width_ms = 60_000;
        config.audit.employee_id = String::new();
        assert!(config.validate().is_err());

        config.audit.employee_id = "E100".to_string();
        config.audit.max_retries = 0;
        assert!(config.validate().is_err());

        config.audit.max_retries = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "partition_count: 8\nhigh_value_threshold: 50.0\njoin:\n  window_width_ms: 600000"
        )
        .unwrap();

        let config = PipelineConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.partition_count, 8);
        assert_eq!(config.high_value_threshold, 50.0);
        assert_eq!(config.join.window_width_ms, 600_000);
        // Untouched values keep their defaults
        assert_eq!(config.audit.employee_id, "E100");
    }
}
