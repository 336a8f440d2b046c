//! Loader configuration: transfer tuning plus quality override

use std::path::Path;

use range_dl::TransferConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::quality::QualityTier;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub manual_override: bool,
    /// Tier used while `manual_override` is set
    pub tier: QualityTier,
}

impl QualityConfig {
    pub fn override_tier(&self) -> Option<QualityTier> {
        self.manual_override.then_some(self.tier)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub transfer: TransferConfig,
    pub quality: QualityConfig,
}

impl LoaderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LoaderConfig = serde_json::from_str(json)?;
        config.transfer.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoaderError;
    use range_dl::{PriorityLevel, DEFAULT_CHUNK_SIZE};
    use std::io::Write;

    #[test]
    fn empty_json_yields_defaults() {
        let config = LoaderConfig::from_json_str("{}").unwrap();
        assert_eq!(config.transfer.chunk_size_bytes, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.transfer.priority_level, PriorityLevel::Medium);
        assert_eq!(config.quality.override_tier(), None);
    }

    #[test]
    fn override_tier_only_when_enabled() {
        let config = LoaderConfig::from_json_str(
            r#"{"quality":{"manual_override":true,"tier":"low"},"transfer":{"chunk_size_bytes":1024}}"#,
        )
        .unwrap();
        assert_eq!(config.quality.override_tier(), Some(QualityTier::Low));
        assert_eq!(config.transfer.chunk_size_bytes, 1024);

        let config = LoaderConfig::from_json_str(r#"{"quality":{"tier":"high"}}"#).unwrap();
        assert_eq!(config.quality.override_tier(), None);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = LoaderConfig::from_json_str(r#"{"transfer":{"chunk_size_bytes":0}}"#).unwrap_err();
        assert!(matches!(err, LoaderError::Transfer(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"transfer":{{"priority_level":"high"}}}}"#).unwrap();

        let config = LoaderConfig::load(file.path()).unwrap();
        assert_eq!(config.transfer.priority_level, PriorityLevel::High);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LoaderConfig::load("/nonexistent/loader.json").unwrap_err();
        assert!(matches!(err, LoaderError::Io(_)));
    }
}
