use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration. Every section has defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgermarkConfig {
    pub matcher: MatcherConfig,
    pub names: NamesConfig,
    pub ocr: OcrConfig,
}

/// Geometry of the cross-reference search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Anchors must start left of `page_width * column_cutoff_ratio`.
    pub column_cutoff_ratio: f32,
    /// Points added above and below an anchor to form its search band.
    pub band_margin: f32,
    /// Account numbers shorter than this are never searched.
    pub min_account_len: usize,
    /// Entity names shorter than this are never searched.
    pub min_name_len: usize,
    /// Names longer than this are retried by their prefix of this many chars.
    pub name_prefix_len: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            // 200pt on a 595pt A4 page.
            column_cutoff_ratio: 0.336,
            band_margin: 2.0,
            min_account_len: 3,
            min_name_len: 5,
            name_prefix_len: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamesConfig {
    pub timeout_ms: u64,
    /// Base URL of an HTTP name directory; `GET {endpoint}/{digits}`.
    pub endpoint: Option<String>,
    /// Static tax identifier -> display name entries.
    pub table: HashMap<String, String>,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            endpoint: None,
            table: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub lang: String,
    pub data_path: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            lang: "por".to_string(),
            data_path: None,
        }
    }
}

impl LedgermarkConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: LedgermarkConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.matcher;
        if !(m.column_cutoff_ratio > 0.0 && m.column_cutoff_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "matcher.column_cutoff_ratio must be in (0, 1], got {}",
                m.column_cutoff_ratio
            )));
        }
        if m.band_margin < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "matcher.band_margin must not be negative, got {}",
                m.band_margin
            )));
        }
        if m.name_prefix_len == 0 {
            return Err(ConfigError::Invalid("matcher.name_prefix_len must be positive".into()));
        }
        if self.names.timeout_ms == 0 {
            return Err(ConfigError::Invalid("names.timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let c = LedgermarkConfig::from_toml("").unwrap();
        assert_eq!(c.matcher.band_margin, 2.0);
        assert_eq!(c.matcher.min_account_len, 3);
        assert_eq!(c.names.timeout_ms, 3000);
        assert_eq!(c.ocr.lang, "por");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let c = LedgermarkConfig::from_toml(
            r#"
            [matcher]
            band_margin = 4.5

            [names]
            endpoint = "https://names.example"

            [names.table]
            "12.345.678/0001-90" = "FUNDO ALFA RF"
            "#,
        )
        .unwrap();
        assert_eq!(c.matcher.band_margin, 4.5);
        assert_eq!(c.matcher.column_cutoff_ratio, 0.336);
        assert_eq!(c.names.endpoint.as_deref(), Some("https://names.example"));
        assert_eq!(c.names.table["12.345.678/0001-90"], "FUNDO ALFA RF");
    }

    #[test]
    fn rejects_out_of_range_cutoff() {
        let err = LedgermarkConfig::from_toml("[matcher]\ncolumn_cutoff_ratio = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = LedgermarkConfig::from_toml("[names]\ntimeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = LedgermarkConfig::from_toml("[matcher\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
