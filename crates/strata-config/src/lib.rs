//! Strata configuration
//!
//! Settings for the importer, loaded from `strata.toml` with environment
//! variable overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "strata.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StrataConfig {
    /// Import pipeline timing and hierarchy policy
    pub import: ImportConfig,
    /// Font fallback settings
    pub fonts: FontConfig,
    /// Logging settings
    pub diagnostics: DiagnosticsConfig,
}

/// Import pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    /// Age after which an incomplete image transfer is evicted
    pub chunk_timeout_ms: u64,
    /// Overall wait for outstanding image transfers once the import completes
    pub drain_timeout_ms: u64,
    /// Poll interval of the drain loop
    pub poll_interval_ms: u64,
    /// Hold nodes whose parent is not created yet instead of attaching them to the root
    pub defer_missing_parents: bool,
    /// Splice pseudo-elements into the batch after their owner
    pub flatten_pseudo_elements: bool,
}

/// Font configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FontConfig {
    /// Family used when nothing requested is available
    pub default_family: String,
    pub default_style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// `env_logger` filter, e.g. `strata_import=debug`
    pub log_filter: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_timeout_ms: 30_000,
            drain_timeout_ms: 10_000,
            poll_interval_ms: 100,
            defer_missing_parents: true,
            flatten_pseudo_elements: true,
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            default_family: "Inter".to_string(),
            default_style: "Regular".to_string(),
        }
    }
}

impl StrataConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load `strata.toml` from the current directory, or defaults if it is missing
    pub fn load_or_default() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_FILE).unwrap_or_default()
    }

    /// Apply environment overrides. Unparseable values are ignored.
    pub fn merge_with_env(&mut self) {
        if let Some(ms) = env_u64("STRATA_CHUNK_TIMEOUT_MS") {
            self.import.chunk_timeout_ms = ms;
        }
        if let Some(ms) = env_u64("STRATA_DRAIN_TIMEOUT_MS") {
            self.import.drain_timeout_ms = ms;
        }
        if let Some(ms) = env_u64("STRATA_POLL_INTERVAL_MS") {
            self.import.poll_interval_ms = ms;
        }
        if let Ok(val) = std::env::var("STRATA_DEFER_MISSING_PARENTS") {
            self.import.defer_missing_parents = val == "1" || val.eq_ignore_ascii_case("true");
        }

        // "Family" or "Family:Style"
        if let Ok(font) = std::env::var("STRATA_DEFAULT_FONT") {
            match font.split_once(':') {
                Some((family, style)) => {
                    self.fonts.default_family = family.trim().to_string();
                    self.fonts.default_style = style.trim().to_string();
                }
                None if !font.trim().is_empty() => {
                    self.fonts.default_family = font.trim().to_string();
                }
                None => {}
            }
        }

        if let Ok(filter) = std::env::var("STRATA_LOG") {
            self.diagnostics.log_filter = Some(filter);
        }
    }

    /// Load from `strata.toml` (or defaults), then apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StrataConfig::default();
        assert_eq!(config.import.chunk_timeout_ms, 30_000);
        assert_eq!(config.import.drain_timeout_ms, 10_000);
        assert!(config.import.defer_missing_parents);
        assert_eq!(config.fonts.default_family, "Inter");
        assert!(config.diagnostics.log_filter.is_none());
    }

    #[test]
    fn test_toml_serialization() {
        let config = StrataConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: StrataConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[import]\ndrain_timeout_ms = 250\n\n[fonts]\ndefault_family = \"Roboto\"").unwrap();

        let config = StrataConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.import.drain_timeout_ms, 250);
        assert_eq!(config.import.chunk_timeout_ms, 30_000);
        assert_eq!(config.fonts.default_family, "Roboto");
        assert_eq!(config.fonts.default_style, "Regular");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[import\nchunk_timeout_ms = ").unwrap();
        assert!(StrataConfig::load_from_file(file.path()).is_err());
        assert!(StrataConfig::load_from_file("/nonexistent/strata.toml").is_err());
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("STRATA_POLL_INTERVAL_MS", "25");
            std::env::set_var("STRATA_DEFER_MISSING_PARENTS", "false");
            std::env::set_var("STRATA_DEFAULT_FONT", "Roboto:Medium");
        }

        let mut config = StrataConfig::default();
        config.merge_with_env();

        assert_eq!(config.import.poll_interval_ms, 25);
        assert!(!config.import.defer_missing_parents);
        assert_eq!(config.fonts.default_family, "Roboto");
        assert_eq!(config.fonts.default_style, "Medium");

        unsafe {
            std::env::remove_var("STRATA_POLL_INTERVAL_MS");
            std::env::remove_var("STRATA_DEFER_MISSING_PARENTS");
            std::env::remove_var("STRATA_DEFAULT_FONT");
        }
    }
}
