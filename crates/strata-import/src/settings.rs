use std::time::Duration;

use strata_config::StrataConfig;
use strata_style::Rgba;

use crate::error::{ImportError, Result};
use crate::host::FontName;

/// Runtime view of [`StrataConfig`] for one importer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    pub chunk_timeout: Duration,
    pub drain_timeout: Duration,
    pub poll_interval: Duration,
    pub defer_missing_parents: bool,
    pub flatten_pseudo_elements: bool,
    /// Last step of the font fallback chain.
    pub default_font: FontName,
    /// Fill of the rectangle substituted for undeliverable images.
    pub placeholder_color: Rgba,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::from(&StrataConfig::default())
    }
}

impl From<&StrataConfig> for ImportSettings {
    fn from(config: &StrataConfig) -> Self {
        Self {
            chunk_timeout: Duration::from_millis(config.import.chunk_timeout_ms),
            drain_timeout: Duration::from_millis(config.import.drain_timeout_ms),
            poll_interval: Duration::from_millis(config.import.poll_interval_ms),
            defer_missing_parents: config.import.defer_missing_parents,
            flatten_pseudo_elements: config.import.flatten_pseudo_elements,
            default_font: FontName::new(
                config.fonts.default_family.clone(),
                config.fonts.default_style.clone(),
            ),
            placeholder_color: Rgba::new(0.85, 0.85, 0.85, 1.0),
        }
    }
}

impl ImportSettings {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(ImportError::Config("poll interval must be positive".into()));
        }
        if self.drain_timeout < self.poll_interval {
            return Err(ImportError::Config(format!(
                "drain timeout {:?} is shorter than the poll interval {:?}",
                self.drain_timeout, self.poll_interval
            )));
        }
        if self.default_font.family.trim().is_empty() {
            return Err(ImportError::Config("default font family is empty".into()));
        }
        Ok(())
    }
}
