//! Fonts the scene can load.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use strata_import::FontName;
use strata_import::fonts::resolve;
use tracing::{debug, info};

/// Installed fonts, keyed by lowercased family and exact style name.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    fonts: BTreeSet<(String, String)>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding exactly `fonts`.
    pub fn with_fonts<'a>(fonts: impl IntoIterator<Item = &'a FontName>) -> Self {
        let mut registry = Self::new();
        for font in fonts {
            registry.insert(font.clone());
        }
        registry
    }

    /// Parses `"Inter:Regular,Roboto:Bold"`. A bare family means Regular.
    pub fn parse_list(list: &str) -> Result<Self> {
        let mut registry = Self::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (family, style) = match entry.split_once(':') {
                Some((family, style)) => (family.trim(), style.trim()),
                None => (entry, "Regular"),
            };
            if family.is_empty() || style.is_empty() {
                bail!("invalid font entry {entry:?}, expected family:style");
            }
            registry.insert(FontName::new(family, style));
        }
        Ok(registry)
    }

    /// Fonts installed on this machine, named the way the importer
    /// resolves CSS weights and styles.
    pub fn system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let registry = Self::from_database(&db);
        info!(faces = db.len(), fonts = registry.len(), "system fonts loaded");
        registry
    }

    /// Fonts from every font file under `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("font directory {} does not exist", dir.display());
        }
        let mut db = fontdb::Database::new();
        db.load_fonts_dir(dir);
        let registry = Self::from_database(&db);
        if registry.is_empty() {
            return Err(anyhow::anyhow!("no fonts found"))
                .with_context(|| format!("loading fonts from {}", dir.display()));
        }
        Ok(registry)
    }

    fn from_database(db: &fontdb::Database) -> Self {
        let mut registry = Self::new();
        for face in db.faces() {
            let italic = match face.style {
                fontdb::Style::Normal => None,
                fontdb::Style::Italic | fontdb::Style::Oblique => Some("italic"),
            };
            for (family, _) in &face.families {
                let name = resolve(family, italic, Some(f64::from(face.weight.0)));
                debug!(font = %name, "font face registered");
                registry.insert(name);
            }
        }
        registry
    }

    pub fn insert(&mut self, font: FontName) {
        self.fonts.insert((font.family.to_lowercase(), font.style));
    }

    /// Family matching ignores case; style matching is exact.
    pub fn contains(&self, font: &FontName) -> bool {
        self.fonts
            .contains(&(font.family.to_lowercase(), font.style.clone()))
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_font_lists() {
        let registry = FontRegistry::parse_list("Inter:Regular, Roboto:Semi Bold,Arial").unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(&FontName::new("roboto", "Semi Bold")));
        assert!(registry.contains(&FontName::new("Arial", "Regular")));
        assert!(!registry.contains(&FontName::new("Inter", "Bold")));
        assert!(FontRegistry::parse_list("Inter:").is_err());
    }

    #[test]
    fn missing_font_dir_is_an_error() {
        assert!(FontRegistry::from_dir(Path::new("/definitely/not/here")).is_err());
    }
}
