//! Font resolution: CSS family/style/weight to a loaded host font.

use std::collections::{HashMap, HashSet};

use strata_ir::{CssProperty, StyleValue, Styles};
use tracing::{debug, warn};

use crate::error::{ImportError, Result};
use crate::host::{FontLoader, FontName};

pub const REGULAR: &str = "Regular";

/// Generic CSS families and the concrete family tried for each. `None`
/// means the configured default family.
const GENERIC_FAMILIES: &[(&str, Option<&str>)] = &[
    ("sans-serif", None),
    ("system-ui", None),
    ("ui-sans-serif", None),
    ("-apple-system", None),
    ("blinkmacsystemfont", None),
    ("cursive", None),
    ("fantasy", None),
    ("serif", Some("Times New Roman")),
    ("ui-serif", Some("Times New Roman")),
    ("monospace", Some("Courier New")),
    ("ui-monospace", Some("Courier New")),
];

/// First usable family of a `font-family` list, unquoted. Generic families
/// are only used when nothing concrete is listed.
pub fn normalize_family(raw: &str, default_family: &str) -> String {
    let families: Vec<String> = raw
        .split(',')
        .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    let is_generic = |f: &str| {
        let lower = f.to_ascii_lowercase();
        GENERIC_FAMILIES.iter().find(|(name, _)| *name == lower)
    };
    if let Some(concrete) = families.iter().find(|f| is_generic(f.as_str()).is_none()) {
        return concrete.clone();
    }
    match families.first().and_then(|f| is_generic(f.as_str())) {
        Some((_, Some(mapped))) => mapped.to_string(),
        _ => default_family.to_string(),
    }
}

/// Style bucket for a numeric weight; `None` in the regular range.
pub fn style_from_weight(weight: f64) -> Option<&'static str> {
    if weight >= 700.0 {
        Some("Bold")
    } else if weight >= 600.0 {
        Some("Semi Bold")
    } else if weight >= 500.0 {
        Some("Medium")
    } else if weight <= 300.0 {
        Some("Light")
    } else {
        None
    }
}

/// Style bucket from a free-form style string (`"SemiBold"`, `"bold italic"`).
pub fn style_from_keyword(style: &str) -> &'static str {
    let lower = style.to_ascii_lowercase();
    if lower.contains("semi") || lower.contains("demi") {
        "Semi Bold"
    } else if lower.contains("bold") {
        "Bold"
    } else if lower.contains("medium") {
        "Medium"
    } else if lower.contains("light") {
        "Light"
    } else {
        REGULAR
    }
}

/// Numeric weight from a CSS `font-weight` value.
pub fn weight_value(value: &StyleValue) -> Option<f64> {
    if let Some(n) = value.as_number() {
        return Some(n);
    }
    match value.as_str().trim().to_ascii_lowercase().as_str() {
        "bold" | "bolder" => Some(700.0),
        "lighter" => Some(300.0),
        "normal" => Some(400.0),
        _ => None,
    }
}

/// Canonical host font for a CSS request.
pub fn resolve(family: &str, style: Option<&str>, weight: Option<f64>) -> FontName {
    // A numeric weight decides on its own; keywords only apply without one.
    let base = match weight {
        Some(weight) => style_from_weight(weight).unwrap_or(REGULAR),
        None => style.map(style_from_keyword).unwrap_or(REGULAR),
    };
    let italic = style.is_some_and(|s| {
        let lower = s.to_ascii_lowercase();
        lower.contains("italic") || lower.contains("oblique")
    });
    let style = match (base, italic) {
        (REGULAR, true) => "Italic".to_string(),
        (base, true) => format!("{base} Italic"),
        (base, false) => base.to_string(),
    };
    FontName::new(family.trim(), style)
}

/// Font for a text node's computed style.
pub fn font_for_styles(styles: &Styles, default_family: &str) -> FontName {
    let family = styles
        .str(CssProperty::FontFamily)
        .map(|f| normalize_family(&f, default_family))
        .unwrap_or_else(|| default_family.to_string());
    let style = styles.str(CssProperty::FontStyle);
    let weight = styles.get(CssProperty::FontWeight).and_then(weight_value);
    resolve(&family, style.as_deref(), weight)
}

/// Fonts already loaded this session, keyed by lowercased family + style.
#[derive(Debug, Default)]
pub struct FontCache {
    loaded: HashMap<(String, String), FontName>,
    unavailable: HashSet<(String, String)>,
}

fn cache_key(font: &FontName) -> (String, String) {
    (font.family.to_lowercase(), font.style.clone())
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `wanted`, falling back to the family's Regular and then to
    /// `default`. Returns the font that actually loaded; fails only when the
    /// whole chain fails.
    pub async fn load<L: FontLoader>(
        &mut self,
        loader: &mut L,
        wanted: &FontName,
        default: &FontName,
    ) -> Result<FontName> {
        let mut chain = vec![wanted.clone()];
        if wanted.style != REGULAR {
            chain.push(FontName::new(wanted.family.clone(), REGULAR));
        }
        if !chain.iter().any(|f| cache_key(f) == cache_key(default)) {
            chain.push(default.clone());
        }

        for candidate in &chain {
            if self.try_load(loader, candidate).await {
                if candidate != wanted {
                    debug!(wanted = %wanted, using = %candidate, "font fallback");
                }
                return Ok(candidate.clone());
            }
        }
        warn!(wanted = %wanted, default = %default, "font fallback chain exhausted");
        Err(ImportError::FontUnavailable {
            family: wanted.family.clone(),
            style: wanted.style.clone(),
        })
    }

    async fn try_load<L: FontLoader>(&mut self, loader: &mut L, font: &FontName) -> bool {
        let key = cache_key(font);
        if self.loaded.contains_key(&key) {
            return true;
        }
        if self.unavailable.contains(&key) {
            return false;
        }
        match loader.load_font(font).await {
            Ok(()) => {
                self.loaded.insert(key, font.clone());
                true
            }
            Err(err) => {
                debug!(font = %font, error = %err, "font load failed");
                self.unavailable.insert(key);
                false
            }
        }
    }

    pub fn is_loaded(&self, font: &FontName) -> bool {
        self.loaded.contains_key(&cache_key(font))
    }

    pub fn loaded(&self) -> impl Iterator<Item = &FontName> {
        self.loaded.values()
    }

    pub fn clear(&mut self) {
        self.loaded.clear();
        self.unavailable.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;

    #[derive(Default)]
    struct Loader {
        installed: Vec<FontName>,
        calls: Vec<FontName>,
    }

    impl FontLoader for Loader {
        async fn load_font(&mut self, font: &FontName) -> std::result::Result<(), HostError> {
            self.calls.push(font.clone());
            if self.installed.contains(font) {
                Ok(())
            } else {
                Err(HostError::FontNotFound {
                    family: font.family.clone(),
                    style: font.style.clone(),
                })
            }
        }
    }

    #[test]
    fn weight_buckets_win_over_keywords() {
        assert_eq!(resolve("Inter", None, Some(700.0)).style, "Bold");
        assert_eq!(resolve("Inter", None, Some(650.0)).style, "Semi Bold");
        assert_eq!(resolve("Inter", None, Some(500.0)).style, "Medium");
        assert_eq!(resolve("Inter", None, Some(300.0)).style, "Light");
        assert_eq!(resolve("Inter", Some("bold"), None).style, "Bold");
        assert_eq!(resolve("Inter", Some("bold"), Some(400.0)).style, "Regular");
        assert_eq!(resolve("Inter", Some("medium italic"), Some(350.0)).style, "Italic");
        assert_eq!(resolve("Inter", Some("SemiBold"), None).style, "Semi Bold");
        assert_eq!(resolve("Inter", None, None).style, "Regular");
    }

    #[test]
    fn italic_is_appended() {
        assert_eq!(resolve("Inter", Some("italic"), None).style, "Italic");
        assert_eq!(resolve("Inter", Some("italic"), Some(700.0)).style, "Bold Italic");
    }

    #[test]
    fn family_lists_are_normalized() {
        assert_eq!(normalize_family("\"Open Sans\", Arial, sans-serif", "Inter"), "Open Sans");
        assert_eq!(normalize_family("-apple-system, 'Segoe UI'", "Inter"), "Segoe UI");
        assert_eq!(normalize_family("sans-serif", "Inter"), "Inter");
        assert_eq!(normalize_family("monospace", "Inter"), "Courier New");
    }

    #[test]
    fn styles_drive_resolution() {
        let mut styles = Styles::default();
        styles.insert("fontFamily", StyleValue::from("Roboto, sans-serif"));
        styles.insert("fontWeight", StyleValue::from("600"));
        styles.insert("fontStyle", StyleValue::from("italic"));
        assert_eq!(
            font_for_styles(&styles, "Inter"),
            FontName::new("Roboto", "Semi Bold Italic")
        );
    }

    #[test]
    fn fallback_chain_and_cache() {
        let default = FontName::new("Inter", "Regular");
        let mut loader = Loader {
            installed: vec![default.clone(), FontName::new("Roboto", "Regular")],
            ..Default::default()
        };
        let mut cache = FontCache::new();

        let got = pollster::block_on(cache.load(
            &mut loader,
            &FontName::new("Roboto", "Bold"),
            &default,
        ))
        .unwrap();
        assert_eq!(got, FontName::new("Roboto", "Regular"));

        let got = pollster::block_on(cache.load(
            &mut loader,
            &FontName::new("Missing", "Regular"),
            &default,
        ))
        .unwrap();
        assert_eq!(got, default);

        // Second request is served from the cache without host calls.
        let calls = loader.calls.len();
        pollster::block_on(cache.load(&mut loader, &FontName::new("Roboto", "Bold"), &default))
            .unwrap();
        assert_eq!(loader.calls.len(), calls);
        assert!(cache.is_loaded(&FontName::new("roboto", "Regular")));
    }

    #[test]
    fn exhausted_chain_is_an_error() {
        let mut loader = Loader::default();
        let mut cache = FontCache::new();
        let result = pollster::block_on(cache.load(
            &mut loader,
            &FontName::new("Nope", "Bold"),
            &FontName::new("Inter", "Regular"),
        ));
        assert!(matches!(result, Err(ImportError::FontUnavailable { .. })));
    }
}
