use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default similarity floor for the fuzzy matching stage.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

fn default_fuzzy_threshold() -> f64 {
    DEFAULT_FUZZY_THRESHOLD
}

/// A competitor tracked on behalf of a brand.
///
/// Competitors only exist nested inside a [`TrackedBrand`]; they are never
/// tracked brands themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Keyword override used when fetching and matching this competitor.
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

/// A brand whose mentions are collected, with its matching configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedBrand {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub product_terms: Vec<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default)]
    pub known_misspellings: Vec<String>,
    /// Platforms (provider names) that must not deliver mentions for this brand.
    #[serde(default)]
    pub disabled_platforms: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
}

impl TrackedBrand {
    /// Minimal brand with default matching configuration.
    #[must_use]
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            keywords: Vec::new(),
            product_terms: Vec::new(),
            industry: None,
            exclude_keywords: Vec::new(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            known_misspellings: Vec::new(),
            disabled_platforms: Vec::new(),
            competitors: Vec::new(),
        }
    }

    /// Generate a URL-safe slug from the brand name.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// The matching profile this brand uses to judge mentions of one of its
    /// competitors.
    ///
    /// The competitor supplies the name and keywords; exclusions, the fuzzy
    /// threshold, and the industry stay the brand's own.
    #[must_use]
    pub fn competitor_profile(&self, competitor: &Competitor) -> TrackedBrand {
        TrackedBrand {
            id: format!("{}:{}", self.id, competitor.id),
            name: competitor.name.clone(),
            aliases: Vec::new(),
            keywords: competitor.keywords.clone().unwrap_or_default(),
            product_terms: Vec::new(),
            industry: self.industry.clone(),
            exclude_keywords: self.exclude_keywords.clone(),
            fuzzy_threshold: self.fuzzy_threshold,
            known_misspellings: Vec::new(),
            disabled_platforms: self.disabled_platforms.clone(),
            competitors: Vec::new(),
        }
    }

    /// Whether `platform` is listed in this brand's disabled platforms.
    #[must_use]
    pub fn is_platform_disabled(&self, platform: &str) -> bool {
        self.disabled_platforms
            .iter()
            .any(|p| p.eq_ignore_ascii_case(platform))
    }
}

/// Lowercase, dash-separated ASCII slug. Non-ASCII characters are dropped.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Deserialize)]
pub struct BrandsFile {
    pub brands: Vec<TrackedBrand>,
}

/// Load and validate the brands configuration from a YAML file.
///
/// Missing brand and competitor ids are filled in from their slugs.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_brands(path: &Path) -> Result<BrandsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::BrandsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_brands(&content)
}

/// Parse and validate brands YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML does not parse or fails validation.
pub fn parse_brands(content: &str) -> Result<BrandsFile, ConfigError> {
    let mut brands_file: BrandsFile =
        serde_yaml::from_str(content).map_err(ConfigError::BrandsFileParse)?;

    fill_default_ids(&mut brands_file);
    validate_brands(&brands_file)?;

    Ok(brands_file)
}

fn fill_default_ids(brands_file: &mut BrandsFile) {
    for brand in &mut brands_file.brands {
        if brand.id.trim().is_empty() {
            brand.id = brand.slug();
        }
        for competitor in &mut brand.competitors {
            if competitor.id.trim().is_empty() {
                competitor.id = slugify(&competitor.name);
            }
        }
    }
}

fn validate_brands(brands_file: &BrandsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for brand in &brands_file.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        if !(brand.fuzzy_threshold > 0.0 && brand.fuzzy_threshold <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "brand '{}' has invalid fuzzy_threshold {}; must be in (0, 1]",
                brand.name, brand.fuzzy_threshold
            )));
        }

        let lower_name = brand.name.trim().to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand name: '{}'",
                brand.name
            )));
        }

        let slug = brand.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "brand '{}' produces an empty slug",
                brand.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand slug: '{}' (from brand '{}')",
                slug, brand.name
            )));
        }

        for competitor in &brand.competitors {
            if competitor.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "brand '{}' has a competitor with an empty name",
                    brand.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "brands_test.rs"]
mod tests;
