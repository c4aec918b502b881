//! Multi-stage brand relevance matcher.
//!
//! Stages run in a fixed order and the first positive result wins:
//!
//! 1. exclusion keywords (substring) short-circuit to a non-match
//! 2. brand name as a whole word (`1.0`)
//! 3. aliases, keywords, product terms as whole words (`0.95`)
//! 4. declared misspellings as substrings (`0.9`)
//! 5. per-word edit-distance similarity against the name (`typo`, raw score)
//!    and keywords (`fuzzy`, score discounted by `0.9`)
//! 6. industry context words plus the name's leading characters (`0.7`)

mod cache;
mod industry;

use std::sync::{Mutex, PoisonError};

use mentions_core::{MatchResult, MatchType, TrackedBrand};
use regex::Regex;
use sha2::{Digest, Sha256};

use self::cache::FifoCache;

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Characters of text that participate in the cache key.
const CACHE_KEY_PREFIX_CHARS: usize = 100;
const MIN_FUZZY_WORD_CHARS: usize = 3;
const KEYWORD_FUZZY_DISCOUNT: f64 = 0.9;

const EXACT_CONFIDENCE: f64 = 1.0;
const KEYWORD_CONFIDENCE: f64 = 0.95;
const MISSPELLING_CONFIDENCE: f64 = 0.9;
const CONTEXT_CONFIDENCE: f64 = 0.7;

/// Normalized edit-distance similarity: `1 - distance / max_len`, in chars.
///
/// Symmetric; two empty strings are identical (`1.0`).
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Matches text against brand profiles, caching results.
///
/// The cache key covers a text prefix, the profile id, and a digest of the
/// profile's matching fields, so an edited profile is re-evaluated.
#[derive(Debug)]
pub struct SmartMatcher {
    cache: Mutex<FifoCache<String, MatchResult>>,
}

impl Default for SmartMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl SmartMatcher {
    #[must_use]
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: Mutex::new(FifoCache::new(cache_capacity)),
        }
    }

    /// Match `text` against `brand`, consulting the cache first.
    pub fn match_text(&self, text: &str, brand: &TrackedBrand) -> MatchResult {
        let key = cache_key(text, brand);
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit.clone();
        }

        let result = evaluate(text, brand);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, result.clone());
        result
    }

    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn cache_key(text: &str, brand: &TrackedBrand) -> String {
    let prefix: String = text.chars().take(CACHE_KEY_PREFIX_CHARS).collect();
    format!(
        "{prefix}\u{1f}{}\u{1f}{}",
        brand.id,
        profile_digest(brand)
    )
}

/// SHA-256 over every field that can change a match outcome.
fn profile_digest(brand: &TrackedBrand) -> String {
    let mut hasher = Sha256::new();
    let mut field = |label: &str, values: &[String]| {
        hasher.update(label.as_bytes());
        for value in values {
            hasher.update([0x1f]);
            hasher.update(value.as_bytes());
        }
        hasher.update([0x1e]);
    };
    field("name", std::slice::from_ref(&brand.name));
    field("aliases", &brand.aliases);
    field("keywords", &brand.keywords);
    field("products", &brand.product_terms);
    field("exclude", &brand.exclude_keywords);
    field("misspellings", &brand.known_misspellings);
    field("industry", brand.industry.as_slice());
    hasher.update(brand.fuzzy_threshold.to_bits().to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Run every stage without touching a cache.
#[must_use]
pub fn evaluate(text: &str, brand: &TrackedBrand) -> MatchResult {
    let lower = text.to_lowercase();

    if let Some(term) = brand
        .exclude_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .find(|k| !k.is_empty() && lower.contains(k.as_str()))
    {
        return MatchResult {
            is_match: false,
            confidence: 0.0,
            match_type: MatchType::None,
            matched_term: Some(term),
            reason: Some("excluded".to_string()),
        };
    }

    let name = brand.name.trim();
    if !name.is_empty() && contains_word(text, name) {
        return MatchResult::hit(MatchType::Exact, EXACT_CONFIDENCE, name, "exact brand name");
    }

    if let Some(term) = brand
        .aliases
        .iter()
        .chain(&brand.keywords)
        .chain(&brand.product_terms)
        .map(|t| t.trim())
        .find(|t| !t.is_empty() && contains_word(text, t))
    {
        return MatchResult::hit(
            MatchType::Keyword,
            KEYWORD_CONFIDENCE,
            term,
            format!("keyword match: {term}"),
        );
    }

    if let Some(term) = brand
        .known_misspellings
        .iter()
        .map(|m| m.trim().to_lowercase())
        .find(|m| !m.is_empty() && lower.contains(m.as_str()))
    {
        let reason = format!("known misspelling: {term}");
        return MatchResult::hit(MatchType::Typo, MISSPELLING_CONFIDENCE, term, reason);
    }

    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if let Some(result) = fuzzy_stage(&words, brand) {
        return result;
    }

    if let Some(result) = context_stage(&lower, &words, brand) {
        return result;
    }

    MatchResult::miss(None)
}

fn fuzzy_stage(words: &[&str], brand: &TrackedBrand) -> Option<MatchResult> {
    let name = brand.name.trim().to_lowercase();
    let keywords: Vec<String> = brand
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let threshold = brand.fuzzy_threshold;

    for word in words
        .iter()
        .filter(|w| w.chars().count() >= MIN_FUZZY_WORD_CHARS)
    {
        if !name.is_empty() {
            let score = similarity(word, &name);
            if score >= threshold {
                return Some(MatchResult::hit(
                    MatchType::Typo,
                    score,
                    *word,
                    format!("'{word}' looks like a typo of '{name}' ({score:.2})"),
                ));
            }
        }

        for keyword in &keywords {
            let score = similarity(word, keyword);
            if score >= threshold {
                return Some(MatchResult::hit(
                    MatchType::Fuzzy,
                    score * KEYWORD_FUZZY_DISCOUNT,
                    *word,
                    format!("'{word}' is close to keyword '{keyword}' ({score:.2})"),
                ));
            }
        }
    }

    None
}

fn context_stage(lower: &str, words: &[&str], brand: &TrackedBrand) -> Option<MatchResult> {
    let terms = industry::context_terms(brand.industry.as_deref()?)?;
    let prefix = name_prefix(&brand.name)?;

    let context_word = words.iter().find(|w| terms.contains(*w))?;
    if !lower.contains(prefix.as_str()) {
        return None;
    }

    Some(MatchResult::hit(
        MatchType::Context,
        CONTEXT_CONFIDENCE,
        prefix.clone(),
        format!("industry context '{context_word}' with name prefix '{prefix}'"),
    ))
}

/// First four characters of the lower-cased name, or three for three-letter
/// names. Shorter names have no usable prefix.
fn name_prefix(name: &str) -> Option<String> {
    let lower = name.trim().to_lowercase();
    let len = lower.chars().count();
    if len < 3 {
        return None;
    }
    Some(lower.chars().take(len.min(4)).collect())
}

/// Case-insensitive whole-word search.
fn contains_word(text: &str, term: &str) -> bool {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::warn!(term, error = %e, "could not compile word pattern");
            false
        }
    }
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod tests;
