//! Normalization from provider [`RawMention`]s to [`NormalizedMention`]s, and
//! schema validation of the result.

use chrono::DateTime;
use mentions_core::{MentionMetadata, NormalizedMention};
use sha2::{Digest, Sha256};

use crate::types::{RawMention, RawTimestamp};

/// Hex characters kept when deriving an id from a URL.
const DERIVED_ID_LEN: usize = 16;

/// Map a raw provider item into canonical shape.
///
/// `brand` is stamped provisionally; the pipeline overwrites it per subscriber.
/// Missing or unparseable timestamps normalize to `0`, which fails validation.
#[must_use]
pub fn normalize_mention(raw: RawMention, brand: &str, platform: &str) -> NormalizedMention {
    let text = [raw.title.as_deref(), raw.body.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let url = raw
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    let id = raw
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| url.as_deref().map(derive_id))
        .unwrap_or_default();

    let timestamp = raw.published.as_ref().map_or(0, to_epoch_millis);

    NormalizedMention {
        id,
        brand: brand.to_string(),
        text,
        timestamp,
        source: platform.to_string(),
        metadata: MentionMetadata {
            author: raw
                .author
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            url,
            raw: (!raw.payload.is_null()).then_some(raw.payload),
            synthetic: raw.synthetic,
            match_info: None,
            competitor: None,
        },
    }
}

fn derive_id(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    digest[..DERIVED_ID_LEN].to_string()
}

fn to_epoch_millis(ts: &RawTimestamp) -> i64 {
    match ts {
        RawTimestamp::EpochMillis(ms) => *ms,
        RawTimestamp::EpochSeconds(secs) => secs.saturating_mul(1000),
        RawTimestamp::Text(text) => {
            let text = text.trim();
            DateTime::parse_from_rfc3339(text)
                .or_else(|_| DateTime::parse_from_rfc2822(text))
                .map_or(0, |dt| dt.timestamp_millis())
        }
    }
}

/// Why a normalized mention failed validation.
#[must_use]
pub fn validation_error(mention: &NormalizedMention) -> Option<&'static str> {
    if mention.id.trim().is_empty() {
        return Some("missing id");
    }
    if mention.brand.trim().is_empty() {
        return Some("missing brand");
    }
    if mention.text.trim().is_empty() {
        return Some("empty text");
    }
    if mention.source.trim().is_empty() {
        return Some("missing source");
    }
    if mention.timestamp <= 0 {
        return Some("missing or invalid timestamp");
    }
    if let Some(url) = &mention.metadata.url {
        match reqwest::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Some("invalid url"),
        }
    }
    None
}

/// Split mentions into `(valid, invalid_count)`.
#[must_use]
pub fn partition_valid(mentions: Vec<NormalizedMention>) -> (Vec<NormalizedMention>, usize) {
    let before = mentions.len();
    let valid: Vec<NormalizedMention> = mentions
        .into_iter()
        .filter(|m| match validation_error(m) {
            None => true,
            Some(reason) => {
                tracing::debug!(id = %m.id, source = %m.source, reason, "dropping invalid mention");
                false
            }
        })
        .collect();
    let invalid = before - valid.len();
    (valid, invalid)
}
