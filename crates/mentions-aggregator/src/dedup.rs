//! Content-fingerprint deduplication.

use std::collections::HashSet;

use mentions_core::NormalizedMention;
use sha2::{Digest, Sha256};

/// SHA-256 over id, lower-cased brand, source, and trimmed lower-cased text.
#[must_use]
pub fn fingerprint(mention: &NormalizedMention) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mention.id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(mention.brand.to_lowercase().as_bytes());
    hasher.update([0x1f]);
    hasher.update(mention.source.as_bytes());
    hasher.update([0x1f]);
    hasher.update(mention.text.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// Remembers fingerprints seen by one target's processing run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the mention was already seen; records it otherwise.
    pub fn is_duplicate(&mut self, mention: &NormalizedMention) -> bool {
        !self.seen.insert(fingerprint(mention))
    }

    /// Keep first occurrences, returning them with the number dropped.
    pub fn filter(&mut self, mentions: Vec<NormalizedMention>) -> (Vec<NormalizedMention>, usize) {
        let before = mentions.len();
        let unique: Vec<NormalizedMention> = mentions
            .into_iter()
            .filter(|m| !self.is_duplicate(m))
            .collect();
        let dropped = before - unique.len();
        (unique, dropped)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
