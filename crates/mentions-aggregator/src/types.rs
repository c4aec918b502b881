use std::sync::Arc;

use mentions_core::{AppConfig, DeliveryMode, TrackedBrand};
use serde::Serialize;

/// Confidence a match must reach before a mention is kept.
///
/// Independent of each brand's fuzzy threshold.
pub const ACCEPT_CONFIDENCE: f64 = 0.7;

/// Publication time as a provider reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimestamp {
    EpochMillis(i64),
    EpochSeconds(i64),
    /// RFC 3339 or RFC 2822 text.
    Text(String),
}

/// A provider item before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawMention {
    pub id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub published: Option<RawTimestamp>,
    pub synthetic: bool,
    pub payload: serde_json::Value,
}

/// Why a brand cares about a fetch target.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub brand: Arc<TrackedBrand>,
    pub is_competitor: bool,
    pub competitor_id: Option<String>,
    pub competitor_name: Option<String>,
}

impl Subscriber {
    /// Brand profile the matcher should use for this subscription.
    #[must_use]
    pub fn matching_profile(&self) -> TrackedBrand {
        if !self.is_competitor {
            return (*self.brand).clone();
        }
        let competitor = self
            .competitor_id
            .as_deref()
            .and_then(|id| self.brand.competitors.iter().find(|c| c.id == id));
        match competitor {
            Some(c) => self.brand.competitor_profile(c),
            None => {
                let mut profile = TrackedBrand::named(
                    format!(
                        "{}:{}",
                        self.brand.id,
                        self.competitor_id.as_deref().unwrap_or_default()
                    ),
                    self.competitor_name.clone().unwrap_or_default(),
                );
                profile.exclude_keywords.clone_from(&self.brand.exclude_keywords);
                profile.fuzzy_threshold = self.brand.fuzzy_threshold;
                profile.industry.clone_from(&self.brand.industry);
                profile
            }
        }
    }
}

/// One deduplicated fetch unit for a cycle.
#[derive(Debug, Clone)]
pub struct FetchTarget {
    /// Lower-cased, trimmed name; the dedup key.
    pub key: String,
    /// Display form of the name, as first seen.
    pub keyword: String,
    pub keywords: Option<Vec<String>>,
    pub subscribers: Vec<Subscriber>,
}

impl FetchTarget {
    /// Brand descriptor handed to providers: built from the target, not from
    /// any subscriber.
    #[must_use]
    pub fn fetch_descriptor(&self) -> TrackedBrand {
        let mut brand = TrackedBrand::named(format!("target:{}", self.key), self.keyword.clone());
        brand.keywords = self.keywords.clone().unwrap_or_default();
        brand
    }
}

/// Outcome of one (brand, platform) unit in a cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationSummary {
    pub brand: String,
    pub platform: String,
    pub fetched: usize,
    pub stored: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub truncated: usize,
    pub fetch_duration_ms: u64,
    pub write_duration_ms: u64,
    pub error: Option<String>,
}

/// Counters from one fair-dispatch drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub batches_sent: usize,
    pub mentions_sent: usize,
    /// Mentions removed from a buffer whose send then failed (at-most-once).
    pub mentions_lost: usize,
    /// Mentions left behind after a brand exhausted its attempts (at-least-once).
    pub mentions_undelivered: usize,
    pub failures: usize,
}

/// Process-wide aggregator state, as reported to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatorStatus {
    pub is_running: bool,
    /// Epoch milliseconds at which the last cycle started.
    pub last_run_at: Option<i64>,
    pub last_run_duration_ms: Option<u64>,
    pub last_error: Option<String>,
    pub summaries: Vec<AggregationSummary>,
    pub last_dispatch: Option<DispatchReport>,
}

/// Tunables for one aggregator instance.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub max_results_per_fetch: usize,
    pub dispatch_batch_size: usize,
    pub delivery_mode: DeliveryMode,
    pub max_dispatch_attempts: u32,
    pub snapshot_on_failure: bool,
    pub match_cache_capacity: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            max_results_per_fetch: 100,
            dispatch_batch_size: 30,
            delivery_mode: DeliveryMode::AtLeastOnce,
            max_dispatch_attempts: 3,
            snapshot_on_failure: false,
            match_cache_capacity: crate::matcher::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl AggregatorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_results_per_fetch: config.max_results_per_fetch,
            dispatch_batch_size: config.dispatch_batch_size.max(1),
            delivery_mode: config.delivery_mode,
            max_dispatch_attempts: config.max_dispatch_attempts.max(1),
            snapshot_on_failure: config.snapshot_on_failure,
            match_cache_capacity: config.match_cache_capacity,
        }
    }
}
