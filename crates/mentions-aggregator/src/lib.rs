//! Brand mention aggregation.
//!
//! Collects deduplicated fetch targets from tracked brands and their
//! competitors, fetches each target once per provider, normalizes, validates,
//! deduplicates, and matches the results per subscribing brand, then drains the
//! per-brand buffers into a downstream queue in round-robin batches.

pub mod aggregator;
pub mod brand_source;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod sink;
pub mod sources;
pub mod targets;
pub mod traits;
pub mod types;

mod pipeline;

pub use aggregator::Aggregator;
pub use brand_source::{StaticBrandSource, YamlBrandSource};
pub use dedup::{fingerprint, Deduplicator};
pub use dispatch::{dispatch_fair, BrandBuffers, DispatchPolicy};
pub use error::AggregatorError;
pub use matcher::{similarity, SmartMatcher};
pub use metrics::{MetricsSink, NoopMetrics, TracingMetrics};
pub use sink::{HttpSink, MemorySink, SinkRecord};
pub use targets::collect_targets;
pub use traits::{BrandSource, MentionSink, Provider};
pub use types::{
    AggregationSummary, AggregatorSettings, AggregatorStatus, DispatchReport, FetchTarget,
    RawMention, RawTimestamp, Subscriber, ACCEPT_CONFIDENCE,
};
