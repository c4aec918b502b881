//! Collaborator seams for the aggregation cycle.
//!
//! [`BrandSource`] supplies tracked brands and [`Provider`] fetches raw content
//! for one platform. [`MentionSink`] is the downstream registry and queue.

use async_trait::async_trait;
use mentions_core::{NormalizedMention, TrackedBrand};

use crate::error::AggregatorError;
use crate::types::RawMention;

#[async_trait]
pub trait BrandSource: Send + Sync {
    /// All brands to track this cycle.
    async fn tracked_brands(&self) -> Result<Vec<TrackedBrand>, AggregatorError>;
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Platform name stamped on every mention this provider yields.
    fn platform(&self) -> &str;

    /// Whether this provider should deliver mentions to `brand`.
    fn is_enabled(&self, brand: &TrackedBrand) -> bool {
        !brand.is_platform_disabled(self.platform())
    }

    /// Fetch raw items for a brand descriptor.
    async fn fetch_mentions(
        &self,
        brand: &TrackedBrand,
    ) -> Result<Vec<RawMention>, AggregatorError>;
}

#[async_trait]
pub trait MentionSink: Send + Sync {
    /// Make sure the downstream knows about `brand`; returns its slug.
    async fn register_brand(&self, brand: &TrackedBrand) -> Result<String, AggregatorError>;

    /// Drop everything stored for a brand that is no longer tracked.
    ///
    /// The brand is addressed by `slugify(brand_name_lowercase)`, the same
    /// resource [`register_brand`](Self::register_brand) created.
    async fn purge_brand_data(&self, brand_name_lowercase: &str) -> Result<(), AggregatorError>;

    /// Enqueue one batch under `slug`, the one returned by
    /// [`register_brand`](Self::register_brand) when registration succeeded.
    /// Returns how many mentions were committed.
    async fn enqueue_mention_chunks(
        &self,
        brand: &TrackedBrand,
        slug: &str,
        mentions: &[NormalizedMention],
    ) -> Result<usize, AggregatorError>;
}
