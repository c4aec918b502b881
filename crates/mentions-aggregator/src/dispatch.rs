//! Per-brand buffers and round-robin batch dispatch.
//!
//! Each pass visits every non-empty buffer once and sends at most one batch
//! from it, so a brand with a large backlog cannot starve a small one.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use mentions_core::{DeliveryMode, NormalizedMention, TrackedBrand};

use crate::traits::MentionSink;
use crate::types::DispatchReport;

#[derive(Debug)]
pub struct BrandBuffer {
    pub brand: Arc<TrackedBrand>,
    /// Downstream slug batches are addressed to.
    pub slug: String,
    pub mentions: VecDeque<NormalizedMention>,
    consecutive_failures: u32,
}

/// Mention buffers keyed by brand name, iterated in first-insertion order.
#[derive(Debug, Default)]
pub struct BrandBuffers {
    buffers: Vec<BrandBuffer>,
    index: HashMap<String, usize>,
    confirmed_slugs: HashMap<String, String>,
}

impl BrandBuffers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the slug the downstream confirmed for `brand_name`.
    ///
    /// Brands without a confirmed slug fall back to [`TrackedBrand::slug`].
    pub fn confirm_slug(&mut self, brand_name: &str, slug: String) {
        if let Some(&slot) = self.index.get(brand_name) {
            self.buffers[slot].slug.clone_from(&slug);
        }
        self.confirmed_slugs.insert(brand_name.to_string(), slug);
    }

    /// Register a buffer for `brand` without adding mentions.
    pub fn ensure(&mut self, brand: &Arc<TrackedBrand>) -> &mut BrandBuffer {
        let slot = match self.index.get(&brand.name) {
            Some(&slot) => slot,
            None => {
                let slug = self
                    .confirmed_slugs
                    .get(&brand.name)
                    .cloned()
                    .unwrap_or_else(|| brand.slug());
                self.buffers.push(BrandBuffer {
                    brand: Arc::clone(brand),
                    slug,
                    mentions: VecDeque::new(),
                    consecutive_failures: 0,
                });
                let slot = self.buffers.len() - 1;
                self.index.insert(brand.name.clone(), slot);
                slot
            }
        };
        &mut self.buffers[slot]
    }

    pub fn extend(
        &mut self,
        brand: &Arc<TrackedBrand>,
        mentions: impl IntoIterator<Item = NormalizedMention>,
    ) {
        self.ensure(brand).mentions.extend(mentions);
    }

    #[must_use]
    pub fn get(&self, brand_name: &str) -> Option<&BrandBuffer> {
        self.index.get(brand_name).map(|&slot| &self.buffers[slot])
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffers.iter().map(|b| b.mentions.len()).sum()
    }

    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.buffers.iter().all(|b| b.mentions.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BrandBuffer> {
        self.buffers.iter()
    }
}

/// How dispatch batches are sized and what happens when the sink fails.
#[derive(Debug, Clone, Copy)]
pub struct DispatchPolicy {
    pub batch_size: usize,
    pub mode: DeliveryMode,
    /// At-least-once only: consecutive failures before a buffer is abandoned.
    pub max_attempts: u32,
}

/// Drain every buffer into `sink` in round-robin batches until all are empty.
pub async fn dispatch_fair(
    buffers: &mut BrandBuffers,
    sink: &dyn MentionSink,
    policy: DispatchPolicy,
) -> DispatchReport {
    let batch_size = policy.batch_size.max(1);
    let max_attempts = policy.max_attempts.max(1);
    let mut report = DispatchReport::default();
    let mut pass = 0_usize;

    while !buffers.is_drained() {
        pass += 1;
        for buffer in &mut buffers.buffers {
            if buffer.mentions.is_empty() {
                continue;
            }
            let take = batch_size.min(buffer.mentions.len());

            match policy.mode {
                DeliveryMode::AtMostOnce => {
                    let batch: Vec<NormalizedMention> = buffer.mentions.drain(..take).collect();
                    let result = sink
                        .enqueue_mention_chunks(&buffer.brand, &buffer.slug, &batch)
                        .await;
                    match result {
                        Ok(_) => {
                            report.batches_sent += 1;
                            report.mentions_sent += batch.len();
                        }
                        Err(e) => {
                            report.failures += 1;
                            report.mentions_lost += batch.len();
                            tracing::warn!(
                                brand = %buffer.brand.name,
                                pass,
                                lost = batch.len(),
                                error = %e,
                                "dispatch failed; batch dropped"
                            );
                        }
                    }
                }
                DeliveryMode::AtLeastOnce => {
                    buffer.mentions.make_contiguous();
                    let (head, _) = buffer.mentions.as_slices();
                    let result = sink
                        .enqueue_mention_chunks(&buffer.brand, &buffer.slug, &head[..take])
                        .await;
                    match result {
                        Ok(_) => {
                            buffer.mentions.drain(..take);
                            buffer.consecutive_failures = 0;
                            report.batches_sent += 1;
                            report.mentions_sent += take;
                        }
                        Err(e) => {
                            report.failures += 1;
                            buffer.consecutive_failures += 1;
                            if buffer.consecutive_failures >= max_attempts {
                                let abandoned = buffer.mentions.len();
                                buffer.mentions.clear();
                                report.mentions_undelivered += abandoned;
                                tracing::error!(
                                    brand = %buffer.brand.name,
                                    attempts = buffer.consecutive_failures,
                                    abandoned,
                                    error = %e,
                                    "dispatch failed repeatedly; abandoning buffer for this cycle"
                                );
                            } else {
                                tracing::warn!(
                                    brand = %buffer.brand.name,
                                    pass,
                                    attempt = buffer.consecutive_failures,
                                    error = %e,
                                    "dispatch failed; batch kept for next pass"
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    report
}
