//! Per-target fetch, normalize, validate, dedup, and match pipeline.

use std::sync::Arc;
use std::time::Instant;

use mentions_core::{CompetitorTag, MatchDiagnostics, NormalizedMention};

use crate::dedup::Deduplicator;
use crate::dispatch::BrandBuffers;
use crate::matcher::SmartMatcher;
use crate::metrics::{duration_ms, MetricsSink};
use crate::normalize::{normalize_mention, partition_valid};
use crate::traits::Provider;
use crate::types::{AggregationSummary, FetchTarget, Subscriber, ACCEPT_CONFIDENCE};

/// Shared collaborators for one cycle's pipeline runs.
pub(crate) struct PipelineContext<'a> {
    pub providers: &'a [Arc<dyn Provider>],
    pub matcher: &'a SmartMatcher,
    pub metrics: &'a dyn MetricsSink,
    pub max_results_per_fetch: usize,
}

/// Counts shared by every subscriber of one `(target, provider)` fetch.
#[derive(Debug, Clone, Copy, Default)]
struct FetchCounts {
    fetched: usize,
    truncated: usize,
    invalid: usize,
    duplicates: usize,
    fetch_duration_ms: u64,
}

/// Run every provider for `target`, appending accepted mentions to `buffers`.
///
/// Each provider is called exactly once. Returns one summary per
/// `(subscriber, provider)` pair that was not skipped as disabled.
pub(crate) async fn process_target(
    ctx: &PipelineContext<'_>,
    target: &FetchTarget,
    buffers: &mut BrandBuffers,
) -> Vec<AggregationSummary> {
    let descriptor = target.fetch_descriptor();
    let mut dedup = Deduplicator::new();
    let mut summaries = Vec::new();

    for provider in ctx.providers {
        let platform = provider.platform();

        let started = Instant::now();
        let fetched = provider.fetch_mentions(&descriptor).await;
        let fetch_elapsed = started.elapsed();
        ctx.metrics.fetch_duration(platform, fetch_elapsed);

        let mut raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    target_name = %target.keyword,
                    platform,
                    error = %e,
                    "fetch failed; continuing with next provider"
                );
                let message = e.to_string();
                summaries.extend(
                    target
                        .subscribers
                        .iter()
                        .filter(|sub| provider.is_enabled(&sub.brand))
                        .map(|sub| AggregationSummary {
                            brand: sub.brand.name.clone(),
                            platform: platform.to_string(),
                            fetch_duration_ms: duration_ms(fetch_elapsed),
                            error: Some(message.clone()),
                            ..AggregationSummary::default()
                        }),
                );
                continue;
            }
        };

        let mut counts = FetchCounts {
            fetched: raw.len(),
            fetch_duration_ms: duration_ms(fetch_elapsed),
            ..FetchCounts::default()
        };
        ctx.metrics.mentions_fetched(platform, raw.len());

        if raw.len() > ctx.max_results_per_fetch {
            counts.truncated = raw.len() - ctx.max_results_per_fetch;
            raw.truncate(ctx.max_results_per_fetch);
            tracing::info!(
                target_name = %target.keyword,
                platform,
                truncated = counts.truncated,
                kept = raw.len(),
                "truncated provider results"
            );
        }

        let started = Instant::now();
        let normalized: Vec<NormalizedMention> = raw
            .into_iter()
            .map(|item| normalize_mention(item, &target.keyword, platform))
            .collect();
        let (valid, invalid) = partition_valid(normalized);
        ctx.metrics.normalize_duration(platform, started.elapsed());
        counts.invalid = invalid;
        ctx.metrics.mentions_invalid(platform, invalid);

        let started = Instant::now();
        let (unique, duplicates) = dedup.filter(valid);
        ctx.metrics.dedup_duration(started.elapsed());
        counts.duplicates = duplicates;
        ctx.metrics.mentions_duplicate(platform, duplicates);

        tracing::debug!(
            target_name = %target.keyword,
            platform,
            fetched = counts.fetched,
            invalid,
            duplicates,
            unique = unique.len(),
            "fetch processed"
        );

        for subscriber in &target.subscribers {
            if !provider.is_enabled(&subscriber.brand) {
                tracing::debug!(
                    brand = %subscriber.brand.name,
                    platform,
                    "provider disabled for brand; skipping subscriber"
                );
                continue;
            }
            let summary = distribute(ctx, subscriber, platform, &unique, counts, buffers);
            summaries.push(summary);
        }
    }

    summaries
}

/// Clone, tag, and match `mentions` for one subscriber.
fn distribute(
    ctx: &PipelineContext<'_>,
    subscriber: &Subscriber,
    platform: &str,
    mentions: &[NormalizedMention],
    counts: FetchCounts,
    buffers: &mut BrandBuffers,
) -> AggregationSummary {
    let started = Instant::now();
    let profile = subscriber.matching_profile();
    let competitor = competitor_tag(subscriber);

    let accepted: Vec<NormalizedMention> = mentions
        .iter()
        .filter_map(|mention| {
            let mut mention = mention.clone();
            mention.brand.clone_from(&subscriber.brand.name);
            mention.metadata.competitor.clone_from(&competitor);

            let result = ctx.matcher.match_text(&mention.text, &profile);
            mention.metadata.match_info = Some(MatchDiagnostics::from(&result));
            (result.is_match && result.confidence >= ACCEPT_CONFIDENCE).then_some(mention)
        })
        .collect();

    let stored = accepted.len();
    buffers.extend(&subscriber.brand, accepted);
    let write_elapsed = started.elapsed();
    ctx.metrics.write_duration(&subscriber.brand.name, write_elapsed);

    AggregationSummary {
        brand: subscriber.brand.name.clone(),
        platform: platform.to_string(),
        fetched: counts.fetched,
        stored,
        invalid: counts.invalid,
        duplicates: counts.duplicates,
        truncated: counts.truncated,
        fetch_duration_ms: counts.fetch_duration_ms,
        write_duration_ms: duration_ms(write_elapsed),
        error: None,
    }
}

fn competitor_tag(subscriber: &Subscriber) -> Option<CompetitorTag> {
    subscriber.is_competitor.then(|| CompetitorTag {
        is_competitor: true,
        competitor_id: subscriber.competitor_id.clone().unwrap_or_default(),
        competitor_name: subscriber.competitor_name.clone().unwrap_or_default(),
    })
}
