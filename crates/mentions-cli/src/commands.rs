//! Command handlers for the CLI.

use std::sync::Arc;

use mentions_aggregator::{collect_targets, Aggregator, FetchTarget, SmartMatcher};
use mentions_core::{load_brands, AppConfig, TrackedBrand};

/// Run one aggregation cycle and print per-summary lines plus the dispatch report.
///
/// # Errors
///
/// Returns an error if wiring fails or the cycle records an error.
pub(crate) async fn run_cycle(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let aggregator = Aggregator::from_app_config(config, dry_run)?;
    if dry_run {
        tracing::info!("dry run: mentions stay in memory");
    }

    if !aggregator.run_now().await {
        anyhow::bail!("an aggregation cycle is already running");
    }

    let status = aggregator.status();
    for summary in &status.summaries {
        match &summary.error {
            Some(error) => println!(
                "{:<24} {:<12} error: {error}",
                summary.brand, summary.platform
            ),
            None => println!(
                "{:<24} {:<12} fetched={} stored={} invalid={} duplicates={} truncated={} fetch_ms={}",
                summary.brand,
                summary.platform,
                summary.fetched,
                summary.stored,
                summary.invalid,
                summary.duplicates,
                summary.truncated,
                summary.fetch_duration_ms,
            ),
        }
    }

    if let Some(report) = &status.last_dispatch {
        println!(
            "dispatch: batches={} sent={} lost={} undelivered={} failures={}",
            report.batches_sent,
            report.mentions_sent,
            report.mentions_lost,
            report.mentions_undelivered,
            report.failures,
        );
    }
    if let Some(duration) = status.last_run_duration_ms {
        println!("cycle finished in {duration} ms");
    }

    match status.last_error {
        Some(error) => anyhow::bail!("cycle failed: {error}"),
        None => Ok(()),
    }
}

/// Print each fetch target with the brands subscribed to it.
///
/// # Errors
///
/// Returns an error if the brands file cannot be loaded.
pub(crate) fn print_targets(config: &AppConfig) -> anyhow::Result<()> {
    let brands: Vec<Arc<TrackedBrand>> = load_brands(&config.brands_path)?
        .brands
        .into_iter()
        .map(Arc::new)
        .collect();
    let targets = collect_targets(&brands);
    for line in describe_targets(&targets) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn describe_targets(targets: &[FetchTarget]) -> Vec<String> {
    let mut lines = Vec::new();
    for target in targets {
        let keywords = target
            .keywords
            .as_ref()
            .map(|k| format!(" [{}]", k.join(", ")))
            .unwrap_or_default();
        lines.push(format!(
            "{}{keywords} ({} subscribers)",
            target.keyword,
            target.subscribers.len()
        ));
        for sub in &target.subscribers {
            match &sub.competitor_name {
                Some(competitor) if sub.is_competitor => {
                    lines.push(format!("  - {} (competitor {competitor})", sub.brand.name));
                }
                _ => lines.push(format!("  - {} (own)", sub.brand.name)),
            }
        }
    }
    lines
}

/// Evaluate the matcher for `brand_name` against `text` and print the result as JSON.
///
/// # Errors
///
/// Returns an error if the brands file cannot be loaded or no brand or
/// competitor has that name.
pub(crate) fn match_text(config: &AppConfig, brand_name: &str, text: &str) -> anyhow::Result<()> {
    let brands = load_brands(&config.brands_path)?.brands;
    let profile = find_profile(&brands, brand_name)
        .ok_or_else(|| anyhow::anyhow!("brand '{brand_name}' not found"))?;

    let result = SmartMatcher::new(1).match_text(text, &profile);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// A tracked brand by name, or else the first brand's profile for a competitor
/// of that name.
pub(crate) fn find_profile(brands: &[TrackedBrand], name: &str) -> Option<TrackedBrand> {
    let name = name.trim();
    if let Some(brand) = brands.iter().find(|b| b.name.eq_ignore_ascii_case(name)) {
        return Some(brand.clone());
    }
    brands.iter().find_map(|brand| {
        brand
            .competitors
            .iter()
            .find(|c| c.name.trim().eq_ignore_ascii_case(name))
            .map(|c| brand.competitor_profile(c))
    })
}
