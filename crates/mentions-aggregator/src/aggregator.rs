//! Aggregation cycle orchestrator.
//!
//! One [`Aggregator`] owns the run flag, the last cycle's status, and the
//! brand-name snapshot used to purge brands that stopped being tracked. Only
//! one cycle runs at a time; a second trigger while busy returns `false`.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use mentions_core::{AppConfig, TrackedBrand};

use crate::brand_source::YamlBrandSource;
use crate::dispatch::{dispatch_fair, BrandBuffers, DispatchPolicy};
use crate::error::AggregatorError;
use crate::matcher::SmartMatcher;
use crate::metrics::{duration_ms, MetricsSink, NoopMetrics, TracingMetrics};
use crate::pipeline::{process_target, PipelineContext};
use crate::sink::{HttpSink, MemorySink};
use crate::sources::{http_client, providers_from_config};
use crate::targets::collect_targets;
use crate::traits::{BrandSource, MentionSink, Provider};
use crate::types::{
    AggregationSummary, AggregatorSettings, AggregatorStatus, DispatchReport, FetchTarget,
};

#[derive(Debug, Default)]
struct RunState {
    status: AggregatorStatus,
    /// Lower-cased names of the brands tracked by the last snapshotted cycle.
    tracked_names: HashSet<String>,
}

/// What a cycle produced before it finished or failed.
#[derive(Debug, Default)]
struct CycleProgress {
    summaries: Vec<AggregationSummary>,
    dispatch: Option<DispatchReport>,
    brand_names: Option<HashSet<String>>,
}

/// Clears the run flag when a cycle ends, including by panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Aggregator {
    brand_source: Arc<dyn BrandSource>,
    providers: Vec<Arc<dyn Provider>>,
    sink: Arc<dyn MentionSink>,
    metrics: Arc<dyn MetricsSink>,
    matcher: SmartMatcher,
    settings: AggregatorSettings,
    running: AtomicBool,
    state: Mutex<RunState>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let platforms: Vec<&str> = self.providers.iter().map(|p| p.platform()).collect();
        f.debug_struct("Aggregator")
            .field("providers", &platforms)
            .field("settings", &self.settings)
            .field("running", &self.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    #[must_use]
    pub fn new(
        brand_source: Arc<dyn BrandSource>,
        providers: Vec<Arc<dyn Provider>>,
        sink: Arc<dyn MentionSink>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            brand_source,
            providers,
            sink,
            metrics: Arc::new(NoopMetrics),
            matcher: SmartMatcher::new(settings.match_cache_capacity),
            settings,
            running: AtomicBool::new(false),
            state: Mutex::new(RunState::default()),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Wire the aggregator from environment configuration.
    ///
    /// Without `MENTIONS_SINK_URL`, or with `force_memory_sink`, mentions go to
    /// an in-memory sink and nothing leaves the process.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(
        config: &AppConfig,
        force_memory_sink: bool,
    ) -> Result<Self, AggregatorError> {
        let client = http_client(config)?;
        let providers = providers_from_config(config, &client);

        let sink: Arc<dyn MentionSink> = match (&config.sink_url, force_memory_sink) {
            (Some(url), false) => Arc::new(HttpSink::new(
                client.clone(),
                url,
                config.sink_api_key.clone(),
            )),
            (None, false) => {
                tracing::warn!("MENTIONS_SINK_URL not set; using in-memory sink");
                Arc::new(MemorySink::new())
            }
            (_, true) => Arc::new(MemorySink::new()),
        };

        Ok(Self::new(
            Arc::new(YamlBrandSource::new(config.brands_path.clone())),
            providers,
            sink,
            AggregatorSettings::from_app_config(config),
        )
        .with_metrics(Arc::new(TracingMetrics)))
    }

    #[must_use]
    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Independent copy of the current status.
    #[must_use]
    pub fn status(&self) -> AggregatorStatus {
        let mut status = self.lock_state().status.clone();
        status.is_running = self.is_running();
        status
    }

    /// Brand names recorded by the last snapshotted cycle, sorted.
    #[must_use]
    pub fn tracked_snapshot(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock_state().tracked_names.iter().cloned().collect();
        names.sort();
        names
    }

    /// Run one cycle to completion on the current task.
    ///
    /// Returns `false` without doing anything if a cycle is already running.
    pub async fn run_now(&self) -> bool {
        let Some(_guard) = self.claim() else {
            tracing::info!("aggregation cycle already running; trigger ignored");
            return false;
        };
        self.run_cycle().await;
        true
    }

    /// Start a cycle on a background task.
    ///
    /// Returns `false` if a cycle is already running.
    pub fn trigger(self: &Arc<Self>) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("aggregation cycle already running; trigger ignored");
            return false;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = RunningGuard(&this.running);
            this.run_cycle().await;
        });
        true
    }

    /// Load brands and collect this cycle's fetch targets without fetching.
    ///
    /// # Errors
    ///
    /// Returns the brand source's error.
    pub async fn preview_targets(&self) -> Result<Vec<FetchTarget>, AggregatorError> {
        let brands: Vec<Arc<TrackedBrand>> = self
            .brand_source
            .tracked_brands()
            .await?
            .into_iter()
            .map(Arc::new)
            .collect();
        Ok(collect_targets(&brands))
    }

    fn claim(&self) -> Option<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(&self.running))
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_cycle(&self) {
        let started_at = chrono::Utc::now().timestamp_millis();
        let started = Instant::now();
        tracing::info!(providers = self.providers.len(), "aggregation cycle started");

        let mut progress = CycleProgress::default();
        let outcome = AssertUnwindSafe(self.cycle(&mut progress))
            .catch_unwind()
            .await;
        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        let elapsed = started.elapsed();
        let stored: usize = progress.summaries.iter().map(|s| s.stored).sum();
        match &error {
            None => tracing::info!(
                duration_ms = duration_ms(elapsed),
                summaries = progress.summaries.len(),
                stored,
                "aggregation cycle finished"
            ),
            Some(e) => tracing::error!(
                duration_ms = duration_ms(elapsed),
                error = %e,
                "aggregation cycle failed"
            ),
        }

        let mut state = self.lock_state();
        let update_snapshot = error.is_none() || self.settings.snapshot_on_failure;
        if let Some(names) = progress.brand_names.filter(|_| update_snapshot) {
            state.tracked_names = names;
        }
        state.status = AggregatorStatus {
            is_running: false,
            last_run_at: Some(started_at),
            last_run_duration_ms: Some(duration_ms(elapsed)),
            last_error: error,
            summaries: progress.summaries,
            last_dispatch: progress.dispatch,
        };
    }

    async fn cycle(&self, progress: &mut CycleProgress) -> Result<(), AggregatorError> {
        let brands: Vec<Arc<TrackedBrand>> = self
            .brand_source
            .tracked_brands()
            .await?
            .into_iter()
            .map(Arc::new)
            .collect();
        self.metrics.tracked_brands(brands.len());

        let current: HashSet<String> = brands.iter().map(|b| b.name.to_lowercase()).collect();
        let previous = self.lock_state().tracked_names.clone();

        if brands.is_empty() {
            tracing::info!(
                purging = previous.len(),
                "no tracked brands; purging previously tracked data"
            );
            self.purge(previous.iter()).await;
            progress.brand_names = Some(current);
            return Ok(());
        }

        self.purge(previous.difference(&current)).await;
        progress.brand_names = Some(current);

        let mut buffers = BrandBuffers::new();
        for brand in &brands {
            match self.sink.register_brand(brand).await {
                Ok(slug) => {
                    tracing::debug!(brand = %brand.name, slug = %slug, "brand registered");
                    buffers.confirm_slug(&brand.name, slug);
                }
                Err(e) => tracing::warn!(
                    brand = %brand.name,
                    error = %e,
                    "brand registration failed; continuing without a confirmed slug"
                ),
            }
        }

        let targets = collect_targets(&brands);
        tracing::debug!(
            brands = brands.len(),
            targets = targets.len(),
            "collected fetch targets"
        );

        let ctx = PipelineContext {
            providers: &self.providers,
            matcher: &self.matcher,
            metrics: self.metrics.as_ref(),
            max_results_per_fetch: self.settings.max_results_per_fetch,
        };
        for target in &targets {
            let summaries = process_target(&ctx, target, &mut buffers).await;
            progress.summaries.extend(summaries);
        }

        let policy = DispatchPolicy {
            batch_size: self.settings.dispatch_batch_size,
            mode: self.settings.delivery_mode,
            max_attempts: self.settings.max_dispatch_attempts,
        };
        let pending = buffers.pending();
        let report = dispatch_fair(&mut buffers, self.sink.as_ref(), policy).await;
        tracing::info!(
            pending,
            batches = report.batches_sent,
            sent = report.mentions_sent,
            lost = report.mentions_lost,
            undelivered = report.mentions_undelivered,
            failures = report.failures,
            mode = %policy.mode,
            "dispatch finished"
        );
        progress.dispatch = Some(report);
        Ok(())
    }

    async fn purge<'a>(&self, names: impl Iterator<Item = &'a String>) {
        for name in names {
            match self.sink.purge_brand_data(name).await {
                Ok(()) => tracing::info!(brand = %name, "purged data for removed brand"),
                Err(e) => tracing::warn!(brand = %name, error = %e, "purge failed; continuing"),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("cycle panicked: {detail}")
}
