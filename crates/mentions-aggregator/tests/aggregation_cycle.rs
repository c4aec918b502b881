//! End-to-end aggregation cycles against in-process fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mentions_aggregator::{
    Aggregator, AggregatorError, AggregatorSettings, BrandSource, MemorySink, Provider,
    RawMention, RawTimestamp, StaticBrandSource,
};
use mentions_core::{Competitor, DeliveryMode, TrackedBrand};
use tokio::sync::Notify;

/// Serves canned items per descriptor name and records every call.
#[derive(Default)]
struct FakeProvider {
    platform: &'static str,
    items: HashMap<String, Vec<RawMention>>,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn new(platform: &'static str) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    fn with_items(mut self, target: &str, titles: &[&str]) -> Self {
        let items = titles
            .iter()
            .enumerate()
            .map(|(n, title)| RawMention {
                id: Some(format!("{target}-{n}")),
                title: Some((*title).to_string()),
                url: Some(format!("https://example.com/{target}/{n}")),
                published: Some(RawTimestamp::EpochMillis(1_700_000_000_000)),
                ..RawMention::default()
            })
            .collect();
        self.items.insert(target.to_lowercase(), items);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn platform(&self) -> &str {
        self.platform
    }

    async fn fetch_mentions(
        &self,
        brand: &TrackedBrand,
    ) -> Result<Vec<RawMention>, AggregatorError> {
        self.calls.lock().unwrap().push(brand.name.clone());
        Ok(self
            .items
            .get(&brand.name.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

/// Blocks inside `fetch_mentions` until released.
struct GateProvider {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Provider for GateProvider {
    fn platform(&self) -> &str {
        "gate"
    }

    async fn fetch_mentions(
        &self,
        _brand: &TrackedBrand,
    ) -> Result<Vec<RawMention>, AggregatorError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
}

struct PanicProvider;

#[async_trait]
impl Provider for PanicProvider {
    fn platform(&self) -> &str {
        "panic"
    }

    async fn fetch_mentions(
        &self,
        _brand: &TrackedBrand,
    ) -> Result<Vec<RawMention>, AggregatorError> {
        panic!("provider exploded");
    }
}

/// Fails while `failing` is set, otherwise serves `brands`.
struct FlakyBrandSource {
    brands: Vec<TrackedBrand>,
    failing: AtomicBool,
}

#[async_trait]
impl BrandSource for FlakyBrandSource {
    async fn tracked_brands(&self) -> Result<Vec<TrackedBrand>, AggregatorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AggregatorError::BrandSource("config store offline".to_string()));
        }
        Ok(self.brands.clone())
    }
}

fn competitor(name: &str, keywords: Option<&[&str]>) -> Competitor {
    Competitor {
        id: name.to_lowercase(),
        name: name.to_string(),
        keywords: keywords.map(|k| k.iter().map(ToString::to_string).collect()),
    }
}

fn brand(name: &str, competitors: Vec<Competitor>) -> TrackedBrand {
    let mut b = TrackedBrand::named(name.to_lowercase(), name);
    b.competitors = competitors;
    b
}

fn acme() -> TrackedBrand {
    brand(
        "Acme",
        vec![competitor("Globex", Some(&["globex", "globexcorp"]))],
    )
}

fn aggregator(
    brands: Arc<dyn BrandSource>,
    providers: Vec<Arc<dyn Provider>>,
    sink: Arc<MemorySink>,
    settings: AggregatorSettings,
) -> Aggregator {
    Aggregator::new(brands, providers, sink, settings)
}

async fn wait_until_idle(agg: &Aggregator) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while agg.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("cycle should finish");
}

#[tokio::test]
async fn competitor_mention_reaches_tracking_brand_buffer() {
    let provider = Arc::new(
        FakeProvider::new("news")
            .with_items("Globex", &["Globex launches new product", "Weather report"]),
    );
    let sink = Arc::new(MemorySink::new());
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(vec![acme()])),
        vec![provider.clone()],
        sink.clone(),
        AggregatorSettings::default(),
    );

    assert!(agg.run_now().await);

    assert_eq!(provider.calls(), vec!["Acme".to_string(), "Globex".to_string()]);

    let record = sink.snapshot();
    assert_eq!(record.registered, vec!["Acme".to_string()]);
    assert!(record.mentions_for("Globex").is_empty());
    let acme_mentions = record.mentions_for("Acme");
    assert_eq!(acme_mentions.len(), 1);
    let mention = acme_mentions[0];
    assert_eq!(mention.text, "Globex launches new product");
    assert_eq!(mention.brand, "Acme");
    assert!(mention.is_competitor());
    let tag = mention.metadata.competitor.as_ref().unwrap();
    assert_eq!(tag.competitor_name, "Globex");

    let status = agg.status();
    assert!(!status.is_running);
    assert!(status.last_error.is_none());
    assert!(status.last_run_at.is_some());
    assert_eq!(status.summaries.len(), 2);
    assert!(status.summaries.iter().all(|s| s.brand == "Acme"));
    let globex_summary = &status.summaries[1];
    assert_eq!(globex_summary.fetched, 2);
    assert_eq!(globex_summary.stored, 1);
    assert_eq!(status.last_dispatch.as_ref().unwrap().mentions_sent, 1);
}

#[tokio::test]
async fn shared_target_fetched_once_per_provider() {
    let brands = vec![
        acme(),
        brand("Initech", vec![competitor("Globex", None)]),
        brand("Umbrella", vec![competitor("GLOBEX ", None), competitor("Acme", None)]),
    ];
    let news = Arc::new(FakeProvider::new("news").with_items("Globex", &["Globex hires"]));
    let forum = Arc::new(FakeProvider::new("forum"));
    let sink = Arc::new(MemorySink::new());
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(brands)),
        vec![news.clone(), forum.clone()],
        sink.clone(),
        AggregatorSettings::default(),
    );

    assert!(agg.run_now().await);

    for provider in [&news, &forum] {
        let calls = provider.calls();
        assert_eq!(calls.len(), 4, "one call per target: {calls:?}");
        assert_eq!(calls.iter().filter(|c| c.eq_ignore_ascii_case("globex")).count(), 1);
    }

    let record = sink.snapshot();
    for name in ["Acme", "Initech", "Umbrella"] {
        assert_eq!(record.mentions_for(name).len(), 1, "{name} should get the Globex mention");
    }
}

#[tokio::test]
async fn trigger_while_running_is_rejected() {
    let gate = Arc::new(GateProvider {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let agg = Arc::new(aggregator(
        Arc::new(StaticBrandSource::new(vec![TrackedBrand::named("acme", "Acme")])),
        vec![gate.clone()],
        Arc::new(MemorySink::new()),
        AggregatorSettings::default(),
    ));

    assert!(agg.trigger());
    gate.entered.notified().await;

    assert!(agg.status().is_running);
    assert!(!agg.run_now().await);
    assert!(!agg.trigger());

    gate.release.notify_one();
    wait_until_idle(&agg).await;

    assert!(!agg.status().is_running);
    assert!(agg.status().last_run_at.is_some());
    // The flag is free again, so a new cycle can start.
    let next = agg.trigger();
    assert!(next);
    gate.entered.notified().await;
    gate.release.notify_one();
    wait_until_idle(&agg).await;
}

#[tokio::test]
async fn status_is_an_independent_copy() {
    let provider = Arc::new(FakeProvider::new("news").with_items("Acme", &["Acme earnings beat"]));
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(vec![TrackedBrand::named("acme", "Acme")])),
        vec![provider],
        Arc::new(MemorySink::new()),
        AggregatorSettings::default(),
    );
    assert!(agg.run_now().await);

    let mut copy = agg.status();
    copy.summaries.clear();
    copy.last_error = Some("tampered".to_string());
    copy.is_running = true;

    let fresh = agg.status();
    assert_eq!(fresh.summaries.len(), 1);
    assert!(fresh.last_error.is_none());
    assert!(!fresh.is_running);
}

#[tokio::test]
async fn removed_brand_is_purged_on_next_cycle() {
    let source = Arc::new(StaticBrandSource::new(vec![
        TrackedBrand::named("acme", "Acme"),
        TrackedBrand::named("initech", "Initech"),
    ]));
    let sink = Arc::new(MemorySink::new());
    let agg = aggregator(
        source.clone(),
        vec![Arc::new(FakeProvider::new("news"))],
        sink.clone(),
        AggregatorSettings::default(),
    );

    assert!(agg.run_now().await);
    assert!(sink.snapshot().purged.is_empty());
    assert_eq!(agg.tracked_snapshot(), vec!["acme".to_string(), "initech".to_string()]);

    source.replace(vec![TrackedBrand::named("acme", "Acme")]);
    assert!(agg.run_now().await);

    assert_eq!(sink.snapshot().purged, vec!["initech".to_string()]);
    assert_eq!(agg.tracked_snapshot(), vec!["acme".to_string()]);
}

#[tokio::test]
async fn empty_brand_set_purges_everything_and_exits() {
    let source = Arc::new(StaticBrandSource::new(vec![TrackedBrand::named("acme", "Acme")]));
    let provider = Arc::new(FakeProvider::new("news"));
    let sink = Arc::new(MemorySink::new());
    let agg = aggregator(
        source.clone(),
        vec![provider.clone()],
        sink.clone(),
        AggregatorSettings::default(),
    );
    assert!(agg.run_now().await);
    let calls_before = provider.calls().len();

    source.replace(Vec::new());
    assert!(agg.run_now().await);

    assert_eq!(sink.snapshot().purged, vec!["acme".to_string()]);
    assert_eq!(provider.calls().len(), calls_before);
    let status = agg.status();
    assert!(status.last_error.is_none());
    assert!(status.summaries.is_empty());
    assert!(status.last_dispatch.is_none());
    assert!(agg.tracked_snapshot().is_empty());
}

#[tokio::test]
async fn brand_source_failure_is_recorded_and_keeps_snapshot() {
    let source = Arc::new(FlakyBrandSource {
        brands: vec![TrackedBrand::named("acme", "Acme")],
        failing: AtomicBool::new(false),
    });
    let agg = aggregator(
        source.clone(),
        vec![Arc::new(FakeProvider::new("news"))],
        Arc::new(MemorySink::new()),
        AggregatorSettings::default(),
    );
    assert!(agg.run_now().await);

    source.failing.store(true, Ordering::SeqCst);
    assert!(agg.run_now().await);

    let status = agg.status();
    assert!(status
        .last_error
        .as_deref()
        .unwrap()
        .contains("config store offline"));
    assert!(!status.is_running);
    assert_eq!(agg.tracked_snapshot(), vec!["acme".to_string()]);
}

#[tokio::test]
async fn panicking_provider_is_caught_and_flag_released() {
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(vec![TrackedBrand::named("acme", "Acme")])),
        vec![Arc::new(PanicProvider)],
        Arc::new(MemorySink::new()),
        AggregatorSettings::default(),
    );

    assert!(agg.run_now().await);
    let status = agg.status();
    assert!(status.last_error.as_deref().unwrap().contains("provider exploded"));
    assert!(!status.is_running);
    // Errored cycle leaves the snapshot alone by default.
    assert!(agg.tracked_snapshot().is_empty());

    assert!(agg.run_now().await);
}

#[tokio::test]
async fn snapshot_on_failure_updates_snapshot_after_errored_cycle() {
    let settings = AggregatorSettings {
        snapshot_on_failure: true,
        ..AggregatorSettings::default()
    };
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(vec![TrackedBrand::named("acme", "Acme")])),
        vec![Arc::new(PanicProvider)],
        Arc::new(MemorySink::new()),
        settings,
    );

    assert!(agg.run_now().await);
    assert!(agg.status().last_error.is_some());
    assert_eq!(agg.tracked_snapshot(), vec!["acme".to_string()]);
}

#[tokio::test]
async fn dispatch_failures_are_reported_not_fatal() {
    let provider = Arc::new(
        FakeProvider::new("news")
            .with_items("Acme", &["Acme one", "Acme two"])
            .with_items("Initech", &["Initech one"]),
    );
    let sink = Arc::new(MemorySink::new());
    sink.fail_enqueue_for("Acme");
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(vec![
            TrackedBrand::named("acme", "Acme"),
            TrackedBrand::named("initech", "Initech"),
        ])),
        vec![provider],
        sink.clone(),
        AggregatorSettings::default(),
    );

    assert!(agg.run_now().await);

    let status = agg.status();
    assert!(status.last_error.is_none());
    let report = status.last_dispatch.unwrap();
    assert_eq!(report.mentions_sent, 1);
    assert_eq!(report.mentions_undelivered, 2);
    assert_eq!(report.failures, 3);
    assert_eq!(sink.snapshot().failed_enqueues, 3);
    assert_eq!(sink.snapshot().mentions_for("Initech").len(), 1);
}

#[tokio::test]
async fn at_most_once_counts_lost_batches() {
    let provider = Arc::new(FakeProvider::new("news").with_items("Acme", &["Acme one"]));
    let sink = Arc::new(MemorySink::new());
    sink.fail_enqueue_for("Acme");
    let settings = AggregatorSettings {
        delivery_mode: DeliveryMode::AtMostOnce,
        ..AggregatorSettings::default()
    };
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(vec![TrackedBrand::named("acme", "Acme")])),
        vec![provider],
        sink.clone(),
        settings,
    );

    assert!(agg.run_now().await);

    let report = agg.status().last_dispatch.unwrap();
    assert_eq!(report.mentions_lost, 1);
    assert_eq!(report.failures, 1);
    assert_eq!(sink.snapshot().failed_enqueues, 1);
}

#[tokio::test]
async fn registration_failure_does_not_block_dispatch() {
    let provider = Arc::new(FakeProvider::new("news").with_items("Acme", &["Acme news"]));
    let sink = Arc::new(MemorySink::new());
    sink.fail_registrations(true);
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(vec![TrackedBrand::named("acme", "Acme")])),
        vec![provider],
        sink.clone(),
        AggregatorSettings::default(),
    );

    assert!(agg.run_now().await);

    let record = sink.snapshot();
    assert!(record.registered.is_empty());
    assert_eq!(record.mentions_for("Acme").len(), 1);
    assert_eq!(record.batch_slugs, vec!["acme".to_string()]);
    assert!(agg.status().last_error.is_none());
}

#[tokio::test]
async fn dispatch_uses_slug_confirmed_at_registration() {
    let provider = Arc::new(
        FakeProvider::new("news")
            .with_items("Acme Rockets", &["Acme Rockets lifts off"])
            .with_items("Initech", &["Initech reorg"]),
    );
    let sink = Arc::new(MemorySink::new());
    sink.assign_slug("Acme Rockets", "acme-rockets-2");
    let agg = aggregator(
        Arc::new(StaticBrandSource::new(vec![
            TrackedBrand::named("acme-rockets", "Acme Rockets"),
            TrackedBrand::named("initech", "Initech"),
        ])),
        vec![provider],
        sink.clone(),
        AggregatorSettings::default(),
    );

    assert!(agg.run_now().await);

    let record = sink.snapshot();
    assert_eq!(
        record.batch_slugs,
        vec!["acme-rockets-2".to_string(), "initech".to_string()]
    );
}

#[tokio::test]
async fn exclusion_added_between_cycles_takes_effect() {
    let provider = Arc::new(
        FakeProvider::new("news").with_items("Acme", &["Acme recall lawsuit filed"]),
    );
    let source = Arc::new(StaticBrandSource::new(vec![TrackedBrand::named("acme", "Acme")]));
    let sink = Arc::new(MemorySink::new());
    let agg = aggregator(
        source.clone(),
        vec![provider],
        sink.clone(),
        AggregatorSettings::default(),
    );

    assert!(agg.run_now().await);
    assert_eq!(sink.snapshot().mentions_for("Acme").len(), 1);

    let mut edited = TrackedBrand::named("acme", "Acme");
    edited.exclude_keywords = vec!["lawsuit".to_string()];
    source.replace(vec![edited]);
    assert!(agg.run_now().await);

    assert_eq!(sink.snapshot().mentions_for("Acme").len(), 1);
    let status = agg.status();
    assert_eq!(status.summaries.len(), 1);
    assert_eq!(status.summaries[0].fetched, 1);
    assert_eq!(status.summaries[0].stored, 0);
}
