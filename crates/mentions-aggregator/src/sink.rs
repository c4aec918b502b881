//! Downstream sinks: an HTTP queue client and an in-memory recorder.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use mentions_core::{slugify, NormalizedMention, TrackedBrand};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::AggregatorError;
use crate::traits::MentionSink;

#[derive(Debug, Serialize)]
struct RegisterBrandRequest<'a> {
    id: &'a str,
    name: &'a str,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct RegisterBrandResponse {
    slug: String,
}

#[derive(Debug, Serialize)]
struct EnqueueRequest<'a> {
    brand: &'a str,
    mentions: &'a [NormalizedMention],
}

#[derive(Debug, Deserialize)]
struct EnqueueResponse {
    committed: usize,
}

/// JSON-over-HTTP client for the downstream brand registry and mention queue.
///
/// - `POST {base}/brands` registers a brand and returns its slug
/// - `DELETE {base}/brands/{slug}/data` purges a removed brand
/// - `POST {base}/brands/{slug}/mentions` enqueues one batch
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSink {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn check(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, AggregatorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AggregatorError::Sink(format!(
            "{what} failed with status {status}: {}",
            body.chars().take(200).collect::<String>()
        )))
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}

#[async_trait]
impl MentionSink for HttpSink {
    async fn register_brand(&self, brand: &TrackedBrand) -> Result<String, AggregatorError> {
        let request = self
            .client
            .post(format!("{}/brands", self.base_url))
            .json(&RegisterBrandRequest {
                id: &brand.id,
                name: &brand.name,
                slug: brand.slug(),
            });
        let response = self.authorize(request).send().await?;
        let response = Self::check(response, "register brand").await?;
        let body: RegisterBrandResponse = response.json().await?;
        Ok(body.slug)
    }

    async fn purge_brand_data(&self, brand_name_lowercase: &str) -> Result<(), AggregatorError> {
        let request = self.client.delete(format!(
            "{}/brands/{}/data",
            self.base_url,
            encode_segment(&slugify(brand_name_lowercase))
        ));
        let response = self.authorize(request).send().await?;
        Self::check(response, "purge brand data").await?;
        Ok(())
    }

    async fn enqueue_mention_chunks(
        &self,
        brand: &TrackedBrand,
        slug: &str,
        mentions: &[NormalizedMention],
    ) -> Result<usize, AggregatorError> {
        let request = self
            .client
            .post(format!(
                "{}/brands/{}/mentions",
                self.base_url,
                encode_segment(slug)
            ))
            .json(&EnqueueRequest {
                brand: &brand.name,
                mentions,
            });
        let response = self.authorize(request).send().await?;
        let response = Self::check(response, "enqueue mentions").await?;
        let body: EnqueueResponse = response.json().await?;
        Ok(body.committed)
    }
}

/// Everything a [`MemorySink`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct SinkRecord {
    pub registered: Vec<String>,
    pub purged: Vec<String>,
    /// `(brand name, batch)` per successful enqueue, in call order.
    pub batches: Vec<(String, Vec<NormalizedMention>)>,
    /// Slug each successful batch was addressed to, parallel to `batches`.
    pub batch_slugs: Vec<String>,
    pub failed_enqueues: usize,
}

impl SinkRecord {
    /// All mentions enqueued for `brand_name`, in order.
    #[must_use]
    pub fn mentions_for(&self, brand_name: &str) -> Vec<&NormalizedMention> {
        self.batches
            .iter()
            .filter(|(brand, _)| brand == brand_name)
            .flat_map(|(_, batch)| batch)
            .collect()
    }
}

/// In-process sink used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    record: Mutex<SinkRecord>,
    fail_enqueue_for: Mutex<Vec<String>>,
    fail_register: Mutex<bool>,
    assigned_slugs: Mutex<Vec<(String, String)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every enqueue for `brand_name` fail until cleared.
    pub fn fail_enqueue_for(&self, brand_name: &str) {
        self.fail_enqueue_for
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(brand_name.to_string());
    }

    /// Answer registrations of `brand_name` with `slug` instead of the derived one.
    pub fn assign_slug(&self, brand_name: &str, slug: &str) {
        self.assigned_slugs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((brand_name.to_string(), slug.to_string()));
    }

    pub fn fail_registrations(&self, fail: bool) {
        *self.fail_register.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    #[must_use]
    pub fn snapshot(&self) -> SinkRecord {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_record<T>(&self, f: impl FnOnce(&mut SinkRecord) -> T) -> T {
        f(&mut self.record.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl MentionSink for MemorySink {
    async fn register_brand(&self, brand: &TrackedBrand) -> Result<String, AggregatorError> {
        if *self.fail_register.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(AggregatorError::Sink(format!(
                "registration rejected for {}",
                brand.name
            )));
        }
        self.with_record(|r| r.registered.push(brand.name.clone()));
        let assigned = self
            .assigned_slugs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(name, _)| *name == brand.name)
            .map(|(_, slug)| slug.clone());
        Ok(assigned.unwrap_or_else(|| brand.slug()))
    }

    async fn purge_brand_data(&self, brand_name_lowercase: &str) -> Result<(), AggregatorError> {
        self.with_record(|r| r.purged.push(brand_name_lowercase.to_string()));
        Ok(())
    }

    async fn enqueue_mention_chunks(
        &self,
        brand: &TrackedBrand,
        slug: &str,
        mentions: &[NormalizedMention],
    ) -> Result<usize, AggregatorError> {
        let failing = self
            .fail_enqueue_for
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&brand.name);
        if failing {
            self.with_record(|r| r.failed_enqueues += 1);
            return Err(AggregatorError::Sink(format!(
                "queue rejected batch for {}",
                brand.name
            )));
        }
        self.with_record(|r| {
            r.batches.push((brand.name.clone(), mentions.to_vec()));
            r.batch_slugs.push(slug.to_string());
        });
        Ok(mentions.len())
    }
}
