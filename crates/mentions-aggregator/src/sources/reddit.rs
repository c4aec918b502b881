//! Reddit search provider (client-credentials OAuth).

use async_trait::async_trait;
use mentions_core::TrackedBrand;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::AggregatorError;
use crate::traits::Provider;
use crate::types::{RawMention, RawTimestamp};

use super::or_query;

pub const REDDIT_PLATFORM: &str = "reddit";

const DEFAULT_AUTH_BASE_URL: &str = "https://www.reddit.com";
const DEFAULT_API_BASE_URL: &str = "https://oauth.reddit.com";
const WEB_BASE_URL: &str = "https://reddit.com";
const PAGE_LIMIT: usize = 50;
const PAGE_COUNT: usize = 2;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostData {
    name: Option<String>,
    title: Option<String>,
    selftext: Option<String>,
    author: Option<String>,
    permalink: Option<String>,
    url: Option<String>,
    created_utc: Option<f64>,
}

/// OAuth credentials for the Reddit API.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Searches Reddit posts sorted by `new`.
///
/// The access token is exchanged lazily and reused until the API rejects it.
#[derive(Debug)]
pub struct RedditProvider {
    client: reqwest::Client,
    credentials: RedditCredentials,
    auth_base_url: String,
    api_base_url: String,
    token: Mutex<Option<String>>,
}

impl RedditProvider {
    #[must_use]
    pub fn new(client: reqwest::Client, credentials: RedditCredentials) -> Self {
        Self::with_base_urls(
            client,
            credentials,
            DEFAULT_AUTH_BASE_URL,
            DEFAULT_API_BASE_URL,
        )
    }

    /// Override the token and search hosts; used by tests.
    #[must_use]
    pub fn with_base_urls(
        client: reqwest::Client,
        credentials: RedditCredentials,
        auth_base_url: &str,
        api_base_url: &str,
    ) -> Self {
        Self {
            client,
            credentials,
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, AggregatorError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let response = self
            .client
            .post(format!("{}/api/v1/access_token", self.auth_base_url))
            .header("User-Agent", &self.credentials.user_agent)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AggregatorError::provider(
                REDDIT_PLATFORM,
                format!("token exchange failed with status {}", response.status()),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AggregatorError::provider(REDDIT_PLATFORM, format!("token parse error: {e}"))
        })?;
        *slot = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    async fn search_page(
        &self,
        token: &str,
        query: &str,
        after: Option<&str>,
    ) -> Result<ListingData, AggregatorError> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("sort", "new".to_string()),
            ("limit", PAGE_LIMIT.to_string()),
            ("type", "link".to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(cursor) = after {
            params.push(("after", cursor.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/search", self.api_base_url))
            .bearer_auth(token)
            .header("User-Agent", &self.credentials.user_agent)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            *self.token.lock().await = None;
        }
        if !status.is_success() {
            return Err(AggregatorError::provider(
                REDDIT_PLATFORM,
                format!("search failed with status {status}"),
            ));
        }

        let listing: Listing = response.json().await.map_err(|e| {
            AggregatorError::provider(REDDIT_PLATFORM, format!("search parse error: {e}"))
        })?;
        Ok(listing.data)
    }
}

#[async_trait]
impl Provider for RedditProvider {
    fn platform(&self) -> &str {
        REDDIT_PLATFORM
    }

    async fn fetch_mentions(
        &self,
        brand: &TrackedBrand,
    ) -> Result<Vec<RawMention>, AggregatorError> {
        let query = or_query(brand);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let token = self.access_token().await?;

        let mut mentions = Vec::new();
        let mut after: Option<String> = None;
        for _ in 0..PAGE_COUNT {
            let page = self.search_page(&token, &query, after.as_deref()).await?;
            mentions.extend(page.children.into_iter().filter_map(|c| to_raw(c.data)));
            after = page.after;
            if after.is_none() {
                break;
            }
        }

        tracing::debug!(query = %query, posts = mentions.len(), "fetched Reddit posts");
        Ok(mentions)
    }
}

fn to_raw(payload: serde_json::Value) -> Option<RawMention> {
    let post: PostData = match serde_json::from_value(payload.clone()) {
        Ok(post) => post,
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparseable Reddit post");
            return None;
        }
    };

    let body = post
        .selftext
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "[deleted]" && s != "[removed]");
    let url = post
        .permalink
        .map(|p| format!("{WEB_BASE_URL}{p}"))
        .or(post.url);
    #[allow(clippy::cast_possible_truncation)]
    let published = post
        .created_utc
        .map(|secs| RawTimestamp::EpochSeconds(secs as i64));

    Some(RawMention {
        id: post.name,
        title: post.title,
        body,
        author: post.author.filter(|a| a != "[deleted]"),
        url,
        published,
        synthetic: false,
        payload,
    })
}
