//! Concrete content providers.

mod google_news;
mod reddit;

use std::sync::Arc;
use std::time::Duration;

use mentions_core::{AppConfig, TrackedBrand};

pub use google_news::{parse_rss_items, GoogleNewsProvider, GOOGLE_NEWS_PLATFORM};
pub use reddit::{RedditCredentials, RedditProvider, REDDIT_PLATFORM};

use crate::error::AggregatorError;
use crate::traits::Provider;

/// Build the HTTP client shared by providers and the HTTP sink.
///
/// # Errors
///
/// Returns [`AggregatorError::Http`] if the TLS backend cannot be initialised.
pub fn http_client(config: &AppConfig) -> Result<reqwest::Client, AggregatorError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?)
}

/// Providers enabled by configuration, in fetch order.
#[must_use]
pub fn providers_from_config(
    config: &AppConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn Provider>> {
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    if config.google_news_enabled {
        providers.push(Arc::new(GoogleNewsProvider::new(client.clone())));
    }

    match config.reddit_credentials() {
        Some((client_id, client_secret, user_agent)) => {
            providers.push(Arc::new(RedditProvider::new(
                client.clone(),
                RedditCredentials {
                    client_id: client_id.to_string(),
                    client_secret: client_secret.to_string(),
                    user_agent: user_agent.to_string(),
                },
            )));
        }
        None => tracing::info!("Reddit credentials not set; Reddit provider disabled"),
    }

    if providers.is_empty() {
        tracing::warn!("no providers enabled; cycles will fetch nothing");
    }
    providers
}

/// Quoted search terms for a descriptor: its name, then its keywords,
/// case-insensitively deduplicated and joined with `OR`.
pub(crate) fn or_query(brand: &TrackedBrand) -> String {
    let mut seen = std::collections::HashSet::new();
    std::iter::once(&brand.name)
        .chain(&brand.keywords)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Strip HTML tags and collapse whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
