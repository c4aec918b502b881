use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the fair dispatcher treats a batch the sink failed to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Remove the batch before sending; a failed send loses it.
    AtMostOnce,
    /// Remove the batch only once the sink confirms it; retry on later passes.
    AtLeastOnce,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::AtMostOnce => write!(f, "at-most-once"),
            DeliveryMode::AtLeastOnce => write!(f, "at-least-once"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub brands_path: PathBuf,
    pub sink_url: Option<String>,
    pub sink_api_key: Option<String>,
    pub max_results_per_fetch: usize,
    pub dispatch_batch_size: usize,
    pub delivery_mode: DeliveryMode,
    pub max_dispatch_attempts: u32,
    pub snapshot_on_failure: bool,
    pub match_cache_capacity: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub cycle_cron: String,
    pub google_news_enabled: bool,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("brands_path", &self.brands_path)
            .field("sink_url", &self.sink_url)
            .field(
                "sink_api_key",
                &self.sink_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("max_results_per_fetch", &self.max_results_per_fetch)
            .field("dispatch_batch_size", &self.dispatch_batch_size)
            .field("delivery_mode", &self.delivery_mode)
            .field("max_dispatch_attempts", &self.max_dispatch_attempts)
            .field("snapshot_on_failure", &self.snapshot_on_failure)
            .field("match_cache_capacity", &self.match_cache_capacity)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("cycle_cron", &self.cycle_cron)
            .field("google_news_enabled", &self.google_news_enabled)
            .field("reddit_client_id", &self.reddit_client_id)
            .field(
                "reddit_client_secret",
                &self.reddit_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("reddit_user_agent", &self.reddit_user_agent)
            .finish()
    }
}

impl AppConfig {
    /// Reddit credentials, present only when all three values are configured.
    #[must_use]
    pub fn reddit_credentials(&self) -> Option<(&str, &str, &str)> {
        match (
            &self.reddit_client_id,
            &self.reddit_client_secret,
            &self.reddit_user_agent,
        ) {
            (Some(id), Some(secret), Some(agent)) => {
                Some((id.as_str(), secret.as_str(), agent.as_str()))
            }
            _ => None,
        }
    }
}
