use crate::app_config::{AppConfig, DeliveryMode, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if env values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if env values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        parse_flag(&or_default(var, default)).ok_or_else(|| invalid(var, "expected true or false"))
    };

    let env = parse_environment(&or_default("MENTIONS_ENV", "development"))?;

    let bind_addr = or_default("MENTIONS_BIND_ADDR", "0.0.0.0:3100")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("MENTIONS_BIND_ADDR", e))?;
    let log_level = or_default("MENTIONS_LOG_LEVEL", "info");
    let brands_path = PathBuf::from(or_default("MENTIONS_BRANDS_PATH", "./config/brands.yaml"));

    let sink_url = optional("MENTIONS_SINK_URL");
    let sink_api_key = optional("MENTIONS_SINK_API_KEY");

    let max_results_per_fetch = parse_usize("MENTIONS_MAX_RESULTS_PER_FETCH", "100")?;
    let dispatch_batch_size = parse_usize("MENTIONS_DISPATCH_BATCH_SIZE", "30")?;
    if dispatch_batch_size == 0 {
        return Err(invalid("MENTIONS_DISPATCH_BATCH_SIZE", "must be at least 1"));
    }
    let delivery_mode =
        parse_delivery_mode(&or_default("MENTIONS_DELIVERY_MODE", "at-least-once"))?;
    let max_dispatch_attempts = parse_u32("MENTIONS_MAX_DISPATCH_ATTEMPTS", "3")?;
    if max_dispatch_attempts == 0 {
        return Err(invalid("MENTIONS_MAX_DISPATCH_ATTEMPTS", "must be at least 1"));
    }
    let snapshot_on_failure = parse_bool("MENTIONS_SNAPSHOT_ON_FAILURE", "false")?;
    let match_cache_capacity = parse_usize("MENTIONS_MATCH_CACHE_CAPACITY", "10000")?;

    let request_timeout_secs = parse_u64("MENTIONS_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("MENTIONS_USER_AGENT", "mentions-aggregator/0.1");
    let cycle_cron = or_default("MENTIONS_CYCLE_CRON", "0 */15 * * * *");
    let google_news_enabled = parse_bool("MENTIONS_GOOGLE_NEWS_ENABLED", "true")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        brands_path,
        sink_url,
        sink_api_key,
        max_results_per_fetch,
        dispatch_batch_size,
        delivery_mode,
        max_dispatch_attempts,
        snapshot_on_failure,
        match_cache_capacity,
        request_timeout_secs,
        user_agent,
        cycle_cron,
        google_news_enabled,
        reddit_client_id: optional("REDDIT_CLIENT_ID"),
        reddit_client_secret: optional("REDDIT_CLIENT_SECRET"),
        reddit_user_agent: optional("REDDIT_USER_AGENT"),
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "MENTIONS_ENV",
            format!("unknown environment '{other}'"),
        )),
    }
}

fn parse_delivery_mode(s: &str) -> Result<DeliveryMode, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "at-most-once" => Ok(DeliveryMode::AtMostOnce),
        "at-least-once" => Ok(DeliveryMode::AtLeastOnce),
        other => Err(invalid(
            "MENTIONS_DELIVERY_MODE",
            format!("unknown delivery mode '{other}'"),
        )),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
