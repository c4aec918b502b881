use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("unknown").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "MENTIONS_ENV"));
}

#[test]
fn build_app_config_defaults_from_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should be valid");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3100");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.brands_path.to_str(), Some("./config/brands.yaml"));
    assert!(cfg.sink_url.is_none());
    assert_eq!(cfg.max_results_per_fetch, 100);
    assert_eq!(cfg.dispatch_batch_size, 30);
    assert_eq!(cfg.delivery_mode, DeliveryMode::AtLeastOnce);
    assert_eq!(cfg.max_dispatch_attempts, 3);
    assert!(!cfg.snapshot_on_failure);
    assert_eq!(cfg.match_cache_capacity, 10_000);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.cycle_cron, "0 */15 * * * *");
    assert!(cfg.google_news_enabled);
    assert!(cfg.reddit_credentials().is_none());
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let map = HashMap::from([("MENTIONS_BIND_ADDR", "not-a-socket-addr")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MENTIONS_BIND_ADDR"),
        "expected InvalidEnvVar(MENTIONS_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_batch_size() {
    let map = HashMap::from([("MENTIONS_DISPATCH_BATCH_SIZE", "0")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MENTIONS_DISPATCH_BATCH_SIZE"),
        "expected InvalidEnvVar(MENTIONS_DISPATCH_BATCH_SIZE), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_dispatch_attempts() {
    let map = HashMap::from([("MENTIONS_MAX_DISPATCH_ATTEMPTS", "0")]);
    assert!(build_app_config(lookup_from_map(&map)).is_err());
}

#[test]
fn build_app_config_parses_delivery_mode() {
    let map = HashMap::from([("MENTIONS_DELIVERY_MODE", "At-Most-Once")]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.delivery_mode, DeliveryMode::AtMostOnce);

    let map = HashMap::from([("MENTIONS_DELIVERY_MODE", "exactly-once")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MENTIONS_DELIVERY_MODE"),
        "expected InvalidEnvVar(MENTIONS_DELIVERY_MODE), got: {result:?}"
    );
}

#[test]
fn build_app_config_parses_boolean_flags() {
    let map = HashMap::from([
        ("MENTIONS_SNAPSHOT_ON_FAILURE", "yes"),
        ("MENTIONS_GOOGLE_NEWS_ENABLED", "0"),
    ]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.snapshot_on_failure);
    assert!(!cfg.google_news_enabled);

    let map = HashMap::from([("MENTIONS_SNAPSHOT_ON_FAILURE", "maybe")]);
    assert!(build_app_config(lookup_from_map(&map)).is_err());
}

#[test]
fn build_app_config_max_results_invalid() {
    let map = HashMap::from([("MENTIONS_MAX_RESULTS_PER_FETCH", "lots")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MENTIONS_MAX_RESULTS_PER_FETCH"),
        "expected InvalidEnvVar(MENTIONS_MAX_RESULTS_PER_FETCH), got: {result:?}"
    );
}

#[test]
fn reddit_credentials_require_all_three_values() {
    let map = HashMap::from([
        ("REDDIT_CLIENT_ID", "id"),
        ("REDDIT_CLIENT_SECRET", "secret"),
    ]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.reddit_credentials().is_none());

    let map = HashMap::from([
        ("REDDIT_CLIENT_ID", "id"),
        ("REDDIT_CLIENT_SECRET", "secret"),
        ("REDDIT_USER_AGENT", "agent/1.0"),
    ]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.reddit_credentials(), Some(("id", "secret", "agent/1.0")));
}

#[test]
fn debug_redacts_secrets() {
    let map = HashMap::from([
        ("MENTIONS_SINK_API_KEY", "super-secret-token"),
        ("REDDIT_CLIENT_SECRET", "reddit-secret"),
    ]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("super-secret-token"));
    assert!(!debug.contains("reddit-secret"));
    assert!(debug.contains("[redacted]"));
}
