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
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "WEATHERMAP_ENV"));
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.locations_path.is_none());
    assert!(cfg.openweather_api_key.is_none());
    assert_eq!(
        cfg.upstream_base_url,
        "https://api.openweathermap.org/data/2.5/"
    );
    assert_eq!(cfg.upstream_lang, "zh_cn");
    assert_eq!(cfg.proxy_base_url, "http://127.0.0.1:8080/");
    assert_eq!(cfg.request_timeout_secs, 10);
    assert_eq!(cfg.user_agent, "weathermap/0.1 (china-weather-map)");
    assert_eq!(cfg.refresh_interval_secs, 600);
    assert_eq!(cfg.utc_offset_hours, 8);
    assert_eq!(cfg.rate_limit_per_minute, 120);
    assert!(cfg.static_dir.is_none());
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "WEATHERMAP_BIND_ADDR"),
        "expected InvalidEnvVar(WEATHERMAP_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_production_requires_api_key() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_ENV", "production");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "OPENWEATHER_API_KEY"),
        "expected MissingEnvVar(OPENWEATHER_API_KEY), got: {result:?}"
    );
}

#[test]
fn build_app_config_production_with_api_key() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_ENV", "production");
    map.insert("OPENWEATHER_API_KEY", "secret-key");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.openweather_api_key.as_deref(), Some("secret-key"));
}

#[test]
fn blank_api_key_is_treated_as_unset() {
    let mut map = HashMap::new();
    map.insert("OPENWEATHER_API_KEY", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.openweather_api_key.is_none());
}

#[test]
fn debug_output_redacts_api_key() {
    let mut map = HashMap::new();
    map.insert("OPENWEATHER_API_KEY", "super-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("[redacted]"));
}

#[test]
fn request_timeout_override() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_REQUEST_TIMEOUT_SECS", "30");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.request_timeout_secs, 30);
}

#[test]
fn request_timeout_invalid() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_REQUEST_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "WEATHERMAP_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(WEATHERMAP_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn refresh_interval_zero_is_rejected() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_REFRESH_INTERVAL_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "WEATHERMAP_REFRESH_INTERVAL_SECS"),
        "expected InvalidEnvVar(WEATHERMAP_REFRESH_INTERVAL_SECS), got: {result:?}"
    );
}

#[test]
fn utc_offset_override_and_local_offset() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_UTC_OFFSET_HOURS", "-5");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.utc_offset_hours, -5);
    assert_eq!(cfg.local_offset().local_minus_utc(), -5 * 3600);
}

#[test]
fn utc_offset_out_of_range() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_UTC_OFFSET_HOURS", "15");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "WEATHERMAP_UTC_OFFSET_HOURS"),
        "expected InvalidEnvVar(WEATHERMAP_UTC_OFFSET_HOURS), got: {result:?}"
    );
}

#[test]
fn optional_paths_are_read() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_LOCATIONS_PATH", "/etc/weathermap/locations.yaml");
    map.insert("WEATHERMAP_STATIC_DIR", "./static");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.locations_path.as_deref(),
        Some(std::path::Path::new("/etc/weathermap/locations.yaml"))
    );
    assert_eq!(
        cfg.static_dir.as_deref(),
        Some(std::path::Path::new("./static"))
    );
}

#[test]
fn rate_limit_invalid() {
    let mut map = HashMap::new();
    map.insert("WEATHERMAP_RATE_LIMIT_PER_MINUTE", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "WEATHERMAP_RATE_LIMIT_PER_MINUTE"),
        "expected InvalidEnvVar(WEATHERMAP_RATE_LIMIT_PER_MINUTE), got: {result:?}"
    );
}
