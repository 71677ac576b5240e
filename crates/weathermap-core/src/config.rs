use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables already in the process.
///
/// Does not read `.env` files; binaries call `dotenvy::dotenv()` first.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
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
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("WEATHERMAP_ENV", "development"))?;

    let bind_addr = parse_addr("WEATHERMAP_BIND_ADDR", "0.0.0.0:8080")?;
    let log_level = or_default("WEATHERMAP_LOG_LEVEL", "info");
    let locations_path = optional("WEATHERMAP_LOCATIONS_PATH").map(PathBuf::from);

    // Mock data is only acceptable outside production.
    let openweather_api_key = optional("OPENWEATHER_API_KEY");
    if env == Environment::Production && openweather_api_key.is_none() {
        return Err(ConfigError::MissingEnvVar("OPENWEATHER_API_KEY".to_string()));
    }

    let upstream_base_url = or_default(
        "WEATHERMAP_UPSTREAM_BASE_URL",
        "https://api.openweathermap.org/data/2.5/",
    );
    let upstream_lang = or_default("WEATHERMAP_UPSTREAM_LANG", "zh_cn");
    let proxy_base_url = or_default("WEATHERMAP_PROXY_BASE_URL", "http://127.0.0.1:8080/");

    let request_timeout_secs = parse_u64("WEATHERMAP_REQUEST_TIMEOUT_SECS", "10")?;
    let user_agent = or_default(
        "WEATHERMAP_USER_AGENT",
        "weathermap/0.1 (china-weather-map)",
    );

    let refresh_interval_secs = parse_u64("WEATHERMAP_REFRESH_INTERVAL_SECS", "600")?;
    if refresh_interval_secs == 0 {
        return Err(invalid(
            "WEATHERMAP_REFRESH_INTERVAL_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let utc_offset_hours = parse_utc_offset(&or_default("WEATHERMAP_UTC_OFFSET_HOURS", "8"))?;
    let rate_limit_per_minute = parse_usize("WEATHERMAP_RATE_LIMIT_PER_MINUTE", "120")?;
    let static_dir = optional("WEATHERMAP_STATIC_DIR").map(PathBuf::from);

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        locations_path,
        openweather_api_key,
        upstream_base_url,
        upstream_lang,
        proxy_base_url,
        request_timeout_secs,
        user_agent,
        refresh_interval_secs,
        utc_offset_hours,
        rate_limit_per_minute,
        static_dir,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "WEATHERMAP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Parse a whole-hour UTC offset within the range real timezones use.
fn parse_utc_offset(s: &str) -> Result<i32, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "WEATHERMAP_UTC_OFFSET_HOURS".to_string(),
        reason,
    };

    let hours = s.trim().parse::<i32>().map_err(|e| invalid(e.to_string()))?;
    if !(-12..=14).contains(&hours) {
        return Err(invalid(format!("{hours} is outside -12..=14")));
    }
    Ok(hours)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
