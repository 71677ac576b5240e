use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub locations_path: Option<PathBuf>,
    pub openweather_api_key: Option<String>,
    pub upstream_base_url: String,
    pub upstream_lang: String,
    pub proxy_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub refresh_interval_secs: u64,
    pub utc_offset_hours: i32,
    pub rate_limit_per_minute: usize,
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Local timezone used for "today" and forecast day matching.
    ///
    /// `utc_offset_hours` is range-checked at load time, so the fallback to
    /// UTC only triggers for hand-built configs.
    #[must_use]
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("locations_path", &self.locations_path)
            .field(
                "openweather_api_key",
                &self.openweather_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_lang", &self.upstream_lang)
            .field("proxy_base_url", &self.proxy_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}
