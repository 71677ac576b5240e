//! HTTP client for the weather backend.
//!
//! The same client speaks to either the upstream OpenWeather-compatible API
//! (credential injected as `appid`) or the local proxy, which holds the
//! credential server-side. Typed calls surface failures as
//! [`WeatherApiError`]; the infallible map-facing path lives in
//! [`crate::fetch`].

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use reqwest::{Client, Url};
use weathermap_core::{AppConfig, Location, Tier};

use crate::error::WeatherApiError;
use crate::normalize;
use crate::types::{CurrentConditions, CurrentPayload, ForecastResponse};

/// Which kind of server sits behind the base URL.
#[derive(Clone)]
pub enum Backend {
    /// Upstream API; every request carries the key and metric/lang params.
    OpenWeather { api_key: String, lang: String },
    /// The local proxy (`/api/*` routes).
    Proxy,
}

impl Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::OpenWeather { .. } => "openweather",
            Backend::Proxy => "proxy",
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::OpenWeather { lang, .. } => f
                .debug_struct("OpenWeather")
                .field("api_key", &"[redacted]")
                .field("lang", lang)
                .finish(),
            Backend::Proxy => write!(f, "Proxy"),
        }
    }
}

/// Transport settings shared by both backends.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Timezone that defines "today" and forecast day boundaries.
    pub utc_offset: FixedOffset,
}

impl ClientOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            utc_offset: config.local_offset(),
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "weathermap/0.1 (china-weather-map)".to_string(),
            utc_offset: Utc.fix(),
        }
    }
}

/// Client for current conditions, forecasts, and (proxy only) location lists.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    backend: Backend,
    base_url: Url,
    utc_offset: FixedOffset,
}

impl WeatherClient {
    /// Creates a client for `backend` rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherApiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`WeatherApiError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(
        base_url: &str,
        backend: Backend,
        options: &ClientOptions,
    ) -> Result<Self, WeatherApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(options.timeout_secs.min(10)))
            .user_agent(options.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash so relative joins append instead of
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| WeatherApiError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            backend,
            base_url,
            utc_offset: options.utc_offset,
        })
    }

    /// Client for the upstream API configured in `config`.
    ///
    /// Returns `Ok(None)` when no API key is configured.
    ///
    /// # Errors
    ///
    /// See [`WeatherClient::new`].
    pub fn upstream_from_config(config: &AppConfig) -> Result<Option<Self>, WeatherApiError> {
        let Some(api_key) = config.openweather_api_key.clone() else {
            return Ok(None);
        };
        let backend = Backend::OpenWeather {
            api_key,
            lang: config.upstream_lang.clone(),
        };
        Self::new(
            &config.upstream_base_url,
            backend,
            &ClientOptions::from_config(config),
        )
        .map(Some)
    }

    /// Client for the local proxy configured in `config`.
    ///
    /// # Errors
    ///
    /// See [`WeatherClient::new`].
    pub fn proxy_from_config(config: &AppConfig) -> Result<Self, WeatherApiError> {
        Self::new(
            &config.proxy_base_url,
            Backend::Proxy,
            &ClientOptions::from_config(config),
        )
    }

    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Fetches current conditions at a coordinate.
    ///
    /// Accepts both the upstream body and the proxy's flattened body.
    ///
    /// # Errors
    ///
    /// - [`WeatherApiError::Http`] on network failure.
    /// - [`WeatherApiError::UnexpectedStatus`] on a non-2xx status.
    /// - [`WeatherApiError::Deserialize`] if neither shape matches.
    /// - [`WeatherApiError::MissingField`] if the conditions block is empty.
    pub async fn current(&self, lat: f64, lon: f64) -> Result<CurrentConditions, WeatherApiError> {
        let path = match self.backend {
            Backend::OpenWeather { .. } => "weather",
            Backend::Proxy => "api/weather",
        };
        let url = self.build_url(path, &coordinate_params(lat, lon))?;
        let body = self.request_json(&url).await?;
        let context = format!("current(lat={lat}, lon={lon})");

        let payload: CurrentPayload =
            serde_json::from_value(body).map_err(|e| WeatherApiError::Deserialize {
                context: context.clone(),
                source: e,
            })?;

        normalize::current_conditions(payload, &context)
    }

    /// Fetches the raw forecast body.
    ///
    /// `days` is forwarded to the proxy; the upstream API ignores it and
    /// always returns its full 5-day list.
    ///
    /// # Errors
    ///
    /// [`WeatherApiError::Http`], [`WeatherApiError::UnexpectedStatus`], or
    /// [`WeatherApiError::Deserialize`] if the body is not JSON.
    pub async fn forecast_json(
        &self,
        lat: f64,
        lon: f64,
        days: u32,
    ) -> Result<serde_json::Value, WeatherApiError> {
        let mut params = coordinate_params(lat, lon);
        let path = match self.backend {
            Backend::OpenWeather { .. } => "forecast",
            Backend::Proxy => {
                params.push(("days", days.to_string()));
                "api/forecast"
            }
        };
        let url = self.build_url(path, &params)?;
        self.request_json(&url).await
    }

    /// Fetches and parses the forecast list.
    ///
    /// # Errors
    ///
    /// As [`WeatherClient::forecast_json`], plus
    /// [`WeatherApiError::Deserialize`] if the body is not a forecast.
    pub async fn forecast(
        &self,
        lat: f64,
        lon: f64,
        days: u32,
    ) -> Result<ForecastResponse, WeatherApiError> {
        let body = self.forecast_json(lat, lon, days).await?;
        serde_json::from_value(body).map_err(|e| WeatherApiError::Deserialize {
            context: format!("forecast(lat={lat}, lon={lon})"),
            source: e,
        })
    }

    /// Fetches a tier's location list from the proxy.
    ///
    /// # Errors
    ///
    /// - [`WeatherApiError::Unsupported`] on the upstream backend.
    /// - [`WeatherApiError::Http`], [`WeatherApiError::UnexpectedStatus`], or
    ///   [`WeatherApiError::Deserialize`] as for the other calls.
    pub async fn locations(&self, tier: Tier) -> Result<Vec<Location>, WeatherApiError> {
        if !matches!(self.backend, Backend::Proxy) {
            return Err(WeatherApiError::Unsupported {
                operation: "location lists",
                backend: self.backend.name(),
            });
        }

        let path = match tier {
            Tier::Primary => "api/cities",
            Tier::Secondary => "api/counties",
        };
        let url = self.build_url(path, &[])?;
        let body = self.request_json(&url).await?;
        serde_json::from_value(body).map_err(|e| WeatherApiError::Deserialize {
            context: format!("locations({tier})"),
            source: e,
        })
    }

    /// Builds the full request URL with percent-encoded query parameters.
    ///
    /// On the upstream backend `appid`, `units=metric`, and `lang` are
    /// appended after the caller's parameters.
    fn build_url(&self, path: &str, extra: &[(&str, String)]) -> Result<Url, WeatherApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| WeatherApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
            if let Backend::OpenWeather { api_key, lang } = &self.backend {
                pairs.append_pair("appid", api_key);
                pairs.append_pair("units", "metric");
                pairs.append_pair("lang", lang);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    /// Sends a GET request, requires a 2xx status, and parses the body as JSON.
    async fn request_json(&self, url: &Url) -> Result<serde_json::Value, WeatherApiError> {
        // Strip the URL from transport errors; it may carry the credential.
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| WeatherApiError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherApiError::UnexpectedStatus {
                status: status.as_u16(),
                url: redact(url),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherApiError::Http(e.without_url()))?;
        serde_json::from_str(&body).map_err(|e| WeatherApiError::Deserialize {
            context: redact(url),
            source: e,
        })
    }
}

fn coordinate_params(lat: f64, lon: f64) -> Vec<(&'static str, String)> {
    vec![("lat", lat.to_string()), ("lon", lon.to_string())]
}

/// URL rendered for logs and errors, with the credential masked.
fn redact(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "appid" { "[redacted]".into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();
    if pairs.is_empty() {
        return masked.to_string();
    }
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
