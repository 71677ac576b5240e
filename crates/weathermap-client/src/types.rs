//! Weather API response types and the canonical per-location record.
//!
//! Two current-conditions shapes are seen in practice: the upstream
//! OpenWeather body and the flattened body the local proxy returns.
//! [`CurrentPayload`] accepts either and [`CurrentConditions`] is what both
//! normalize to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Description carried by the sentinel record.
pub const UNAVAILABLE_DESCRIPTION: &str = "data unavailable";

/// Icon code carried by the sentinel record.
pub const DEFAULT_ICON_CODE: &str = "default";

// ---------------------------------------------------------------------------
// Upstream shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MainBlock {
    pub temp: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConditionBlock {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// `GET weather` upstream body: `{name, main: {temp}, weather: [{description, icon}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamCurrent {
    #[serde(default)]
    pub name: Option<String>,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
}

/// Flattened current-conditions body served by the local proxy.
///
/// Field names match what the browser front end already consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub city: String,
    pub temperature: f64,
    pub weather: String,
    pub icon: String,
}

/// Either observed current-conditions shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CurrentPayload {
    Proxy(CurrentConditions),
    Upstream(UpstreamCurrent),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForecastCity {
    #[serde(default)]
    pub name: Option<String>,
}

/// One 3-hourly entry of the upstream `forecast` list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForecastEntry {
    /// Unix seconds.
    pub dt: i64,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
}

/// `GET forecast` upstream body. The proxy passes it through unchanged.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub city: Option<ForecastCity>,
    #[serde(default)]
    pub list: Vec<ForecastEntry>,
}

// ---------------------------------------------------------------------------
// Canonical record
// ---------------------------------------------------------------------------

/// Latest weather for one location. Each fetch produces a fresh record that
/// replaces the previous one; no history is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherRecord {
    pub location_name: String,
    /// Whole degrees Celsius; `None` is the unavailable sentinel.
    pub temperature: Option<i32>,
    pub description: String,
    pub icon_code: String,
    /// Local date of the forecast entry used; absent for current conditions.
    pub forecast_date: Option<NaiveDate>,
}

impl WeatherRecord {
    /// The placeholder substituted whenever a fetch fails for any reason.
    #[must_use]
    pub fn unavailable(location_name: &str) -> Self {
        Self {
            location_name: location_name.to_owned(),
            temperature: None,
            description: UNAVAILABLE_DESCRIPTION.to_owned(),
            icon_code: DEFAULT_ICON_CODE.to_owned(),
            forecast_date: None,
        }
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.temperature.is_none()
    }
}
