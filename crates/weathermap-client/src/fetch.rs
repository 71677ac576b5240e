//! The map-facing fetch path.
//!
//! [`WeatherSource::fetch_weather`] never fails: network errors, bad
//! statuses, malformed bodies, and missing fields all become the
//! unavailable sentinel record. There is no retry and no backoff.

use std::future::Future;

use chrono::{Duration, NaiveDate, Utc};
use weathermap_core::Location;

use crate::client::WeatherClient;
use crate::dates::local_today;
use crate::error::WeatherApiError;
use crate::normalize;
use crate::types::WeatherRecord;

/// Anything that can produce a weather record for a location.
///
/// `offset_days == 0` asks for current conditions; anything greater asks
/// for the forecast `offset_days` days from today.
pub trait WeatherSource: Send + Sync {
    fn fetch_weather(
        &self,
        location: &Location,
        offset_days: u32,
    ) -> impl Future<Output = WeatherRecord> + Send;
}

impl WeatherSource for WeatherClient {
    async fn fetch_weather(&self, location: &Location, offset_days: u32) -> WeatherRecord {
        let today = local_today(Utc::now(), self.utc_offset());
        match self.fetch_record(location, offset_days, today).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    location = %location.name,
                    offset_days,
                    error = %e,
                    "weather fetch failed; substituting unavailable record"
                );
                WeatherRecord::unavailable(&location.name)
            }
        }
    }
}

impl WeatherClient {
    /// Fallible form of [`WeatherSource::fetch_weather`] with an explicit
    /// "today".
    ///
    /// # Errors
    ///
    /// Any [`WeatherApiError`] from the request or from normalization.
    pub async fn fetch_record(
        &self,
        location: &Location,
        offset_days: u32,
        today: NaiveDate,
    ) -> Result<WeatherRecord, WeatherApiError> {
        if offset_days == 0 {
            let conditions = self.current(location.lat, location.lon).await?;
            return normalize::record_from_current(&location.name, &conditions, &location.name);
        }

        let target = today + Duration::days(i64::from(offset_days));
        let forecast = self
            .forecast(location.lat, location.lon, offset_days)
            .await?;
        normalize::record_from_forecast(
            &location.name,
            &forecast,
            target,
            self.utc_offset(),
            &location.name,
        )
    }
}
