//! Normalization of upstream bodies into [`WeatherRecord`]s.
//!
//! Anything missing or malformed becomes a [`WeatherApiError`]; the caller
//! decides whether that turns into the sentinel record.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};

use crate::error::WeatherApiError;
use crate::types::{
    ConditionBlock, CurrentConditions, CurrentPayload, ForecastEntry, ForecastResponse,
    WeatherRecord,
};

const NOON_SECONDS: i64 = 12 * 3600;

/// Rounds a Celsius reading to whole degrees. Non-finite or absurd values
/// yield `None`.
#[must_use]
pub fn round_temperature(celsius: f64) -> Option<i32> {
    if !celsius.is_finite() || celsius.abs() > 1000.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let rounded = celsius.round() as i32;
    Some(rounded)
}

/// Collapses either current-conditions shape into [`CurrentConditions`].
///
/// # Errors
///
/// Returns [`WeatherApiError::MissingField`] when the upstream body has no
/// usable `weather[0]` entry.
pub fn current_conditions(
    payload: CurrentPayload,
    context: &str,
) -> Result<CurrentConditions, WeatherApiError> {
    match payload {
        CurrentPayload::Proxy(conditions) => Ok(conditions),
        CurrentPayload::Upstream(body) => {
            let (description, icon) = first_condition(&body.weather, context)?;
            Ok(CurrentConditions {
                city: body.name.unwrap_or_default(),
                temperature: body.main.temp,
                weather: description,
                icon,
            })
        }
    }
}

/// Builds a current-conditions record (no forecast date).
///
/// # Errors
///
/// Returns [`WeatherApiError::MissingField`] if the temperature is not a
/// usable number or the description/icon are empty.
pub fn record_from_current(
    location_name: &str,
    conditions: &CurrentConditions,
    context: &str,
) -> Result<WeatherRecord, WeatherApiError> {
    let temperature = round_temperature(conditions.temperature)
        .ok_or_else(|| missing(context, "temperature"))?;
    if conditions.weather.trim().is_empty() {
        return Err(missing(context, "weather description"));
    }
    if conditions.icon.trim().is_empty() {
        return Err(missing(context, "weather icon"));
    }

    Ok(WeatherRecord {
        location_name: location_name.to_owned(),
        temperature: Some(temperature),
        description: conditions.weather.clone(),
        icon_code: conditions.icon.clone(),
        forecast_date: None,
    })
}

/// Local calendar date of a forecast entry.
#[must_use]
pub fn entry_local_date(entry: &ForecastEntry, tz: FixedOffset) -> Option<NaiveDate> {
    DateTime::from_timestamp(entry.dt, 0).map(|utc| utc.with_timezone(&tz).date_naive())
}

/// Picks the forecast entry to represent `target`.
///
/// Among entries on `target` (local date), the one closest to local noon
/// wins, earliest first on a tie. With no entry on `target`, the first entry
/// of the list is used. Returns `None` only for an empty list.
#[must_use]
pub fn select_forecast_entry(
    list: &[ForecastEntry],
    target: NaiveDate,
    tz: FixedOffset,
) -> Option<&ForecastEntry> {
    list.iter()
        .filter_map(|entry| {
            let local = DateTime::from_timestamp(entry.dt, 0)?.with_timezone(&tz);
            (local.date_naive() == target).then(|| {
                let seconds = i64::from(local.num_seconds_from_midnight());
                ((seconds - NOON_SECONDS).abs(), entry)
            })
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, entry)| entry)
        .or_else(|| list.first())
}

/// Builds a forecast record for `target` from an upstream forecast body.
///
/// # Errors
///
/// Returns [`WeatherApiError::MissingField`] if the list is empty or the
/// chosen entry lacks a usable condition or temperature.
pub fn record_from_forecast(
    location_name: &str,
    forecast: &ForecastResponse,
    target: NaiveDate,
    tz: FixedOffset,
    context: &str,
) -> Result<WeatherRecord, WeatherApiError> {
    let entry = select_forecast_entry(&forecast.list, target, tz)
        .ok_or_else(|| missing(context, "list"))?;

    if entry_local_date(entry, tz) != Some(target) {
        tracing::debug!(
            location = location_name,
            %target,
            "no forecast entry for target date; using first entry"
        );
    }

    let temperature =
        round_temperature(entry.main.temp).ok_or_else(|| missing(context, "main.temp"))?;
    let (description, icon_code) = first_condition(&entry.weather, context)?;

    Ok(WeatherRecord {
        location_name: location_name.to_owned(),
        temperature: Some(temperature),
        description,
        icon_code,
        forecast_date: entry_local_date(entry, tz),
    })
}

fn first_condition(
    conditions: &[ConditionBlock],
    context: &str,
) -> Result<(String, String), WeatherApiError> {
    let first = conditions.first().ok_or_else(|| missing(context, "weather[0]"))?;
    let description = first
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| missing(context, "weather[0].description"))?;
    let icon = first
        .icon
        .clone()
        .filter(|i| !i.trim().is_empty())
        .ok_or_else(|| missing(context, "weather[0].icon"))?;
    Ok((description, icon))
}

fn missing(context: &str, field: &'static str) -> WeatherApiError {
    WeatherApiError::MissingField {
        context: context.to_owned(),
        field,
    }
}
