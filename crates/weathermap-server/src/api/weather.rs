//! `/api/weather` and `/api/forecast`: forward to the upstream API with the
//! server-side credential, or answer with mock data when none is configured.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use weathermap_client::CurrentConditions;

use super::{map_upstream_error, mock, ApiError, AppState};
use crate::middleware::RequestId;

/// Forecast length the upstream API can serve.
const MAX_FORECAST_DAYS: i64 = 5;

/// Raw query parameters. Parsed by hand so a bad value produces the JSON
/// error body instead of axum's plain-text rejection.
#[derive(Debug, Deserialize)]
pub(super) struct CoordinateQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub days: Option<String>,
}

pub(super) async fn current_weather(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<CurrentConditions>, ApiError> {
    let (lat, lon) = parse_coordinates(&query, &req_id.0)?;

    let Some(upstream) = &state.upstream else {
        return Ok(Json(mock::current_conditions()));
    };

    upstream
        .current(lat, lon)
        .await
        .map(Json)
        .map_err(|e| map_upstream_error(req_id.0, &e))
}

pub(super) async fn forecast(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (lat, lon) = parse_coordinates(&query, &req_id.0)?;
    let days = clamp_days(query.days.as_deref());

    let Some(upstream) = &state.upstream else {
        return Ok(Json(mock::forecast(days, state.utc_offset)));
    };

    upstream
        .forecast_json(lat, lon, days)
        .await
        .map(Json)
        .map_err(|e| map_upstream_error(req_id.0, &e))
}

/// `days` defaults to 1 when absent or not an integer, then is clamped to
/// the upstream range.
pub(super) fn clamp_days(raw: Option<&str>) -> u32 {
    let days = raw
        .and_then(|d| d.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_FORECAST_DAYS);
    u32::try_from(days).unwrap_or(1)
}

pub(super) fn parse_coordinates(
    query: &CoordinateQuery,
    request_id: &str,
) -> Result<(f64, f64), ApiError> {
    let (Some(lat), Some(lon)) = (non_blank(query.lat.as_deref()), non_blank(query.lon.as_deref()))
    else {
        return Err(ApiError::new(
            request_id,
            "bad_request",
            "lat and lon query parameters are required",
        ));
    };

    let lat = parse_coordinate(lat, "lat", 90.0, request_id)?;
    let lon = parse_coordinate(lon, "lon", 180.0, request_id)?;
    Ok((lat, lon))
}

fn parse_coordinate(raw: &str, name: &str, bound: f64, request_id: &str) -> Result<f64, ApiError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= bound)
        .ok_or_else(|| {
            ApiError::new(
                request_id,
                "bad_request",
                format!("{name} must be a number between -{bound} and {bound}"),
            )
        })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
