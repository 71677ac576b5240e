//! `/api/cities` and `/api/counties`: the registry as bare JSON arrays.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use weathermap_core::Location;

use super::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct CountyQuery {
    pub province: Option<String>,
}

pub(super) async fn list_cities(State(state): State<AppState>) -> Json<Vec<Location>> {
    Json(state.registry.cities.clone())
}

/// All counties, or only those of `province` when it is given and non-empty.
pub(super) async fn list_counties(
    State(state): State<AppState>,
    Query(query): Query<CountyQuery>,
) -> Json<Vec<Location>> {
    let counties = match query.province.as_deref().map(str::trim) {
        Some(province) if !province.is_empty() => {
            state.registry.counties_in(province).cloned().collect()
        }
        _ => state.registry.counties.clone(),
    };
    Json(counties)
}
