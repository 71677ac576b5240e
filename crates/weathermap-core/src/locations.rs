//! Location registry: the two static tiers of map locations.
//!
//! Cities form the primary tier and are always displayed. Counties form the
//! secondary tier and only appear once the user toggles them on. Both lists
//! are immutable after load.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const BUILTIN_LOCATIONS: &str = include_str!("../../../config/locations.yaml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "city")]
    Primary,
    #[serde(rename = "county")]
    Secondary,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Primary => write!(f, "city"),
            Tier::Secondary => write!(f, "county"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
}

/// Stable key for a location: its tier plus its position in that tier's list.
///
/// Display names are not unique across tiers (丽江 is both a city and a
/// county entry), so the store never keys on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId {
    pub tier: Tier,
    pub index: u32,
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.tier, self.index)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationRegistry {
    pub cities: Vec<Location>,
    #[serde(default)]
    pub counties: Vec<Location>,
}

impl LocationRegistry {
    /// The registry bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the bundled YAML fails to parse or validate.
    pub fn builtin() -> Result<Self, ConfigError> {
        parse_locations(BUILTIN_LOCATIONS)
    }

    /// Builds a registry from in-memory lists, applying the same validation as
    /// [`load_locations`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if either list is invalid.
    pub fn from_lists(cities: Vec<Location>, counties: Vec<Location>) -> Result<Self, ConfigError> {
        let registry = Self { cities, counties };
        validate_locations(&registry)?;
        Ok(registry)
    }

    #[must_use]
    pub fn tier(&self, tier: Tier) -> &[Location] {
        match tier {
            Tier::Primary => &self.cities,
            Tier::Secondary => &self.counties,
        }
    }

    #[must_use]
    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.tier(id.tier).get(usize::try_from(id.index).ok()?)
    }

    /// Iterates a tier together with each location's stable id.
    pub fn entries(&self, tier: Tier) -> impl Iterator<Item = (LocationId, &Location)> {
        self.tier(tier).iter().enumerate().filter_map(move |(i, loc)| {
            let index = u32::try_from(i).ok()?;
            Some((LocationId { tier, index }, loc))
        })
    }

    /// Counties belonging to `province`, in registry order.
    pub fn counties_in<'a>(&'a self, province: &'a str) -> impl Iterator<Item = &'a Location> {
        self.counties
            .iter()
            .filter(move |c| c.province.as_deref() == Some(province))
    }
}

/// Load and validate the location registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_locations(path: &Path) -> Result<LocationRegistry, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LocationsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_locations(&content)
}

/// The registry at `path`, or the bundled one when no path is configured.
///
/// # Errors
///
/// As [`load_locations`] and [`LocationRegistry::builtin`].
pub fn load_registry(path: Option<&Path>) -> Result<LocationRegistry, ConfigError> {
    match path {
        Some(path) => load_locations(path),
        None => LocationRegistry::builtin(),
    }
}

fn parse_locations(content: &str) -> Result<LocationRegistry, ConfigError> {
    let registry: LocationRegistry =
        serde_yaml::from_str(content).map_err(ConfigError::LocationsFileParse)?;

    validate_locations(&registry)?;

    Ok(registry)
}

fn validate_locations(registry: &LocationRegistry) -> Result<(), ConfigError> {
    if registry.cities.is_empty() {
        return Err(ConfigError::Validation(
            "at least one city is required".to_string(),
        ));
    }

    for tier in [Tier::Primary, Tier::Secondary] {
        let mut seen_names = HashSet::new();

        for location in registry.tier(tier) {
            if location.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{tier} name must be non-empty"
                )));
            }

            if !(-90.0..=90.0).contains(&location.lat) || !(-180.0..=180.0).contains(&location.lon)
            {
                return Err(ConfigError::Validation(format!(
                    "{tier} '{}' has out-of-range coordinates ({}, {})",
                    location.name, location.lat, location.lon
                )));
            }

            if !seen_names.insert(location.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate {tier} name: '{}'",
                    location.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(name: &str, lat: f64, lon: f64) -> Location {
        Location {
            name: name.to_string(),
            lat,
            lon,
            province: None,
        }
    }

    #[test]
    fn builtin_registry_loads() {
        let registry = LocationRegistry::builtin().expect("bundled locations must be valid");
        assert_eq!(registry.cities.len(), 70);
        assert!(!registry.counties.is_empty());
        assert_eq!(registry.cities[0].name, "北京");
        assert!((registry.cities[0].lat - 39.9042).abs() < 1e-9);
    }

    #[test]
    fn builtin_registry_allows_names_repeated_across_tiers() {
        let registry = LocationRegistry::builtin().unwrap();
        let in_cities = registry.cities.iter().any(|c| c.name == "丽江");
        let in_counties = registry.counties.iter().any(|c| c.name == "丽江");
        assert!(in_cities && in_counties);
    }

    #[test]
    fn counties_in_filters_by_province() {
        let registry = LocationRegistry::builtin().unwrap();
        let hebei: Vec<_> = registry.counties_in("河北").collect();
        assert_eq!(hebei.len(), 8);
        assert!(hebei.iter().all(|c| c.province.as_deref() == Some("河北")));
        assert_eq!(registry.counties_in("火星").count(), 0);
    }

    #[test]
    fn entries_yield_stable_ids() {
        let registry =
            LocationRegistry::from_lists(vec![loc("A", 1.0, 1.0), loc("B", 2.0, 2.0)], vec![])
                .unwrap();
        let ids: Vec<_> = registry.entries(Tier::Primary).map(|(id, _)| id).collect();
        assert_eq!(
            ids,
            vec![
                LocationId { tier: Tier::Primary, index: 0 },
                LocationId { tier: Tier::Primary, index: 1 },
            ]
        );
        assert_eq!(registry.get(ids[1]).map(|l| l.name.as_str()), Some("B"));
        assert!(registry
            .get(LocationId { tier: Tier::Secondary, index: 0 })
            .is_none());
    }

    #[test]
    fn validate_rejects_empty_cities() {
        let err = LocationRegistry::from_lists(vec![], vec![loc("X", 0.0, 0.0)]).unwrap_err();
        assert!(err.to_string().contains("at least one city"));
    }

    #[test]
    fn validate_rejects_blank_name() {
        let err = LocationRegistry::from_lists(vec![loc("  ", 0.0, 0.0)], vec![]).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_out_of_range_coordinates() {
        let err = LocationRegistry::from_lists(vec![loc("Nowhere", 91.0, 0.0)], vec![]).unwrap_err();
        assert!(err.to_string().contains("out-of-range"));
    }

    #[test]
    fn validate_rejects_duplicate_within_tier() {
        let err = LocationRegistry::from_lists(
            vec![loc("北京", 39.9, 116.4)],
            vec![loc("Foo", 1.0, 1.0), loc("foo", 2.0, 2.0)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate county name"));
    }

    #[test]
    fn load_locations_reports_missing_file() {
        let err = load_locations(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::LocationsFileIo { .. }));
    }

    #[test]
    fn parse_locations_reports_bad_yaml() {
        let err = parse_locations("cities: [ { name: 1").unwrap_err();
        assert!(matches!(err, ConfigError::LocationsFileParse(_)));
    }

    #[test]
    fn city_serializes_without_province() {
        let json = serde_json::to_value(loc("北京", 39.9042, 116.4074)).unwrap();
        assert!(json.get("province").is_none());
        assert_eq!(json["name"], "北京");
    }

    #[test]
    fn tier_display_and_serde_names() {
        assert_eq!(Tier::Primary.to_string(), "city");
        assert_eq!(Tier::Secondary.to_string(), "county");
        assert_eq!(serde_json::to_value(Tier::Secondary).unwrap(), "county");
        let id = LocationId { tier: Tier::Secondary, index: 7 };
        assert_eq!(id.to_string(), "county#7");
    }

    #[test]
    fn load_registry_without_path_is_builtin() {
        let registry = load_registry(None).unwrap();
        assert_eq!(registry.cities.len(), 70);
    }

    #[test]
    fn load_registry_reports_missing_file() {
        let err = load_registry(Some(Path::new("/nonexistent/locations.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::LocationsFileIo { .. }));
    }
}
