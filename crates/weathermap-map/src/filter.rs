//! Weather-category filter.
//!
//! The predicate looks at a record's description and icon code only, so the
//! same record always matches the same categories.

use std::fmt;
use std::str::FromStr;

use weathermap_client::WeatherRecord;

/// Category a user can filter the map by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherCategory {
    Sunny,
    Cloudy,
    Rain,
    Snow,
}

impl WeatherCategory {
    pub const ALL: [WeatherCategory; 4] = [
        WeatherCategory::Sunny,
        WeatherCategory::Cloudy,
        WeatherCategory::Rain,
        WeatherCategory::Snow,
    ];

    /// Lowercase substrings matched against the description.
    #[must_use]
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            WeatherCategory::Sunny => &["晴", "clear"],
            WeatherCategory::Cloudy => &["多云", "cloud", "阴", "overcast"],
            WeatherCategory::Rain => &["雨", "rain"],
            WeatherCategory::Snow => &["雪", "snow"],
        }
    }

    /// Icon code prefixes belonging to the category.
    #[must_use]
    pub fn icon_prefixes(self) -> &'static [&'static str] {
        match self {
            WeatherCategory::Sunny => &["01"],
            WeatherCategory::Cloudy => &["02", "03", "04"],
            WeatherCategory::Rain => &["09", "10", "11"],
            WeatherCategory::Snow => &["13"],
        }
    }

    /// Whether `record` falls in this category.
    #[must_use]
    pub fn matches(self, record: &WeatherRecord) -> bool {
        let description = record.description.to_lowercase();
        self.keywords().iter().any(|k| description.contains(k))
            || self
                .icon_prefixes()
                .iter()
                .any(|p| record.icon_code.starts_with(p))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WeatherCategory::Sunny => "sunny",
            WeatherCategory::Cloudy => "cloudy",
            WeatherCategory::Rain => "rain",
            WeatherCategory::Snow => "snow",
        }
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown weather category '{0}' (expected sunny, cloudy, rain, or snow)")]
pub struct UnknownCategory(pub String);

impl FromStr for WeatherCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeatherCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// The single active filter, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    #[default]
    Inactive,
    Active(WeatherCategory),
}

impl FilterState {
    #[must_use]
    pub fn from_category(category: Option<WeatherCategory>) -> Self {
        category.map_or(FilterState::Inactive, FilterState::Active)
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, FilterState::Active(_))
    }

    #[must_use]
    pub fn category(self) -> Option<WeatherCategory> {
        match self {
            FilterState::Inactive => None,
            FilterState::Active(c) => Some(c),
        }
    }
}
