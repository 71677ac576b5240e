//! Marker appearance and reconciliation.
//!
//! [`marker_visual`] is pure: the same record, filter, tier, and tier
//! visibility always give the same [`MarkerVisual`]. [`reconcile`] and
//! [`render`] push that visual to the surface, touching only the one entry
//! they were handed.

use weathermap_client::WeatherRecord;
use weathermap_core::{Location, Tier};

use crate::filter::FilterState;
use crate::store::MarkerEntry;
use crate::surface::MapSurface;

pub const PRIMARY_SIZE_PX: u32 = 40;
pub const SECONDARY_SIZE_PX: u32 = 30;
/// Added to the tier size when a marker matches the active filter.
pub const EMPHASIS_EXTRA_PX: u32 = 10;
pub const DIMMED_OPACITY: f64 = 0.3;

const ICON_DIR: &str = "static/weather_icon";

/// Weather icon image shipped with the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconAsset {
    Sunny,
    Cloudy,
    Overcast,
    Thunderstorm,
    HeavyRain,
    ModerateRain,
    LightRain,
    Snow,
}

/// Description keywords, first match wins.
const KEYWORD_ICONS: &[(&[&str], IconAsset)] = &[
    (&["晴", "clear", "sunny"], IconAsset::Sunny),
    (&["多云", "cloud"], IconAsset::Cloudy),
    (&["阴", "overcast"], IconAsset::Overcast),
    (&["雷", "thunder"], IconAsset::Thunderstorm),
    (&["暴雨", "大雨", "heavy rain", "rainstorm"], IconAsset::HeavyRain),
    (&["中雨", "moderate rain"], IconAsset::ModerateRain),
    (&["小雨", "light rain"], IconAsset::LightRain),
    (&["雨", "rain"], IconAsset::LightRain),
    (&["雪", "snow"], IconAsset::Snow),
];

impl IconAsset {
    /// Exact icon-code lookup. Day and night variants share an asset.
    #[must_use]
    pub fn from_icon_code(code: &str) -> Option<Self> {
        let asset = match code {
            "01d" | "01n" | "default" => IconAsset::Sunny,
            "02d" | "02n" | "03d" | "03n" | "04d" | "04n" => IconAsset::Cloudy,
            "50d" | "50n" => IconAsset::Overcast,
            "10d" | "10n" => IconAsset::LightRain,
            "09d" | "09n" => IconAsset::ModerateRain,
            "11d" | "11n" => IconAsset::Thunderstorm,
            "13d" | "13n" => IconAsset::Snow,
            _ => return None,
        };
        Some(asset)
    }

    /// Keyword match on a description; sunny when nothing matches.
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        let description = description.to_lowercase();
        KEYWORD_ICONS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| description.contains(k)))
            .map_or(IconAsset::Sunny, |(_, asset)| *asset)
    }

    /// Icon for a record: code table first, description keywords second.
    #[must_use]
    pub fn resolve(icon_code: &str, description: &str) -> Self {
        Self::from_icon_code(icon_code).unwrap_or_else(|| Self::from_description(description))
    }

    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            IconAsset::Sunny => "sunny.png",
            IconAsset::Cloudy => "douyun.png",
            IconAsset::Overcast => "yintian.png",
            IconAsset::Thunderstorm => "leizhenyu.png",
            IconAsset::HeavyRain => "dayu.png",
            IconAsset::ModerateRain => "zhongyu.png",
            IconAsset::LightRain => "xiaoyu.png",
            IconAsset::Snow => "snow.png",
        }
    }

    #[must_use]
    pub fn path(self) -> String {
        format!("{ICON_DIR}/{}", self.file_name())
    }
}

/// Everything the surface needs to draw one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerVisual {
    pub icon: IconAsset,
    pub size_px: u32,
    pub opacity: f64,
    /// Matches the active filter.
    pub emphasized: bool,
    pub visible: bool,
    /// Permanent tooltip text.
    pub label: String,
    /// Popup body (HTML).
    pub popup: String,
}

impl MarkerVisual {
    #[must_use]
    pub fn is_dimmed(&self) -> bool {
        self.opacity < 1.0
    }

    /// Equal ignoring visibility.
    fn same_appearance(&self, other: &Self) -> bool {
        self.icon == other.icon
            && self.size_px == other.size_px
            && self.opacity.to_bits() == other.opacity.to_bits()
            && self.emphasized == other.emphasized
            && self.label == other.label
            && self.popup == other.popup
    }
}

/// Computes a marker's appearance.
///
/// With a filter active, a marker whose record matches is emphasized and one
/// whose record does not match is dimmed. A marker still waiting for its first
/// record is left as-is until data arrives. With no filter, every marker is
/// drawn at full opacity and normal size.
#[must_use]
pub fn marker_visual(
    location: &Location,
    tier: Tier,
    record: Option<&WeatherRecord>,
    filter: FilterState,
    tier_visible: bool,
) -> MarkerVisual {
    let icon = record.map_or(IconAsset::Sunny, |r| {
        IconAsset::resolve(&r.icon_code, &r.description)
    });

    let matched = filter
        .category()
        .and_then(|category| record.map(|r| category.matches(r)));
    let emphasized = matched == Some(true);

    let base = match tier {
        Tier::Primary => PRIMARY_SIZE_PX,
        Tier::Secondary => SECONDARY_SIZE_PX,
    };
    let size_px = if emphasized {
        base + EMPHASIS_EXTRA_PX
    } else {
        base
    };
    let opacity = if matched == Some(false) {
        DIMMED_OPACITY
    } else {
        1.0
    };

    MarkerVisual {
        icon,
        size_px,
        opacity,
        emphasized,
        visible: tier_visible,
        label: location.name.clone(),
        popup: popup_html(&location.name, icon, record),
    }
}

/// Popup body for a marker. All interpolated text is escaped.
#[must_use]
pub fn popup_html(name: &str, icon: IconAsset, record: Option<&WeatherRecord>) -> String {
    let heading = format!(
        r#"<div class="weather-popup-content"><h3>{}</h3>"#,
        escape_html(name)
    );

    let Some(record) = record else {
        return heading + "<p>加载中...</p></div>";
    };

    let description = escape_html(&record.description);
    let date = record
        .forecast_date
        .map(|date| format!("<p><strong>日期:</strong> {date}</p>"))
        .unwrap_or_default();
    let temperature = record
        .temperature
        .map_or_else(|| "--".to_owned(), |t| t.to_string());

    format!(
        concat!(
            "{heading}",
            r#"<img src="{icon}" class="weather-popup-icon" alt="{description}">"#,
            "{date}",
            "<p><strong>温度:</strong> {temperature}°C</p>",
            "<p><strong>天气:</strong> {description}</p>",
            "</div>",
        ),
        heading = heading,
        icon = icon.path(),
        description = description,
        date = date,
        temperature = temperature,
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Stores `record` as the entry's latest and redraws it.
pub fn reconcile<S: MapSurface>(
    surface: &mut S,
    entry: &mut MarkerEntry,
    record: WeatherRecord,
    filter: FilterState,
    tier_visible: bool,
) {
    entry.last_record = Some(record);
    render(surface, entry, filter, tier_visible);
}

/// Redraws an entry from its cached record. Only the differences from what
/// was last drawn reach the surface.
pub fn render<S: MapSurface>(
    surface: &mut S,
    entry: &mut MarkerEntry,
    filter: FilterState,
    tier_visible: bool,
) {
    let visual = marker_visual(
        &entry.location,
        entry.id.tier,
        entry.last_record.as_ref(),
        filter,
        tier_visible,
    );

    if !visual.same_appearance(&entry.visual) {
        surface.apply(entry.handle, &visual);
    }
    if visual.visible != entry.visual.visible {
        surface.set_visible(entry.handle, visual.visible);
    }
    entry.visual = visual;
}
