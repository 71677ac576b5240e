//! A map surface that draws to the log, and the snapshot line format.

use std::collections::BTreeMap;

use weathermap_core::{Location, LocationId};
use weathermap_map::{MapSurface, MarkerEntry, MarkerHandle, MarkerVisual};

#[derive(Debug, Default)]
pub struct ConsoleSurface {
    markers: BTreeMap<MarkerHandle, LocationId>,
}

impl ConsoleSurface {
    fn id(&self, handle: MarkerHandle) -> String {
        self.markers
            .get(&handle)
            .map_or_else(|| format!("{handle:?}"), ToString::to_string)
    }
}

impl MapSurface for ConsoleSurface {
    fn place_marker(
        &mut self,
        id: LocationId,
        location: &Location,
        visual: &MarkerVisual,
    ) -> MarkerHandle {
        let handle = MarkerHandle(self.markers.len() as u64 + 1);
        self.markers.insert(handle, id);
        tracing::debug!(
            %id,
            name = %location.name,
            lat = location.lat,
            lon = location.lon,
            visible = visual.visible,
            "marker placed"
        );
        handle
    }

    fn apply(&mut self, handle: MarkerHandle, visual: &MarkerVisual) {
        tracing::info!(
            id = %self.id(handle),
            name = %visual.label,
            icon = visual.icon.file_name(),
            size_px = visual.size_px,
            opacity = visual.opacity,
            emphasized = visual.emphasized,
            "marker updated"
        );
    }

    fn set_visible(&mut self, handle: MarkerHandle, visible: bool) {
        tracing::info!(id = %self.id(handle), visible, "marker visibility changed");
    }

    fn open_popup(&mut self, handle: MarkerHandle, popup: &str) {
        tracing::info!(id = %self.id(handle), popup, "popup opened");
    }
}

/// One line of `snapshot` output.
#[must_use]
pub fn snapshot_line(entry: &MarkerEntry) -> String {
    let visual = entry.visual();
    let (temperature, description, date) = match &entry.last_record {
        Some(record) => (
            record
                .temperature
                .map_or_else(|| "--".to_owned(), |t| t.to_string()),
            record.description.as_str(),
            record
                .forecast_date
                .map(|d| format!(" ({d})"))
                .unwrap_or_default(),
        ),
        None => ("--".to_owned(), "pending", String::new()),
    };
    let mark = if visual.emphasized {
        "*"
    } else if visual.is_dimmed() {
        "."
    } else {
        " "
    };

    format!(
        "{mark} {:<6} {:<8} {temperature:>3}°C  {description}{date}  [{}]",
        entry.id.tier.to_string(),
        entry.location.name,
        visual.icon.file_name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use weathermap_client::WeatherRecord;
    use weathermap_core::Tier;
    use weathermap_map::{FilterState, MarkerStore};

    #[test]
    fn snapshot_line_shows_record_and_icon() {
        let mut surface = ConsoleSurface::default();
        let mut store = MarkerStore::new();
        let location = Location {
            name: "北京".to_string(),
            lat: 39.9042,
            lon: 116.4074,
            province: None,
        };
        let id = LocationId {
            tier: Tier::Primary,
            index: 0,
        };

        let entry = store.upsert(&mut surface, id, &location, FilterState::Inactive, true);
        assert!(snapshot_line(entry).contains("pending"));

        weathermap_map::reconcile(
            &mut surface,
            entry,
            WeatherRecord {
                location_name: "北京".to_string(),
                temperature: Some(21),
                description: "晴".to_string(),
                icon_code: "01d".to_string(),
                forecast_date: None,
            },
            FilterState::Inactive,
            true,
        );
        let line = snapshot_line(entry);
        assert!(line.contains("北京"));
        assert!(line.contains("21°C"));
        assert!(line.contains("[sunny.png]"));
        assert!(line.starts_with("  city"));
    }
}
