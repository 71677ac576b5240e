//! Marker state store.
//!
//! One [`MarkerEntry`] per location, created on first display and never
//! removed. Keys are [`LocationId`]s so equal names in different tiers stay
//! separate.

use std::collections::BTreeMap;

use weathermap_client::WeatherRecord;
use weathermap_core::{Location, LocationId, Tier};

use crate::filter::FilterState;
use crate::render::{marker_visual, MarkerVisual};
use crate::surface::{MapSurface, MarkerHandle};

#[derive(Debug, Clone)]
pub struct MarkerEntry {
    pub id: LocationId,
    pub location: Location,
    pub handle: MarkerHandle,
    pub last_record: Option<WeatherRecord>,
    /// What the surface currently shows for this marker.
    pub(crate) visual: MarkerVisual,
    /// Sequence number of the newest fetch applied to this entry.
    pub(crate) applied_seq: u64,
}

impl MarkerEntry {
    #[must_use]
    pub fn visual(&self) -> &MarkerVisual {
        &self.visual
    }
}

/// Result of offering a fetch completion to the store.
#[derive(Debug)]
pub enum Acceptance<'a> {
    /// Newer than anything applied so far; the caller should reconcile.
    Fresh(&'a mut MarkerEntry),
    /// A newer fetch for the same entry already landed.
    Stale { newest: u64 },
    /// No entry for this id.
    Unknown,
}

#[derive(Debug, Default)]
pub struct MarkerStore {
    entries: BTreeMap<LocationId, MarkerEntry>,
}

impl MarkerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `id`, placing its marker on `surface` first if
    /// this is the first call for that location.
    pub fn upsert<S: MapSurface>(
        &mut self,
        surface: &mut S,
        id: LocationId,
        location: &Location,
        filter: FilterState,
        tier_visible: bool,
    ) -> &mut MarkerEntry {
        self.entries.entry(id).or_insert_with(|| {
            let visual = marker_visual(location, id.tier, None, filter, tier_visible);
            let handle = surface.place_marker(id, location, &visual);
            tracing::debug!(%id, location = %location.name, ?handle, "marker placed");
            MarkerEntry {
                id,
                location: location.clone(),
                handle,
                last_record: None,
                visual,
                applied_seq: 0,
            }
        })
    }

    #[must_use]
    pub fn get(&self, id: LocationId) -> Option<&MarkerEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: LocationId) -> Option<&mut MarkerEntry> {
        self.entries.get_mut(&id)
    }

    /// First entry in `tier` with this display name.
    #[must_use]
    pub fn get_by_name(&self, tier: Tier, name: &str) -> Option<&MarkerEntry> {
        self.all_entries(tier).find(|e| e.location.name == name)
    }

    pub fn all_entries(&self, tier: Tier) -> impl Iterator<Item = &MarkerEntry> {
        self.entries.values().filter(move |e| e.id.tier == tier)
    }

    pub fn all_entries_mut(&mut self, tier: Tier) -> impl Iterator<Item = &mut MarkerEntry> {
        self.entries.values_mut().filter(move |e| e.id.tier == tier)
    }

    /// Offers a completion carrying sequence number `seq`. Out-of-order
    /// completions older than the newest applied one are rejected.
    pub fn accept(&mut self, id: LocationId, seq: u64) -> Acceptance<'_> {
        let Some(entry) = self.entries.get_mut(&id) else {
            return Acceptance::Unknown;
        };
        if seq < entry.applied_seq {
            return Acceptance::Stale {
                newest: entry.applied_seq,
            };
        }
        entry.applied_seq = seq;
        Acceptance::Fresh(entry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
