//! The map session: the single owner of marker state.
//!
//! Fetches are issued back-to-back and complete in any order. Each one is
//! tagged with a session-wide sequence number; the store drops a completion
//! that is older than one already applied to the same entry. Completions are
//! folded in one at a time on the session's own task, so the store is never
//! shared.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use weathermap_client::dates::local_today;
use weathermap_client::{
    offset_days, DateOutOfRange, ForecastWindow, WeatherRecord, WeatherSource,
};
use weathermap_core::{LocationId, LocationRegistry, Tier};

use crate::filter::{FilterState, WeatherCategory};
use crate::render::{reconcile, render};
use crate::store::{Acceptance, MarkerStore};
use crate::surface::MapSurface;

/// Default interval between periodic refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    DateOutOfRange(#[from] DateOutOfRange),

    #[error("no marker for location {0}")]
    UnknownLocation(LocationId),
}

/// User actions delivered to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    ToggleSecondary,
    SelectDate(NaiveDate),
    Refresh,
    Click(LocationId),
    ApplyFilter(Option<WeatherCategory>),
}

struct Completion {
    id: LocationId,
    seq: u64,
    record: WeatherRecord,
    open_popup: bool,
}

pub struct MapSession<S, W> {
    registry: LocationRegistry,
    store: MarkerStore,
    surface: S,
    source: W,
    filter: FilterState,
    secondary_visible: bool,
    secondary_loaded: bool,
    offset_days: u32,
    utc_offset: FixedOffset,
    refresh_interval: Duration,
    next_seq: u64,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
}

impl<S, W> MapSession<S, W>
where
    S: MapSurface,
    W: WeatherSource + Clone + 'static,
{
    pub fn new(registry: LocationRegistry, surface: S, source: W, utc_offset: FixedOffset) -> Self {
        Self {
            registry,
            store: MarkerStore::new(),
            surface,
            source,
            filter: FilterState::Inactive,
            secondary_visible: false,
            secondary_loaded: false,
            offset_days: 0,
            utc_offset,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            next_seq: 0,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Sets the periodic refresh interval used by [`MapSession::run`].
    /// A zero interval is ignored.
    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.refresh_interval = interval;
        }
        self
    }

    #[must_use]
    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    #[must_use]
    pub fn filter(&self) -> FilterState {
        self.filter
    }

    #[must_use]
    pub fn secondary_visible(&self) -> bool {
        self.secondary_visible
    }

    #[must_use]
    pub fn offset_days(&self) -> u32 {
        self.offset_days
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn tier_visible(&self, tier: Tier) -> bool {
        match tier {
            Tier::Primary => true,
            Tier::Secondary => self.secondary_visible,
        }
    }

    /// Places a marker for every primary location and fetches its weather.
    pub fn load_primary(&mut self) {
        let count = self.show_tier(Tier::Primary);
        tracing::info!(count, "primary tier loaded");
    }

    /// Flips secondary-tier visibility and returns the new state.
    ///
    /// The first time the tier is shown its markers are created and fetched.
    /// Later toggles only redraw: hidden markers keep their records and come
    /// back in a state consistent with the current filter.
    pub fn toggle_secondary(&mut self) -> bool {
        self.secondary_visible = !self.secondary_visible;

        if self.secondary_visible && !self.secondary_loaded {
            self.secondary_loaded = true;
            let count = self.show_tier(Tier::Secondary);
            tracing::info!(count, "secondary tier loaded");
        } else {
            self.render_tier(Tier::Secondary);
            tracing::info!(visible = self.secondary_visible, "secondary tier toggled");
        }
        self.secondary_visible
    }

    /// Selects the date to display and refetches every loaded tier.
    ///
    /// Returns the resulting offset in days (0 is current conditions).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DateOutOfRange`] if `date` is outside
    /// `[today, today + 4]`; the selection is left unchanged.
    pub fn select_date(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<u32, SessionError> {
        ForecastWindow::starting(local_today(now, self.utc_offset)).check(date)?;
        self.offset_days = offset_days(date, now, self.utc_offset);
        tracing::info!(%date, offset_days = self.offset_days, "date selected");

        self.fetch_tier(Tier::Primary);
        if self.secondary_loaded {
            self.fetch_tier(Tier::Secondary);
        }
        Ok(self.offset_days)
    }

    /// Refetches the primary tier, and the secondary tier while it is shown.
    pub fn refresh(&mut self) {
        tracing::debug!(secondary = self.secondary_visible, "refresh");
        self.fetch_tier(Tier::Primary);
        if self.secondary_visible {
            self.fetch_tier(Tier::Secondary);
        }
    }

    /// Refetches one location and opens its popup when the result lands.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownLocation`] if no marker exists for `id`.
    pub fn click(&mut self, id: LocationId) -> Result<(), SessionError> {
        if self.store.get(id).is_none() {
            return Err(SessionError::UnknownLocation(id));
        }
        self.issue_fetch(id, true);
        Ok(())
    }

    /// Sets or clears the filter and redraws every visible marker.
    pub fn apply_filter(&mut self, category: Option<WeatherCategory>) {
        self.filter = FilterState::from_category(category);
        tracing::info!(filter = ?self.filter, "filter applied");
        self.render_visible();
    }

    /// Waits for every in-flight fetch and applies the results.
    pub async fn settle(&mut self) {
        while let Some(completion) = self.in_flight.next().await {
            self.complete(completion);
        }
    }

    /// Handles one command from the user.
    ///
    /// # Errors
    ///
    /// As [`MapSession::select_date`] and [`MapSession::click`].
    pub fn dispatch(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::ToggleSecondary => {
                self.toggle_secondary();
            }
            SessionCommand::SelectDate(date) => {
                self.select_date(date, Utc::now())?;
            }
            SessionCommand::Refresh => self.refresh(),
            SessionCommand::Click(id) => self.click(id)?,
            SessionCommand::ApplyFilter(category) => self.apply_filter(category),
        }
        Ok(())
    }

    /// Event loop: commands, the refresh timer, and fetch completions, until
    /// `shutdown` resolves or the command channel closes.
    pub async fn run<F>(&mut self, mut commands: mpsc::Receiver<SessionCommand>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let period = self.refresh_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(refresh_secs = period.as_secs(), "map session running");
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("map session shutting down");
                    break;
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("command channel closed; map session stopping");
                        break;
                    };
                    if let Err(e) = self.dispatch(command) {
                        tracing::warn!(error = %e, "command rejected");
                    }
                }
                _ = ticker.tick() => self.refresh(),
                Some(completion) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.complete(completion);
                }
            }
        }
    }

    /// Creates markers for a tier (idempotent) and fetches all of them.
    fn show_tier(&mut self, tier: Tier) -> usize {
        let visible = self.tier_visible(tier);
        let ids: Vec<LocationId> = self.registry.entries(tier).map(|(id, _)| id).collect();
        for &id in &ids {
            if let Some(location) = self.registry.get(id) {
                self.store
                    .upsert(&mut self.surface, id, location, self.filter, visible);
            }
        }
        self.fetch_tier(tier);
        ids.len()
    }

    fn fetch_tier(&mut self, tier: Tier) {
        let ids: Vec<LocationId> = self.store.all_entries(tier).map(|e| e.id).collect();
        for id in ids {
            self.issue_fetch(id, false);
        }
    }

    fn issue_fetch(&mut self, id: LocationId, open_popup: bool) {
        let Some(location) = self.registry.get(id).cloned() else {
            return;
        };
        self.next_seq += 1;
        let seq = self.next_seq;
        let source = self.source.clone();
        let offset_days = self.offset_days;

        self.in_flight.push(
            async move {
                let record = source.fetch_weather(&location, offset_days).await;
                Completion {
                    id,
                    seq,
                    record,
                    open_popup,
                }
            }
            .boxed(),
        );
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            id,
            seq,
            record,
            open_popup,
        } = completion;
        let visible = self.tier_visible(id.tier);

        match self.store.accept(id, seq) {
            Acceptance::Fresh(entry) => {
                tracing::debug!(
                    %id,
                    location = %entry.location.name,
                    temperature = ?record.temperature,
                    description = %record.description,
                    "reconciling marker"
                );
                reconcile(&mut self.surface, entry, record, self.filter, visible);
            }
            Acceptance::Stale { newest } => {
                tracing::debug!(%id, seq, newest, "discarding out-of-order completion");
            }
            Acceptance::Unknown => {
                tracing::debug!(%id, "completion for unknown marker skipped");
                return;
            }
        }

        if self.filter.is_active() {
            self.render_visible();
        }

        if open_popup {
            if let Some(entry) = self.store.get(id) {
                self.surface.open_popup(entry.handle, &entry.visual().popup);
            }
        }
    }

    fn render_visible(&mut self) {
        self.render_tier(Tier::Primary);
        if self.secondary_visible {
            self.render_tier(Tier::Secondary);
        }
    }

    fn render_tier(&mut self, tier: Tier) {
        let visible = self.tier_visible(tier);
        for entry in self.store.all_entries_mut(tier) {
            render(&mut self.surface, entry, self.filter, visible);
        }
    }
}
