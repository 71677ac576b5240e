//! Forecast date arithmetic.
//!
//! The date picker is bounded to `[today, today + FORECAST_HORIZON_DAYS]`
//! and the chosen date is turned into an offset in whole days, where `0`
//! means current conditions.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use thiserror::Error;

/// Last selectable day, counted from today. The upstream forecast covers
/// five days including today.
pub const FORECAST_HORIZON_DAYS: u32 = 4;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("date {date} is outside the forecast window {first}..={last}")]
pub struct DateOutOfRange {
    pub date: NaiveDate,
    pub first: NaiveDate,
    pub last: NaiveDate,
}

/// Today's date in the map's local timezone.
#[must_use]
pub fn local_today(now: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Whole days from `now` to the start of `selected` (local), rounded up.
///
/// Selecting today always yields `0`; past dates are floored at `0`.
#[must_use]
pub fn offset_days(selected: NaiveDate, now: DateTime<Utc>, tz: FixedOffset) -> u32 {
    let Some(midnight) = selected
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| tz.from_local_datetime(&naive).single())
    else {
        return 0;
    };

    let seconds = midnight.signed_duration_since(now).num_seconds();
    let partial_day = seconds.rem_euclid(SECONDS_PER_DAY) > 0;
    let days = seconds.div_euclid(SECONDS_PER_DAY) + i64::from(partial_day);
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// The range of dates the user may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastWindow {
    first: NaiveDate,
    last: NaiveDate,
}

impl ForecastWindow {
    #[must_use]
    pub fn starting(today: NaiveDate) -> Self {
        Self {
            first: today,
            last: today + Duration::days(i64::from(FORECAST_HORIZON_DAYS)),
        }
    }

    #[must_use]
    pub fn first(&self) -> NaiveDate {
        self.first
    }

    #[must_use]
    pub fn last(&self) -> NaiveDate {
        self.last
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.first..=self.last).contains(&date)
    }

    /// # Errors
    ///
    /// Returns [`DateOutOfRange`] if `date` falls outside the window.
    pub fn check(&self, date: NaiveDate) -> Result<NaiveDate, DateOutOfRange> {
        if self.contains(date) {
            Ok(date)
        } else {
            Err(DateOutOfRange {
                date,
                first: self.first,
                last: self.last,
            })
        }
    }
}
