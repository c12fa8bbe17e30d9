//! Year resolution for month/day mentions that carry no year.
//!
//! A yearless mention ("pay insurance jan 22") is anchored to the calendar date
//! its item was created on. The unwindowed form picks the next anniversary on
//! or after that date; the windowed form lists every anniversary inside the
//! query window. Both forms are bounded to a number of calendar years past
//! creation, [`DEFAULT_CAP_YEARS`] unless configured otherwise, so a single
//! mention never turns into an endless yearly series.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

/// Default bound on how far past creation a yearless mention may resolve.
/// A mention yields at most four annual occurrences under it.
pub const DEFAULT_CAP_YEARS: u32 = 3;

/// Candidate years examined by the unwindowed form. Eight years always reaches
/// the next Feb 29, even across a skipped century leap year.
pub const ANNIVERSARY_SEARCH_YEARS: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearlessResolver {
    cap_years: Option<u32>,
}

impl Default for YearlessResolver {
    fn default() -> Self {
        Self::capped(DEFAULT_CAP_YEARS)
    }
}

impl YearlessResolver {
    /// Resolver bounded to `years` calendar years past the creation date.
    pub fn capped(years: u32) -> Self {
        Self {
            cap_years: Some(years),
        }
    }

    /// Resolver with no upper bound; windowed resolution then yields every
    /// anniversary in the window.
    pub fn uncapped() -> Self {
        Self { cap_years: None }
    }

    pub fn from_cap(cap_years: Option<u32>) -> Self {
        Self { cap_years }
    }

    pub fn cap_years(&self) -> Option<u32> {
        self.cap_years
    }

    /// Earliest anniversary of `month`/`day` on or after the creation date.
    pub fn resolve(&self, month: u32, day: u32, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let floor = created_at.date_naive();
        let cap = self.cap_for(floor);
        (floor.year()..=floor.year() + ANNIVERSARY_SEARCH_YEARS)
            .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
            .find(|candidate| *candidate >= floor)
            .filter(|candidate| cap.map_or(true, |cap| *candidate <= cap))
            .map(midnight_utc)
    }

    /// Every anniversary of `month`/`day` inside `[max(start, created), min(end, cap)]`.
    pub fn resolve_in_window(
        &self,
        month: u32,
        day: u32,
        created_at: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let floor = created_at.date_naive();
        let lower = start.max(midnight_utc(floor));
        let upper = match self.cap_for(floor) {
            Some(cap) => end.min(midnight_utc(cap)),
            None => end,
        };
        if lower > upper {
            return Vec::new();
        }

        (lower.year()..=upper.year())
            .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
            .map(midnight_utc)
            .filter(|instant| *instant >= lower && *instant <= upper)
            .collect()
    }

    fn cap_for(&self, floor: NaiveDate) -> Option<NaiveDate> {
        self.cap_years
            .and_then(|years| floor.checked_add_months(Months::new(years.saturating_mul(12))))
    }
}

/// Unwindowed resolution with the default policy.
pub fn resolve(month: u32, day: u32, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    YearlessResolver::default().resolve(month, day, created_at)
}

/// Windowed resolution with the default policy.
pub fn resolve_in_window(
    month: u32,
    day: u32,
    created_at: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    YearlessResolver::default().resolve_in_window(month, day, created_at, start, end)
}

pub(crate) fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
