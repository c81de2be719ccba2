//! Local calendar days as UTC instant ranges.
//!
//! A note belongs to a local calendar day. On disk the day is keyed by the UTC
//! instant of that day's local midnight, and lookups use the half-open range
//! `[midnight(day), midnight(day + 1))`, so days of 23 or 25 hours around DST
//! transitions are covered exactly.

use chrono::{Datelike, DateTime, Duration, LocalResult, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{Result, StoreError};

/// Granularity used to step over a DST gap that swallows local midnight.
const GAP_STEP_MINUTES: i64 = 15;

/// A day is at most this many gap steps long.
const MAX_GAP_STEPS: i64 = 24 * 60 / GAP_STEP_MINUTES;

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UtcRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A local calendar day together with its UTC range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDay {
    pub date: NaiveDate,
    pub range: UtcRange,
}

/// Resolve `date` in `zone`.
pub fn local_day<Z: TimeZone>(zone: &Z, date: NaiveDate) -> Result<LocalDay> {
    Ok(LocalDay {
        date,
        range: day_range(zone, date)?,
    })
}

/// The UTC instant at which `date` begins in `zone`.
///
/// An ambiguous midnight resolves to the earliest instant; a midnight that
/// falls into a DST gap resolves to the first local time that exists that day.
pub fn local_midnight<Z: TimeZone>(zone: &Z, date: NaiveDate) -> Result<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    for step in 0..=MAX_GAP_STEPS {
        let candidate = midnight + Duration::minutes(step * GAP_STEP_MINUTES);
        match zone.from_local_datetime(&candidate) {
            LocalResult::Single(instant) => return Ok(instant.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => return Ok(earliest.with_timezone(&Utc)),
            LocalResult::None => continue,
        }
    }
    Err(StoreError::InvalidInput(format!(
        "No local time exists on {}",
        date
    )))
}

/// `[midnight(date), midnight(date + 1))` in UTC.
pub fn day_range<Z: TimeZone>(zone: &Z, date: NaiveDate) -> Result<UtcRange> {
    let next = date
        .succ_opt()
        .ok_or_else(|| StoreError::InvalidInput(format!("Date out of range: {}", date)))?;
    Ok(UtcRange {
        start: local_midnight(zone, date)?,
        end: local_midnight(zone, next)?,
    })
}

/// Range of the local calendar month containing `month`, from midnight of
/// day 1 to midnight of day 1 of the following month.
pub fn month_range<Z: TimeZone>(zone: &Z, month: NaiveDate) -> Result<UtcRange> {
    let first = first_of_month(month);
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| StoreError::InvalidInput(format!("Month out of range: {}", month)))?;
    Ok(UtcRange {
        start: local_midnight(zone, first)?,
        end: local_midnight(zone, next)?,
    })
}

/// The local calendar day an instant falls on.
pub fn local_date_of<Z: TimeZone>(zone: &Z, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(zone).date_naive()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month `date` can be in.
    date.with_day0(0).unwrap_or(date)
}
