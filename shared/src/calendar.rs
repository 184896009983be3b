//! Business-local calendar: which day "today" is and which instants belong to it

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Calendar of a business operating at a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusinessCalendar {
    utc_offset_minutes: i32,
}

impl BusinessCalendar {
    pub fn new(utc_offset_minutes: i32) -> LedgerResult<Self> {
        FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            LedgerError::InvalidPeriod(format!("UTC offset of {} minutes", utc_offset_minutes))
        })?;
        Ok(Self { utc_offset_minutes })
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }

    fn offset(&self) -> Duration {
        Duration::minutes(i64::from(self.utc_offset_minutes))
    }

    /// Business date an instant falls on
    pub fn business_date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        let naive = instant.naive_utc();
        naive
            .checked_add_signed(self.offset())
            .unwrap_or(naive)
            .date()
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.business_date_of(now)
    }

    /// Half-open UTC interval `[start, end)` covering one business date.
    /// Fails for dates whose bounds fall outside the representable range.
    pub fn day_bounds(&self, date: NaiveDate) -> LedgerResult<(DateTime<Utc>, DateTime<Utc>)> {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let start = local_midnight
            .checked_sub_signed(self.offset())
            .ok_or(LedgerError::DateOutOfRange(date))?;
        let end = start
            .checked_add_signed(Duration::days(1))
            .ok_or(LedgerError::DateOutOfRange(date))?;
        Ok((Utc.from_utc_datetime(&start), Utc.from_utc_datetime(&end)))
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
