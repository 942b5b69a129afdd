//! Modification-date filtering over listed entries.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::model::DocumentEntry;

/// Inclusive calendar-day range. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included, from its first millisecond.
    pub start: Option<NaiveDate>,
    /// Last day included, up to its last millisecond.
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Range between two optional days.
    #[must_use]
    pub const fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Whether any bound is set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Match against day boundaries in the local time zone.
    #[must_use]
    pub fn matches(&self, entry: &DocumentEntry) -> bool {
        self.matches_in(entry, &Local)
    }

    /// Match against day boundaries in `zone`.
    #[must_use]
    pub fn matches_in<Tz: TimeZone>(&self, entry: &DocumentEntry, zone: &Tz) -> bool {
        if !self.is_active() {
            return true;
        }
        let modified = entry.last_modified;
        let after_start = self
            .start
            .and_then(|day| {
                let start_of_day = NaiveTime::from_hms_opt(0, 0, 0)?;
                boundary_millis(day, start_of_day, zone)
            })
            .is_none_or(|start| modified >= start);
        let before_end = self
            .end
            .and_then(|day| {
                let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?;
                boundary_millis(day, end_of_day, zone)
            })
            .is_none_or(|end| modified <= end);
        after_start && before_end
    }

    /// Keep the entries that fall inside the range, preserving order.
    #[must_use]
    pub fn apply<'a, I>(&self, entries: I) -> Vec<DocumentEntry>
    where
        I: IntoIterator<Item = &'a DocumentEntry>,
    {
        entries
            .into_iter()
            .filter(|entry| self.matches(entry))
            .cloned()
            .collect()
    }
}

fn boundary_millis<Tz: TimeZone>(day: NaiveDate, time: NaiveTime, zone: &Tz) -> Option<i64> {
    zone.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|instant: DateTime<Tz>| instant.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry_at(millis: i64) -> DocumentEntry {
        DocumentEntry {
            name: format!("{millis}.jpg"),
            uri: format!("mem://root/{millis}"),
            mime_type: None,
            size: 1,
            last_modified: millis,
            is_directory: false,
        }
    }

    fn day(year: i32, month: u32, date: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, date).expect("valid date")
    }

    fn millis(year: i32, month: u32, date: u32, hour: u32, minute: u32, second: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, date, hour, minute, second)
            .single()
            .expect("valid instant")
            .timestamp_millis()
    }

    #[test]
    fn inactive_range_matches_everything() {
        let range = DateRange::default();
        assert!(!range.is_active());
        assert!(range.matches_in(&entry_at(0), &Utc));
    }

    #[test]
    fn end_day_is_inclusive_until_last_millisecond() {
        let range = DateRange::new(Some(day(2024, 3, 1)), Some(day(2024, 3, 31)));
        assert!(range.matches_in(&entry_at(millis(2024, 3, 1, 0, 0, 0)), &Utc));
        assert!(range.matches_in(&entry_at(millis(2024, 3, 31, 23, 59, 59) + 999), &Utc));
        assert!(!range.matches_in(&entry_at(millis(2024, 4, 1, 0, 0, 0)), &Utc));
        assert!(!range.matches_in(&entry_at(millis(2024, 2, 29, 23, 59, 59)), &Utc));
    }

    #[test]
    fn open_bounds_only_constrain_one_side() {
        let since = DateRange::new(Some(day(2024, 1, 1)), None);
        assert!(since.matches_in(&entry_at(millis(2030, 1, 1, 0, 0, 0)), &Utc));
        assert!(!since.matches_in(&entry_at(millis(2023, 12, 31, 12, 0, 0)), &Utc));

        let until = DateRange::new(None, Some(day(2024, 1, 1)));
        assert!(until.matches_in(&entry_at(0), &Utc));
        assert!(!until.matches_in(&entry_at(millis(2024, 1, 2, 0, 0, 0)), &Utc));
    }
}
