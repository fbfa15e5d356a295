//! The `datetime` scalar payload: year, month, day, hour, minute, second as
//! fixed-width fields (`duro/obj/datetimeops.c`).

use chrono::{Datelike, TimeZone, Timelike, Utc};

use crate::error::Error;
use crate::Result;

/// A calendar date and time of day, stored as six fixed-width fields rather than
/// as an opaque timestamp, matching the possrep components
/// `year`/`month`/`day`/`hour`/`minute`/`second` that the selector and getters expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Pre-1924 Julian-calendar leap rule: every year divisible by 4 is a leap year,
/// with no exception for centuries not divisible by 400. From 1924 onward the
/// ordinary Gregorian rule applies.
fn is_leap_year(year: i32) -> bool {
    if year < 1924 {
        year % 4 == 0
    } else {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }
}

fn days_in_month(year: i32, month: u8) -> u8 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS_IN_MONTH[(month - 1) as usize]
    }
}

impl DateTime {
    /// Validates and constructs a `DateTime`. Validates month, day (with the
    /// pre-1924 Julian leap rule), hour, minute and second ranges.
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::invalid_argument(format!("invalid month: {}", month)));
        }
        let max_day = days_in_month(year, month);
        if day < 1 || day > max_day {
            return Err(Error::invalid_argument(format!("invalid day: {}", day)));
        }
        if hour > 23 {
            return Err(Error::invalid_argument(format!("invalid hour: {}", hour)));
        }
        if minute > 59 {
            return Err(Error::invalid_argument(format!("invalid minute: {}", minute)));
        }
        if second > 59 {
            return Err(Error::invalid_argument(format!("invalid second: {}", second)));
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// The current local time, truncated to whole seconds. The kernel has no
    /// concept of time zones beyond what `chrono::Local` resolves at the call
    /// site, matching the source's `now`/`now_utc` pair.
    pub fn now() -> Self {
        let now = chrono::Local::now();
        Self {
            year: now.year(),
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        }
    }

    /// The current UTC time, truncated to whole seconds.
    pub fn now_utc() -> Self {
        let now = Utc::now();
        Self {
            year: now.year(),
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        }
    }

    /// Adds `seconds` (may be negative) and returns the resulting `DateTime`.
    pub fn add_seconds(self, seconds: i64) -> Result<Self> {
        let naive = chrono::NaiveDate::from_ymd_opt(self.year, self.month as u32, self.day as u32)
            .and_then(|d| d.and_hms_opt(self.hour as u32, self.minute as u32, self.second as u32))
            .ok_or_else(|| Error::invalid_argument("invalid datetime"))?;
        let shifted = naive
            .checked_add_signed(chrono::Duration::seconds(seconds))
            .ok_or_else(|| Error::type_constraint_violation("datetime arithmetic overflow"))?;
        Ok(Self {
            year: shifted.year(),
            month: shifted.month() as u8,
            day: shifted.day() as u8,
            hour: shifted.hour() as u8,
            minute: shifted.minute() as u8,
            second: shifted.second() as u8,
        })
    }

    /// Renders as ISO-8601 `YYYY-MM-DDTHH:MM:SS`.
    pub fn to_iso8601(self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }

    /// Parses an ISO-8601 `YYYY-MM-DDTHH:MM:SS` string.
    pub fn parse_iso8601(s: &str) -> Result<Self> {
        let dt = Utc
            .datetime_from_str(&format!("{}+0000", s), "%Y-%m-%dT%H:%M:%S%z")
            .map_err(|e| Error::invalid_argument(format!("invalid datetime literal `{}`: {}", s, e)))?;
        Self::new(
            dt.year(),
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_components() {
        assert!(DateTime::new(2024, 2, 30, 0, 0, 0).is_err());
        assert!(DateTime::new(2024, 13, 1, 0, 0, 0).is_err());
        assert!(DateTime::new(2024, 1, 1, 24, 0, 0).is_err());
    }

    #[test]
    fn julian_leap_rule_applies_before_1924() {
        // 1900 is not a Gregorian leap year but is a Julian one.
        assert!(DateTime::new(1900, 2, 29, 0, 0, 0).is_ok());
        assert!(DateTime::new(1999, 2, 29, 0, 0, 0).is_err());
    }

    #[test]
    fn selector_then_getters_roundtrip() {
        let dt = DateTime::new(2020, 6, 15, 9, 30, 5).unwrap();
        assert_eq!((dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second), (2020, 6, 15, 9, 30, 5));
    }

    #[test]
    fn iso8601_roundtrips() {
        let dt = DateTime::new(2020, 6, 15, 9, 30, 5).unwrap();
        let s = dt.to_iso8601();
        assert_eq!(s, "2020-06-15T09:30:05");
        assert_eq!(DateTime::parse_iso8601(&s).unwrap(), dt);
    }
}
