//! Calendar arithmetic behind `TIMESTAMPADD` and `TIMESTAMPDIFF`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::error::{Error, Result};

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    /// Units that move the calendar date without touching the time of day.
    pub fn is_date_granular(&self) -> bool {
        matches!(
            self,
            TimeUnit::Day | TimeUnit::Week | TimeUnit::Month | TimeUnit::Quarter | TimeUnit::Year
        )
    }

    fn months(&self) -> Option<i64> {
        match self {
            TimeUnit::Month => Some(1),
            TimeUnit::Quarter => Some(3),
            TimeUnit::Year => Some(12),
            _ => None,
        }
    }

    fn microseconds(&self) -> Option<i64> {
        match self {
            TimeUnit::Microsecond => Some(1),
            TimeUnit::Millisecond => Some(1_000),
            TimeUnit::Second => Some(1_000_000),
            TimeUnit::Minute => Some(60_000_000),
            TimeUnit::Hour => Some(3_600_000_000),
            TimeUnit::Day => Some(86_400_000_000),
            TimeUnit::Week => Some(7 * 86_400_000_000),
            _ => None,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.to_ascii_uppercase();
        let name = upper.strip_prefix("SQL_TSI_").unwrap_or(&upper);
        match name {
            "MICROSECOND" | "FRAC_SECOND" => Ok(TimeUnit::Microsecond),
            "MILLISECOND" => Ok(TimeUnit::Millisecond),
            "SECOND" => Ok(TimeUnit::Second),
            "MINUTE" => Ok(TimeUnit::Minute),
            "HOUR" => Ok(TimeUnit::Hour),
            "DAY" => Ok(TimeUnit::Day),
            "WEEK" => Ok(TimeUnit::Week),
            "MONTH" => Ok(TimeUnit::Month),
            "QUARTER" => Ok(TimeUnit::Quarter),
            "YEAR" => Ok(TimeUnit::Year),
            _ => Err(Error::Expression(format!("Unsupported time unit: {}", s))),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TimeUnit::Microsecond => "MICROSECOND",
            TimeUnit::Millisecond => "MILLISECOND",
            TimeUnit::Second => "SECOND",
            TimeUnit::Minute => "MINUTE",
            TimeUnit::Hour => "HOUR",
            TimeUnit::Day => "DAY",
            TimeUnit::Week => "WEEK",
            TimeUnit::Month => "MONTH",
            TimeUnit::Quarter => "QUARTER",
            TimeUnit::Year => "YEAR",
        };
        write!(f, "{}", name)
    }
}

fn overflow(unit: TimeUnit, amount: i64) -> Error {
    Error::Expression(format!("Timestamp overflow adding {} {}", amount, unit))
}

/// Shifts `ts` by `amount` units. Month based units clamp to the last day of
/// the target month.
pub fn add(unit: TimeUnit, amount: i64, ts: NaiveDateTime) -> Result<NaiveDateTime> {
    if let Some(months) = unit.months() {
        let total = amount
            .checked_mul(months)
            .ok_or_else(|| overflow(unit, amount))?;
        let magnitude = u32::try_from(total.unsigned_abs()).map_err(|_| overflow(unit, amount))?;
        let shifted = if total >= 0 {
            ts.checked_add_months(Months::new(magnitude))
        } else {
            ts.checked_sub_months(Months::new(magnitude))
        };
        return shifted.ok_or_else(|| overflow(unit, amount));
    }

    let micros = unit
        .microseconds()
        .and_then(|m| m.checked_mul(amount))
        .ok_or_else(|| overflow(unit, amount))?;
    ts.checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(|| overflow(unit, amount))
}

pub fn add_to_date(unit: TimeUnit, amount: i64, date: NaiveDate) -> Result<NaiveDate> {
    Ok(add(unit, amount, date.and_time(NaiveTime::MIN))?.date())
}

/// Whole `unit`s elapsed from `start` to `end`, truncated toward zero.
pub fn diff(unit: TimeUnit, start: NaiveDateTime, end: NaiveDateTime) -> Result<i64> {
    if let Some(months) = unit.months() {
        return Ok(month_diff(start, end) / months);
    }

    let per_unit = unit.microseconds().ok_or_else(|| overflow(unit, 0))?;
    let elapsed = (end - start)
        .num_microseconds()
        .ok_or_else(|| Error::Expression(format!("Interval too large for {}", unit)))?;
    Ok(elapsed / per_unit)
}

fn month_diff(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let mut months = (end.year() as i64 - start.year() as i64) * 12 + end.month() as i64
        - start.month() as i64;

    // back off when the day/time inside the last month has not been reached
    let start_rest = (start.day(), start.time());
    let end_rest = (end.day(), end.time());
    if months > 0 && end_rest < start_rest {
        months -= 1;
    } else if months < 0 && end_rest > start_rest {
        months += 1;
    }
    months
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Expression(format!("Invalid date literal: '{}'", s)))
}

/// Accepts full timestamps as well as bare dates (midnight).
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    parse_date(s)
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| Error::Expression(format!("Invalid timestamp literal: '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn parses_units_with_tsi_prefix() {
        assert_eq!("day".parse::<TimeUnit>().unwrap(), TimeUnit::Day);
        assert_eq!("SQL_TSI_HOUR".parse::<TimeUnit>().unwrap(), TimeUnit::Hour);
        assert!("fortnight".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn add_past_the_calendar_is_an_error() {
        let start = ts("1995-07-06 00:00:00");
        for (unit, amount) in [
            (TimeUnit::Year, i64::MAX),
            (TimeUnit::Month, 10_000_000),
            (TimeUnit::Day, i64::MIN),
            (TimeUnit::Second, 1_000_000_000_000),
        ] {
            assert!(
                matches!(add(unit, amount, start), Err(Error::Expression(_))),
                "{} {}",
                amount,
                unit
            );
        }
        assert!(add_to_date(TimeUnit::Year, i64::MAX, start.date()).is_err());
    }

    #[test]
    fn adds_fixed_units() {
        let base = ts("1995-12-10 02:06:17");
        assert_eq!(add(TimeUnit::Day, 22, base).unwrap(), ts("1996-01-01 02:06:17"));
        assert_eq!(add(TimeUnit::Hour, 21, base).unwrap(), ts("1995-12-10 23:06:17"));
        assert_eq!(add(TimeUnit::Minute, 72, base).unwrap(), ts("1995-12-10 03:18:17"));
        assert_eq!(add(TimeUnit::Second, 105, base).unwrap(), ts("1995-12-10 02:08:02"));
        assert_eq!(add(TimeUnit::Day, -10, base).unwrap(), ts("1995-11-30 02:06:17"));
    }

    #[test]
    fn month_addition_clamps_to_month_end() {
        let base = ts("1996-01-31 10:00:00");
        assert_eq!(add(TimeUnit::Month, 1, base).unwrap(), ts("1996-02-29 10:00:00"));
        assert_eq!(add(TimeUnit::Quarter, -1, base).unwrap(), ts("1995-10-31 10:00:00"));
        assert_eq!(add(TimeUnit::Year, 1, ts("1996-02-29")).unwrap(), ts("1997-02-28"));
    }

    #[test]
    fn date_granular_addition_keeps_dates() {
        let date = parse_date("1995-07-06").unwrap();
        assert_eq!(add_to_date(TimeUnit::Day, 92, date).unwrap(), parse_date("1995-10-06").unwrap());
    }

    #[test]
    fn diff_truncates_toward_zero() {
        let a = ts("1995-03-06 10:50:00");
        let b = ts("1995-12-03 19:50:00");
        assert_eq!(diff(TimeUnit::Day, a, b).unwrap(), 272);
        assert_eq!(diff(TimeUnit::Hour, a, b).unwrap(), 6537);
        assert_eq!(diff(TimeUnit::Minute, a, b).unwrap(), 392_220);
        assert_eq!(diff(TimeUnit::Second, a, b).unwrap(), 23_533_200);
        assert_eq!(diff(TimeUnit::Day, b, a).unwrap(), -272);
    }

    #[test]
    fn diff_between_dates_is_negative_when_reversed() {
        let a = ts("1995-07-06");
        let b = ts("1995-02-06");
        assert_eq!(diff(TimeUnit::Day, a, b).unwrap(), -150);
        assert_eq!(diff(TimeUnit::Hour, a, b).unwrap(), -3600);
    }

    #[test]
    fn month_diff_counts_completed_months() {
        assert_eq!(diff(TimeUnit::Month, ts("1995-01-31"), ts("1995-02-28")).unwrap(), 0);
        assert_eq!(diff(TimeUnit::Month, ts("1995-01-15"), ts("1995-03-15")).unwrap(), 2);
        assert_eq!(diff(TimeUnit::Month, ts("1995-03-15"), ts("1995-01-16")).unwrap(), -1);
        assert_eq!(diff(TimeUnit::Year, ts("1992-06-01"), ts("1998-05-31")).unwrap(), 5);
        assert_eq!(diff(TimeUnit::Quarter, ts("1995-01-01"), ts("1995-12-31")).unwrap(), 3);
    }

    #[test]
    fn parses_dates_as_midnight_timestamps() {
        assert_eq!(ts("1995-07-06").to_string(), "1995-07-06 00:00:00");
        assert!(parse_timestamp("not a date").is_err());
    }
}
