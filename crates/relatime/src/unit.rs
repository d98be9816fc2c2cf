use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Timelike};

use crate::ParseUnitError;

/// Calendar granularity, ordered from finest to coarsest.
///
/// The formatter walks these in declaration order, so `Seconds < Minutes <
/// ... < Years` both for `Ord` and for the eligibility test below.
///
/// # Example
///
/// ```rust
/// use relatime::Unit;
///
/// assert!(Unit::Seconds < Unit::Years);
/// assert_eq!("days".parse::<Unit>(), Ok(Unit::Days));
/// assert_eq!(Unit::Months.to_string(), "months");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Unit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl Unit {
    /// Every unit, finest first. This is the ladder the formatter climbs.
    pub const ALL: [Unit; 6] = [
        Unit::Seconds,
        Unit::Minutes,
        Unit::Hours,
        Unit::Days,
        Unit::Months,
        Unit::Years,
    ];

    /// Whether this unit is at least as coarse as the configured floor.
    ///
    /// Ineligible units are skipped without a bucket test, which is how a
    /// `smallest` of [`Unit::Minutes`] turns two instants in the same second
    /// into "this minute" rather than "this second".
    pub const fn is_eligible(self, smallest: Unit) -> bool {
        self as u8 >= smallest as u8
    }

    /// Whether this unit is the configured ceiling and must emit a counted
    /// phrase when its bucket test fails.
    pub const fn is_terminal(self, biggest: Unit) -> bool {
        self as u8 == biggest as u8
    }

    /// Nominal length of one unit in milliseconds.
    ///
    /// Months and years use fixed 31-day and 372-day lengths, so the counted
    /// phrases for the coarse units are approximations that undershoot. Small
    /// counts follow from that: two instants one calendar year apart floor to
    /// a 365 or 366 day difference and divide to zero.
    pub(crate) const fn millis(self) -> i64 {
        match self {
            Unit::Seconds => 1_000,
            Unit::Minutes => 60_000,
            Unit::Hours => 3_600_000,
            Unit::Days => 86_400_000,
            Unit::Months => 31 * 86_400_000,
            Unit::Years => 372 * 86_400_000,
        }
    }

    /// Whether `a` and `b` fall in the same calendar bucket at this unit:
    /// every field from this unit up through the year must match pairwise.
    pub(crate) fn same_bucket(self, a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>) -> bool {
        match self {
            Unit::Years => a.year() == b.year(),
            Unit::Months => Unit::Years.same_bucket(a, b) && a.month() == b.month(),
            Unit::Days => Unit::Months.same_bucket(a, b) && a.day() == b.day(),
            Unit::Hours => Unit::Days.same_bucket(a, b) && a.hour() == b.hour(),
            Unit::Minutes => Unit::Hours.same_bucket(a, b) && a.minute() == b.minute(),
            Unit::Seconds => Unit::Minutes.same_bucket(a, b) && a.second() == b.second(),
        }
    }

    /// Floor `dt` to the start of its bucket at this unit.
    ///
    /// Days clear the time of day, months additionally pin the day to the
    /// 1st, and years pin both day and month.
    pub(crate) fn floor(self, dt: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let tz = dt.timezone();
        let (y, mo, d) = (dt.year(), dt.month(), dt.day());
        let (h, mi, s) = (dt.hour(), dt.minute(), dt.second());
        let floored = match self {
            Unit::Seconds => tz.with_ymd_and_hms(y, mo, d, h, mi, s),
            Unit::Minutes => tz.with_ymd_and_hms(y, mo, d, h, mi, 0),
            Unit::Hours => tz.with_ymd_and_hms(y, mo, d, h, 0, 0),
            Unit::Days => tz.with_ymd_and_hms(y, mo, d, 0, 0, 0),
            Unit::Months => tz.with_ymd_and_hms(y, mo, 1, 0, 0, 0),
            Unit::Years => tz.with_ymd_and_hms(y, 1, 1, 0, 0, 0),
        };
        // Fixed offsets have no gaps or folds, and the fields come from a
        // real instant, so the rebuild is always a single valid datetime.
        floored.single().unwrap_or(*dt)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Unit::Seconds => "seconds",
            Unit::Minutes => "minutes",
            Unit::Hours => "hours",
            Unit::Days => "days",
            Unit::Months => "months",
            Unit::Years => "years",
        };
        f.write_str(name)
    }
}

impl FromStr for Unit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seconds" => Ok(Unit::Seconds),
            "minutes" => Ok(Unit::Minutes),
            "hours" => Ok(Unit::Hours),
            "days" => Ok(Unit::Days),
            "months" => Ok(Unit::Months),
            "years" => Ok(Unit::Years),
            _ => Err(ParseUnitError { name: s.to_owned() }),
        }
    }
}
