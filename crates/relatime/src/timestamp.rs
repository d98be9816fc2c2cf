use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, FixedOffset, LocalResult, TimeZone, Utc};

use crate::Unit;

/// A wall-clock instant as signed milliseconds since the Unix epoch.
///
/// Negative values are instants before 1970 and are fully supported: the
/// formatter only ever differences two timestamps and reads calendar fields
/// through [`chrono`].
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use relatime::Timestamp;
///
/// let ts: Timestamp = Utc
///     .with_ymd_and_hms(2011, 9, 16, 10, 0, 0)
///     .unwrap()
///     .into();
/// assert_eq!(ts.millis(), 1_316_167_200_000);
/// assert_eq!(Timestamp::UNIX_EPOCH.millis(), 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    /// Midnight, January 1st 1970, UTC.
    pub const UNIX_EPOCH: Timestamp = Timestamp { millis: 0 };

    /// Builds a timestamp from raw milliseconds since the Unix epoch.
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Milliseconds since the Unix epoch.
    pub const fn millis(self) -> i64 {
        self.millis
    }

    /// Signed distance in milliseconds from `other` to `self`.
    ///
    /// Positive when `self` is later. Saturates instead of wrapping at the
    /// extremes of the representable range.
    pub const fn millis_since(self, other: Timestamp) -> i64 {
        self.millis.saturating_sub(other.millis)
    }

    /// Reads this timestamp's calendar fields under a fixed offset.
    ///
    /// Values outside chrono's representable range are clamped to its edges
    /// first, so the conversion is total.
    pub(crate) fn at(self, zone: FixedOffset) -> DateTime<FixedOffset> {
        // One day of slack keeps the local representation in range for any
        // legal offset after the clamp.
        let min = DateTime::<Utc>::MIN_UTC.timestamp_millis() + Unit::Days.millis();
        let max = DateTime::<Utc>::MAX_UTC.timestamp_millis() - Unit::Days.millis();
        match zone.timestamp_millis_opt(self.millis.clamp(min, max)) {
            LocalResult::Single(dt) => dt,
            // Unreachable under a fixed offset once clamped.
            _ => DateTime::<Utc>::UNIX_EPOCH.with_timezone(&zone),
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        let millis = match t.duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_millis())
                .map_or(i64::MIN, i64::saturating_neg),
        };
        Self { millis }
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Timestamp {
    fn from(dt: DateTime<Tz>) -> Self {
        Self {
            millis: dt.timestamp_millis(),
        }
    }
}

/// A source of "now" timestamps.
///
/// The formatter is generic over its clock so rendering stays deterministic
/// under test. Production code uses [`SystemClock`]; tests substitute a fixed
/// or scripted implementation.
///
/// # Example
///
/// ```rust
/// use relatime::{Clock, Timestamp};
///
/// struct FixedClock(Timestamp);
///
/// impl Clock for FixedClock {
///     fn now(&self) -> Timestamp {
///         self.0
///     }
/// }
///
/// let clock = FixedClock(Timestamp::from_millis(1_316_167_200_000));
/// assert_eq!(clock.now().millis(), 1_316_167_200_000);
/// ```
pub trait Clock {
    /// The current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now().into()
    }
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn millis_round_trip() {
        let ts = Timestamp::from_millis(1_316_167_200_000);
        assert_eq!(ts.millis(), 1_316_167_200_000);
        assert_eq!(Timestamp::from_millis(-1).millis(), -1);
    }

    #[test]
    fn distance_is_signed_and_saturating() {
        let a = Timestamp::from_millis(10);
        let b = Timestamp::from_millis(25);
        assert_eq!(b.millis_since(a), 15);
        assert_eq!(a.millis_since(b), -15);
        assert_eq!(
            Timestamp::from_millis(i64::MAX).millis_since(Timestamp::from_millis(i64::MIN)),
            i64::MAX
        );
    }

    #[test]
    fn datetime_conversion_round_trips() {
        let dt = Utc
            .with_ymd_and_hms(2011, 9, 16, 10, 0, 0)
            .single()
            .expect("valid test datetime");
        let ts = Timestamp::from(dt);
        assert_eq!(ts.millis(), dt.timestamp_millis());
        let back = ts.at(FixedOffset::east_opt(0).expect("utc offset"));
        assert_eq!(back.year(), 2011);
        assert_eq!(back.hour(), 10);
    }

    #[test]
    fn calendar_fields_follow_the_offset() {
        let ts = Timestamp::from_millis(1_316_167_200_000); // 2011-09-16 10:00:00 UTC
        let east = FixedOffset::east_opt(5 * 3600 + 1800).expect("offset in range");
        let local = ts.at(east);
        assert_eq!((local.hour(), local.minute()), (15, 30));
    }

    #[test]
    fn out_of_range_millis_clamp_instead_of_panicking() {
        let zone = FixedOffset::west_opt(11 * 3600).expect("offset in range");
        let far = Timestamp::from_millis(i64::MAX).at(zone);
        let early = Timestamp::from_millis(i64::MIN).at(zone);
        assert!(far.year() > early.year());
    }

    #[test]
    fn pre_epoch_system_time_is_negative() {
        let t = UNIX_EPOCH - std::time::Duration::from_millis(1_500);
        assert_eq!(Timestamp::from(t).millis(), -1_500);
    }

    #[test]
    fn system_clock_is_past_the_epoch() {
        assert!(SystemClock.now() > Timestamp::UNIX_EPOCH);
    }
}
