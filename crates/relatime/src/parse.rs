use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Config, ParseError, Timestamp};

static FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\d\d\d+").expect("fractional seconds pattern"));
static ZONE_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]\d\d):?(\d\d)").expect("zone offset pattern"));

const OFFSET_FORMAT: &str = "%Y/%m/%d %H:%M:%S %z";
const UTC_FORMAT: &str = "%Y/%m/%d %H:%M:%S UTC";
const DATETIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y/%m/%d";

/// Parses a timestamp string into a [`Timestamp`].
///
/// The input is first rewritten into a canonical `YYYY/MM/DD HH:MM:SS` shape:
/// fractional seconds of three or more digits are dropped, the first two `-`
/// become `/`, the first `T` becomes a space, the first `Z` becomes ` UTC`,
/// and a `±HH:MM` or `±HHMM` zone designator is detached with its colon
/// removed. Each rewrite touches only the first occurrence, so ISO 8601
/// variants converge on the same canonical string. The rewrites assume ISO
/// shapes on the way in: a raw input already carrying a ` UTC` designator
/// loses the designator's `T` to the first-match rewrite and fails, and a
/// raw `/`-separated date can only be zoneless.
///
/// A rewritten string with an explicit designator keeps it; a zoneless one is
/// interpreted under the config's reference zone, with a date-only input
/// read as local midnight. The configured skew in seconds is then added to
/// whatever parsed.
///
/// # Example
///
/// ```rust
/// use relatime::{parse, Config};
///
/// let config = Config::default();
/// let a = parse("2011-09-16T10:00:00.123Z", &config)?;
/// let b = parse("2011-09-16 10:00:00+00:00", &config)?;
/// assert_eq!(a.millis(), 1_316_167_200_000);
/// assert_eq!(a, b);
/// # Ok::<(), relatime::ParseError>(())
/// ```
#[cfg_attr(feature = "tracing", instrument(level = "trace", skip(config)))]
pub fn parse(text: &str, config: &Config) -> Result<Timestamp, ParseError> {
    let normalized = normalize(text);
    let millis = parse_normalized(&normalized, config.time_zone).map_err(|source| ParseError {
        input: text.to_owned(),
        source,
    })?;
    Ok(Timestamp::from_millis(
        millis.saturating_add(config.offset.saturating_mul(1_000)),
    ))
}

/// Rewrites `text` into the canonical parse shape. First match only, per
/// rewrite.
pub(crate) fn normalize(text: &str) -> String {
    let text = text.trim();
    let text = FRACTION.replace(text, "");
    let text = text.replacen('-', "/", 1).replacen('-', "/", 1);
    let text = text.replacen('T', " ", 1);
    let text = text.replacen('Z', " UTC", 1);
    ZONE_OFFSET.replace(&text, " $1$2").into_owned()
}

fn parse_normalized(text: &str, zone: FixedOffset) -> Result<i64, chrono::ParseError> {
    if let Ok(dt) = DateTime::parse_from_str(text, OFFSET_FORMAT) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, UTC_FORMAT) {
        return Ok(dt.and_utc().timestamp_millis());
    }
    match NaiveDateTime::parse_from_str(text, DATETIME_FORMAT) {
        Ok(dt) => Ok(resolve(dt, zone)),
        Err(err) => match NaiveDate::parse_from_str(text, DATE_FORMAT) {
            Ok(date) => Ok(resolve(date.and_time(NaiveTime::MIN), zone)),
            // Report the full-datetime error, that is the expected shape.
            Err(_) => Err(err),
        },
    }
}

/// Pins a zoneless datetime to the reference zone.
fn resolve(naive: NaiveDateTime, zone: FixedOffset) -> i64 {
    match naive.and_local_timezone(zone).single() {
        Some(dt) => dt.timestamp_millis(),
        // Only reachable at the very edge of chrono's range, where shifting
        // into UTC overflows. The arithmetic below is the same conversion.
        None => naive
            .and_utc()
            .timestamp_millis()
            .saturating_sub(i64::from(zone.local_minus_utc()) * 1_000),
    }
}
