use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Clock, Config, ParseError, SystemClock, Template, Timestamp, Unit};

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)%d").expect("number token pattern"));
static PLURAL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?i)%n").expect("plural token pattern"));

/// Renders timestamps as relative phrases under one [`Config`].
///
/// The formatter walks the granularity ladder from [`Unit::Seconds`] up. At
/// each eligible unit it first asks whether both instants share that unit's
/// calendar bucket and, if so, emits the current-bucket phrase with no
/// affixes: two instants in the same minute are "this minute" no matter how
/// many seconds apart they are. Only when the walk reaches the configured
/// ceiling without a bucket match does it emit a counted phrase, flooring
/// both instants to the ceiling unit and dividing the difference by the
/// unit's nominal length.
///
/// # Example
///
/// ```rust
/// use relatime::{Config, Formatter, Timestamp, Unit};
///
/// let formatter = Formatter::new(Config::default());
/// let now = Timestamp::from_millis(1_316_169_030_000); // 2011-09-16 10:30:30 UTC
///
/// // Same hour, however far apart the minutes are.
/// let then = Timestamp::from_millis(1_316_167_500_000); // 10:05:00
/// assert_eq!(formatter.in_words(now, then), "this hour");
///
/// // A finer ceiling trades bucket phrases for counts.
/// let capped = Formatter::new(Config::builder().biggest(Unit::Minutes).build());
/// assert_eq!(capped.in_words(now, then), "25 minutes ago");
/// ```
#[derive(Clone, Debug)]
pub struct Formatter<C = SystemClock> {
    config: Config,
    clock: C,
}

impl Formatter<SystemClock> {
    /// A formatter on the system clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for Formatter<SystemClock> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<C> Formatter<C> {
    /// A formatter reading "now" from the given clock.
    pub fn with_clock(config: Config, clock: C) -> Self {
        Self { config, clock }
    }

    /// The settings this formatter renders under.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parses a timestamp string under this formatter's reference zone and
    /// skew. See [`parse`](crate::parse()) for the accepted shapes.
    pub fn parse(&self, text: &str) -> Result<Timestamp, ParseError> {
        crate::parse::parse(text, &self.config)
    }

    /// Phrases the distance from `now` back (or forward) to `then`.
    ///
    /// Never fails: any pair of timestamps yields a phrase, with counted
    /// years as the backstop for distances beyond the ceiling.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn in_words(&self, now: Timestamp, then: Timestamp) -> String {
        let config = &self.config;
        let distance = now.millis_since(then);
        let future = config.allow_future && distance < 0;
        let magnitude = if config.allow_future {
            distance.saturating_abs()
        } else {
            distance
        };

        let local_now = now.at(config.time_zone);
        let local_then = then.at(config.time_zone);

        let counted = |unit: Unit| {
            let count = if unit == Unit::Seconds {
                magnitude.div_euclid(Unit::Seconds.millis())
            } else {
                let span = unit
                    .floor(&local_now)
                    .timestamp_millis()
                    .saturating_sub(unit.floor(&local_then).timestamp_millis());
                let span = if config.allow_future {
                    span.saturating_abs()
                } else {
                    span
                };
                span.div_euclid(unit.millis())
            };
            let words = substitute(
                config.strings.counted(unit),
                count,
                magnitude,
                &config.strings.numbers,
            );
            let (prefix, suffix) = if future {
                (
                    config.strings.prefix_from_now.as_deref(),
                    config.strings.suffix_from_now.as_deref(),
                )
            } else {
                (
                    config.strings.prefix_ago.as_deref(),
                    config.strings.suffix_ago.as_deref(),
                )
            };
            join(prefix, &words, suffix)
        };

        for unit in Unit::ALL {
            if unit.is_eligible(config.smallest) && unit.same_bucket(&local_now, &local_then) {
                let words = substitute(
                    config.strings.current(unit),
                    0,
                    magnitude,
                    &config.strings.numbers,
                );
                // Current-bucket phrases stand alone, affixes stay off.
                return join(None, &words, None);
            }
            if unit.is_terminal(config.biggest) {
                return counted(unit);
            }
        }
        // Years backstop, in case the ceiling test never fired.
        counted(Unit::Years)
    }
}

impl<C: Clock> Formatter<C> {
    /// Phrases the distance from the clock's current time to `then`.
    pub fn format(&self, then: Timestamp) -> String {
        self.in_words(self.clock.now(), then)
    }

    /// Parses `text` and phrases it relative to the clock's current time.
    ///
    /// # Example
    ///
    /// ```rust
    /// use relatime::{Clock, Config, Formatter, Timestamp};
    ///
    /// struct FixedClock(Timestamp);
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> Timestamp {
    ///         self.0
    ///     }
    /// }
    ///
    /// let now = FixedClock(Timestamp::from_millis(1_316_169_030_000));
    /// let formatter = Formatter::with_clock(Config::default(), now);
    /// let phrase = formatter.format_str("2011-09-16T10:05:00Z")?;
    /// assert_eq!(phrase, "this hour");
    /// # Ok::<(), relatime::ParseError>(())
    /// ```
    pub fn format_str(&self, text: &str) -> Result<String, ParseError> {
        let then = self.parse(text)?;
        Ok(self.format(then))
    }
}

/// Realizes a template and fills its `%d` and `%n` tokens.
///
/// Token matching is ASCII case-insensitive and replaces only the first
/// occurrence of each token. The count renders through the numeral table
/// when a non-empty entry exists at that index, digits otherwise.
fn substitute(
    template: &Template,
    count: i64,
    distance_millis: i64,
    numbers: &[Option<Cow<'static, str>>],
) -> String {
    let text = template.realize(count, distance_millis);
    let digits;
    let numeral = match usize::try_from(count)
        .ok()
        .and_then(|index| numbers.get(index))
        .and_then(|entry| entry.as_deref())
        .filter(|word| !word.is_empty())
    {
        Some(word) => word,
        None => {
            digits = count.to_string();
            digits.as_str()
        }
    };
    let text = NUMBER_TOKEN.replace(&text, NoExpand(numeral));
    let plural = if count > 1 { "s" } else { "" };
    PLURAL_TOKEN.replace(&text, NoExpand(plural)).into_owned()
}

/// Space-joins the non-empty parts of a phrase.
fn join(prefix: Option<&str>, words: &str, suffix: Option<&str>) -> String {
    let mut phrase = String::new();
    for part in [prefix, Some(words), suffix].into_iter().flatten() {
        if part.is_empty() {
            continue;
        }
        if !phrase.is_empty() {
            phrase.push(' ');
        }
        phrase.push_str(part);
    }
    phrase
}
