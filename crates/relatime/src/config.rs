use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};

use crate::Unit;

/// One phrase slot: either literal text or a function of the rendered count.
///
/// Function templates receive the counted magnitude and the raw distance in
/// milliseconds and return the text to render. Their output still goes
/// through `%d` and `%n` substitution, so a function may emit tokens and let
/// the numeral table fill them in. Current-bucket phrases invoke functions
/// with a count of zero.
///
/// # Example
///
/// ```rust
/// use relatime::{Config, Strings, Template, Timestamp, Formatter, Unit};
///
/// let strings = Strings {
///     days: Template::func(|count, _millis| {
///         if count == 1 { "yesterday".into() } else { "%d days".into() }
///     }),
///     suffix_ago: None,
///     ..Strings::default()
/// };
/// let config = Config::builder().biggest(Unit::Days).strings(strings).build();
/// let formatter = Formatter::new(config);
///
/// let now = Timestamp::from_millis(1_316_167_200_000);
/// let day = 86_400_000;
/// assert_eq!(formatter.in_words(now, Timestamp::from_millis(now.millis() - day)), "yesterday");
/// assert_eq!(formatter.in_words(now, Timestamp::from_millis(now.millis() - 3 * day)), "3 days");
/// ```
#[derive(Clone)]
pub enum Template {
    /// Literal text, substituted in place.
    Text(Cow<'static, str>),
    /// Text computed from `(count, distance_millis)`.
    Func(Arc<TemplateFn>),
}

/// Signature of a [`Template::Func`] callback.
pub type TemplateFn = dyn Fn(i64, i64) -> String + Send + Sync;

impl Template {
    /// Wraps a closure as a function template.
    pub fn func(f: impl Fn(i64, i64) -> String + Send + Sync + 'static) -> Self {
        Template::Func(Arc::new(f))
    }

    pub(crate) fn realize(&self, count: i64, distance_millis: i64) -> Cow<'_, str> {
        match self {
            Template::Text(text) => Cow::Borrowed(text.as_ref()),
            Template::Func(f) => Cow::Owned(f(count, distance_millis)),
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Template::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&'static str> for Template {
    fn from(text: &'static str) -> Self {
        Template::Text(Cow::Borrowed(text))
    }
}

impl From<String> for Template {
    fn from(text: String) -> Self {
        Template::Text(Cow::Owned(text))
    }
}

impl From<Cow<'static, str>> for Template {
    fn from(text: Cow<'static, str>) -> Self {
        Template::Text(text)
    }
}

/// The localizable phrase catalog.
///
/// Each unit has a current-bucket phrase ("this hour") and a counted phrase
/// ("%d hour%n"). `%d` becomes the count, spelled through [`numbers`] when an
/// entry exists for it, and `%n` becomes `s` when the count is greater than
/// one. Affixes are joined around counted phrases with single spaces; empty
/// or absent affixes contribute nothing.
///
/// [`numbers`]: Strings::numbers
#[derive(Clone, Debug)]
pub struct Strings {
    pub prefix_ago: Option<Cow<'static, str>>,
    pub prefix_from_now: Option<Cow<'static, str>>,
    pub suffix_ago: Option<Cow<'static, str>>,
    pub suffix_from_now: Option<Cow<'static, str>>,
    pub this_second: Template,
    pub seconds: Template,
    pub this_minute: Template,
    pub minutes: Template,
    pub this_hour: Template,
    pub hours: Template,
    pub this_day: Template,
    pub days: Template,
    pub this_month: Template,
    pub months: Template,
    pub this_year: Template,
    pub years: Template,
    /// Spelled-out numerals, indexed by count. A missing, `None`, or empty
    /// entry falls back to digits.
    pub numbers: Vec<Option<Cow<'static, str>>>,
}

impl Strings {
    pub(crate) fn current(&self, unit: Unit) -> &Template {
        match unit {
            Unit::Seconds => &self.this_second,
            Unit::Minutes => &self.this_minute,
            Unit::Hours => &self.this_hour,
            Unit::Days => &self.this_day,
            Unit::Months => &self.this_month,
            Unit::Years => &self.this_year,
        }
    }

    pub(crate) fn counted(&self, unit: Unit) -> &Template {
        match unit {
            Unit::Seconds => &self.seconds,
            Unit::Minutes => &self.minutes,
            Unit::Hours => &self.hours,
            Unit::Days => &self.days,
            Unit::Months => &self.months,
            Unit::Years => &self.years,
        }
    }
}

impl Default for Strings {
    fn default() -> Self {
        Self {
            prefix_ago: None,
            prefix_from_now: None,
            suffix_ago: Some(Cow::Borrowed("ago")),
            suffix_from_now: Some(Cow::Borrowed("from now")),
            this_second: "this second".into(),
            seconds: "%d second%n".into(),
            this_minute: "this minute".into(),
            minutes: "%d minute%n".into(),
            this_hour: "this hour".into(),
            hours: "%d hour%n".into(),
            this_day: "today".into(),
            days: "%d day%n".into(),
            this_month: "this month".into(),
            months: "%d month%n".into(),
            this_year: "this year".into(),
            years: "%d year%n".into(),
            numbers: Vec::new(),
        }
    }
}

/// Immutable formatter settings.
///
/// Built once through [`Config::builder`] or [`Overrides::apply`] and then
/// shared; a [`Formatter`](crate::Formatter) never mutates its config, so one
/// value can serve any number of renders across threads.
#[derive(Clone, Debug)]
pub struct Config {
    /// Re-render cadence in milliseconds for live updates. Zero disables the
    /// refresh ticker entirely.
    pub refresh_millis: u64,
    /// When `true`, instants later than "now" render with the from-now affix
    /// pair and positive counts. When `false`, future instants keep the ago
    /// pair and their negative counts.
    pub allow_future: bool,
    /// Floor of the granularity ladder. Units finer than this never match.
    pub smallest: Unit,
    /// Ceiling of the granularity ladder. The walk stops counting here.
    pub biggest: Unit,
    /// Constant skew in seconds added to every parsed timestamp.
    pub offset: i64,
    /// Fixed offset under which calendar buckets are read and zoneless
    /// timestamps are interpreted.
    pub time_zone: FixedOffset,
    /// Phrase catalog.
    pub strings: Strings,
}

impl Config {
    /// Starts a builder seeded with the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_millis: 60_000,
            allow_future: false,
            smallest: Unit::Seconds,
            biggest: Unit::Years,
            offset: 0,
            time_zone: Utc.fix(),
            strings: Strings::default(),
        }
    }
}

/// Chained construction for [`Config`].
///
/// # Example
///
/// ```rust
/// use relatime::{Config, Unit};
///
/// let config = Config::builder()
///     .allow_future(true)
///     .smallest(Unit::Minutes)
///     .biggest(Unit::Days)
///     .build();
/// assert!(config.allow_future);
/// assert_eq!(config.smallest, Unit::Minutes);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn refresh_millis(mut self, millis: u64) -> Self {
        self.config.refresh_millis = millis;
        self
    }

    pub fn allow_future(mut self, allow: bool) -> Self {
        self.config.allow_future = allow;
        self
    }

    pub fn smallest(mut self, unit: Unit) -> Self {
        self.config.smallest = unit;
        self
    }

    pub fn biggest(mut self, unit: Unit) -> Self {
        self.config.biggest = unit;
        self
    }

    pub fn offset(mut self, seconds: i64) -> Self {
        self.config.offset = seconds;
        self
    }

    pub fn time_zone(mut self, zone: FixedOffset) -> Self {
        self.config.time_zone = zone;
        self
    }

    pub fn strings(mut self, strings: Strings) -> Self {
        self.config.strings = strings;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// A sparse settings patch, deep-merged over a base [`Config`].
///
/// This is the wire form of configuration: every field is optional, unknown
/// keys are ignored, and an unrecognized grain name leaves the base grain in
/// place rather than failing. With the `serde` feature enabled it
/// deserializes from the camelCase key set (`refreshMillis`, `allowFuture`,
/// `smallestGrain`, `biggestGrain`, `offset`, `strings`).
///
/// # Example
///
/// ```rust
/// # #[cfg(feature = "serde")] {
/// use relatime::{Config, Overrides};
///
/// let overrides: Overrides = serde_json::from_str(
///     r#"{ "allowFuture": true, "strings": { "suffixAgo": "earlier" } }"#,
/// ).unwrap();
/// let config = overrides.apply(Config::default());
/// assert!(config.allow_future);
/// assert_eq!(config.strings.suffix_ago.as_deref(), Some("earlier"));
/// // Untouched slots keep their defaults.
/// assert_eq!(config.refresh_millis, 60_000);
/// # }
/// ```
#[derive(Clone, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct Overrides {
    pub refresh_millis: Option<u64>,
    pub allow_future: Option<bool>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_grain"))]
    pub smallest_grain: Option<Unit>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_grain"))]
    pub biggest_grain: Option<Unit>,
    pub offset: Option<i64>,
    pub strings: StringOverrides,
}

impl Overrides {
    /// Deep-merges this patch over `base`: present fields replace, absent
    /// fields keep the base value, and the phrase catalog merges per slot.
    pub fn apply(self, base: Config) -> Config {
        let mut config = base;
        if let Some(millis) = self.refresh_millis {
            config.refresh_millis = millis;
        }
        if let Some(allow) = self.allow_future {
            config.allow_future = allow;
        }
        if let Some(unit) = self.smallest_grain {
            config.smallest = unit;
        }
        if let Some(unit) = self.biggest_grain {
            config.biggest = unit;
        }
        if let Some(seconds) = self.offset {
            config.offset = seconds;
        }
        self.strings.apply(&mut config.strings);
        config
    }
}

/// The [`Strings`] half of an [`Overrides`] patch.
///
/// All slots take plain text on the wire; function templates are a
/// library-level construct and cannot be expressed here. Setting an affix to
/// the empty string silences it.
#[derive(Clone, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct StringOverrides {
    pub prefix_ago: Option<String>,
    pub prefix_from_now: Option<String>,
    pub suffix_ago: Option<String>,
    pub suffix_from_now: Option<String>,
    pub this_second: Option<String>,
    pub seconds: Option<String>,
    pub this_minute: Option<String>,
    pub minutes: Option<String>,
    pub this_hour: Option<String>,
    pub hours: Option<String>,
    pub this_day: Option<String>,
    pub days: Option<String>,
    pub this_month: Option<String>,
    pub months: Option<String>,
    pub this_year: Option<String>,
    pub years: Option<String>,
    pub numbers: Option<Vec<Option<String>>>,
}

impl StringOverrides {
    fn apply(self, base: &mut Strings) {
        fn affix(slot: &mut Option<Cow<'static, str>>, patch: Option<String>) {
            if let Some(text) = patch {
                *slot = Some(Cow::Owned(text));
            }
        }
        fn phrase(slot: &mut Template, patch: Option<String>) {
            if let Some(text) = patch {
                *slot = text.into();
            }
        }

        affix(&mut base.prefix_ago, self.prefix_ago);
        affix(&mut base.prefix_from_now, self.prefix_from_now);
        affix(&mut base.suffix_ago, self.suffix_ago);
        affix(&mut base.suffix_from_now, self.suffix_from_now);
        phrase(&mut base.this_second, self.this_second);
        phrase(&mut base.seconds, self.seconds);
        phrase(&mut base.this_minute, self.this_minute);
        phrase(&mut base.minutes, self.minutes);
        phrase(&mut base.this_hour, self.this_hour);
        phrase(&mut base.hours, self.hours);
        phrase(&mut base.this_day, self.this_day);
        phrase(&mut base.days, self.days);
        phrase(&mut base.this_month, self.this_month);
        phrase(&mut base.months, self.months);
        phrase(&mut base.this_year, self.this_year);
        phrase(&mut base.years, self.years);
        if let Some(numbers) = self.numbers {
            base.numbers = numbers
                .into_iter()
                .map(|entry| entry.map(Cow::Owned))
                .collect();
        }
    }
}

/// Accepts a grain name but maps unknown names to `None` instead of erroring,
/// so a typo in one key never rejects the whole document.
#[cfg(feature = "serde")]
fn lenient_grain<'de, D>(deserializer: D) -> Result<Option<Unit>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name.and_then(|name| name.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_catalog() {
        let config = Config::default();
        assert_eq!(config.refresh_millis, 60_000);
        assert!(!config.allow_future);
        assert_eq!(config.smallest, Unit::Seconds);
        assert_eq!(config.biggest, Unit::Years);
        assert_eq!(config.offset, 0);
        assert_eq!(config.time_zone.local_minus_utc(), 0);
        assert_eq!(config.strings.prefix_ago, None);
        assert_eq!(config.strings.suffix_ago.as_deref(), Some("ago"));
        assert_eq!(config.strings.suffix_from_now.as_deref(), Some("from now"));
        assert!(config.strings.numbers.is_empty());
    }

    #[test]
    fn builder_sets_every_knob() {
        let zone = FixedOffset::east_opt(3_600).expect("offset in range");
        let config = Config::builder()
            .refresh_millis(0)
            .allow_future(true)
            .smallest(Unit::Minutes)
            .biggest(Unit::Days)
            .offset(-120)
            .time_zone(zone)
            .strings(Strings {
                suffix_ago: Some("earlier".into()),
                ..Strings::default()
            })
            .build();
        assert_eq!(config.refresh_millis, 0);
        assert!(config.allow_future);
        assert_eq!(config.smallest, Unit::Minutes);
        assert_eq!(config.biggest, Unit::Days);
        assert_eq!(config.offset, -120);
        assert_eq!(config.time_zone, zone);
        assert_eq!(config.strings.suffix_ago.as_deref(), Some("earlier"));
    }

    #[test]
    fn templates_realize_text_and_functions() {
        let text = Template::from("%d day%n");
        assert_eq!(text.realize(3, 0), "%d day%n");

        let func = Template::func(|count, millis| format!("{count}/{millis}"));
        assert_eq!(func.realize(2, 9_000), "2/9000");
    }

    #[test]
    fn overrides_merge_per_slot() {
        let overrides = Overrides {
            allow_future: Some(true),
            biggest_grain: Some(Unit::Hours),
            strings: StringOverrides {
                hours: Some("%d hr".to_owned()),
                numbers: Some(vec![None, Some("one".to_owned())]),
                ..StringOverrides::default()
            },
            ..Overrides::default()
        };
        let config = overrides.apply(Config::default());
        assert!(config.allow_future);
        assert_eq!(config.biggest, Unit::Hours);
        // Patched slots replace, the rest keep their defaults.
        assert_eq!(config.strings.hours.realize(0, 0), "%d hr");
        assert_eq!(config.strings.minutes.realize(0, 0), "%d minute%n");
        assert_eq!(config.strings.numbers.len(), 2);
        assert_eq!(config.strings.numbers[1].as_deref(), Some("one"));
        assert_eq!(config.refresh_millis, 60_000);
        assert_eq!(config.smallest, Unit::Seconds);
    }

    #[cfg(feature = "serde")]
    mod wire {
        use super::*;

        #[test]
        fn camel_case_keys_round_trip() {
            let overrides: Overrides = serde_json::from_str(
                r#"{
                    "refreshMillis": 0,
                    "allowFuture": true,
                    "smallestGrain": "minutes",
                    "biggestGrain": "days",
                    "offset": 3600,
                    "strings": {
                        "thisDay": "sometime today",
                        "suffixAgo": "",
                        "numbers": [null, "one", "a couple of"]
                    }
                }"#,
            )
            .expect("well-formed overrides");
            let config = overrides.apply(Config::default());
            assert_eq!(config.refresh_millis, 0);
            assert!(config.allow_future);
            assert_eq!(config.smallest, Unit::Minutes);
            assert_eq!(config.biggest, Unit::Days);
            assert_eq!(config.offset, 3_600);
            assert_eq!(config.strings.this_day.realize(0, 0), "sometime today");
            assert_eq!(config.strings.suffix_ago.as_deref(), Some(""));
            assert_eq!(config.strings.numbers[2].as_deref(), Some("a couple of"));
            assert_eq!(config.strings.numbers[0], None);
        }

        #[test]
        fn unknown_keys_and_grains_are_ignored() {
            let overrides: Overrides = serde_json::from_str(
                r#"{
                    "smallestGrain": "fortnights",
                    "wham": true,
                    "strings": { "eons": "%d eon%n" }
                }"#,
            )
            .expect("unknown keys are skipped");
            let config = overrides.apply(Config::default());
            assert_eq!(config.smallest, Unit::Seconds);
        }

        #[test]
        fn null_grain_keeps_the_default() {
            let overrides: Overrides =
                serde_json::from_str(r#"{ "biggestGrain": null }"#).expect("null is absent");
            assert_eq!(overrides.biggest_grain, None);
        }
    }
}
