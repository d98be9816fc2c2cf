use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use chrono::FixedOffset;
use clap::Parser;
use relatime::{Config, Overrides, ParseUnitError, Unit};

/// Runtime configuration for the `relatime` binary.
///
/// Settings layer in three steps: library defaults first, then a JSON
/// overrides file when one is given, then individual CLI flags on top. All
/// flags also read from environment variables, so a wrapper script can pin a
/// house style without spelling out arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "relatime",
    version,
    about = "Render timestamps as relative phrases, one-shot or live"
)]
pub struct CliArgs {
    /// Timestamps to render: ISO 8601 (`2011-09-16T10:00:00Z`, `Z` or
    /// numeric offset or neither) or zoneless `YYYY/MM/DD HH:MM:SS`.
    #[arg(required = true)]
    pub timestamps: Vec<String>,

    /// JSON overrides file, deep-merged over the defaults before any flags
    /// apply. Uses the camelCase key set (`refreshMillis`, `allowFuture`,
    /// `smallestGrain`, `biggestGrain`, `offset`, `strings`).
    ///
    /// Environment variable: `RELATIME_CONFIG`
    #[arg(long, env = "RELATIME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Phrase instants later than now as "from now" instead of carrying a
    /// negative count into the ago phrasing.
    ///
    /// Environment variable: `RELATIME_ALLOW_FUTURE`
    #[arg(long, env = "RELATIME_ALLOW_FUTURE", default_value_t = false)]
    pub allow_future: bool,

    /// Finest granularity the phrasing may settle on.
    ///
    /// Environment variable: `RELATIME_SMALLEST`
    #[arg(long, env = "RELATIME_SMALLEST", value_parser = grain)]
    pub smallest: Option<Unit>,

    /// Coarsest granularity; distances past it are counted in this unit.
    ///
    /// Environment variable: `RELATIME_BIGGEST`
    #[arg(long, env = "RELATIME_BIGGEST", value_parser = grain)]
    pub biggest: Option<Unit>,

    /// Skew in seconds added to every parsed timestamp.
    ///
    /// Environment variable: `RELATIME_OFFSET`
    #[arg(long, env = "RELATIME_OFFSET", allow_negative_numbers = true)]
    pub offset: Option<i64>,

    /// Reference zone for calendar buckets and zoneless inputs, as a UTC
    /// offset: `+05:30`, `-0400`, or `+02`.
    ///
    /// Environment variable: `RELATIME_ZONE`
    #[arg(long, env = "RELATIME_ZONE", allow_hyphen_values = true)]
    pub zone: Option<String>,

    /// Re-render cadence in milliseconds for `--watch`.
    ///
    /// Environment variable: `RELATIME_REFRESH_MILLIS`
    #[arg(long, env = "RELATIME_REFRESH_MILLIS")]
    pub refresh_millis: Option<u64>,

    /// Keep re-rendering on the refresh cadence until interrupted.
    #[arg(short, long, default_value_t = false)]
    pub watch: bool,
}

fn grain(s: &str) -> Result<Unit, ParseUnitError> {
    Unit::from_str(s)
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub config: Config,
    pub inputs: Vec<String>,
    pub watch: bool,
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let mut config = match &args.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading overrides from {}", path.display()))?;
                let overrides: Overrides = serde_json::from_str(&text)
                    .with_context(|| format!("parsing overrides from {}", path.display()))?;
                overrides.apply(Config::default())
            }
            None => Config::default(),
        };

        if let Some(millis) = args.refresh_millis {
            config.refresh_millis = millis;
        }
        if args.allow_future {
            config.allow_future = true;
        }
        if let Some(unit) = args.smallest {
            config.smallest = unit;
        }
        if let Some(unit) = args.biggest {
            config.biggest = unit;
        }
        if let Some(seconds) = args.offset {
            config.offset = seconds;
        }
        if let Some(zone) = &args.zone {
            config.time_zone = parse_zone(zone)?;
        }

        if args.watch && config.refresh_millis == 0 {
            bail!("--watch needs a cadence; set --refresh-millis above zero");
        }

        Ok(Self {
            config,
            inputs: args.timestamps,
            watch: args.watch,
        })
    }
}

/// Parses `+HH`, `+HHMM`, or `+HH:MM` (and their `-` forms) into an offset.
fn parse_zone(text: &str) -> anyhow::Result<FixedOffset> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits = digits.replace(':', "");
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("zone `{text}` must look like +HH, +HHMM, or +HH:MM");
    }
    let (hours, minutes): (i32, i32) = match digits.len() {
        2 => (digits.parse()?, 0),
        4 => (digits[..2].parse()?, digits[2..].parse()?),
        _ => bail!("zone `{text}` must look like +HH, +HHMM, or +HH:MM"),
    };
    if minutes >= 60 {
        bail!("zone `{text}` has more than 59 minutes");
    }
    let seconds = hours * 3_600 + minutes * 60;
    let seconds = if negative { -seconds } else { seconds };
    FixedOffset::east_opt(seconds)
        .ok_or_else(|| anyhow::anyhow!("zone `{text}` is out of range (max +23:59)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn zone_shapes_parse_to_the_same_offset() {
        let expected = FixedOffset::east_opt(5 * 3_600 + 1_800).expect("offset in range");
        assert_eq!(parse_zone("+05:30").expect("parses"), expected);
        assert_eq!(parse_zone("+0530").expect("parses"), expected);
        assert_eq!(
            parse_zone("-0400").expect("parses"),
            FixedOffset::west_opt(4 * 3_600).expect("offset in range")
        );
        assert_eq!(
            parse_zone("+02").expect("parses"),
            FixedOffset::east_opt(2 * 3_600).expect("offset in range")
        );
        assert!(parse_zone("+5").is_err());
        assert!(parse_zone("+05:75").is_err());
        assert!(parse_zone("+99:00").is_err());
    }

    #[test]
    fn flags_override_the_defaults() {
        let cli = CliConfig::try_from(args(&[
            "relatime",
            "--allow-future",
            "--smallest",
            "minutes",
            "--biggest",
            "days",
            "--offset",
            "-120",
            "--zone",
            "+01",
            "2011-09-16T10:00:00Z",
        ]))
        .expect("valid configuration");
        assert!(cli.config.allow_future);
        assert_eq!(cli.config.smallest, Unit::Minutes);
        assert_eq!(cli.config.biggest, Unit::Days);
        assert_eq!(cli.config.offset, -120);
        assert_eq!(cli.config.time_zone.local_minus_utc(), 3_600);
        assert_eq!(cli.inputs, vec!["2011-09-16T10:00:00Z".to_owned()]);
        assert!(!cli.watch);
    }

    #[test]
    fn unknown_grain_is_a_flag_error() {
        assert!(CliArgs::try_parse_from(["relatime", "--smallest", "fortnights", "x"]).is_err());
    }

    #[test]
    fn watch_requires_a_cadence() {
        let err = CliConfig::try_from(args(&[
            "relatime",
            "--watch",
            "--refresh-millis",
            "0",
            "2011-09-16T10:00:00Z",
        ]))
        .expect_err("zero cadence cannot watch");
        assert!(err.to_string().contains("--refresh-millis"));
    }
}
