/// A timestamp string that survived normalization but still failed to parse.
///
/// Carries the caller's original input (before any rewriting) so the string
/// can be reported or skipped upstream. The source error is the underlying
/// [`chrono::ParseError`] from the last format attempted.
#[derive(Clone, Debug, thiserror::Error)]
#[error("unrecognized timestamp `{input}`")]
pub struct ParseError {
    pub(crate) input: String,
    #[source]
    pub(crate) source: chrono::ParseError,
}

impl ParseError {
    /// The original input string, untouched by normalization.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// A granularity name that is not one of the six recognized units.
///
/// Unknown names never abort configuration: callers that go through the
/// lenient override path simply keep the default grain. This error only
/// surfaces through [`Unit::from_str`].
///
/// [`Unit::from_str`]: core::str::FromStr::from_str
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown granularity `{name}`; expected one of seconds, minutes, hours, days, months, years")]
pub struct ParseUnitError {
    pub(crate) name: String,
}

impl ParseUnitError {
    /// The rejected name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
