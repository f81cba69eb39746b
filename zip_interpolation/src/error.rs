use snafu::Snafu;

/// Errors raised by the interpolation core.
///
/// Unresolved geography and scopes under the reporting threshold are not errors:
/// they are counted in [`crate::Diagnostics`].
#[derive(Debug, Snafu, Clone, PartialEq)]
#[snafu(visibility(pub))]
pub enum InterpolationError {
    /// A required feed could not be retrieved or parsed, or it held no usable rows.
    #[snafu(display("{feed} is unavailable: {reason}"))]
    DataUnavailable { feed: String, reason: String },

    /// A single row could not be parsed. The row is skipped, the feed is kept.
    #[snafu(display("malformed row {lineno} in {feed}: {reason}"))]
    MalformedRow {
        feed: String,
        lineno: usize,
        reason: String,
    },
}

pub type InterpolationResult<T> = Result<T, InterpolationError>;
