use thiserror::Error;

/// Author-facing errors from decoder synthesis and validation.
///
/// Runtime matching failures never surface here: a stored pattern that fails
/// to compile at classification time is logged and treated as a non-match
/// (see `catalog`), so a single corrupted decoder cannot abort a batch.
#[derive(Debug, Error)]
pub enum DecoderError {
    /// Synthesis was attempted with zero usable field annotations.
    #[error("no fields defined for decoder")]
    NoFields,

    /// None of the annotated texts occur in the sample log.
    #[error("defined fields were not found in the sample log")]
    FieldsNotFound,

    /// A hand-edited pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A service needs a non-empty prefilter keyword to shortlist lines.
    #[error("service prefilter keyword must not be empty")]
    EmptyPrefilter,
}
