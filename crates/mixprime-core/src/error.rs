//! Error taxonomy for a generation run.

use std::time::Duration;

use thiserror::Error;

/// Failure of the underlying entropy source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("random source unavailable: {0}")]
pub struct RandomSourceError(pub String);

/// Everything a generation run can fail with.
///
/// Per-attempt errors (`PrimeSearchExhausted`) are counted and discarded;
/// every other variant aborts the run and reaches the caller.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    #[error("random source failed on all {attempts} attempts: {source}")]
    RandomSourceFailure {
        attempts: usize,
        #[source]
        source: RandomSourceError,
    },

    #[error("no prime found after {attempts} attempts")]
    PrimeSearchExhausted { attempts: usize },

    #[error(
        "insufficient valid candidates: got {accepted}, need at least 2 \
         ({attempts} attempts, {failed_attempts} failed)"
    )]
    InsufficientCandidates {
        accepted: usize,
        attempts: usize,
        failed_attempts: usize,
    },

    #[error(
        "no candidate in a pool of {pool} differs from best {best:#010X} \
         by at least {min_distance} bits without being a rotation or shift of it"
    )]
    SelectionFailure {
        pool: usize,
        best: u32,
        min_distance: u32,
    },

    #[error("final validation failed: {reason}")]
    FinalValidationFailure { reason: String },

    #[error("generation timed out after {elapsed:?} with {accepted} accepted candidates")]
    Timeout { elapsed: Duration, accepted: usize },

    #[error("generation cancelled with {accepted} accepted candidates")]
    Cancelled { accepted: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            reason: reason.into(),
        }
    }

    /// Whether this error ends the whole run. Per-attempt failures do not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::PrimeSearchExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
