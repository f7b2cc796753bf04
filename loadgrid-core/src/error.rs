//! Domain errors raised by the matrix engine
//!
//! Calendar keys and color ramps validate eagerly and fail loudly. The pivot
//! and view stages never fail on individual records.

use thiserror::Error;

pub type Result<T, E = LoadgridError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadgridError {
    /// Malformed calendar key, display string or hex color.
    #[error("format error: {0}")]
    Format(String),

    /// Color ramp cannot produce a color (no breakpoints, duplicate or negative keys).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A mutation was submitted before the previous one was refreshed.
    #[error("mutation already in flight for person {person_id}, subject {subject_id}")]
    MutationInFlight { person_id: i64, subject_id: i64 },

    /// Sort request naming a column the matrix cannot be sorted by.
    #[error("unknown sort key \"{0}\" (expected team, name, firstname, subject or type)")]
    UnknownSortKey(String),

    /// A cell edit carried a load outside the accepted monthly range.
    #[error("invalid load {load}: expected a value between 0 and {max}")]
    InvalidLoad { load: i64, max: i64 },
}

impl LoadgridError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        LoadgridError::Format(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        LoadgridError::Configuration(msg.into())
    }
}
