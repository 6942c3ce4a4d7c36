//! Error types for the variscope library.
//!
//! This module provides error handling using the `thiserror` crate, with
//! specific variants for column lookup, data sufficiency, specification
//! limit validation, and drill session navigation.
//!
//! Statistical "not computable" conditions (too few groups, zero variance)
//! are *not* errors: those are returned as `None`/`Option` fields so callers
//! can render an explicit "not enough data" state. Only caller bugs — an
//! unknown column, a filter that is not active, a node id that does not
//! exist — surface as `Err`.

use thiserror::Error;

/// The main error type for the variscope library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The requested column is absent from every row of the dataset.
    #[error("column '{column}' does not exist in the dataset")]
    UnknownColumn {
        /// The missing column name.
        column: String,
    },

    /// Too few valid observations for a statistic that requires a minimum.
    #[error("insufficient data: {needed} valid observations required, got {got}")]
    InsufficientData {
        /// Minimum number of valid observations required.
        needed: usize,
        /// Number of valid observations found.
        got: usize,
    },

    /// Specification limits failed validation.
    #[error("invalid specification limits: {message}")]
    InvalidSpecLimits {
        /// Description of what is invalid.
        message: String,
    },

    /// The node id does not exist in the current drill tree.
    #[error("node {id} does not exist in the drill tree")]
    UnknownNode {
        /// The invalid node id.
        id: usize,
    },

    /// `remove_filter` was called for a factor that is not in the active path.
    #[error("no active filter on factor '{factor}'")]
    FilterNotActive {
        /// The factor that was requested.
        factor: String,
    },

    /// `drill_into` was called for a factor that is already filtered.
    #[error("factor '{factor}' is already filtered on the active path")]
    DuplicateFilter {
        /// The factor that was requested.
        factor: String,
    },
}

/// A specialized `Result` type for variscope operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Create a new `UnknownColumn` error.
    #[must_use]
    pub fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            column: column.into(),
        }
    }

    /// Create a new `InvalidSpecLimits` error.
    #[must_use]
    pub fn invalid_spec_limits(message: impl Into<String>) -> Self {
        Self::InvalidSpecLimits {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_column("pressure");
        assert!(err.to_string().contains("pressure"));
        assert!(err.to_string().contains("does not exist"));

        let err = Error::InsufficientData { needed: 2, got: 1 };
        assert!(err.to_string().contains('2'));
        assert!(err.to_string().contains('1'));

        let err = Error::FilterNotActive {
            factor: "machine".into(),
        };
        assert!(err.to_string().contains("machine"));
    }

    #[test]
    fn test_error_equality() {
        let err1 = Error::unknown_column("a");
        let err2 = Error::unknown_column("a");
        assert_eq!(err1, err2);

        let err3 = Error::unknown_column("b");
        assert_ne!(err1, err3);
    }
}
