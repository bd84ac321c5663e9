//! Unified error type for gridflow.
//!
//! Every fallible operation in the workspace reports a [`GridError`]. The
//! variants mirror how a failure should be handled by the caller:
//!
//! - [`GridError::DataIntegrity`]: the input tables contradict each other.
//!   Fatal, never retried.
//! - [`GridError::InvalidParameter`]: a caller-supplied parameter is out of
//!   range. Raised before any construction work starts.
//! - [`GridError::SolverFailure`]: the max-flow solver failed or returned an
//!   unusable answer. Propagated as-is.
//!
//! # Example
//!
//! ```
//! use gridflow_core::{GridError, GridResult};
//!
//! fn check_capacity(capacity_mw: f64) -> GridResult<f64> {
//!     if capacity_mw > 0.0 {
//!         Ok(capacity_mw)
//!     } else {
//!         Err(GridError::InvalidParameter(format!(
//!             "capacity must be positive, got {capacity_mw}"
//!         )))
//!     }
//! }
//!
//! assert!(check_capacity(-1.0).is_err());
//! ```

use thiserror::Error;

/// Error type for all gridflow operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input tables
    #[error("Parse error: {0}")]
    Parse(String),

    /// Bus and branch tables are internally inconsistent, or a flow
    /// assignment cannot be decomposed
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Out-of-range or non-finite parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Max-flow solver errors
    #[error("Solver failure: {0}")]
    SolverFailure(String),

    /// Unreadable or malformed configuration file
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridError::DataIntegrity("bus 7 has no branches".into());
        assert!(err.to_string().contains("Data integrity error"));
        assert!(err.to_string().contains("bus 7"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GridError = io_err.into();
        assert!(matches!(err, GridError::Io(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = GridError::Config("parsing config file gridflow.toml".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: parsing config file gridflow.toml"
        );
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> GridResult<()> {
            Err(GridError::InvalidParameter("tolerance".into()))
        }

        fn outer() -> GridResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(GridError::InvalidParameter(_))));
    }
}
