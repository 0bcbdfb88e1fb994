//! Errors raised while setting up a problem or a solver.
//!
//! Nothing in here is produced by a running search: a non-finite objective value
//! or a collapsed simplex ends a run with a [`Termination`](crate::Termination)
//! instead.

use thiserror::Error;

/// A result type for solver construction.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors, all detected before the first objective call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// `lb`, `ub` and the integrality mask must all have the same length.
    #[error("dimension mismatch: {lower} lower bounds, {upper} upper bounds, {integer} integrality flags")]
    DimensionMismatch {
        lower: usize,
        upper: usize,
        integer: usize,
    },

    #[error("a problem needs at least one decision variable")]
    EmptyProblem,

    #[error("bound of variable {index} is not finite")]
    NonFiniteBound { index: usize },

    #[error("lower bound {lower} exceeds upper bound {upper} for variable {index}")]
    InvertedBounds { index: usize, lower: f64, upper: f64 },

    /// An integer variable whose box `[lower, upper]` holds no integer.
    #[error("integer variable {index} has no integer in [{lower}, {upper}]")]
    EmptyIntegerRange { index: usize, lower: f64, upper: f64 },

    #[error("initial points have {found} columns, expected {expected}")]
    InitialPointDimension { expected: usize, found: usize },

    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

impl Error {
    pub(crate) fn setting(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidSetting {
            name,
            reason: reason.into(),
        }
    }
}
