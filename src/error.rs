//! Error taxonomy: validation errors surfaced at the public boundary,
//! plus the internal `Conflict` value used by propagators and plugins
//! (which is never allowed to escape to a caller as an `Error`).
use std::backtrace::Backtrace;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("variable {var} has an empty initial domain")]
    EmptyDomain { var: u32 },
    #[error("constraint arity mismatch: expected {expected} variables, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("coefficient length mismatch: {vars} variables but {coeffs} coefficients")]
    CoefficientLengthMismatch { vars: usize, coeffs: usize },
    #[error("universe size must be positive, got {0}")]
    NonPositiveUniverse(i64),
    #[error("invalid term shape: {0}")]
    InvalidShape(String),
    #[error("nil argument where a term was required")]
    NilArgument,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation error: {inner}\n{backtrace}")]
    Validation {
        inner: Box<ModelError>,
        backtrace: Box<Backtrace>,
    },
    #[error("hybrid fixed-point loop diverged after {iterations} iterations")]
    Resource { iterations: usize },
    #[error("operation cancelled")]
    Cancelled,
}

impl From<ModelError> for Error {
    fn from(inner: ModelError) -> Self {
        Error::Validation {
            inner: Box::new(inner),
            backtrace: Box::new(Backtrace::capture()),
        }
    }
}

/// A local, non-escaping failure: a propagator or plugin has proven the
/// current branch unsatisfiable. Consumed by search as a backtrack signal,
/// never surfaced across the public boundary (see spec §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub var: Option<u32>,
    pub reason: String,
}

impl Conflict {
    pub fn new(reason: impl Into<String>) -> Conflict {
        Conflict {
            var: None,
            reason: reason.into(),
        }
    }

    pub fn on_var(var: u32, reason: impl Into<String>) -> Conflict {
        Conflict {
            var: Some(var),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.var {
            Some(v) => write!(f, "conflict on var {v}: {}", self.reason),
            None => write!(f, "conflict: {}", self.reason),
        }
    }
}
