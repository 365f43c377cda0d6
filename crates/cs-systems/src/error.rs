//! Error types for dynamical system operations.

use cs_core::error::CsError;
use thiserror::Error;

/// Errors raised by system construction, state updates and pin commands.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SystemError {
    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: &'static str },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("State length mismatch: expected {expected}, got {got}")]
    StateLength { expected: usize, got: usize },
}

pub type SystemResult<T> = Result<T, SystemError>;

impl From<SystemError> for CsError {
    fn from(e: SystemError) -> Self {
        match e {
            SystemError::InvalidConfig { what } => CsError::InvalidArg { what },
            SystemError::IndexOob { what, index, len } => CsError::IndexOob { what, index, len },
            SystemError::StateLength { .. } => CsError::InvalidArg {
                what: "state length",
            },
        }
    }
}
