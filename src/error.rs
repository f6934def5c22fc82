//! Error types for the steamrail kernel

use thiserror::Error;

/// Kernel error kinds.
///
/// `InvalidInput` is always recoverable at the call boundary: it is raised
/// before any state mutation and carries a user-facing message. `Invariant`
/// means the kernel itself (or a variant module) is broken; no partial
/// mutation is trusted after one, though memory is still reset so the next
/// call starts clean.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown variant: {0}")]
    UnknownVariant(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        EngineError::Invariant(msg.into())
    }

    /// True for player-recoverable failures, false for kernel bugs.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
