//! Errors in the library.
use thiserror::Error;

/// Errors raised by the core components and the agents built on them.
#[derive(Debug, Error)]
pub enum DrsacError {
    /// A configuration could not be validated. The object must not be built.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch was requested from a replay buffer without any transition.
    #[error("Cannot sample a batch from an empty replay buffer")]
    EmptyReplayBuffer,

    /// A vector did not have the expected length.
    #[error("Dimension mismatch for {name}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked.
        name: String,
        /// Expected length.
        expected: usize,
        /// Given length.
        actual: usize,
    },

    /// A loss became NaN or infinite during an optimization step.
    #[error("Non-finite value in {0}")]
    NonFiniteLoss(String),

    /// Key was not found in a record.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// A record value had an unexpected type.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
