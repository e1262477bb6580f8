//! Error types for the client abstraction.
//!
//! All failures surface through the [`Error`] enum. The variants keep the
//! batch-structural / operation-logical distinction first-class: a caller
//! can always tell "the whole batch failed" apart from "one of my
//! operations failed".
//!
//! We use `thiserror` for `Display`/`Error` impls; variants carry typed
//! fields so callers can match on details instead of parsing messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::CommandId;
use crate::types::ExecMode;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Client execution errors.
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Dispatch rejection | `Unsupported` | Refused before any driver call |
/// | Per-operation | `Operation`, `WrongShape` | One queued operation failed |
/// | Batch protocol | `ResultCountMismatch` | Commit result list length broke the invariant |
/// | Batch lifecycle | `Timeout`, `Discarded`, `Closed` | Batch aborted before this result resolved |
/// | System | `Transport`, `Codec` | Infrastructure failures |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Dispatch rejection ====================
    /// Operation not supported by the active driver in the active mode.
    /// Raised before any network interaction.
    #[error("{command} is not supported by driver {driver} in {mode} mode")]
    Unsupported {
        /// The rejected command.
        command: CommandId,
        /// The mode it was dispatched under.
        mode: ExecMode,
        /// Name of the active driver.
        driver: String,
    },

    // ==================== Per-operation ====================
    /// The store reported a failure for this specific operation.
    #[error("{command} failed: {message}")]
    Operation {
        /// The failing command.
        command: CommandId,
        /// Store-reported error text.
        message: String,
    },

    /// The driver produced a raw shape outside the operation's contract.
    #[error("{command} returned {actual}, expected {expected}")]
    WrongShape {
        /// The command whose reply was malformed.
        command: CommandId,
        /// Shape the converter was built for.
        expected: &'static str,
        /// Shape the driver actually produced.
        actual: &'static str,
    },

    // ==================== Batch protocol ====================
    /// Commit returned a raw-result list whose length does not match the
    /// pending queue. Fatal: indicates a driver/core mismatch or state
    /// corruption, never retried.
    #[error("incorrect transaction result count: expected {expected}, got {actual}")]
    ResultCountMismatch {
        /// Number of queued operations.
        expected: usize,
        /// Number of raw results the driver returned.
        actual: usize,
    },

    // ==================== Batch lifecycle ====================
    /// The batch did not complete within the configured deadline.
    #[error("batch did not complete within {elapsed:?}")]
    Timeout {
        /// The deadline that elapsed.
        elapsed: Duration,
    },

    /// The owning transaction was discarded before this result resolved.
    #[error("transaction discarded")]
    Discarded,

    /// The owning batch was closed before this result resolved.
    #[error("batch closed before completion")]
    Closed,

    // ==================== System ====================
    /// Connection-level failure reported by the driver.
    #[error("transport error: {reason}")]
    Transport {
        /// Driver-reported reason.
        reason: String,
    },

    /// Value encoding/decoding failure.
    #[error("codec error: {reason}")]
    Codec {
        /// Underlying codec failure.
        reason: String,
    },
}

impl Error {
    /// Returns `true` for failures scoped to a single operation rather
    /// than the whole batch.
    pub fn is_operation_scoped(&self) -> bool {
        matches!(self, Error::Operation { .. } | Error::WrongShape { .. })
    }

    /// Returns `true` for fatal batch-protocol violations that must never
    /// be retried.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::ResultCountMismatch { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport {
            reason: err.to_string(),
        }
    }
}
