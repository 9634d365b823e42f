//! Error Module - GC Error Types
//!
//! Defines all error types used by the collector.

use thiserror::Error;

/// Main error type for all GC operations
#[derive(Debug, Error)]
pub enum GcError {
    #[error("out of memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    #[error("index {index} out of range for {slots} slots")]
    IndexOutOfRange { index: usize, slots: usize },

    #[error("handle has no body")]
    NoBody,

    #[error("heap initialization failed: {0}")]
    HeapInitialization(String),

    #[error("forwarding table error: {0}")]
    ForwardingTableError(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GcError {
    /// Whether a caller might reasonably retry after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GcError::OutOfMemory { .. } | GcError::IndexOutOfRange { .. })
    }
}

/// Result type alias for GC operations
pub type Result<T> = std::result::Result<T, GcError>;
