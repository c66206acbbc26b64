//! Error types for target-process operations

use super::address::MemoryAddress;
use super::ProcessId;
use thiserror::Error;

/// Errors surfaced at the [`TargetBackend`](crate::target::TargetBackend) boundary.
///
/// Backends translate native error signalling into these variants; raw OS
/// error codes never escape.
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("Backend is not attached to a process")]
    NotAttached,

    #[error("Process not found: {0}")]
    ProcessNotFound(ProcessId),

    #[error("Access denied to process {pid}: {reason}")]
    AccessDenied { pid: ProcessId, reason: String },

    #[error("Failed to resolve main module: {0}")]
    ModuleResolution(String),

    #[error("Failed to read {size} bytes at {address}")]
    ReadFailed { address: MemoryAddress, size: usize },

    #[error("Failed to write {size} bytes at {address}")]
    WriteFailed { address: MemoryAddress, size: usize },

    #[error("Partial transfer at {address}: expected {expected} bytes, moved {actual}")]
    PartialTransfer {
        address: MemoryAddress,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Unsupported pointer width: {0} bytes")]
    UnsupportedPointerWidth(usize),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for target operations
pub type TargetResult<T> = Result<T, TargetError>;

impl TargetError {
    /// Creates an access denied error for a process
    pub fn access_denied(pid: ProcessId, reason: impl Into<String>) -> Self {
        TargetError::AccessDenied {
            pid,
            reason: reason.into(),
        }
    }

    /// Creates a module resolution error
    pub fn module_resolution(reason: impl Into<String>) -> Self {
        TargetError::ModuleResolution(reason.into())
    }

    /// Creates a read failed error
    pub fn read_failed(address: MemoryAddress, size: usize) -> Self {
        TargetError::ReadFailed { address, size }
    }

    /// Creates a write failed error
    pub fn write_failed(address: MemoryAddress, size: usize) -> Self {
        TargetError::WriteFailed { address, size }
    }

    /// Creates a partial transfer error
    pub fn partial_transfer(address: MemoryAddress, expected: usize, actual: usize) -> Self {
        TargetError::PartialTransfer {
            address,
            expected,
            actual,
        }
    }

    /// True for failures a scanner is expected to hit routinely and skip
    pub fn is_access_fault(&self) -> bool {
        matches!(
            self,
            TargetError::ReadFailed { .. }
                | TargetError::WriteFailed { .. }
                | TargetError::PartialTransfer { .. }
        )
    }
}
