/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Recoverable errors raised by the mutex, condition variable and queues
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyncError {
    #[error("Not owner")]
    #[diagnostic(
        code(sync::ownership),
        help("Only the task holding the mutex may wait on a condition variable with it.")
    )]
    Ownership,

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(sync::argument), help("Queue capacities must be positive."))]
    Argument(String),

    #[error("queue empty")]
    #[diagnostic(
        code(sync::empty_queue),
        help("Use a blocking pop to wait for a value instead.")
    )]
    EmptyQueue,

    #[error("Malformed queue record: {0}")]
    #[diagnostic(
        code(sync::format),
        help("A persisted queue starts with its capacity followed by the queued values.")
    )]
    Format(String),
}

/// Failure to resume a task that can no longer run
///
/// Never surfaced to callers of the primitives: wake paths skip the task.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeError {
    #[error("Task {0} has terminated")]
    Terminated(u64),
}

/// A primitive was destroyed while a resumable task was still queued on it
///
/// This means a wakeup was dropped somewhere. It is not recoverable: the
/// `Drop` implementations log it and abort the process.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("{kind} {address:#x} freed with {survivors} live task(s) waiting")]
#[diagnostic(code(sync::fatal_consistency))]
pub struct FatalConsistencyError {
    pub kind: PrimitiveKind,
    pub address: usize,
    pub survivors: usize,
}

/// Primitive named in a fatal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Mutex,
    ConditionVariable,
    Queue,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Mutex => "mutex",
            PrimitiveKind::ConditionVariable => "condition variable",
            PrimitiveKind::Queue => "queue",
        };
        f.write_str(name)
    }
}

impl FatalConsistencyError {
    /// Log the violation and abort the process
    pub(crate) fn abort(&self) -> ! {
        tracing::error!(
            kind = %self.kind,
            address = self.address,
            survivors = self.survivors,
            "{}",
            self
        );
        eprintln!("fastsync: [BUG] {}", self);
        std::process::abort()
    }
}
