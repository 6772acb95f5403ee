/*!
 * fastsync
 *
 * Blocking synchronization primitives with FIFO wake ordering: a mutex, a
 * condition variable, and unbounded/bounded blocking queues.
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{FatalConsistencyError, PrimitiveKind, SyncError, SyncResult, WakeError};
pub use crate::core::sync::{
    queue, BlockingQueue, ConditionVariable, Lockable, Mutex, MutexGuard, RawLockAdapter, Task,
    TaskId, WaitList, UNBOUNDED,
};
pub use crate::core::SyncConfig;
pub use monitoring::init_tracing;
