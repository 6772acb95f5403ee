/*!
 * Synchronization Primitives
 *
 * Blocking primitives with FIFO wake ordering:
 * - `Mutex`: single-owner lock with wake-and-retry unlocking
 * - `ConditionVariable`: signal/broadcast, waits with any `Lockable`
 * - `BlockingQueue`: unbounded and bounded FIFO queues
 *
 * # Architecture
 *
 * Every primitive keeps its blocked tasks in a `WaitList`, an arena-backed
 * FIFO that recycles nodes. Check-then-mutate steps run under a small
 * internal critical section per primitive; tasks suspend only after leaving
 * it, and are resumed only after it has been released. Resuming a task that
 * has terminated fails quietly and the next waiter is tried.
 *
 * # Consistency
 *
 * Dropping a primitive while a resumable task is still queued on it means a
 * wakeup was lost. `Drop` detects this through `audit()` and aborts.
 */

mod condvar;
mod legacy;
mod mutex;
mod task;
mod traits;
mod wait_list;
mod wake;

pub mod queue;

pub use condvar::ConditionVariable;
pub use legacy::RawLockAdapter;
pub use mutex::{Mutex, MutexGuard};
pub use queue::{BlockingQueue, UNBOUNDED};
pub use task::{Task, TaskId};
pub use traits::Lockable;
pub use wait_list::{Drain, Iter, WaitList};
