/*!
 * Task Handles
 *
 * Scheduler boundary for the blocking primitives: a handle to the running
 * task, a cooperative suspend, and a resume that fails for tasks that can no
 * longer run.
 *
 * # Design
 *
 * Parking uses parking_lot_core keyed on the handle's allocation address.
 * Each handle carries a notification token, so a resume that lands before
 * the target has parked is not lost: the next suspend consumes the token and
 * returns immediately.
 */

use crate::core::errors::WakeError;
use parking_lot_core::{park, unpark_one, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier of a task handle, unique for the lifetime of the process
pub type TaskId = u64;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

struct TaskInner {
    id: TaskId,
    notified: AtomicBool,
    terminated: AtomicBool,
}

/// Cloneable handle to a schedulable unit of work
///
/// Handles obtained through [`Task::current`] are bound to the calling
/// thread and are marked terminated when that thread exits. Handles created
/// with [`Task::detached`] belong to an external scheduler, which decides
/// when they terminate.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

/// Terminates the thread's handle when the thread exits
struct ThreadTask(Task);

impl Drop for ThreadTask {
    fn drop(&mut self) {
        self.0.terminate();
    }
}

thread_local! {
    static CURRENT: ThreadTask = ThreadTask(Task::detached());
}

impl Task {
    /// Handle for the currently running thread
    pub fn current() -> Task {
        CURRENT
            .try_with(|task| task.0.clone())
            // Thread-local storage is being torn down; hand out a fresh
            // handle so late callers can still park and be resumed.
            .unwrap_or_else(|_| Task::detached())
    }

    /// Create a handle that is not bound to any thread
    pub fn detached() -> Task {
        Task {
            inner: Arc::new(TaskInner {
                id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
                notified: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Whether a resume would currently succeed
    #[inline]
    pub fn is_resumable(&self) -> bool {
        !self.inner.terminated.load(Ordering::Acquire)
    }

    /// Mark the task as no longer schedulable
    ///
    /// Later resumes fail with [`WakeError::Terminated`]. A thread already
    /// parked on this handle is not woken: cancelling a waiting task is the
    /// scheduler's job.
    pub fn terminate(&self) {
        self.inner.terminated.store(true, Ordering::Release);
    }

    /// Park the calling thread until this task is resumed
    ///
    /// Returns immediately if a resume arrived since the last suspend.
    pub fn suspend(&self) {
        let key = self.park_key();
        while !self.inner.notified.swap(false, Ordering::Acquire) {
            // SAFETY: the key is the address of our Arc allocation, which is
            // alive for the whole call. The validate callback only reads an
            // atomic and never panics or touches parking_lot.
            unsafe {
                park(
                    key,
                    || !self.inner.notified.load(Ordering::Acquire),
                    || {},
                    |_, _| {},
                    DEFAULT_PARK_TOKEN,
                    None,
                );
            }
        }
    }

    /// Make the task runnable again
    pub fn resume(&self) -> Result<(), WakeError> {
        if !self.is_resumable() {
            return Err(WakeError::Terminated(self.id()));
        }

        self.inner.notified.store(true, Ordering::Release);
        // SAFETY: same key as `suspend`; the callback is trivial.
        unsafe {
            unpark_one(self.park_key(), |_| DEFAULT_UNPARK_TOKEN);
        }
        Ok(())
    }

    #[inline]
    fn park_key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Task {}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("resumable", &self.is_resumable())
            .finish()
    }
}
