/*!
 * Mutex
 *
 * Single-owner exclusion lock with FIFO wake-and-retry semantics.
 *
 * # Design
 *
 * Unlocking never hands ownership to a waiter. It clears the owner and
 * resumes the earliest queued task, which then races for the lock again
 * like any other contender. Every check-then-mutate step runs inside the
 * mutex's internal critical section; suspension and resumes happen outside it.
 */

use super::task::{Task, TaskId};
use super::traits::Lockable;
use super::wait_list::WaitList;
use super::wake::{self, PendingWake};
use crate::core::config::SyncConfig;
use crate::core::errors::{FatalConsistencyError, PrimitiveKind};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub(crate) struct MutexState {
    pub(crate) owner: Option<Task>,
    pub(crate) waiting: WaitList<Task>,
}

pub(crate) fn mutex_waiters(state: &mut MutexState) -> &mut WaitList<Task> {
    &mut state.waiting
}

/// Blocking mutual-exclusion lock
///
/// The lock protects no data of its own; callers pair it with whatever they
/// need to guard, usually via [`Mutex::synchronize`]. It is not re-entrant:
/// a task locking a mutex it already holds blocks forever.
///
/// # Examples
///
/// ```
/// use fastsync::Mutex;
///
/// let mutex = Mutex::new();
/// let answer = mutex.synchronize(|| 42);
/// assert_eq!(answer, 42);
/// assert!(!mutex.is_locked());
/// ```
pub struct Mutex {
    state: parking_lot::Mutex<MutexState>,
}

impl Mutex {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::global())
    }

    pub fn with_config(config: &SyncConfig) -> Self {
        Self {
            state: parking_lot::Mutex::new(MutexState {
                owner: None,
                waiting: WaitList::with_config(config),
            }),
        }
    }

    /// Whether any task currently owns the lock
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Whether the calling task owns the lock
    pub fn is_owned_by_current(&self) -> bool {
        self.state.lock().owner.as_ref() == Some(&Task::current())
    }

    /// Id of the owning task, if any
    pub fn owner(&self) -> Option<TaskId> {
        self.state.lock().owner.as_ref().map(Task::id)
    }

    /// Number of tasks blocked in [`Mutex::lock`]
    pub fn num_waiting(&self) -> usize {
        self.state.lock().waiting.len()
    }

    /// Claim the lock if it is free. Never suspends.
    pub fn try_lock(&self) -> bool {
        let mut state = self.state.lock();
        if state.owner.is_some() {
            return false;
        }
        state.owner = Some(Task::current());
        true
    }

    /// Block until the calling task owns the lock
    pub fn lock(&self) {
        let current = Task::current();
        loop {
            {
                let mut state = self.state.lock();
                if state.owner.is_none() {
                    state.owner = Some(current);
                    return;
                }
                state.waiting.push(current.clone());
            }
            current.suspend();
        }
    }

    /// Release the lock and wake the earliest waiter
    ///
    /// Returns `false` without doing anything if the lock was not held.
    pub fn unlock(&self) -> bool {
        self.release_with(|| (), false)
    }

    /// Release the lock, running `action` before any other task can observe
    /// the release
    ///
    /// `action` runs even if the lock was not held, in which case `false` is
    /// returned. If `action` panics the release still completes and a waiter
    /// is still woken.
    pub fn exclusive_unlock<F: FnOnce()>(&self, action: F) -> bool {
        self.release_with(action, true)
    }

    /// Run `action` while holding the lock
    ///
    /// The lock is released on every exit path, including a panic in `action`.
    pub fn synchronize<R, F: FnOnce() -> R>(&self, action: F) -> R {
        let _guard = self.guard();
        action()
    }

    /// Lock and return a guard that unlocks on drop
    pub fn guard(&self) -> MutexGuard<'_> {
        self.lock();
        MutexGuard { mutex: self }
    }

    /// Check that no resumable task is left waiting on this mutex
    pub fn audit(&self) -> Result<(), FatalConsistencyError> {
        let survivors = self.survivors();
        if survivors == 0 {
            return Ok(());
        }
        Err(FatalConsistencyError {
            kind: PrimitiveKind::Mutex,
            address: self as *const Self as usize,
            survivors,
        })
    }

    pub(crate) fn survivors(&self) -> usize {
        self.state.lock().waiting.survivors()
    }

    pub(crate) fn state(&self) -> &parking_lot::Mutex<MutexState> {
        &self.state
    }

    /// Wake the earliest waiter outside the critical section
    pub(crate) fn wake_waiter(&self) -> Option<Task> {
        wake::wake_one(&self.state, mutex_waiters)
    }

    fn release_with<F: FnOnce()>(&self, action: F, run_when_unlocked: bool) -> bool {
        // Must be declared before the state guard so it drops after it
        let mut wake = PendingWake::new(&self.state, mutex_waiters);
        let mut state = self.state.lock();

        if state.owner.take().is_none() {
            if run_when_unlocked {
                action();
            }
            return false;
        }

        wake.arm();
        action();
        drop(state);
        true
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        if let Err(err) = self.audit() {
            err.abort();
        }
    }
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Mutex")
            .field("owner", &state.owner.as_ref().map(Task::id))
            .field("waiting", &state.waiting.len())
            .finish()
    }
}

impl Lockable for Mutex {
    fn acquire(&self) {
        self.lock();
    }

    fn release(&self) -> bool {
        self.unlock()
    }

    fn exclusive_release(&self, action: &mut dyn FnMut()) -> bool {
        self.release_with(action, false)
    }

    fn is_held_by_other(&self) -> bool {
        self.state
            .lock()
            .owner
            .as_ref()
            .map_or(false, |owner| *owner != Task::current())
    }

    fn as_native(&self) -> Option<&Mutex> {
        Some(self)
    }
}

/// Lock state is not persisted; a restored mutex is always unlocked
impl Serialize for Mutex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

impl<'de> Deserialize<'de> for Mutex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <()>::deserialize(deserializer)?;
        Ok(Mutex::new())
    }
}

/// RAII guard returned by [`Mutex::guard`]
#[must_use = "dropping the guard unlocks the mutex immediately"]
pub struct MutexGuard<'a> {
    mutex: &'a Mutex,
}

impl MutexGuard<'_> {
    pub fn mutex(&self) -> &Mutex {
        self.mutex
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..2_000 {
            if condition() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("condition not reached in time");
    }

    #[test]
    fn test_try_lock_and_unlock() {
        let mutex = Mutex::new();
        assert!(!mutex.is_locked());
        assert!(mutex.try_lock());
        assert!(mutex.is_owned_by_current());
        assert_eq!(mutex.owner(), Some(Task::current().id()));
        assert!(!mutex.try_lock());

        assert!(mutex.unlock());
        assert!(!mutex.is_locked());
        assert!(!mutex.unlock());
    }

    #[test]
    fn test_unlock_skips_terminated_waiter() {
        let mutex = Arc::new(Mutex::new());
        mutex.lock();

        let dead = Task::detached();
        mutex.state.lock().waiting.push(dead.clone());
        dead.terminate();

        let contender = {
            let mutex = mutex.clone();
            thread::spawn(move || {
                mutex.lock();
                mutex.unlock()
            })
        };
        wait_for(|| mutex.num_waiting() == 2);

        assert!(mutex.unlock());
        assert!(contender.join().unwrap());
        assert_eq!(mutex.num_waiting(), 0);
    }

    #[test]
    fn test_exclusive_unlock_runs_action_inside_critical_section() {
        let mutex = Mutex::new();
        mutex.lock();

        let mut critical_held = None;
        assert!(mutex.exclusive_unlock(|| {
            // Internal lock is still held here
            critical_held = Some(mutex.state.try_lock().is_none());
        }));
        assert_eq!(critical_held, Some(true));
        assert!(!mutex.is_locked());

        let mut ran = false;
        assert!(!mutex.exclusive_unlock(|| ran = true));
        assert!(ran);
    }

    #[test]
    fn test_exclusive_unlock_panic_still_wakes_waiter() {
        let mutex = Arc::new(Mutex::new());
        mutex.lock();

        let contender = {
            let mutex = mutex.clone();
            thread::spawn(move || mutex.synchronize(|| true))
        };
        wait_for(|| mutex.num_waiting() == 1);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            mutex.exclusive_unlock(|| panic!("action failed"));
        }));
        assert!(result.is_err());

        assert!(contender.join().unwrap());
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_audit_reports_resumable_survivor() {
        let mutex = Mutex::new();
        let stranded = Task::detached();
        mutex.state.lock().waiting.push(stranded.clone());

        let err = mutex.audit().unwrap_err();
        assert_eq!(err.kind, PrimitiveKind::Mutex);
        assert_eq!(err.survivors, 1);
        assert_eq!(err.address, &mutex as *const Mutex as usize);

        // A waiter that can no longer run is not a dropped wakeup
        stranded.terminate();
        assert!(mutex.audit().is_ok());
        mutex.state.lock().waiting.clear();
    }

    /// Set in the child process that performs the fatal drop
    const ABORT_CHILD_ENV: &str = "FASTSYNC_ABORT_CHILD";

    #[test]
    fn test_drop_with_resumable_waiter_aborts() {
        if std::env::var_os(ABORT_CHILD_ENV).is_some() {
            let mutex = Mutex::new();
            mutex.state.lock().waiting.push(Task::detached());
            drop(mutex);
            unreachable!("dropping a mutex with a live waiter must abort");
        }

        let exe = std::env::current_exe().unwrap();
        let output = std::process::Command::new(exe)
            .args([
                "core::sync::mutex::tests::test_drop_with_resumable_waiter_aborts",
                "--exact",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(ABORT_CHILD_ENV, "1")
            .output()
            .unwrap();

        assert!(!output.status.success());
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            assert_eq!(output.status.signal(), Some(6));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("freed with 1 live task(s) waiting"),
            "unexpected child stderr: {}",
            stderr
        );
    }

    #[test]
    fn test_serializes_as_unlocked_placeholder() {
        let mutex = Mutex::new();
        mutex.lock();

        let json = serde_json::to_string(&mutex).unwrap();
        assert_eq!(json, "null");

        let restored: Mutex = serde_json::from_str(&json).unwrap();
        assert!(!restored.is_locked());
        mutex.unlock();
    }
}
