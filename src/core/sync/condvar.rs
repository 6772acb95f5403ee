/*!
 * Condition Variable
 *
 * FIFO signaling primitive used together with a lock. Waiting releases the
 * lock, suspends until signaled, then re-acquires the lock through the full
 * locking protocol (never a direct handoff).
 */

use super::mutex::{Mutex, MutexState};
use super::task::Task;
use super::traits::Lockable;
use super::wait_list::WaitList;
use super::wake;
use crate::core::config::SyncConfig;
use crate::core::errors::{FatalConsistencyError, PrimitiveKind, SyncError, SyncResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

struct CondvarState {
    waiting: WaitList<Task>,
}

fn condvar_waiters(state: &mut CondvarState) -> &mut WaitList<Task> {
    &mut state.waiting
}

/// Outcome of releasing a native mutex on the way into a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    Released,
    Unowned,
    NotOwner,
}

/// Condition variable that works with any [`Lockable`]
///
/// # Examples
///
/// ```
/// use fastsync::{ConditionVariable, Mutex};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::thread;
///
/// let pair = Arc::new((Mutex::new(), ConditionVariable::new(), AtomicBool::new(false)));
/// let waiter = {
///     let pair = pair.clone();
///     thread::spawn(move || {
///         let (mutex, condvar, ready) = &*pair;
///         mutex.synchronize(|| {
///             while !ready.load(Ordering::Acquire) {
///                 condvar.wait(mutex).unwrap();
///             }
///         });
///     })
/// };
///
/// let (mutex, condvar, ready) = &*pair;
/// mutex.synchronize(|| {
///     ready.store(true, Ordering::Release);
///     condvar.signal();
/// });
/// waiter.join().unwrap();
/// ```
pub struct ConditionVariable {
    state: parking_lot::Mutex<CondvarState>,
}

impl ConditionVariable {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::global())
    }

    pub fn with_config(config: &SyncConfig) -> Self {
        Self {
            state: parking_lot::Mutex::new(CondvarState {
                waiting: WaitList::with_config(config),
            }),
        }
    }

    /// Release `lock`, wait for a signal, then re-acquire `lock`
    ///
    /// If nobody holds `lock` this returns `Ok(())` at once: the caller is
    /// not enqueued and does not suspend. That holds for a native [`Mutex`]
    /// and for any other [`Lockable`] alike. Callers should re-check their
    /// condition in a loop anyway.
    ///
    /// # Errors
    ///
    /// [`SyncError::Ownership`] if the lock is held by another task.
    pub fn wait<L: Lockable + ?Sized>(&self, lock: &L) -> SyncResult<()> {
        if let Some(mutex) = lock.as_native() {
            return self.wait_native(mutex);
        }

        // Only the caller can change whether it holds the lock
        if lock.is_held_by_other() {
            return Err(SyncError::Ownership);
        }

        // Locks from outside the crate: enqueue as part of their release
        let current = Task::current();
        let mut enqueue = || self.state.lock().waiting.push(current.clone());
        if !lock.exclusive_release(&mut enqueue) {
            return Ok(());
        }
        current.suspend();
        lock.acquire();
        Ok(())
    }

    /// Wake the earliest waiter. No-op if nobody waits.
    pub fn signal(&self) {
        wake::wake_one(&self.state, condvar_waiters);
    }

    /// Wake every waiter; each re-acquires its lock independently
    pub fn broadcast(&self) {
        wake::wake_all(&self.state, condvar_waiters);
    }

    /// Number of tasks waiting for a signal
    pub fn num_waiting(&self) -> usize {
        self.state.lock().waiting.len()
    }

    /// Check that no resumable task is left waiting
    pub fn audit(&self) -> Result<(), FatalConsistencyError> {
        let survivors = self.survivors();
        if survivors == 0 {
            return Ok(());
        }
        Err(FatalConsistencyError {
            kind: PrimitiveKind::ConditionVariable,
            address: self as *const Self as usize,
            survivors,
        })
    }

    pub(crate) fn survivors(&self) -> usize {
        self.state.lock().waiting.survivors()
    }

    /// Wait with a mutex the caller is known to hold
    pub(crate) fn wait_held(&self, mutex: &Mutex) {
        let current = Task::current();
        let outcome = self.release_and_enqueue(mutex, &current);
        debug_assert_eq!(outcome, Release::Released);
        if outcome == Release::Released {
            current.suspend();
            mutex.lock();
        }
    }

    fn wait_native(&self, mutex: &Mutex) -> SyncResult<()> {
        let current = Task::current();
        match self.release_and_enqueue(mutex, &current) {
            Release::Unowned => Ok(()),
            Release::NotOwner => Err(SyncError::Ownership),
            Release::Released => {
                current.suspend();
                mutex.lock();
                Ok(())
            }
        }
    }

    /// Check ownership, enqueue on this condvar and clear the owner in one
    /// critical section of the mutex, then wake one of its waiters
    fn release_and_enqueue(&self, mutex: &Mutex, current: &Task) -> Release {
        {
            let mut state: parking_lot::MutexGuard<'_, MutexState> = mutex.state().lock();
            match &state.owner {
                None => return Release::Unowned,
                Some(owner) if owner != current => return Release::NotOwner,
                Some(_) => {}
            }

            // Lock order: mutex state, then condvar state
            self.state.lock().waiting.push(current.clone());
            state.owner = None;
        }

        mutex.wake_waiter();
        Release::Released
    }
}

impl Default for ConditionVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConditionVariable {
    fn drop(&mut self) {
        if let Err(err) = self.audit() {
            err.abort();
        }
    }
}

impl fmt::Debug for ConditionVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionVariable")
            .field("waiting", &self.num_waiting())
            .finish()
    }
}

/// Waiters are not persisted; a restored condition variable is empty
impl Serialize for ConditionVariable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

impl<'de> Deserialize<'de> for ConditionVariable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <()>::deserialize(deserializer)?;
        Ok(ConditionVariable::new())
    }
}
