/*!
 * Legacy Lock Adapter
 *
 * Lets condition variables wait with raw locks that know nothing about
 * task wait lists. The condvar drives them only through acquire/release.
 */

use super::task::{Task, TaskId};
use super::traits::Lockable;
use parking_lot::lock_api::RawMutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Owner slot value while nobody holds the lock; task ids start at 1
const NO_OWNER: TaskId = 0;

/// [`Lockable`] wrapper around any `lock_api` raw mutex
///
/// The adapter remembers which task acquired the raw lock. Only that task
/// can release it; a release from anyone else is refused.
///
/// # Examples
///
/// ```
/// use fastsync::{Lockable, RawLockAdapter};
///
/// let lock = RawLockAdapter::<parking_lot::RawMutex>::new();
/// lock.acquire();
/// assert!(lock.is_locked());
/// assert!(lock.release());
/// assert!(!lock.release());
/// ```
pub struct RawLockAdapter<R: RawMutex> {
    raw: R,
    owner: AtomicU64,
}

impl<R: RawMutex> RawLockAdapter<R> {
    pub const fn new() -> Self {
        Self {
            raw: R::INIT,
            owner: AtomicU64::new(NO_OWNER),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Whether the calling task holds the lock
    pub fn is_held_by_current(&self) -> bool {
        self.owner.load(Ordering::Acquire) == Task::current().id()
    }

    /// Acquire without blocking
    pub fn try_acquire(&self) -> bool {
        if !self.raw.try_lock() {
            return false;
        }
        self.owner.store(Task::current().id(), Ordering::Release);
        true
    }
}

impl<R: RawMutex> Default for RawLockAdapter<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RawMutex> Lockable for RawLockAdapter<R> {
    fn acquire(&self) {
        self.raw.lock();
        self.owner.store(Task::current().id(), Ordering::Release);
    }

    fn release(&self) -> bool {
        self.exclusive_release(&mut || ())
    }

    fn exclusive_release(&self, action: &mut dyn FnMut()) -> bool {
        if !self.is_held_by_current() {
            return false;
        }
        action();
        self.owner.store(NO_OWNER, Ordering::Release);
        // SAFETY: the owner slot holds the calling task's id, which is only
        // stored after this task acquired the raw lock on its own thread.
        unsafe { self.raw.unlock() };
        true
    }

    fn is_held_by_other(&self) -> bool {
        let owner = self.owner.load(Ordering::Acquire);
        owner != NO_OWNER && owner != Task::current().id()
    }
}

impl<R: RawMutex> fmt::Debug for RawLockAdapter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawLockAdapter")
            .field("locked", &self.is_locked())
            .field("owner", &self.owner.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::SyncError;
    use crate::core::sync::ConditionVariable;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    type Adapter = RawLockAdapter<parking_lot::RawMutex>;

    #[test]
    fn test_release_reports_state() {
        let lock = Adapter::new();
        assert!(!lock.release());

        assert!(lock.try_acquire());
        assert!(!lock.try_acquire());

        let mut ran = false;
        assert!(lock.exclusive_release(&mut || ran = true));
        assert!(ran);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_exclusive_release_skips_action_when_unlocked() {
        let lock = Adapter::new();
        let mut ran = false;
        assert!(!lock.exclusive_release(&mut || ran = true));
        assert!(!ran);
    }

    #[test]
    fn test_condvar_waits_with_legacy_lock() {
        let lock = Arc::new(Adapter::new());
        let condvar = Arc::new(ConditionVariable::new());
        let ready = Arc::new(AtomicBool::new(false));

        let waiter = {
            let (lock, condvar, ready) = (lock.clone(), condvar.clone(), ready.clone());
            thread::spawn(move || {
                lock.acquire();
                while !ready.load(Ordering::Acquire) {
                    condvar.wait(&*lock).unwrap();
                }
                let held = lock.is_locked();
                lock.release();
                held
            })
        };

        while condvar.num_waiting() == 0 {
            thread::sleep(Duration::from_millis(1));
        }

        lock.acquire();
        ready.store(true, Ordering::Release);
        condvar.signal();
        lock.release();

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_release_by_non_holder_is_refused() {
        let lock = Arc::new(Adapter::new());
        lock.acquire();

        let intruder = lock.clone();
        let released = thread::spawn(move || {
            let mut ran = false;
            let exclusive = intruder.exclusive_release(&mut || ran = true);
            (intruder.release(), exclusive, ran)
        })
        .join()
        .unwrap();

        assert_eq!(released, (false, false, false));
        assert!(lock.is_locked());
        assert!(lock.is_held_by_current());
        assert!(lock.release());
    }

    #[test]
    fn test_condvar_wait_by_non_holder_fails() {
        let lock = Arc::new(Adapter::new());
        let condvar = Arc::new(ConditionVariable::new());
        lock.acquire();

        let result = {
            let (lock, condvar) = (lock.clone(), condvar.clone());
            thread::spawn(move || {
                let result = condvar.wait(&*lock);
                (result, lock.is_held_by_current())
            })
            .join()
            .unwrap()
        };

        assert_eq!(result, (Err(SyncError::Ownership), false));
        assert_eq!(condvar.num_waiting(), 0);
        assert!(lock.is_held_by_current());
        assert!(lock.release());
    }

    #[test]
    fn test_condvar_wait_with_unheld_legacy_lock_returns() {
        let lock = Adapter::new();
        let condvar = ConditionVariable::new();

        assert_eq!(condvar.wait(&lock), Ok(()));
        assert_eq!(condvar.num_waiting(), 0);
        assert!(!lock.is_locked());
    }
}
