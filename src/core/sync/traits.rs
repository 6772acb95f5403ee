/*!
 * Synchronization Traits
 *
 * Acquire/release capability shared by the native mutex and adapters for
 * locks that predate this crate. Condition variables wait against it.
 */

use super::mutex::Mutex;

/// A lock a [`ConditionVariable`](super::ConditionVariable) can wait with
///
/// The trait is object safe, so `&dyn Lockable` works as well as concrete
/// lock types.
pub trait Lockable {
    /// Block until the lock is held by the calling task
    fn acquire(&self);

    /// Release the lock; returns `false` if the calling task does not hold it
    fn release(&self) -> bool;

    /// Release the lock, running `action` atomically with the release
    ///
    /// If the calling task does not hold the lock, nothing is released,
    /// `action` does not run, and `false` is returned.
    fn exclusive_release(&self, action: &mut dyn FnMut()) -> bool;

    /// Whether a task other than the caller currently holds the lock
    fn is_held_by_other(&self) -> bool {
        false
    }

    /// The native mutex behind this lock, enabling the fast wait path
    fn as_native(&self) -> Option<&Mutex> {
        None
    }
}

impl<L: Lockable + ?Sized> Lockable for &L {
    fn acquire(&self) {
        (**self).acquire()
    }

    fn release(&self) -> bool {
        (**self).release()
    }

    fn exclusive_release(&self, action: &mut dyn FnMut()) -> bool {
        (**self).exclusive_release(action)
    }

    fn is_held_by_other(&self) -> bool {
        (**self).is_held_by_other()
    }

    fn as_native(&self) -> Option<&Mutex> {
        (**self).as_native()
    }
}
