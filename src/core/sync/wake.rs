/*!
 * Wake Helpers
 *
 * Resume tasks after the owning primitive's critical section has been left.
 * A task that can no longer run is skipped and never reported to the caller.
 */

use super::task::Task;
use super::wait_list::WaitList;
use parking_lot::Mutex;
use tracing::trace;

/// Projection from a primitive's state to one of its wait lists
pub(crate) type ListOf<S> = fn(&mut S) -> &mut WaitList<Task>;

/// Resume a single task, logging and swallowing failure
#[inline]
pub(crate) fn try_resume(task: &Task) -> bool {
    match task.resume() {
        Ok(()) => true,
        Err(err) => {
            trace!(task = task.id(), error = %err, "Skipping waiter that cannot resume");
            false
        }
    }
}

/// Resume every task, returning how many actually resumed
pub(crate) fn resume_all(tasks: impl IntoIterator<Item = Task>) -> usize {
    tasks.into_iter().filter(|task| try_resume(task)).count()
}

/// Shift waiters one at a time and resume them until one succeeds
///
/// The critical section is held only while shifting; every resume happens
/// outside it.
pub(crate) fn wake_one<S>(state: &Mutex<S>, list: ListOf<S>) -> Option<Task> {
    loop {
        let task = list(&mut *state.lock()).shift()?;
        if try_resume(&task) {
            return Some(task);
        }
    }
}

/// Empty the list inside the critical section, then resume everyone
pub(crate) fn wake_all<S>(state: &Mutex<S>, list: ListOf<S>) -> usize {
    let tasks: Vec<Task> = list(&mut *state.lock()).drain().collect();
    resume_all(tasks)
}

/// Wakes one waiter when dropped, unless disarmed
///
/// Declared before the critical-section guard, so on every exit path
/// (including unwinding out of a caller-supplied action) the guard is
/// released first and the wake runs afterwards.
pub(crate) struct PendingWake<'a, S> {
    state: &'a Mutex<S>,
    list: ListOf<S>,
    armed: bool,
}

impl<'a, S> PendingWake<'a, S> {
    pub(crate) fn new(state: &'a Mutex<S>, list: ListOf<S>) -> Self {
        Self {
            state,
            list,
            armed: false,
        }
    }

    #[inline]
    pub(crate) fn arm(&mut self) {
        self.armed = true;
    }
}

impl<S> Drop for PendingWake<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            wake_one(self.state, self.list);
        }
    }
}
