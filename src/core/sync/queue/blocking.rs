/*!
 * Blocking Queue
 * FIFO queue with optional capacity bound (Queue / SizedQueue)
 */

use super::super::condvar::ConditionVariable;
use super::super::mutex::Mutex;
use super::super::wait_list::WaitList;
use crate::core::config::SyncConfig;
use crate::core::errors::{FatalConsistencyError, PrimitiveKind, SyncError, SyncResult};
use std::fmt;
use tracing::debug;

/// Capacity value meaning "no bound"
pub const UNBOUNDED: usize = 0;

pub(super) struct QueueState<T> {
    pub(super) values: WaitList<T>,
    pub(super) capacity: usize,
}

/// Blocking FIFO queue
///
/// A capacity of [`UNBOUNDED`] gives the plain queue: pushes never block.
/// A positive capacity gives the sized variant: pushes block while the queue
/// holds `capacity` or more values.
///
/// Every field is guarded by the queue's own [`Mutex`]. Consumers wait on a
/// "value available" condition and producers on a "space available" one.
///
/// # Examples
///
/// ```
/// use fastsync::BlockingQueue;
///
/// let queue = BlockingQueue::bounded(2).unwrap();
/// queue.push(1);
/// queue.push(2);
/// assert_eq!(queue.len(), 2);
/// assert_eq!(queue.pop(), 1);
/// assert!(queue.try_pop().is_ok());
/// assert!(queue.try_pop().is_err());
/// ```
pub struct BlockingQueue<T> {
    mutex: Mutex,
    value_available: ConditionVariable,
    space_available: ConditionVariable,
    pub(super) state: parking_lot::Mutex<QueueState<T>>,
}

impl<T> BlockingQueue<T> {
    /// Unbounded queue
    pub fn new() -> Self {
        Self::with_config(UNBOUNDED, SyncConfig::global())
    }

    /// Queue holding at most `capacity` values
    ///
    /// # Errors
    ///
    /// [`SyncError::Argument`] if `capacity` is zero.
    pub fn bounded(capacity: usize) -> SyncResult<Self> {
        check_capacity(capacity)?;
        Ok(Self::with_config(capacity, SyncConfig::global()))
    }

    /// Queue with an explicit capacity (`UNBOUNDED` allowed) and storage config
    pub fn with_config(capacity: usize, config: &SyncConfig) -> Self {
        Self {
            mutex: Mutex::with_config(config),
            value_available: ConditionVariable::with_config(config),
            space_available: ConditionVariable::with_config(config),
            state: parking_lot::Mutex::new(QueueState {
                values: WaitList::with_config(config),
                capacity,
            }),
        }
    }

    /// Append a value, blocking while a bounded queue is full
    pub fn push(&self, value: T) {
        self.mutex.synchronize(|| {
            while self.is_full() {
                self.space_available.wait_held(&self.mutex);
            }
            self.state.lock().values.push(value);
            self.value_available.signal();
        })
    }

    /// Remove the front value, blocking while the queue is empty
    pub fn pop(&self) -> T {
        self.mutex.synchronize(|| self.take_front())
    }

    /// Remove the front value without blocking
    ///
    /// # Errors
    ///
    /// [`SyncError::EmptyQueue`] if there is nothing to take.
    pub fn try_pop(&self) -> SyncResult<T> {
        self.pop_with(true)
    }

    /// Remove the front value; with `non_block` an empty queue is an error
    /// instead of a wait
    pub fn pop_with(&self, non_block: bool) -> SyncResult<T> {
        self.mutex.synchronize(|| {
            if non_block && self.state.lock().values.is_empty() {
                return Err(SyncError::EmptyQueue);
            }
            Ok(self.take_front())
        })
    }

    /// Drop every queued value
    ///
    /// Wakes at most one blocked producer, however much room was freed.
    pub fn clear(&self) {
        self.mutex.synchronize(|| {
            self.state.lock().values.clear();
            self.space_available.signal();
        })
    }

    pub fn is_empty(&self) -> bool {
        self.mutex.synchronize(|| self.state.lock().values.is_empty())
    }

    pub fn len(&self) -> usize {
        self.mutex.synchronize(|| self.state.lock().values.len())
    }

    /// Producers blocked on capacity plus consumers blocked on emptiness
    pub fn num_waiting(&self) -> usize {
        self.mutex.synchronize(|| {
            self.value_available.num_waiting() + self.space_available.num_waiting()
        })
    }

    /// Current bound, or [`UNBOUNDED`]
    pub fn capacity(&self) -> usize {
        self.mutex.synchronize(|| self.state.lock().capacity)
    }

    /// Change the bound
    ///
    /// Raising the bound of a sized queue wakes up to as many blocked
    /// producers as slots were added. Lowering it never evicts: the queue may
    /// stay over the new bound until consumers drain it.
    ///
    /// # Errors
    ///
    /// [`SyncError::Argument`] if `capacity` is zero.
    pub fn set_capacity(&self, capacity: usize) -> SyncResult<()> {
        check_capacity(capacity)?;

        self.mutex.synchronize(|| {
            let added = {
                let mut state = self.state.lock();
                let added = if state.capacity > 0 && capacity > state.capacity {
                    capacity - state.capacity
                } else {
                    0
                };
                state.capacity = capacity;
                added
            };

            debug!(capacity, added, "Queue capacity changed");
            for _ in 0..added {
                self.space_available.signal();
            }
        });
        Ok(())
    }

    /// Alias for [`push`](Self::push)
    #[inline]
    pub fn enq(&self, value: T) {
        self.push(value)
    }

    /// Alias for [`pop`](Self::pop)
    #[inline]
    pub fn deq(&self) -> T {
        self.pop()
    }

    /// Alias for [`pop`](Self::pop)
    #[inline]
    pub fn shift(&self) -> T {
        self.pop()
    }

    /// Alias for [`len`](Self::len)
    #[inline]
    pub fn size(&self) -> usize {
        self.len()
    }

    /// Check that no resumable task is left waiting on any internal list
    pub fn audit(&self) -> Result<(), FatalConsistencyError> {
        let survivors = self.mutex.survivors()
            + self.value_available.survivors()
            + self.space_available.survivors();
        if survivors == 0 {
            return Ok(());
        }
        Err(FatalConsistencyError {
            kind: PrimitiveKind::Queue,
            address: self as *const Self as usize,
            survivors,
        })
    }

    /// Wait for a value and shift it; the caller holds `self.mutex`
    fn take_front(&self) -> T {
        loop {
            let mut state = self.state.lock();
            if let Some(value) = state.values.shift() {
                let has_space = state.capacity > 0 && state.values.len() < state.capacity;
                drop(state);
                if has_space {
                    self.space_available.signal();
                }
                return value;
            }
            drop(state);
            self.value_available.wait_held(&self.mutex);
        }
    }

    fn is_full(&self) -> bool {
        let state = self.state.lock();
        state.capacity > 0 && state.values.len() >= state.capacity
    }
}

impl<T: Clone> BlockingQueue<T> {
    /// Snapshot of the queued values, front first
    pub fn to_vec(&self) -> Vec<T> {
        self.mutex.synchronize(|| self.state.lock().values.to_vec())
    }
}

fn check_capacity(capacity: usize) -> SyncResult<()> {
    if capacity < 1 {
        return Err(SyncError::Argument("value must be positive".into()));
    }
    Ok(())
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for BlockingQueue<T> {
    fn drop(&mut self) {
        if let Err(err) = self.audit() {
            err.abort();
        }
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockingQueue")
            .field("len", &state.values.len())
            .field("capacity", &state.capacity)
            .finish()
    }
}
