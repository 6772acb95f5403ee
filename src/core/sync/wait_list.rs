/*!
 * Wait List
 *
 * FIFO list with pooled node reuse, used for blocked tasks and for queued
 * values alike.
 *
 * # Design
 *
 * Nodes live in an arena and are linked by index. Freed nodes go onto an
 * intrusive free list and are recycled by the next push, so a list under
 * steady churn stops allocating once it reaches its high-water mark. With
 * pooling disabled the arena is released whenever the list drains.
 */

use super::task::Task;
use crate::core::config::SyncConfig;
use std::fmt;

struct Node<T> {
    value: Option<T>,
    next: Option<usize>,
}

/// FIFO collection; insertion order is wake order
pub struct WaitList<T> {
    nodes: Vec<Node<T>>,
    head: Option<usize>,
    tail: Option<usize>,
    /// Head of the free-node chain
    pool: Option<usize>,
    len: usize,
    pooling: bool,
}

impl<T> WaitList<T> {
    /// Create a list using the process-wide configuration
    pub fn new() -> Self {
        Self::with_config(SyncConfig::global())
    }

    pub fn with_config(config: &SyncConfig) -> Self {
        Self {
            nodes: Vec::with_capacity(config.preallocate_nodes),
            head: None,
            tail: None,
            pool: None,
            len: 0,
            pooling: config.node_pooling,
        }
    }

    /// Append to the back of the list
    pub fn push(&mut self, value: T) {
        let node = Node {
            value: Some(value),
            next: None,
        };

        let index = match self.pool {
            Some(index) => {
                self.pool = self.nodes[index].next;
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    /// Remove and return the earliest entry
    pub fn shift(&mut self) -> Option<T> {
        let index = self.head?;
        let node = &mut self.nodes[index];
        let value = node.value.take();
        self.head = node.next;
        node.next = self.pool;
        self.pool = Some(index);

        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        self.release_if_drained();

        value
    }

    /// Drop every entry, returning their nodes to the pool
    pub fn clear(&mut self) {
        let Some(tail) = self.tail else {
            return;
        };

        let mut cursor = self.head;
        while let Some(index) = cursor {
            self.nodes[index].value = None;
            cursor = self.nodes[index].next;
        }

        // The live chain is already linked; splice it onto the pool whole
        self.nodes[tail].next = self.pool;
        self.pool = self.head;
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.release_if_drained();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of free nodes held for reuse
    #[inline]
    pub fn pooled_nodes(&self) -> usize {
        self.nodes.len() - self.len
    }

    /// Iterate entries front to back
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Remove entries front to back
    ///
    /// Entries not consumed by the iterator stay in the list.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { list: self }
    }

    fn release_if_drained(&mut self) {
        if !self.pooling && self.len == 0 {
            self.nodes = Vec::new();
            self.pool = None;
        }
    }
}

impl<T: Clone> WaitList<T> {
    /// Snapshot of the entries in FIFO order
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl WaitList<Task> {
    /// Number of queued tasks that would still resume
    pub fn survivors(&self) -> usize {
        self.iter().filter(|task| task.is_resumable()).count()
    }
}

impl<T> Default for WaitList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for WaitList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for WaitList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

/// Borrowing iterator over a [`WaitList`]
pub struct Iter<'a, T> {
    list: &'a WaitList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = &self.list.nodes[self.cursor?];
        self.cursor = node.next;
        node.value.as_ref()
    }
}

/// Draining iterator over a [`WaitList`]
pub struct Drain<'a, T> {
    list: &'a mut WaitList<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.list.shift()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len, Some(self.list.len))
    }
}
