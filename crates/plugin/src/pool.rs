//! Bounded holding areas for tasks between admission and selection.
//!
//! Both arrangements order entries by `(key, timestamp, pid)` ascending and
//! refuse admission once `capacity` entries are resident.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use gthulhu_core::QueuedTask;

/// Pool bound for a configured pool size; one slot stays reserved.
pub fn capacity_for(pool_size: usize) -> usize {
    pool_size.saturating_sub(1)
}

/// A resident task with the priority key computed at admission.
#[derive(Debug, Clone, Copy)]
pub struct PoolEntry {
    pub task: QueuedTask,
    pub key: u64,
    pub timestamp: u64,
}

impl PoolEntry {
    pub fn new(task: QueuedTask, key: u64, timestamp: u64) -> Self {
        Self { task, key, timestamp }
    }

    fn sort_key(&self) -> (u64, u64, i32) {
        (self.key, self.timestamp, self.task.pid)
    }
}

impl PartialEq for PoolEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for PoolEntry {}

impl PartialOrd for PoolEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PoolEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Common surface of the pool arrangements.
pub trait TaskPool {
    /// Admit an entry. Hands it back when the pool is full.
    fn insert(&mut self, entry: PoolEntry) -> Result<(), PoolEntry>;

    /// Remove the most eligible entry.
    fn pop(&mut self) -> Option<PoolEntry>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

// ── Ordered list ──────────────────────────────────────────────

/// Sorted list; in FIFO mode entries are appended in arrival order
/// regardless of key.
#[derive(Debug)]
pub struct OrderedPool {
    entries: VecDeque<PoolEntry>,
    capacity: usize,
    fifo: bool,
}

impl OrderedPool {
    pub fn new(capacity: usize, fifo: bool) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            fifo,
        }
    }

    pub fn is_fifo(&self) -> bool {
        self.fifo
    }
}

impl TaskPool for OrderedPool {
    fn insert(&mut self, entry: PoolEntry) -> Result<(), PoolEntry> {
        if self.is_full() {
            return Err(entry);
        }
        if self.fifo {
            self.entries.push_back(entry);
        } else {
            // after every entry that does not sort strictly after the new one
            let idx = self.entries.partition_point(|e| e <= &entry);
            self.entries.insert(idx, entry);
        }
        Ok(())
    }

    fn pop(&mut self) -> Option<PoolEntry> {
        self.entries.pop_front()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

// ── Min-heap ──────────────────────────────────────────────────

#[derive(Debug)]
pub struct HeapPool {
    heap: BinaryHeap<Reverse<PoolEntry>>,
    capacity: usize,
}

impl HeapPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            capacity,
        }
    }
}

impl TaskPool for HeapPool {
    fn insert(&mut self, entry: PoolEntry) -> Result<(), PoolEntry> {
        if self.is_full() {
            return Err(entry);
        }
        self.heap.push(Reverse(entry));
        Ok(())
    }

    fn pop(&mut self) -> Option<PoolEntry> {
        self.heap.pop().map(|Reverse(e)| e)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
