//! Blocked Process Queue
//!
//! Each semaphore owns a fixed-capacity ring of the processes waiting on
//! it. The ring lives inside the semaphore slot, so blocking a process
//! never touches a heap.
//!
//! # Design
//!
//! - `head` is the next entry to dequeue, `tail` the next free entry
//! - `head == tail` means either empty or full; the `full` flag decides
//! - Every entry carries an `occupied` flag, and dequeue refuses an
//!   unoccupied head rather than returning a stale process id

use super::process::ProcessId;
use super::semaphore::SemaphoreId;
use super::status::{SemError, SemResult};

/// Raw "no process" value for trap-level callers
pub const NOT_FOUND: i32 = -1;

/// One queued process
#[derive(Debug, Clone, Copy)]
struct BlockedEntry {
    occupied: bool,
    pid: ProcessId,
}

impl BlockedEntry {
    const fn empty() -> Self {
        Self {
            occupied: false,
            pid: ProcessId(NOT_FOUND),
        }
    }
}

/// FIFO of processes blocked on one semaphore
#[derive(Debug, Clone)]
pub struct BlockedQueue<const N: usize> {
    entries: [BlockedEntry; N],
    head: usize,
    tail: usize,
    full: bool,
}

impl<const N: usize> BlockedQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            entries: [BlockedEntry::empty(); N],
            head: 0,
            tail: 0,
            full: false,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail && !self.full
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Number of queued processes
    pub fn len(&self) -> usize {
        if self.full {
            N
        } else if self.tail >= self.head {
            self.tail - self.head
        } else {
            N - self.head + self.tail
        }
    }

    /// Append a process at the tail
    ///
    /// A full queue is left unchanged and reported; the caller decides
    /// how loudly to fail. `id` only labels the error.
    pub fn enqueue(&mut self, id: SemaphoreId, pid: ProcessId) -> SemResult<()> {
        if self.full || N == 0 {
            return Err(SemError::QueueCapacityExceeded { id, pid });
        }

        self.entries[self.tail] = BlockedEntry { occupied: true, pid };
        self.tail = (self.tail + 1) % N;

        if self.tail == self.head {
            self.full = true;
        }
        Ok(())
    }

    /// Remove the process at the head
    ///
    /// Returns `None` when nothing is queued.
    pub fn dequeue(&mut self) -> Option<ProcessId> {
        if self.is_empty() {
            return None;
        }

        let entry = &mut self.entries[self.head];
        if !entry.occupied {
            return None;
        }
        entry.occupied = false;
        let pid = entry.pid;

        self.head = (self.head + 1) % N;
        self.full = false;

        Some(pid)
    }

    /// Head of the queue without removing it
    pub fn peek(&self) -> Option<ProcessId> {
        if self.is_empty() {
            return None;
        }
        let entry = &self.entries[self.head];
        entry.occupied.then_some(entry.pid)
    }

    /// Drop every queued process
    pub fn clear(&mut self) {
        self.entries = [BlockedEntry::empty(); N];
        self.head = 0;
        self.tail = 0;
        self.full = false;
    }

    /// Queued processes in wakeup order
    pub fn iter(&self) -> impl Iterator<Item = ProcessId> + '_ {
        (0..self.len())
            .map(move |i| &self.entries[(self.head + i) % N])
            .filter(|entry| entry.occupied)
            .map(|entry| entry.pid)
    }
}

impl<const N: usize> Default for BlockedQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
