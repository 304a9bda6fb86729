//! Kernel Semaphore Table
//!
//! A counting semaphore is a slot in a fixed table. Each slot holds the
//! semaphore's value and the queue of processes blocked on it.
//!
//! - `init`: claim the first free slot and set its value
//! - `wait`: decrement; a negative result blocks the caller
//! - `signal`: increment; the oldest blocked process (if any) is readied
//!
//! A negative value counts the blocked processes: for a slot created with
//! a non-negative value, `waiters == max(0, -value)`. A slot created with a
//! negative value starts with that many missing signals and no waiters;
//! waiters then number at most `-value`.
//!
//! Slots move from Free to Allocated and never back. `reset` is the only
//! way to free them, and it frees all of them at once.
//!
//! # Usage
//! ```ignore
//! let mut table = SemaphoreTable::<8, 4>::new();
//! let sem = table.init(1)?;
//! table.wait(ProcessId(1), sem, &dispatcher)?;   // value 1 -> 0
//! table.wait(ProcessId(2), sem, &dispatcher)?;   // value 0 -> -1, pid 2 blocks
//! table.signal(ProcessId(1), sem, &dispatcher)?; // value -1 -> 0, pid 2 readied
//! ```

use core::fmt;

use super::blocked_queue::BlockedQueue;
use super::process::ProcessId;
use super::scheduler::{ki_block_process, ki_unblock_process, Dispatcher};
use super::status::{SemError, SemResult};
use crate::config::{tracing, SemTraceFlags};

/// Index of a slot in the semaphore table
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemaphoreId(pub usize);

impl SemaphoreId {
    /// Convert a raw trap-level identifier; negative values have no slot
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().map(Self)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SemaphoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a wait did to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The value stayed non-negative; the caller keeps running
    Acquired,
    /// The caller was queued and must be handed to the block primitive
    Blocked(ProcessId),
}

/// What a signal did to the waiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Nobody was waiting
    NoWaiter,
    /// This process was dequeued and must be handed to the unblock primitive
    Woke(ProcessId),
}

/// One semaphore slot
#[derive(Debug, Clone)]
struct SemaphoreSlot<const P: usize> {
    allocated: bool,
    value: i32,
    queue: BlockedQueue<P>,
}

impl<const P: usize> SemaphoreSlot<P> {
    const fn new() -> Self {
        Self {
            allocated: false,
            value: 0,
            queue: BlockedQueue::new(),
        }
    }
}

/// Fixed table of `S` semaphores, each able to queue `P` processes
pub struct SemaphoreTable<const S: usize, const P: usize> {
    slots: [SemaphoreSlot<P>; S],
}

impl<const S: usize, const P: usize> SemaphoreTable<S, P> {
    /// Create a table with every slot free
    pub const fn new() -> Self {
        Self {
            slots: [const { SemaphoreSlot::<P>::new() }; S],
        }
    }

    /// Return every slot to the Free state
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.allocated = false;
            slot.value = 0;
            slot.queue.clear();
        }
    }

    /// Allocate a semaphore with the given initial value
    ///
    /// Any value is accepted, including negative ones.
    ///
    /// # Returns
    /// * `Ok(id)` - index of the claimed slot
    /// * `Err(ResourceExhausted)` - every slot is in use
    pub fn init(&mut self, value: i32) -> SemResult<SemaphoreId> {
        let index = self
            .slots
            .iter()
            .position(|slot| !slot.allocated)
            .ok_or(SemError::ResourceExhausted)?;

        let slot = &mut self.slots[index];
        slot.allocated = true;
        slot.value = value;
        slot.queue.clear();

        let id = SemaphoreId(index);
        if tracing(SemTraceFlags::ALLOCATE) {
            log::trace!("[SEM] allocated semaphore {} (value {})", id, value);
        }
        Ok(id)
    }

    /// Wait on a semaphore, blocking `pid` through `dispatcher` if needed
    pub fn wait(
        &mut self,
        pid: ProcessId,
        id: SemaphoreId,
        dispatcher: &dyn Dispatcher,
    ) -> SemResult<WaitOutcome> {
        let outcome = self.prepare_wait(pid, id)?;
        if let WaitOutcome::Blocked(blocked) = outcome {
            ki_block_process(dispatcher, blocked);
        }
        Ok(outcome)
    }

    /// Signal a semaphore, readying the oldest waiter through `dispatcher`
    pub fn signal(
        &mut self,
        pid: ProcessId,
        id: SemaphoreId,
        dispatcher: &dyn Dispatcher,
    ) -> SemResult<SignalOutcome> {
        let outcome = self.prepare_signal(pid, id)?;
        if let SignalOutcome::Woke(woken) = outcome {
            ki_unblock_process(dispatcher, woken);
        }
        Ok(outcome)
    }

    /// State transition of `wait` without calling the dispatcher
    ///
    /// On `Blocked` the caller must hand the process to the block
    /// primitive. A full queue or an underflowing value leaves the slot
    /// untouched.
    pub fn prepare_wait(&mut self, pid: ProcessId, id: SemaphoreId) -> SemResult<WaitOutcome> {
        let slot = self.slot_mut(id)?;

        let value = slot.value.checked_sub(1).ok_or(SemError::CountOverflow(id))?;
        if value >= 0 {
            slot.value = value;
            if tracing(SemTraceFlags::WAIT) {
                log::trace!("[SEM] {} wait on {}: value {}", pid, id, value);
            }
            return Ok(WaitOutcome::Acquired);
        }

        slot.queue.enqueue(id, pid)?;
        slot.value = value;
        if tracing(SemTraceFlags::WAIT) {
            log::trace!("[SEM] {} wait on {}: value {}, queued", pid, id, value);
        }
        Ok(WaitOutcome::Blocked(pid))
    }

    /// State transition of `signal` without calling the dispatcher
    ///
    /// Wakeup is decided by the queue, not the sign of the value: the
    /// oldest waiter is readied whenever there is one, and an empty queue
    /// wakes nobody. For a semaphore created with a negative value this
    /// means a waiter can be readied while the value is still negative.
    /// An overflowing value leaves the slot untouched.
    pub fn prepare_signal(&mut self, pid: ProcessId, id: SemaphoreId) -> SemResult<SignalOutcome> {
        let slot = self.slot_mut(id)?;

        slot.value = slot.value.checked_add(1).ok_or(SemError::CountOverflow(id))?;
        let outcome = match slot.queue.dequeue() {
            Some(woken) => SignalOutcome::Woke(woken),
            None => SignalOutcome::NoWaiter,
        };

        if tracing(SemTraceFlags::SIGNAL) {
            log::trace!("[SEM] {} signal on {}: value {}, {:?}", pid, id, slot.value, outcome);
        }
        Ok(outcome)
    }

    /// Current value of an allocated semaphore
    pub fn value(&self, id: SemaphoreId) -> SemResult<i32> {
        Ok(self.slot(id)?.value)
    }

    /// Number of processes blocked on an allocated semaphore
    pub fn waiter_count(&self, id: SemaphoreId) -> SemResult<usize> {
        Ok(self.slot(id)?.queue.len())
    }

    /// Whether `id` names an allocated slot
    pub fn is_allocated(&self, id: SemaphoreId) -> bool {
        self.slot(id).is_ok()
    }

    /// Blocked processes of an allocated semaphore, oldest first
    pub fn waiters(&self, id: SemaphoreId) -> SemResult<impl Iterator<Item = ProcessId> + '_> {
        Ok(self.slot(id)?.queue.iter())
    }

    /// Table-wide counters
    pub fn stats(&self) -> SemaphoreStats {
        let mut stats = SemaphoreStats {
            max_semaphores: S,
            queue_capacity: P,
            allocated_count: 0,
            free_count: 0,
            blocked_count: 0,
        };

        for slot in self.slots.iter() {
            if slot.allocated {
                stats.allocated_count += 1;
                stats.blocked_count += slot.queue.len();
            } else {
                stats.free_count += 1;
            }
        }
        stats
    }

    /// Snapshots of up to `N` allocated semaphores, in slot order
    pub fn snapshots<const N: usize>(&self) -> ([SemaphoreSnapshot; N], usize) {
        let mut snapshots = [SemaphoreSnapshot::empty(); N];
        let mut count = 0;

        for (index, slot) in self.slots.iter().enumerate() {
            if count >= N {
                break;
            }
            if slot.allocated {
                snapshots[count] = SemaphoreSnapshot {
                    id: SemaphoreId(index),
                    value: slot.value,
                    waiters: slot.queue.len(),
                    next_waiter: slot.queue.peek(),
                };
                count += 1;
            }
        }

        (snapshots, count)
    }

    fn slot(&self, id: SemaphoreId) -> SemResult<&SemaphoreSlot<P>> {
        match self.slots.get(id.index()) {
            Some(slot) if slot.allocated => Ok(slot),
            _ => Err(SemError::InvalidHandle(id)),
        }
    }

    fn slot_mut(&mut self, id: SemaphoreId) -> SemResult<&mut SemaphoreSlot<P>> {
        match self.slots.get_mut(id.index()) {
            Some(slot) if slot.allocated => Ok(slot),
            _ => Err(SemError::InvalidHandle(id)),
        }
    }
}

impl<const S: usize, const P: usize> Default for SemaphoreTable<S, P> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Inspection
// ============================================================================

/// Semaphore table statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreStats {
    /// Slots in the table
    pub max_semaphores: usize,
    /// Capacity of each blocked queue
    pub queue_capacity: usize,
    /// Allocated slots
    pub allocated_count: usize,
    /// Free slots
    pub free_count: usize,
    /// Processes blocked across all semaphores
    pub blocked_count: usize,
}

/// Point-in-time view of one allocated semaphore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreSnapshot {
    pub id: SemaphoreId,
    pub value: i32,
    pub waiters: usize,
    /// Process the next signal would ready
    pub next_waiter: Option<ProcessId>,
}

impl SemaphoreSnapshot {
    pub const fn empty() -> Self {
        Self {
            id: SemaphoreId(0),
            value: 0,
            waiters: 0,
            next_waiter: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
