//! Semaphore System Services
//!
//! Entry points the trap layer calls for the semaphore system calls:
//!
//! | System call      | Service          |
//! |------------------|------------------|
//! | (kernel startup) | `ex_init_sem`    |
//! | `Seminit(v)`     | `ex_seminit`     |
//! | `Wait(s)`        | `ex_wait`        |
//! | `Signal(s)`      | `ex_signal`      |
//!
//! The trap layer passes the calling process id alongside the arguments.
//!
//! # Locking
//!
//! One global lock guards the table. It is held only for the state
//! transition; the dispatcher is called after it is released, since the
//! block primitive does not return until the process runs again.
//!
//! # Failures
//!
//! Running out of semaphores is reported to the caller as
//! `ALLOCATION_FAILED`. A bad semaphore id, an overflowing blocked queue
//! or a value leaving the `i32` range is a kernel bug and raises a bug
//! check.

use spin::{Mutex, RwLock};

use crate::bugcheck;
use crate::config::{MAX_PROCESSES, MAX_SEMAPHORES};
use crate::ke::bugcheck::codes;
use crate::ke::process::ProcessId;
use crate::ke::scheduler::{ki_block_process, ki_unblock_process, Dispatcher, NullDispatcher};
use crate::ke::semaphore::{
    SemaphoreId, SemaphoreSnapshot, SemaphoreStats, SemaphoreTable, SignalOutcome, WaitOutcome,
};
use crate::ke::status::SemError;

/// Returned by `ex_seminit` when no semaphore could be allocated
pub const ALLOCATION_FAILED: i32 = -1;

/// Maximum snapshots returned by `get_semaphore_snapshots`
pub const MAX_SNAPSHOTS: usize = 16;

/// Process-wide semaphore table
static SEMAPHORE_TABLE: Mutex<SemaphoreTable<MAX_SEMAPHORES, MAX_PROCESSES>> =
    Mutex::new(SemaphoreTable::new());

/// Scheduler primitives used to block and ready processes
static DISPATCHER: RwLock<&'static dyn Dispatcher> = RwLock::new(&NullDispatcher);

/// Register the scheduler's Block/Unblock primitives
pub fn ex_register_dispatcher(dispatcher: &'static dyn Dispatcher) {
    *DISPATCHER.write() = dispatcher;
}

#[inline]
fn current_dispatcher() -> &'static dyn Dispatcher {
    *DISPATCHER.read()
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the semaphore subsystem (InitSem)
///
/// Called once during kernel startup. Every slot becomes free.
pub fn ex_init_sem() {
    SEMAPHORE_TABLE.lock().reset();
    log::info!(
        "[SEM] Semaphore table initialized ({} semaphores, {} waiters each)",
        MAX_SEMAPHORES,
        MAX_PROCESSES
    );
}

// ============================================================================
// System Services
// ============================================================================

/// Allocate a semaphore (Seminit)
///
/// # Arguments
/// * `p` - Calling process
/// * `v` - Initial value, may be negative
///
/// # Returns
/// The new semaphore id, or `ALLOCATION_FAILED`
pub fn ex_seminit(p: i32, v: i32) -> i32 {
    let result = SEMAPHORE_TABLE.lock().init(v);

    match result {
        Ok(id) => id.index() as i32,
        Err(err) => {
            log::warn!("[SEM] Seminit from pid {}: {}", p, err);
            ALLOCATION_FAILED
        }
    }
}

/// Wait on a semaphore (Wait)
///
/// Decrements the semaphore; if the value goes negative the calling
/// process is queued and handed to the dispatcher's block primitive.
pub fn ex_wait(p: i32, s: i32) {
    let pid = ProcessId::new(p);
    let id = exp_reference_semaphore(p, s);

    let result = SEMAPHORE_TABLE.lock().prepare_wait(pid, id);

    match result {
        Ok(WaitOutcome::Acquired) => {}
        Ok(WaitOutcome::Blocked(blocked)) => ki_block_process(current_dispatcher(), blocked),
        Err(err) => exp_semaphore_failure(err, p, s),
    }
}

/// Signal a semaphore (Signal)
///
/// Increments the semaphore and readies the oldest blocked process, if
/// there is one.
pub fn ex_signal(p: i32, s: i32) {
    let pid = ProcessId::new(p);
    let id = exp_reference_semaphore(p, s);

    let result = SEMAPHORE_TABLE.lock().prepare_signal(pid, id);

    match result {
        Ok(SignalOutcome::NoWaiter) => {}
        Ok(SignalOutcome::Woke(woken)) => ki_unblock_process(current_dispatcher(), woken),
        Err(err) => exp_semaphore_failure(err, p, s),
    }
}

/// Convert a trap-level semaphore id, bug checking on negative ids
fn exp_reference_semaphore(p: i32, s: i32) -> SemaphoreId {
    match SemaphoreId::from_raw(s) {
        Some(id) => id,
        None => bugcheck!(codes::INVALID_SEMAPHORE_HANDLE, s, p),
    }
}

/// Raise the bug check matching a Wait/Signal failure
fn exp_semaphore_failure(err: SemError, p: i32, s: i32) -> ! {
    log::error!("[SEM] pid {} on semaphore {}: {}", p, s, err);

    match err {
        SemError::QueueCapacityExceeded { id, pid } => bugcheck!(
            codes::SEMAPHORE_QUEUE_OVERFLOW,
            id.index(),
            pid.as_raw(),
            MAX_PROCESSES
        ),
        SemError::CountOverflow(id) => bugcheck!(codes::SEMAPHORE_COUNT_OVERFLOW, id.index(), p),
        _ => bugcheck!(codes::INVALID_SEMAPHORE_HANDLE, s, p),
    }
}

// ============================================================================
// Inspection Functions
// ============================================================================

/// Current value of semaphore `s`, if allocated
pub fn ex_semaphore_value(s: i32) -> Option<i32> {
    let id = SemaphoreId::from_raw(s)?;
    SEMAPHORE_TABLE.lock().value(id).ok()
}

/// Number of processes blocked on semaphore `s`, if allocated
pub fn ex_semaphore_waiters(s: i32) -> Option<usize> {
    let id = SemaphoreId::from_raw(s)?;
    SEMAPHORE_TABLE.lock().waiter_count(id).ok()
}

/// Get semaphore table statistics
pub fn get_semaphore_stats() -> SemaphoreStats {
    SEMAPHORE_TABLE.lock().stats()
}

/// Get snapshots of allocated semaphores
pub fn get_semaphore_snapshots() -> ([SemaphoreSnapshot; MAX_SNAPSHOTS], usize) {
    SEMAPHORE_TABLE.lock().snapshots::<MAX_SNAPSHOTS>()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ke::bugcheck::get_bugcheck_data;
    use crate::ke::scheduler::testing::{DispatchEvent, RecordingDispatcher};
    use crate::TEST_LOCK;
    use std::boxed::Box;

    fn fresh_kernel() -> &'static RecordingDispatcher {
        let dispatcher: &'static RecordingDispatcher = Box::leak(Box::new(RecordingDispatcher::new()));
        ex_init_sem();
        ex_register_dispatcher(dispatcher);
        dispatcher
    }

    fn pid(raw: i32) -> ProcessId {
        ProcessId(raw)
    }

    #[test]
    fn test_seminit_one_scenario() {
        let _guard = TEST_LOCK.lock();
        let dispatcher = fresh_kernel();

        let s = ex_seminit(1, 1);
        assert_eq!(s, 0);

        ex_wait(1, s);
        assert_eq!(ex_semaphore_value(s), Some(0));
        assert!(dispatcher.events().is_empty());

        ex_wait(2, s);
        assert_eq!(ex_semaphore_value(s), Some(-1));
        assert_eq!(ex_semaphore_waiters(s), Some(1));
        assert_eq!(dispatcher.events(), [DispatchEvent::Block(pid(2))]);

        ex_signal(1, s);
        assert_eq!(ex_semaphore_value(s), Some(0));
        assert_eq!(ex_semaphore_waiters(s), Some(0));
        assert_eq!(
            dispatcher.events(),
            [DispatchEvent::Block(pid(2)), DispatchEvent::Unblock(pid(2))]
        );
    }

    #[test]
    fn test_seminit_zero_scenario() {
        let _guard = TEST_LOCK.lock();
        let dispatcher = fresh_kernel();

        let s = ex_seminit(1, 0);
        assert_eq!(s, 0);

        ex_wait(1, s);
        assert_eq!(ex_semaphore_value(s), Some(-1));
        assert_eq!(dispatcher.blocked(), [pid(1)]);

        ex_signal(2, s);
        assert_eq!(ex_semaphore_value(s), Some(0));
        assert_eq!(ex_semaphore_waiters(s), Some(0));
        assert_eq!(dispatcher.unblocked(), [pid(1)]);

        ex_signal(2, s);
        assert_eq!(ex_semaphore_value(s), Some(1));
        assert_eq!(ex_semaphore_waiters(s), Some(0));
        assert_eq!(dispatcher.unblocked(), [pid(1)]);
    }

    #[test]
    fn test_seminit_exhaustion() {
        let _guard = TEST_LOCK.lock();
        fresh_kernel();

        for expected in 0..MAX_SEMAPHORES as i32 {
            assert_eq!(ex_seminit(1, 0), expected);
        }
        assert_eq!(ex_seminit(1, 0), ALLOCATION_FAILED);

        let stats = get_semaphore_stats();
        assert_eq!(stats.allocated_count, MAX_SEMAPHORES);
        assert_eq!(stats.free_count, 0);
    }

    #[test]
    fn test_seminit_negative_value() {
        let _guard = TEST_LOCK.lock();
        let dispatcher = fresh_kernel();

        let s = ex_seminit(1, -2);
        assert_eq!(s, 0);
        assert_eq!(ex_semaphore_value(s), Some(-2));

        // k = 1 wait, j = 3 signals
        ex_wait(1, s);
        assert_eq!(ex_semaphore_value(s), Some(-3));
        assert_eq!(ex_semaphore_waiters(s), Some(1));

        ex_signal(2, s);
        ex_signal(2, s);
        ex_signal(2, s);
        assert_eq!(ex_semaphore_value(s), Some(-2 - 1 + 3));
        assert_eq!(ex_semaphore_waiters(s), Some(0));
        assert_eq!(dispatcher.events(), [DispatchEvent::Block(pid(1)), DispatchEvent::Unblock(pid(1))]);
    }

    #[test]
    fn test_signal_overflow_bugchecks() {
        let _guard = TEST_LOCK.lock();
        let dispatcher = fresh_kernel();

        let s = ex_seminit(1, i32::MAX);
        let result = std::panic::catch_unwind(|| ex_signal(5, s));
        assert!(result.is_err());

        let data = get_bugcheck_data().unwrap();
        assert_eq!(data.code, codes::SEMAPHORE_COUNT_OVERFLOW);
        assert_eq!(data.parameter1, s as u64);
        assert_eq!(data.parameter2, 5);

        assert_eq!(ex_semaphore_value(s), Some(i32::MAX));
        assert!(dispatcher.events().is_empty());
    }

    #[test]
    fn test_init_sem_frees_everything() {
        let _guard = TEST_LOCK.lock();
        fresh_kernel();

        let a = ex_seminit(1, 0);
        ex_wait(3, a);
        assert_eq!(get_semaphore_stats().blocked_count, 1);

        ex_init_sem();
        let stats = get_semaphore_stats();
        assert_eq!(stats.allocated_count, 0);
        assert_eq!(stats.blocked_count, 0);
        assert_eq!(ex_semaphore_value(a), None);
        assert_eq!(ex_seminit(1, 4), 0);
    }

    #[test]
    fn test_fifo_across_processes() {
        let _guard = TEST_LOCK.lock();
        let dispatcher = fresh_kernel();

        let s = ex_seminit(1, 0);
        for p in 1..=MAX_PROCESSES as i32 {
            ex_wait(p, s);
        }
        assert_eq!(ex_semaphore_waiters(s), Some(MAX_PROCESSES));

        for _ in 0..MAX_PROCESSES {
            ex_signal(0, s);
        }
        let expected: std::vec::Vec<_> = (1..=MAX_PROCESSES as i32).map(pid).collect();
        assert_eq!(dispatcher.unblocked(), expected);
        assert_eq!(ex_semaphore_value(s), Some(0));
    }

    #[test]
    fn test_snapshots() {
        let _guard = TEST_LOCK.lock();
        fresh_kernel();

        let a = ex_seminit(1, 2);
        let b = ex_seminit(1, 0);
        ex_wait(4, b);

        let (snapshots, count) = get_semaphore_snapshots();
        assert_eq!(count, 2);
        assert_eq!(snapshots[0].id, SemaphoreId(a as usize));
        assert_eq!(snapshots[0].value, 2);
        assert_eq!(snapshots[1].value, -1);
        assert_eq!(snapshots[1].next_waiter, Some(pid(4)));
    }

    #[test]
    #[should_panic(expected = "INVALID_SEMAPHORE_HANDLE")]
    fn test_wait_on_unallocated_semaphore() {
        let _guard = TEST_LOCK.lock();
        fresh_kernel();
        ex_wait(1, 3);
    }

    #[test]
    #[should_panic(expected = "INVALID_SEMAPHORE_HANDLE")]
    fn test_signal_on_negative_id() {
        let _guard = TEST_LOCK.lock();
        fresh_kernel();
        ex_signal(1, -1);
    }

    #[test]
    #[should_panic(expected = "INVALID_SEMAPHORE_HANDLE")]
    fn test_signal_out_of_range() {
        let _guard = TEST_LOCK.lock();
        fresh_kernel();
        ex_signal(1, MAX_SEMAPHORES as i32);
    }

    #[test]
    fn test_queue_overflow_bugchecks() {
        let _guard = TEST_LOCK.lock();
        let dispatcher = fresh_kernel();

        let s = ex_seminit(1, 0);
        for p in 1..=MAX_PROCESSES as i32 {
            ex_wait(p, s);
        }

        let result = std::panic::catch_unwind(|| ex_wait(99, s));
        assert!(result.is_err());

        let data = get_bugcheck_data().unwrap();
        assert_eq!(data.code, codes::SEMAPHORE_QUEUE_OVERFLOW);
        assert_eq!(data.parameter1, s as u64);
        assert_eq!(data.parameter2, 99);

        // The overflowing wait must not have touched the semaphore
        assert_eq!(ex_semaphore_value(s), Some(-(MAX_PROCESSES as i32)));
        assert_eq!(dispatcher.blocked().len(), MAX_PROCESSES);
    }
}
