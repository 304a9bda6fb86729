//! Kernel Bug Check
//!
//! A bug check is raised when the semaphore core finds state it cannot
//! trust any more: a waiter that does not fit its queue, or an operation
//! on a semaphore that was never allocated. Continuing would strand a
//! process or corrupt a neighbouring slot, so the kernel stops instead.
//!
//! The stop code and its parameters are saved for the debugger, logged
//! at error level, and the current context panics. The kernel's panic
//! handler halts the machine; in hosted tests the panic is observable.

use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

/// Bug check has been initiated
static BUGCHECK_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Data of the most recent bug check
static BUGCHECK_DATA: Mutex<BugCheckData> = Mutex::new(BugCheckData::new());

/// Bug check information structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BugCheckData {
    /// The bug check code
    pub code: u32,
    /// First parameter
    pub parameter1: u64,
    /// Second parameter
    pub parameter2: u64,
    /// Third parameter
    pub parameter3: u64,
    /// Fourth parameter
    pub parameter4: u64,
}

impl BugCheckData {
    const fn new() -> Self {
        Self {
            code: 0,
            parameter1: 0,
            parameter2: 0,
            parameter3: 0,
            parameter4: 0,
        }
    }
}

// ============================================================================
// Bug Check Codes (STOP Codes)
// ============================================================================

pub mod codes {
    //! Stop codes raised by the semaphore subsystem

    /// SEMAPHORE_QUEUE_OVERFLOW (0x100)
    /// A process had to block but its semaphore's queue was full.
    /// Parameters: semaphore id, process id, queue capacity.
    pub const SEMAPHORE_QUEUE_OVERFLOW: u32 = 0x00000100;

    /// INVALID_SEMAPHORE_HANDLE (0x101)
    /// Wait or Signal named an out-of-range or unallocated semaphore.
    /// Parameters: raw semaphore id, calling process id.
    pub const INVALID_SEMAPHORE_HANDLE: u32 = 0x00000101;

    /// SEMAPHORE_COUNT_OVERFLOW (0x102)
    /// Wait or Signal would move a semaphore's value outside `i32`.
    /// Parameters: semaphore id, calling process id.
    pub const SEMAPHORE_COUNT_OVERFLOW: u32 = 0x00000102;
}

/// Human-readable name of a stop code
pub fn bugcheck_name(code: u32) -> &'static str {
    match code {
        codes::SEMAPHORE_QUEUE_OVERFLOW => "SEMAPHORE_QUEUE_OVERFLOW",
        codes::INVALID_SEMAPHORE_HANDLE => "INVALID_SEMAPHORE_HANDLE",
        codes::SEMAPHORE_COUNT_OVERFLOW => "SEMAPHORE_COUNT_OVERFLOW",
        _ => "UNKNOWN_BUGCHECK",
    }
}

// ============================================================================
// Bug Check Functions
// ============================================================================

/// Stop with a bug check code and diagnostic parameters
///
/// # Arguments
/// * `code` - The bug check code identifying the error
/// * `p1`..`p4` - Parameters, meaning depends on code
///
/// # Never Returns
pub fn ke_bugcheck_ex(code: u32, p1: u64, p2: u64, p3: u64, p4: u64) -> ! {
    BUGCHECK_ACTIVE.store(true, Ordering::SeqCst);

    let data = BugCheckData {
        code,
        parameter1: p1,
        parameter2: p2,
        parameter3: p3,
        parameter4: p4,
    };
    *BUGCHECK_DATA.lock() = data;

    log::error!(
        "[SEM] *** STOP: 0x{:08X} ({:#x}, {:#x}, {:#x}, {:#x}) {}",
        code,
        p1,
        p2,
        p3,
        p4,
        bugcheck_name(code)
    );

    panic!("bugcheck 0x{:08X} {}", code, bugcheck_name(code));
}

/// Check if a bugcheck has been raised
pub fn is_bugcheck_active() -> bool {
    BUGCHECK_ACTIVE.load(Ordering::SeqCst)
}

/// Get the most recent bugcheck data (if any)
pub fn get_bugcheck_data() -> Option<BugCheckData> {
    if is_bugcheck_active() {
        Some(*BUGCHECK_DATA.lock())
    } else {
        None
    }
}

// ============================================================================
// Convenience Macros
// ============================================================================

/// Trigger a bugcheck with one to four parameters
#[macro_export]
macro_rules! bugcheck {
    ($code:expr, $p1:expr) => {
        $crate::ke::bugcheck::ke_bugcheck_ex($code, $p1 as u64, 0, 0, 0)
    };
    ($code:expr, $p1:expr, $p2:expr) => {
        $crate::ke::bugcheck::ke_bugcheck_ex($code, $p1 as u64, $p2 as u64, 0, 0)
    };
    ($code:expr, $p1:expr, $p2:expr, $p3:expr) => {
        $crate::ke::bugcheck::ke_bugcheck_ex($code, $p1 as u64, $p2 as u64, $p3 as u64, 0)
    };
    ($code:expr, $p1:expr, $p2:expr, $p3:expr, $p4:expr) => {
        $crate::ke::bugcheck::ke_bugcheck_ex($code, $p1 as u64, $p2 as u64, $p3 as u64, $p4 as u64)
    };
}
