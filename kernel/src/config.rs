//! Semaphore Subsystem Configuration
//!
//! Capacities are fixed at compile time; nothing in the semaphore core
//! allocates. Tracing is the only knob that can change at run time.

use core::sync::atomic::{AtomicU32, Ordering};

/// Number of slots in the process-wide semaphore table
pub const MAX_SEMAPHORES: usize = 50;

/// Maximum number of processes in the system
///
/// Also the capacity of every blocked queue, so a queue can hold every
/// process at once.
pub const MAX_PROCESSES: usize = 10;

bitflags::bitflags! {
    /// Events reported through `log::trace!`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SemTraceFlags: u32 {
        /// Slot allocation by Seminit
        const ALLOCATE = 1 << 0;
        /// Every Wait call
        const WAIT = 1 << 1;
        /// Every Signal call
        const SIGNAL = 1 << 2;
        /// A process handed to the block primitive
        const BLOCK = 1 << 3;
        /// A process handed to the unblock primitive
        const UNBLOCK = 1 << 4;
    }
}

static TRACE_FLAGS: AtomicU32 = AtomicU32::new(0);

/// Replace the set of traced events
pub fn set_trace_flags(flags: SemTraceFlags) {
    TRACE_FLAGS.store(flags.bits(), Ordering::Relaxed);
}

/// Currently traced events
pub fn trace_flags() -> SemTraceFlags {
    SemTraceFlags::from_bits_truncate(TRACE_FLAGS.load(Ordering::Relaxed))
}

/// Check whether any of `flags` is being traced
#[inline]
pub fn tracing(flags: SemTraceFlags) -> bool {
    trace_flags().intersects(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_flags_round_trip() {
        let saved = trace_flags();

        set_trace_flags(SemTraceFlags::WAIT | SemTraceFlags::BLOCK);
        assert!(tracing(SemTraceFlags::WAIT));
        assert!(tracing(SemTraceFlags::BLOCK | SemTraceFlags::SIGNAL));
        assert!(!tracing(SemTraceFlags::ALLOCATE));

        set_trace_flags(saved);
    }

    #[test]
    fn test_unknown_bits_are_dropped() {
        assert_eq!(SemTraceFlags::from_bits_truncate(0xFFFF_FFE0), SemTraceFlags::empty());
    }
}
