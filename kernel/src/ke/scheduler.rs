//! Dispatcher Interface
//!
//! The semaphore core does not switch processes itself. Blocking and
//! readying a process belong to the kernel's scheduler, which plugs in
//! through the `Dispatcher` trait.
//!
//! - `block`: take the process off the CPU until someone unblocks it.
//!   From the caller's point of view this does not return until the
//!   process is scheduled again.
//! - `unblock`: put the process back on the ready queue.

use super::process::ProcessId;

/// Block/Unblock primitives supplied by the scheduler
///
/// The semaphore table lock is released before `block` is called, so a
/// signalling process can call `unblock(pid)` before the waiter reaches
/// `block(pid)`. Implementations must remember such an early unblock as
/// a pending wake and let the following `block` return immediately;
/// dropping it strands the waiter forever.
pub trait Dispatcher: Sync {
    /// Suspend `pid` until it is explicitly unblocked
    ///
    /// Returns at once if an unblock for `pid` is already pending.
    fn block(&self, pid: ProcessId);

    /// Make `pid` runnable again, or record a pending wake if `pid`
    /// has not blocked yet
    fn unblock(&self, pid: ProcessId);
}

/// Dispatcher used before the scheduler registers itself
///
/// Blocking without a scheduler would strand the process, so both
/// operations only report the call.
pub struct NullDispatcher;

impl Dispatcher for NullDispatcher {
    fn block(&self, pid: ProcessId) {
        log::warn!("[SEM] block({}) with no dispatcher registered", pid);
    }

    fn unblock(&self, pid: ProcessId) {
        log::warn!("[SEM] unblock({}) with no dispatcher registered", pid);
    }
}

/// Hand a process to the dispatcher's block primitive
#[inline]
pub fn ki_block_process(dispatcher: &dyn Dispatcher, pid: ProcessId) {
    if crate::config::tracing(crate::config::SemTraceFlags::BLOCK) {
        log::trace!("[SEM] block {}", pid);
    }
    dispatcher.block(pid);
}

/// Hand a process to the dispatcher's unblock primitive
#[inline]
pub fn ki_unblock_process(dispatcher: &dyn Dispatcher, pid: ProcessId) {
    if crate::config::tracing(crate::config::SemTraceFlags::UNBLOCK) {
        log::trace!("[SEM] unblock {}", pid);
    }
    dispatcher.unblock(pid);
}


#[cfg(test)]
mod tests {
    use super::testing::{DispatchEvent, RecordingDispatcher};
    use super::*;

    #[test]
    fn test_block_and_unblock_reach_dispatcher() {
        let dispatcher = RecordingDispatcher::new();

        ki_block_process(&dispatcher, ProcessId(3));
        ki_unblock_process(&dispatcher, ProcessId(3));

        assert_eq!(
            dispatcher.events(),
            [DispatchEvent::Block(ProcessId(3)), DispatchEvent::Unblock(ProcessId(3))]
        );
    }
}
