//! Process Identity
//!
//! The semaphore core never looks inside a process. It only records the
//! identifier the kernel passes in and hands it back to the dispatcher.

use core::fmt;

/// Kernel process identifier
///
/// Validity is the caller's concern; the core stores whatever id the
/// trap layer hands it.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub i32);

impl ProcessId {
    /// Create a process id from the raw kernel value
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw kernel value
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl From<i32> for ProcessId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}
