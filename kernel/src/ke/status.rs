//! Semaphore Status Codes
//!
//! Only `ResourceExhausted` is expected in normal operation. The other
//! variants mean the table, a queue or a value was about to be corrupted,
//! and the system service layer turns them into a bug check.

use super::process::ProcessId;
use super::semaphore::SemaphoreId;

/// Errors raised by the semaphore core
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SemError {
    /// Every slot in the semaphore table is allocated
    #[error("no free semaphores")]
    ResourceExhausted,

    /// A blocked queue had no room for another waiter
    #[error("blocked queue of semaphore {id} is full, cannot queue {pid}")]
    QueueCapacityExceeded { id: SemaphoreId, pid: ProcessId },

    /// Out of range or never allocated semaphore
    #[error("invalid semaphore handle {0}")]
    InvalidHandle(SemaphoreId),

    /// Wait or Signal would push the value outside `i32`
    #[error("value of semaphore {0} would overflow")]
    CountOverflow(SemaphoreId),
}

impl SemError {
    /// Whether the error means the semaphore state cannot be trusted
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::ResourceExhausted)
    }
}

pub type SemResult<T> = Result<T, SemError>;
