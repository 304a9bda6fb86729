//! Kernel (ke)
//!
//! The semaphore core proper:
//!
//! - **Blocked queues**: fixed-capacity FIFO of waiting processes
//! - **Semaphore table**: slot allocation and the wait/signal transitions
//! - **Dispatcher**: the scheduler's Block/Unblock primitives
//! - **Bug check**: fatal stop for corrupted semaphore state
//!
//! # Key Structures
//!
//! - `BlockedQueue`: ring of process ids with an explicit full flag
//! - `SemaphoreTable`: fixed array of semaphore slots
//! - `Dispatcher`: trait the scheduler implements

pub mod blocked_queue;
pub mod bugcheck;
pub mod process;
pub mod scheduler;
pub mod semaphore;
pub mod status;

// Re-export key types
pub use blocked_queue::{BlockedQueue, NOT_FOUND};
pub use process::ProcessId;
pub use scheduler::{Dispatcher, NullDispatcher};
pub use semaphore::{
    SemaphoreId, SemaphoreSnapshot, SemaphoreStats, SemaphoreTable, SignalOutcome, WaitOutcome,
};
pub use status::{SemError, SemResult};

// Re-export bug check entry points
pub use bugcheck::{ke_bugcheck_ex, BugCheckData};
