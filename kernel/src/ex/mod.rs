//! Executive (ex)
//!
//! System services built on the kernel semaphore core:
//!
//! - **Semaphore services**: InitSem, Seminit, Wait, Signal
//! - **Inspection**: statistics and per-semaphore snapshots
//!
//! The executive owns the process-wide semaphore table and the registered
//! dispatcher; callers never see either directly.

pub mod semaphore;

// Re-exports for convenience
pub use semaphore::*;
