//! Nostalgia OS Semaphore Core
//!
//! Counting semaphores for the kernel's `Seminit`/`Wait`/`Signal` system
//! calls: a fixed table of semaphores, each with its own FIFO of blocked
//! processes.
//!
//! # Layout
//!
//! - **ke** - Kernel: blocked queues, the semaphore table, dispatcher
//!   interface, status codes, bug check
//! - **ex** - Executive: the process-wide table and the system services
//!   the trap layer calls
//! - **config** - Capacities and trace flags
//!
//! Nothing here allocates. The scheduler supplies Block/Unblock through
//! `ke::Dispatcher` and the kernel installs the `log` backend.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod ex;
pub mod ke;

pub use config::{MAX_PROCESSES, MAX_SEMAPHORES};

/// Serializes tests that touch process-wide state
#[cfg(test)]
pub(crate) static TEST_LOCK: spin::Mutex<()> = spin::Mutex::new(());
