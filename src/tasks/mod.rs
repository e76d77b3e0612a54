//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cleanup: Removes expired responses from the memory cache

mod cleanup;

pub use cleanup::spawn_cleanup_task;
