//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the process lifetime.
//!
//! # Tasks
//! - Cache cleanup: removes expired entries at configured intervals
//! - Rate limiter compaction: drops clients whose window emptied

mod cleanup;

pub use cleanup::{spawn_cleanup_task, spawn_compaction_task};
