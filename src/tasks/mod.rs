//! Background Tasks Module
//!
//! Long-running maintenance tasks for the cache.

mod refresh;

pub use refresh::spawn_refresh_task;
