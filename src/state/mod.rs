//! Client-side synchronization core: server-state cache, board identity
//! broadcast, optimistic edits, and the autoplay scheduler.

#[cfg(test)]
#[path = "scenario_test.rs"]
mod scenario_test;

pub mod autoplay;
pub mod cache;
pub mod edit;
pub mod identity;
pub mod queries;
