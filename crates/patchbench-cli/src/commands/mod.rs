//! Command implementations

pub mod config;
pub mod evaluate;
pub mod task;
