//! Shared wire definitions for the Taskboard client and its backend.

pub mod api;
pub mod push;
pub mod task;
