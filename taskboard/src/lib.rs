//! Taskboard: a Kanban task board client with live push updates.

pub mod api;
pub mod board;
pub mod cache;
pub mod config;
pub mod controller;
pub mod events;
pub mod push;
pub mod session;
pub mod ui;
