//! Personal terminal dashboard: links, reminders and a roadmap kept as
//! small card lists, optionally persisted and optionally behind a
//! session passphrase.

pub mod app;
pub mod config;
pub mod dashboard;
pub mod gate;
pub mod logging;
pub mod medium;
pub mod models;
pub mod records;
pub mod store;
pub mod ui;
