//! Personal productivity toolkit usable from a terminal: todo list, reminders, time tracking,
//! pomodoro and expenses, plus file encryption, password tools, file automation, CSV/JSON
//! conversion and unit and age calculators. A small daemon watches reminders and runs scheduled
//! backups in the background.
//!

pub mod automation;
pub mod calculators;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod data;
pub mod error;
pub mod productivity;
pub mod security;
pub mod store;
pub mod utils;
