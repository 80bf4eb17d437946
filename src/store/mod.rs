//! Stores are flat files holding a list of records.
//!  - A store is fully read and fully rewritten on every mutation.
//!  - [json_store::JsonStore] keeps a pretty printed JSON array, used by todos, reminders, time
//!    tracking and pomodoro statistics.
//!  - [csv_store::CsvStore] keeps one record per CSV row, used by expenses.
//!  - Files are guarded with advisory locks, shared for reads and exclusive for writes.

pub mod csv_store;
pub mod json_store;
