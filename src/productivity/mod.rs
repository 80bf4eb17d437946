pub mod dashboard;
pub mod expenses;
pub mod pomodoro;
pub mod reminder;
pub mod todo;
pub mod tracker;
