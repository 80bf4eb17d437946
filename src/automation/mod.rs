pub mod backup;
pub mod folder_monitor;
pub mod organizer;
