//! `config.json` in the application directory. Every field is optional, missing ones fall back
//! to the defaults below, so an empty object is a valid config.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::json_store::{read_json_file, write_json_file};

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pomodoro: PomodoroConfig,
    pub reminders: ReminderConfig,
    pub password: PasswordConfig,
    pub encryption: EncryptionConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PomodoroConfig {
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub long_break_minutes: u32,
    /// Every n-th completed work session is followed by a long break.
    pub long_break_every: u32,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
            long_break_minutes: 15,
            long_break_every: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub poll_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub default_length: usize,
    pub include_uppercase: bool,
    pub include_lowercase: bool,
    pub include_digits: bool,
    pub include_symbols: bool,
    pub exclude_ambiguous: bool,
    pub memorable_words: usize,
    pub memorable_separator: String,
    pub pin_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            default_length: 12,
            include_uppercase: true,
            include_lowercase: true,
            include_digits: true,
            include_symbols: true,
            exclude_ambiguous: false,
            memorable_words: 3,
            memorable_separator: "-".into(),
            pin_length: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Bytes. Files above the limit are reported as errors and left untouched.
    pub max_file_size: u64,
    /// Lower-case extensions including the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024,
            allowed_extensions: [
                ".pdf", ".ppt", ".pptx", ".jpg", ".jpeg", ".png", ".gif", ".mp4", ".avi", ".mov",
                ".mkv", ".txt", ".doc", ".docx", ".xls", ".xlsx", ".zip", ".rar", ".7z",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// The daemon schedules backups only when both source and target are set.
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub every_hours: u32,
    pub keep_days: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            every_hours: 24,
            keep_days: 7,
        }
    }
}

impl Config {
    pub async fn load(application_dir: &Path) -> Result<Config> {
        let path = application_dir.join(CONFIG_FILE_NAME);
        let config = read_json_file::<Config>(&path).await?.unwrap_or_default();
        debug!("Loaded config {config:?}");
        Ok(config)
    }

    /// Writes the config and returns the path it was written to.
    pub async fn save(&self, application_dir: &Path) -> Result<PathBuf> {
        let path = application_dir.join(CONFIG_FILE_NAME);
        write_json_file(&path, self).await?;
        Ok(path)
    }
}
