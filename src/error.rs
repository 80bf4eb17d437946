use thiserror::Error;

/// Failures callers may want to tell apart. Everything else travels as a plain [anyhow::Error]
/// with context attached.
#[derive(Debug, Error)]
pub enum DaybookError {
    #[error("invalid task index {0}")]
    InvalidIndex(usize),

    #[error("reminder {0} not found")]
    ReminderNotFound(String),

    #[error("invalid repeat interval '{0}' (expected <n>m, <n>h or <n>d)")]
    InvalidInterval(String),

    #[error("invalid time '{0}' (expected HH:MM, YYYY-MM-DDTHH:MM or a phrase like \"in 2 hours\")")]
    InvalidTime(String),

    #[error("key management: {0}")]
    KeyManagement(String),

    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("invalid password options: {0}")]
    InvalidPasswordOptions(String),

    #[error("invalid amount {0}")]
    InvalidAmount(f64),

    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("cannot convert {from} to {to}")]
    IncompatibleUnits { from: String, to: String },

    #[error("invalid date '{0}' (expected YYYY-MM-DD, DD/MM/YYYY, MM/DD/YYYY or \"March 5, 1990\")")]
    InvalidDate(String),
}
