use thiserror::Error;

/// Classified errors, mirroring how they are reported to the user.
///
/// `User` errors are things the user can fix and are rendered as a single
/// line. `Unlikely` errors carry long-form remediation advice. Everything
/// else is rendered as an internal error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    User(String),

    #[error("{short}")]
    Unlikely { short: String, long: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Logic errors and protocol violations.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn user(message: impl Into<String>) -> Self {
        Error::User(message.into())
    }

    pub fn unlikely(short: impl Into<String>, long: impl Into<String>) -> Self {
        Error::Unlikely {
            short: short.into(),
            long: long.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Whether this error should halt a multi-item operation instead of
    /// being collected and reported once the operation finishes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Unlikely { .. } | Error::Database(_) | Error::Internal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
