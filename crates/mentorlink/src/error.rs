//! Error types for mentorlink.
//!
//! This module defines all error types used throughout the mentorlink crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// Why a login attempt was refused.
///
/// Both variants render the same message so callers cannot be used to probe
/// which usernames exist.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No account carries the given username.
    #[error("incorrect username/password")]
    NotFound,
    /// The account exists but the password (or role, when checked) did not match.
    #[error("incorrect username/password")]
    BadCredential,
}

/// The main error type for mentorlink operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// A table exists but does not match its expected schema.
    #[error("corrupt table at {path}: {message}")]
    StorageCorrupt {
        /// Path to the offending file.
        path: PathBuf,
        /// What failed to parse.
        message: String,
    },

    /// Reading or writing a CSV table failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Account Errors ===
    /// Login was refused.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Signup was refused because the username is already registered.
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    /// User-supplied input was rejected.
    #[error("invalid input: {0}")]
    Validation(String),

    // === Navigation Errors ===
    /// An action was dispatched from a screen where it is not allowed.
    #[error("action '{action}' is not allowed on the {screen} screen")]
    InvalidTransition {
        /// Name of the rejected action.
        action: &'static str,
        /// Screen that was active.
        screen: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for mentorlink operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a storage corruption error for the given file.
    #[must_use]
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StorageCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this error is a refused login.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this error is recoverable by the user retrying with
    /// different input.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::UsernameTaken(_) | Self::Validation(_)
        )
    }
}
