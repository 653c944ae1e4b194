//! Error types for shieldr.
//!
//! This module defines the errors surfaced by the library. Upstream geodata
//! failures are deliberately absent: they never leave the zone resolver and
//! are reported as a fallback reason instead (see [`crate::zones`]).

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for shieldr operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open the in-memory database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path (or `:memory:`) of the database.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    StorageLock,

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

    // === Request Errors ===
    /// Query coordinates are missing or not finite numbers.
    #[error("lat and lng are required")]
    InvalidQuery,

    /// A request body failed validation.
    #[error("{message}")]
    Validation {
        /// Message returned to the client.
        message: String,
    },

    /// No contact exists with the given id.
    #[error("Contact not found")]
    ContactNotFound {
        /// The id that was looked up.
        id: i64,
    },

    // === Server Errors ===
    /// The HTTP listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    ServerBind {
        /// Address that was requested.
        addr: SocketAddr,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system or socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for shieldr operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error was caused by the caller rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuery | Self::Validation { .. } | Self::ContactNotFound { .. }
        )
    }

    /// Check if this error means a requested record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ContactNotFound { .. })
    }
}
