//! Error types for atareport.
//!
//! This module defines all error types used throughout the atareport crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for atareport operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to read a stored document.
    #[error("failed to read {path}: {source}")]
    StorageRead {
        /// Path of the storage unit.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a stored document.
    #[error("failed to write {path}: {source}")]
    StorageWrite {
        /// Path of the storage unit.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a stored document.
    #[error("failed to delete {path}: {source}")]
    StorageDelete {
        /// Path of the storage unit.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Domain Errors ===
    /// A form identifier contains characters that are not allowed.
    #[error("invalid form id: {0:?}")]
    InvalidFormId(String),

    /// An archive name is not a generated identifier.
    #[error("invalid archive name: {0:?}")]
    InvalidArchiveName(String),

    /// No generated archive exists with the given name.
    #[error("archive not found: {0}")]
    ArchiveNotFound(String),

    /// A request body is missing required data.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // === Export Errors ===
    /// The external PDF renderer failed.
    #[error("PDF rendering failed: {message}")]
    RenderFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// The configured logo could not be read.
    #[error("failed to load logo {path}: {source}")]
    LogoLoad {
        /// Path of the logo file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the ZIP archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
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

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for atareport operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a renderer failure error.
    #[must_use]
    pub fn render_failed(message: impl Into<String>) -> Self {
        Self::RenderFailed {
            message: message.into(),
        }
    }

    /// Check if this error means the requested resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ArchiveNotFound(_))
    }

    /// Check if this error was caused by bad caller input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormId(_) | Self::InvalidArchiveName(_) | Self::InvalidRequest(_)
        )
    }
}
