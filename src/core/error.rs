/// Prodev Error Module
///
/// This module defines the error taxonomy shared by the connection provider,
/// the streams and the CSV seeder.
use std::fmt;
use thiserror::Error;

/// Why a connection could not be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The engine refused the session (permissions, authorization).
    AccessDenied,
    /// The server is reachable but the named database does not exist.
    UnknownDatabase,
    /// The server itself (data directory) could not be reached.
    Unreachable,
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionErrorKind::AccessDenied => "access denied",
            ConnectionErrorKind::UnknownDatabase => "unknown database",
            ConnectionErrorKind::Unreachable => "server unreachable",
        };
        f.write_str(label)
    }
}

/// Error type for every fallible operation in prodev.
///
/// The variants follow the three failure families of the streaming layer:
/// - connection failures (authentication, missing database, unreachable server)
/// - query failures (malformed SQL, missing table, unconvertible rows)
/// - data load failures while seeding from CSV
///
/// plus the ambient configuration and I/O errors.
#[derive(Error, Debug)]
pub enum ProdevError {
    /// Opening a session failed
    #[error("Connection error ({kind}): {message}")]
    Connection {
        kind: ConnectionErrorKind,
        message: String,
    },

    /// SQL execution or row conversion errors from SQLite
    #[error("Query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// Seeding failures that abort the load
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an argument outside the accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProdevError {
    pub fn connection(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        ProdevError::Connection {
            kind,
            message: message.into(),
        }
    }

    /// Returns the connection failure kind, if this is a connection error.
    pub fn connection_kind(&self) -> Option<ConnectionErrorKind> {
        match self {
            ProdevError::Connection { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether retrying the same operation may succeed.
    ///
    /// Only an unreachable server and a busy or locked database qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            ProdevError::Connection { kind, .. } => *kind == ConnectionErrorKind::Unreachable,
            ProdevError::Query(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Type alias for Result to use ProdevError as the error type.
pub type Result<T> = std::result::Result<T, ProdevError>;
