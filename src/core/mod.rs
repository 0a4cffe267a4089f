/// Core Module for prodev
///
/// Shared infrastructure for the streaming layer: connection management,
/// one-shot queries and transactions, and the crate-wide error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{ConnectionErrorKind, ProdevError, Result};
