//! Unified error type for every layer of the service.
//!
//! Core functions return [`Result`]; the HTTP layer maps each variant onto a
//! status code and the `{ error, success: false }` envelope.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any failure reported by the backing store
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or not unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Row does not exist or belongs to another tenant
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `"project"`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Input failed validation at the boundary
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// Monetary amount is negative, NaN or infinite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Journal entry debits and credits differ, or it has fewer than two lines
    #[error("Journal entry cannot be posted: debits {debits:.2}, credits {credits:.2}, {line_count} line(s)")]
    UnbalancedEntry {
        /// Sum of debit amounts
        debits: f64,
        /// Sum of credit amounts
        credits: f64,
        /// Number of lines submitted
        line_count: usize,
    },

    /// Status change not permitted from the current status
    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidTransition {
        /// Entity kind
        entity: &'static str,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Missing or invalid credentials
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Reason
        message: String,
    },

    /// Authenticated caller lacks a permission
    #[error("Forbidden: missing permission '{permission}'")]
    Forbidden {
        /// The permission that was required
        permission: String,
    },

    /// API key exhausted its hourly quota
    #[error("Rate limit of {limit} requests per hour exceeded")]
    RateLimited {
        /// Configured hourly limit
        limit: i32,
    },

    /// Outbound HTTP failure
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Upstream API answered with an error or with output that does not match the schema
    #[error("Upstream service error: {message}")]
    Upstream {
        /// Upstream detail
        message: String,
    },

    /// Integer conversion overflow
    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for Error {
    fn from(value: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        Self::Io(value.into_error())
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
