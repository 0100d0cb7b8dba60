//! Unified error type for the ledger core.
//!
//! Business-rule failures carry enough context for the request layer to build a
//! human-readable message; `status_code` tells it which HTTP class to surface.

use rust_decimal::Decimal;
use thiserror::Error;

/// All failures a ledger operation can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying database failure; the surrounding transaction is rolled back.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// I/O failure while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is malformed or violates a business rule.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A batch does not hold enough pieces for the requested sale.
    #[error("Insufficient stock for batch {batch_id}. Available: {available}, Required: {required}")]
    InsufficientStock {
        /// Batch that was short
        batch_id: i64,
        /// Pieces left in the batch
        available: i32,
        /// Pieces the cart asked for
        required: i32,
    },

    /// A payment larger than everything owed.
    #[error("Payment amount ({amount}) cannot exceed total due ({total_due})")]
    ExcessPayment {
        /// Amount offered
        amount: Decimal,
        /// Sum of all outstanding dues
        total_due: Decimal,
    },

    /// Ledger totals disagree after a mutation, e.g. an order whose stored amounts drifted.
    #[error("Ledger consistency violation: expected total due {expected}, found {actual}")]
    ConsistencyViolation {
        /// Total due the allocation should have produced
        expected: Decimal,
        /// Total due actually found after the allocation
        actual: Decimal,
    },

    /// Entity id absent, or owned by another organization.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity looked up
        entity: &'static str,
        /// Requested id
        id: i64,
    },

    /// Inventory already holds the maximum number of batches.
    #[error("Maximum {limit} batches allowed for inventory {inventory_id}")]
    BatchLimitExceeded {
        /// Inventory that is full
        inventory_id: i64,
        /// Batch cap
        limit: usize,
    },
}

impl Error {
    /// Shorthand for a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// HTTP-equivalent status the request layer should report.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::ExcessPayment { .. } | Self::BatchLimitExceeded { .. } => {
                400
            }
            Self::NotFound { .. } => 404,
            Self::InsufficientStock { .. } => 422,
            Self::ConsistencyViolation { .. }
            | Self::Database(_)
            | Self::Config { .. }
            | Self::Io(_) => 500,
        }
    }

    /// Whether the failure is the caller's fault (4xx).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
