//! The module contains the error the engine can throw.
//!
//! Every variant but [`Database`] is a *rejection*: the operation was refused
//! before anything was written, and the message is a reason fit to show to
//! the person at the desk. [`Database`] means the store failed; the unit of
//! work was rolled back and the operation is not retried.
//!
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Unknown bicycle, member or transaction.
    #[error("{0}")]
    NotFound(String),
    /// Membership inactive or rental limit reached.
    #[error("{0}")]
    Ineligible(String),
    /// Bicycle is not in the `Available` state.
    #[error("{0}")]
    NotAvailable(String),
    /// Return attempted on a rental that already has a return date.
    #[error("{0}")]
    AlreadyClosed(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The return was not confirmed by the caller.
    #[error("{0}")]
    Canceled(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for validation failures, `false` for storage failures.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Ineligible(a), Self::Ineligible(b)) => a == b,
            (Self::NotAvailable(a), Self::NotAvailable(b)) => a == b,
            (Self::AlreadyClosed(a), Self::AlreadyClosed(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::Canceled(a), Self::Canceled(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
