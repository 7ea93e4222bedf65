use std::time::Duration;

use thiserror::Error;

/// Coarse classification of an [`AppError`], used by transports to pick a
/// response without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-correctable input problem; never retried.
    Validation,
    /// The requested entity, or its join chain, is absent.
    NotFound,
    /// Backing store fault. Safe to resubmit once the store recovers.
    Storage,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Invalid routing number")]
    InvalidRoutingNumber,

    #[error("Customer does not exist: {0}")]
    UnknownCustomer(String),

    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Store call '{operation}' exceeded its deadline of {deadline:?}")]
    StoreTimeout {
        operation: &'static str,
        deadline: Duration,
    },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadRequest(_) | AppError::InvalidRoutingNumber | AppError::UnknownCustomer(_) => {
                ErrorKind::Validation
            }
            AppError::TransferNotFound(_)
            | AppError::AccountNotFound(_)
            | AppError::CustomerNotFound(_) => ErrorKind::NotFound,
            AppError::StoreTimeout { .. } | AppError::Database(_) => ErrorKind::Storage,
        }
    }
}
