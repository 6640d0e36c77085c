//! Error types for PageHost Core

use thiserror::Error;

use crate::preview::PreviewTokenError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Preview token rejected: {0}")]
    PreviewToken(#[from] PreviewTokenError),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for every "row does not exist" flavour of error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::TenantNotFound(_)
                | Error::DomainNotFound(_)
                | Error::PageNotFound(_)
                | Error::BlockNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
