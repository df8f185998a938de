use http::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;

use crate::models::ProductId;
use crate::requests::RequestKind;

#[derive(Debug, Error)]
pub enum ProductError {
    /// Caller input broke one or more field rules; the handler never ran
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// A write targeted an id that does not exist
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// Zero or several handlers registered for a request kind
    #[error("Expected exactly one handler for {kind}, found {found}")]
    NoHandlerRegistered { kind: RequestKind, found: usize },

    #[error("Store failure: {0}")]
    Store(#[from] DbErr),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

impl ProductError {
    /// Status a transport layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProductError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ProductError::NotFound(_) => StatusCode::NOT_FOUND,
            ProductError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            ProductError::NoHandlerRegistered { .. }
            | ProductError::Store(_)
            | ProductError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Expected outcomes are mapped to user-facing responses; the rest are system failures
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            ProductError::ValidationFailed(_) | ProductError::NotFound(_)
        )
    }

    /// Violation messages in rule order, if this is a validation failure
    pub fn violations(&self) -> Option<&[String]> {
        match self {
            ProductError::ValidationFailed(messages) => Some(messages.as_slice()),
            _ => None,
        }
    }
}
