//! Error types for the lending registry

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::store::{self, StoreError};

/// Stable error classes exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    InvalidArgument = 1,
    InvalidFormat = 2,
    NotFound = 3,
    AlreadyExists = 4,
    BorrowRejected = 5,
    InternalFailure = 6,
}

/// Message returned for every rejected loan, whatever the cause
pub const BORROW_REJECTED_MESSAGE: &str =
    "Borrow failed. Either item unavailable, member limit exceeded, or member does not exist.";

/// Why a loan commit was cancelled.
///
/// Only ever logged; callers see [`ErrorCode::BorrowRejected`] with
/// [`BORROW_REJECTED_MESSAGE`] regardless of the variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("item has no available copies")]
    ItemUnavailable,
    #[error("item does not exist")]
    ItemMissing,
    #[error("member reached the loan cap")]
    MemberAtCap,
    #[error("member does not exist")]
    MemberMissing,
    #[error("transaction id already recorded")]
    DuplicateTransaction,
    #[error("commit cancelled without a reported cause")]
    Unspecified,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Borrow rejected: {0}")]
    BorrowRejected(RejectReason),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::InvalidArgument,
            AppError::InvalidFormat(_) => ErrorCode::InvalidFormat,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::AlreadyExists,
            AppError::BorrowRejected(_) => ErrorCode::BorrowRejected,
            AppError::Database(_) | AppError::Store(_) | AppError::Internal(_) => {
                ErrorCode::InternalFailure
            }
        }
    }

    /// Transport faults leave no partial effect and may be retried; a query
    /// the database rejects on its own terms fails the same way every time
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(e) => store::is_transient(e),
            AppError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CounterOverflow(item_id) => AppError::Validation(format!(
                "copies would exceed the supported total for item {}",
                item_id
            )),
            other => AppError::Store(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let is_format = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .any(|e| e.code == "regex");

        let message = errors.to_string();
        if is_format {
            AppError::InvalidFormat(message)
        } else {
            AppError::Validation(message)
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let retryable = self.is_retryable();
        let (status, message) = match &self {
            AppError::Validation(msg) | AppError::InvalidFormat(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::BorrowRejected(reason) => {
                tracing::debug!("Borrow rejected: {}", reason);
                (StatusCode::CONFLICT, BORROW_REJECTED_MESSAGE.to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                store_failure(retryable)
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                store_failure(retryable)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        let mut response = (status, body).into_response();
        if retryable {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

fn store_failure(retryable: bool) -> (StatusCode, String) {
    if retryable {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Store unavailable, please retry".to_string(),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
