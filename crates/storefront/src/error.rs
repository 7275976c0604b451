//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Responses carry a JSON body `{"error": "..."}`. Server errors never expose
//! their details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{CartError, CheckoutError, CommissionError, PaymentError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Commission(#[from] CommissionError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cart(err) => match err {
                CartError::InvalidQuantity(_) | CartError::VariantRequired(_) => {
                    StatusCode::BAD_REQUEST
                }
                CartError::ProductNotFound
                | CartError::VariantNotFound
                | CartError::ItemNotFound => StatusCode::NOT_FOUND,
                CartError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidAddress(_)
                | CheckoutError::UnsupportedPaymentMethod(_)
                | CheckoutError::EmptyCart
                | CheckoutError::MissingCode
                | CheckoutError::InvalidCode(_) => StatusCode::BAD_REQUEST,
                CheckoutError::CouponUnavailable(_)
                | CheckoutError::ProductUnavailable(_)
                | CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Payment(err) => match err {
                PaymentError::OrderNotFound | PaymentError::PaymentNotFound => {
                    StatusCode::NOT_FOUND
                }
                PaymentError::MissingTransactionRef | PaymentError::ConfirmationRequired => {
                    StatusCode::BAD_REQUEST
                }
                PaymentError::AlreadyConfirmed
                | PaymentError::PaymentNotPending
                | PaymentError::InvalidTransition { .. } => StatusCode::CONFLICT,
                PaymentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Commission(err) => match err {
                CommissionError::NotFound => StatusCode::NOT_FOUND,
                CommissionError::InvalidTransition { .. } => StatusCode::CONFLICT,
                CommissionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        let message = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this once the request's identity is known to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
