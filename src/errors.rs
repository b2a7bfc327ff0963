use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Product unavailable")]
    ProductUnavailable,

    /// The targeted cart line is gone; the client should re-render the cart.
    #[error("Item is no longer in the cart")]
    ItemNotInCart,

    #[error("Not found")]
    NotFound,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Order could not be placed, please retry")]
    Retryable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::ProductNotFound(_) => AppError::ProductUnavailable,
            DomainError::ItemNotFound(_) => AppError::ItemNotInCart,
            DomainError::OrderNotFound(_) => AppError::NotFound,
            DomainError::EmptyCart => AppError::EmptyCart,
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::OrderPersistenceFailed(msg) => AppError::Retryable(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ProductUnavailable | AppError::ItemNotInCart | AppError::NotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Retryable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::ItemNotInCart => serde_json::json!({
                "error": self.to_string(),
                "refresh": true
            }),
            AppError::Retryable(reason) => {
                log::warn!("order persistence failed: {}", reason);
                serde_json::json!({
                    "error": self.to_string(),
                    "retryable": true
                })
            }
            AppError::Internal(reason) => {
                log::error!("internal error: {}", reason);
                serde_json::json!({ "error": "Internal server error" })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Failures that stop the service before it starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("migrations: {0}")]
    Migrations(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
