use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use crate::database::{extract_timeout_type, is_check_violation, is_timeout_error, is_transient_error};

pub const REQUIRED_FIELDS_MESSAGE: &str = "Name, price, and stock_quantity are required fields.";
pub const NOT_FOUND_MESSAGE: &str = "Product not found.";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Product not found.")]
    NotFound,
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),
}

impl CatalogError {
    /// Returns (error_code, status_code) for this error.
    fn error_metadata(&self) -> (&'static str, StatusCode) {
        match self {
            CatalogError::ValidationError(_) => ("validation_error", StatusCode::BAD_REQUEST),
            CatalogError::NotFound => ("not_found", StatusCode::NOT_FOUND),
            CatalogError::StoreUnavailable(_) => {
                ("store_unavailable", StatusCode::SERVICE_UNAVAILABLE)
            }
            CatalogError::DatabaseError(_) => {
                ("database_error", StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.error_metadata().0
    }

    pub fn status_code(&self) -> StatusCode {
        self.error_metadata().1
    }

    pub fn is_5xx(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_5xx() {
            tracing::error!(error_code = self.error_code(), error = %self, "Request failed");
        }

        let message = match self {
            CatalogError::ValidationError(msg) => msg,
            CatalogError::NotFound => NOT_FOUND_MESSAGE.to_string(),
            CatalogError::StoreUnavailable(_) => {
                "Service is currently unavailable. Please try again later.".to_string()
            }
            CatalogError::DatabaseError(_) => {
                "A database error occurred. Please try again later.".to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => CatalogError::NotFound,
            _ if is_timeout_error(&e) => CatalogError::StoreUnavailable(
                extract_timeout_type(&e).unwrap_or("timeout").to_string(),
            ),
            _ if is_transient_error(&e) => CatalogError::StoreUnavailable(e.to_string()),
            _ if is_check_violation(&e) => CatalogError::ValidationError(
                "Product violates a table constraint.".to_string(),
            ),
            _ => CatalogError::DatabaseError(e),
        }
    }
}

impl From<JsonRejection> for CatalogError {
    fn from(rejection: JsonRejection) -> Self {
        CatalogError::ValidationError(rejection.body_text())
    }
}
