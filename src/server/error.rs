use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::flashcards::FlashcardStorageError;
use crate::review::StoreError;

/// Error returned by card API handlers
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Invalid(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::NotAuthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Store(StoreError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::TransientIo(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<FlashcardStorageError> for ApiError {
    fn from(err: FlashcardStorageError) -> Self {
        match err {
            FlashcardStorageError::Validation(message) => ApiError::Invalid(message),
            other => ApiError::Store(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Store(err) => err.to_string(),
            ApiError::Invalid(message) => message.clone(),
        };
        if status.is_server_error() {
            log::error!("Card API failure: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
