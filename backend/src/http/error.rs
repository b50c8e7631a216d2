//! HTTP error handling and response types.
//!
//! Every failure leaves the server as `{"status": <code>, "message": "..."}`
//! with the matching HTTP status. Details of 5xx errors are logged and never
//! returned to the client.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::rate_limit::RateDecision;
use crate::auth::TokenError;
use crate::db::repository::RepositoryError;
use crate::db::services::ServiceError;
use crate::search::SearchError;
use crate::storage::StorageError;

pub const MSG_NOT_FOUND: &str = "Sorry page not exists";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const MSG_UNAUTHORIZED: &str =
    "Your token signature is broken, please check your token or request new token";
pub const MSG_FORBIDDEN: &str = "you don't have access to perform this action";
pub const MSG_PAYLOAD_TOO_LARGE: &str = "Request body too large";
pub const MSG_TOO_MANY_REQUESTS: &str = "Rate limit exceeded";
pub const MSG_INTERNAL: &str = "Unhandled exception occurred, please contact API division";

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error)
    BadRequest(String),
    /// Broken or expired bearer token
    Unauthorized(String),
    /// Valid token without the required scope
    Forbidden,
    /// Resource not found
    NotFound(String),
    MethodNotAllowed,
    PayloadTooLarge,
    TooManyRequests(RateDecision),
    /// Internal server error; the detail is logged only
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        AppError::Internal(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthorized(_) => MSG_UNAUTHORIZED.to_string(),
            AppError::Forbidden => MSG_FORBIDDEN.to_string(),
            AppError::MethodNotAllowed => MSG_METHOD_NOT_ALLOWED.to_string(),
            AppError::PayloadTooLarge => MSG_PAYLOAD_TOO_LARGE.to_string(),
            AppError::TooManyRequests(_) => MSG_TOO_MANY_REQUESTS.to_string(),
            AppError::Internal(_) => MSG_INTERNAL.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Internal(detail) => tracing::error!(%status, "{}", detail),
            AppError::Unauthorized(reason) => tracing::warn!(%status, "{}", reason),
            _ => tracing::warn!(%status, "{}", self.public_message()),
        }

        let body = ApiError::new(status, self.public_message());
        let mut response = (status, Json(body)).into_response();
        if let AppError::TooManyRequests(decision) = &self {
            decision.write_headers(response.headers_mut());
            if let Ok(value) = HeaderValue::from_str(&decision.retry_after().to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::BadRequest(msg) => AppError::BadRequest(msg),
            ServiceError::TeamNotFound | ServiceError::PlayerNotFound => {
                AppError::BadRequest(err.to_string())
            }
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            ServiceError::Repository(e) => e.into(),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ValidationError { message, .. } => AppError::BadRequest(message),
            RepositoryError::NotFound { message, .. } => AppError::NotFound(message),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidKey(_) => AppError::Internal(err.to_string()),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;

    #[test]
    fn test_not_found_entities_are_bad_requests() {
        let err: AppError = ServiceError::TeamNotFound.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Team not found");

        let err: AppError = ServiceError::PlayerNotFound.into();
        assert_eq!(err.public_message(), "Player not found");
    }

    #[test]
    fn test_repository_failures_hide_details() {
        let err: AppError = RepositoryError::connection_with_context(
            "pool exhausted",
            ErrorContext::new("get_team"),
        )
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), MSG_INTERNAL);
    }

    #[test]
    fn test_token_errors_are_unauthorized() {
        let err: AppError = TokenError::Expired(10).into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.public_message(), MSG_UNAUTHORIZED);
    }

    #[test]
    fn test_search_errors_are_bad_requests() {
        let err: AppError = SearchError::MissingKeyword.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
