//! Mapping from service errors to HTTP responses.

use api_shared::{AuthError, ErrorRes};
use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use nicu_core::RecordError;

const NOT_FOUND: &str = "Not found.";
const INVALID_PAGE: &str = "Invalid page.";
const INTERNAL_ERROR: &str = "Internal error";

/// Every way a REST request can fail.
#[derive(Debug)]
pub enum ApiError {
    Record(RecordError),
    Auth(AuthError),
    Body(JsonRejection),
    /// A path id that is not an integer; no record can match it.
    BadId,
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        ApiError::Record(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorRes::new(message))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Record(RecordError::Validation(errors)) => {
                tracing::debug!("Validation failed: {}", errors);
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::Record(RecordError::InvalidInput(message)) => {
                detail(StatusCode::BAD_REQUEST, message)
            }
            ApiError::Record(RecordError::NotFound { .. }) | ApiError::BadId => {
                detail(StatusCode::NOT_FOUND, NOT_FOUND)
            }
            ApiError::Record(RecordError::InvalidPage) => detail(StatusCode::NOT_FOUND, INVALID_PAGE),
            ApiError::Record(err @ (RecordError::Storage(_) | RecordError::Serialization(_))) => {
                tracing::error!("Record store error: {:?}", err);
                detail(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
            ApiError::Auth(err) => {
                let mut response = detail(StatusCode::UNAUTHORIZED, err.to_string());
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"api\""),
                );
                response
            }
            ApiError::Body(rejection) => {
                let status = rejection.status();
                let message = match rejection {
                    JsonRejection::MissingJsonContentType(_) => {
                        "Unsupported media type in request; expected application/json.".to_string()
                    }
                    other => format!("JSON parse error - {}", other.body_text()),
                };
                detail(status, message)
            }
        }
    }
}
