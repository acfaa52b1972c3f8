use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docsense_core::error::{AppError, ErrorKind};
use serde::Serialize;

/// `AppError` rendered as `{ "error": { ... } }` with a status picked from its kind.
#[derive(Debug)]
pub struct ApiError(pub AppError);

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a AppError,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Retrieval | ErrorKind::GenerationBackend => StatusCode::BAD_GATEWAY,
        ErrorKind::Configuration | ErrorKind::Storage | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(
            AppError::validation("VALIDATION_BODY", "Request body is not valid JSON for this endpoint")
                .with_details(rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind);
        if status.is_server_error() {
            tracing::warn!(code = %self.0.code, kind = ?self.0.kind, status = status.as_u16(), "request failed");
        }
        (status, Json(ErrorBody { error: &self.0 })).into_response()
    }
}
