use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use service::auth::AuthError;
use tracing::{debug, error};

/// JSON error body returned by every handler: `{"error": ..., "detail": ...}`.
#[derive(Debug)]
pub struct JsonApiError {
    status: StatusCode,
    error: &'static str,
    detail: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, detail: Option<String>) -> Self {
        Self { status, error, detail }
    }

    /// The single answer for every token failure.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", None)
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid request body", None)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found", None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.error, detail: self.detail.as_deref() };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, "validation error", Some(msg)),
            AuthError::DuplicateEmail => Self::new(StatusCode::CONFLICT, "email already registered", None),
            AuthError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, "invalid credentials", None),
            AuthError::Token(_) => Self::unauthorized(),
            AuthError::NotFound => Self::not_found(),
            AuthError::Forbidden => Self::new(StatusCode::FORBIDDEN, "forbidden", None),
            AuthError::Hash(_) | AuthError::Store(_) | AuthError::Internal(_) => {
                error!(code = e.code(), error = %e, "request failed on internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error", None)
            }
        }
    }
}

/// Any unreadable JSON body is a plain 400; the parser's message stays in the logs.
impl From<JsonRejection> for JsonApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), reason = %rejection.body_text(), "request body rejected");
        Self::bad_request()
    }
}
