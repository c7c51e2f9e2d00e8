use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use tracing::warn;

use service::auth::domain::LoginInput;
use service::auth::repository::AccountRepository;
use service::auth::{AccountService, Subject, TokenManager};

use crate::errors::JsonApiError;

pub type SharedAccounts = Arc<AccountService<dyn AccountRepository>>;

#[derive(Clone)]
pub struct ServerState {
    pub accounts: SharedAccounts,
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub token: String,
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged in", body = crate::openapi::LoginResponse), (status = 401, description = "Invalid credentials")))]
pub async fn login(
    State(state): State<ServerState>,
    WithRejection(Json(input), _): WithRejection<Json<LoginInput>, JsonApiError>,
) -> Result<Json<LoginOutput>, JsonApiError> {
    let session = state.accounts.login(input).await?;
    Ok(Json(LoginOutput { token: session.token }))
}

/// Token carried by the `Authorization` header.
///
/// Both the bare token and `Bearer <token>` (any case) are accepted. A
/// missing or non-ASCII header yields the empty token.
pub fn bearer_token(headers: &HeaderMap) -> &str {
    const SCHEME: &str = "bearer";
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim();
    match (raw.get(..SCHEME.len()), raw.get(SCHEME.len()..)) {
        // A bare scheme carries no token.
        (Some(scheme), Some(rest)) if scheme.eq_ignore_ascii_case(SCHEME) && rest.is_empty() => "",
        (Some(scheme), Some(rest)) if scheme.eq_ignore_ascii_case(SCHEME) && rest.starts_with(char::is_whitespace) => {
            rest.trim_start()
        }
        _ => raw,
    }
}

/// Gate for protected routes: validates the session token and attaches the
/// resolved [`Subject`] to the request. Every failure is the same 401.
pub async fn require_bearer_token(
    State(tokens): State<Arc<TokenManager>>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let outcome = tokens.validate(bearer_token(req.headers()));
    match outcome {
        Ok(subject) => {
            req.extensions_mut().insert(Subject::new(subject));
            Ok(next.run(req).await)
        }
        Err(reason) => {
            warn!(path = %req.uri().path(), method = %req.method(), %reason, "request rejected by auth gate");
            Err(JsonApiError::unauthorized())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn raw_token_passes_through() {
        assert_eq!(bearer_token(&headers("abc.def.ghi")), "abc.def.ghi");
    }

    #[test]
    fn bearer_prefix_stripped_case_insensitively() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), "abc.def.ghi");
        assert_eq!(bearer_token(&headers("bearer  abc.def.ghi")), "abc.def.ghi");
        assert_eq!(bearer_token(&headers("BEARER abc")), "abc");
    }

    #[test]
    fn missing_header_is_empty() {
        assert_eq!(bearer_token(&HeaderMap::new()), "");
    }

    #[test]
    fn bare_scheme_is_empty() {
        assert_eq!(bearer_token(&headers("Bearer ")), "");
        assert_eq!(bearer_token(&headers("Bearer")), "");
        assert_eq!(bearer_token(&headers("bearer\t ")), "");
    }

    #[test]
    fn scheme_needs_a_separator() {
        assert_eq!(bearer_token(&headers("Bearerabc")), "Bearerabc");
        assert_eq!(bearer_token(&headers("Bearer\tabc")), "abc");
    }
}
