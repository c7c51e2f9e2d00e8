use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;

use service::auth::domain::{Account, RegisterInput, UpdateInput};
use service::auth::Subject;

use crate::errors::JsonApiError;
use crate::routes::auth::ServerState;

#[derive(Serialize)]
pub struct CreatedOutput {
    pub id: Uuid,
}

// An id that cannot name an account is simply not found.
fn parse_id(raw: &str) -> Result<Uuid, JsonApiError> {
    Uuid::parse_str(raw).map_err(|_| JsonApiError::not_found())
}

#[utoipa::path(post, path = "/users", tag = "users", request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Registered", body = crate::openapi::CreatedResponse), (status = 400, description = "Bad Request"), (status = 409, description = "Duplicate email")))]
pub async fn create_user(
    State(state): State<ServerState>,
    WithRejection(Json(input), _): WithRejection<Json<RegisterInput>, JsonApiError>,
) -> Result<(StatusCode, Json<CreatedOutput>), JsonApiError> {
    let account = state.accounts.register(input).await?;
    Ok((StatusCode::CREATED, Json(CreatedOutput { id: account.id })))
}

#[utoipa::path(get, path = "/users", tag = "users", responses((status = 200, description = "All accounts", body = [crate::openapi::AccountResponse]), (status = 401, description = "Unauthorized")))]
pub async fn list_users(State(state): State<ServerState>) -> Result<Json<Vec<Account>>, JsonApiError> {
    Ok(Json(state.accounts.list().await?))
}

#[utoipa::path(get, path = "/users/{id}", tag = "users", params(("id" = String, Path, description = "Account id")), responses((status = 200, description = "Account", body = crate::openapi::AccountResponse), (status = 401, description = "Unauthorized"), (status = 404, description = "Not Found")))]
pub async fn get_user(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Json<Account>, JsonApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.accounts.get(id).await?))
}

#[utoipa::path(put, path = "/users/{id}", tag = "users", params(("id" = String, Path, description = "Account id")), request_body = crate::openapi::UpdateRequest, responses((status = 204, description = "Updated"), (status = 400, description = "Bad Request"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found"), (status = 409, description = "Duplicate email")))]
pub async fn update_user(
    State(state): State<ServerState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateInput>, JsonApiError>,
) -> Result<StatusCode, JsonApiError> {
    let id = parse_id(&id)?;
    state.accounts.update(&subject, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(delete, path = "/users/{id}", tag = "users", params(("id" = String, Path, description = "Account id")), responses((status = 204, description = "Deleted"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn delete_user(
    State(state): State<ServerState>,
    Extension(subject): Extension<Subject>,
    Path(id): Path<String>,
) -> Result<StatusCode, JsonApiError> {
    let id = parse_id(&id)?;
    state.accounts.delete(&subject, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
