use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest { pub name: String, pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct LoginResponse { pub token: String }

#[derive(ToSchema)]
pub struct UpdateRequest { pub name: String, pub email: String }

#[derive(ToSchema)]
pub struct CreatedResponse { pub id: Uuid }

#[derive(ToSchema)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// RFC 3339 timestamp
    pub created_at: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::login,
        crate::routes::users::create_user,
        crate::routes::users::list_users,
        crate::routes::users::get_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateRequest,
            CreatedResponse,
            AccountResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "users")
    )
)]
pub struct ApiDoc;
