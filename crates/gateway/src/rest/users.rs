//! User account REST endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use huddle_identity::{Identity, IssuedCredential};
use huddle_users::User;

use crate::error::GatewayResult;
use crate::middleware::BearerToken;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.public_id,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: String,
}

impl SessionResponse {
    fn new(user: User, credential: IssuedCredential) -> Self {
        Self {
            user: user.into(),
            token: credential.token,
            expires_at: credential.expires_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenInfo {
    pub expires_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub token_info: TokenInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "Users",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Invalid email, weak password, or duplicate account")
    )
)]
pub async fn register(
    State(state): State<Arc<GatewayState>>,
    Json(payload): Json<CredentialsRequest>,
) -> GatewayResult<Response> {
    let (user, credential) = state.users.register(&payload.email, &payload.password).await?;
    let body = Json(SessionResponse::new(user, credential));
    Ok((StatusCode::CREATED, body).into_response())
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "Users",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<Arc<GatewayState>>,
    Json(payload): Json<CredentialsRequest>,
) -> GatewayResult<Json<SessionResponse>> {
    let (user, credential) = state.users.login(&payload.email, &payload.password).await?;
    Ok(Json(SessionResponse::new(user, credential)))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = ProfileResponse),
        (status = 401, description = "Missing, revoked, or invalid credential")
    )
)]
pub async fn me(
    State(state): State<Arc<GatewayState>>,
    Extension(identity): Extension<Identity>,
) -> GatewayResult<Json<ProfileResponse>> {
    let user = state.users.profile(&identity.id).await?;
    Ok(Json(ProfileResponse {
        user: user.into(),
        token_info: TokenInfo {
            expires_at: identity.expires_at.to_rfc3339(),
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/users/logout",
    tag = "Users",
    responses(
        (status = 200, description = "Credential revoked", body = MessageResponse),
        (status = 401, description = "Missing, revoked, or invalid credential")
    )
)]
pub async fn logout(
    State(state): State<Arc<GatewayState>>,
    Extension(token): Extension<BearerToken>,
) -> GatewayResult<Json<MessageResponse>> {
    state.revocations.revoke(&token.0, state.revocation_ttl).await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/all",
    tag = "Users",
    responses(
        (status = 200, description = "Every registered user except the caller", body = UsersResponse),
        (status = 401, description = "Missing, revoked, or invalid credential")
    )
)]
pub async fn list_users(
    State(state): State<Arc<GatewayState>>,
    Extension(identity): Extension<Identity>,
) -> GatewayResult<Json<UsersResponse>> {
    let users = state.users.list_others(&identity.id).await?;
    Ok(Json(UsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}
