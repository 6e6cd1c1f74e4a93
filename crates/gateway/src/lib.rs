//! # Huddle Gateway Crate
//!
//! The HTTP surface of the Huddle backend: REST endpoints for accounts and
//! projects, and the WebSocket endpoint that admits connections into
//! project rooms.
//!
//! - **REST**: account and project management with OpenAPI documentation
//! - **WebSocket**: the realtime room handshake and event pump
//! - **State**: shared service handles plus the realtime core
//! - **Middleware**: bearer-credential authentication and request logging

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;

use std::sync::Arc;

use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        rest::health::health_check,
        rest::users::register,
        rest::users::login,
        rest::users::me,
        rest::users::logout,
        rest::users::list_users,
        rest::projects::create_project,
        rest::projects::add_user,
        rest::projects::list_projects,
        rest::projects::get_project,
        rest::projects::leave_project,
    ),
    components(schemas(
        rest::health::HealthResponse,
        rest::users::CredentialsRequest,
        rest::users::UserResponse,
        rest::users::SessionResponse,
        rest::users::TokenInfo,
        rest::users::ProfileResponse,
        rest::users::UsersResponse,
        rest::users::MessageResponse,
        rest::projects::CreateProjectRequest,
        rest::projects::AddUsersRequest,
        rest::projects::LeaveProjectRequest,
        rest::projects::ProjectMemberResponse,
        rest::projects::ProjectResponse,
        rest::projects::ProjectsResponse,
    )),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Users", description = "Account registration and sessions"),
        (name = "Projects", description = "Project management"),
    )
)]
struct ApiDoc;

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let state = Arc::new(state);

    let public = Router::new()
        .route("/api/health", get(rest::health::health_check))
        .route("/api/users/register", post(rest::users::register))
        .route("/api/users/login", post(rest::users::login))
        .route("/api-docs/openapi.json", get(openapi_spec));

    let protected = Router::new()
        .route("/api/users/me", get(rest::users::me))
        .route("/api/users/logout", post(rest::users::logout))
        .route("/api/users/all", get(rest::users::list_users))
        .route("/api/projects/create", post(rest::projects::create_project))
        .route("/api/projects/add-user", put(rest::projects::add_user))
        .route("/api/projects/all", get(rest::projects::list_projects))
        .route("/api/projects/:project_id", get(rest::projects::get_project))
        .route("/api/projects/leave", put(rest::projects::leave_project))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(websocket::create_websocket_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .with_state(state)
}
