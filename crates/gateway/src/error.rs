//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use huddle_identity::IdentityError;
use huddle_projects::ProjectError;
use huddle_realtime::GateError;
use huddle_users::UserError;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InternalError(_)
            | GatewayError::DatabaseError(_)
            | GatewayError::WebSocketError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = json!({
            "error": status.as_str(),
            "message": self.to_string(),
        });

        (status, Json(error_response)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<UserError> for GatewayError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::UserExists => GatewayError::InvalidRequest("user already exists".to_string()),
            UserError::InvalidCredentials => {
                GatewayError::AuthenticationFailed("invalid credentials".to_string())
            }
            UserError::InvalidEmail => GatewayError::InvalidRequest("invalid email address".to_string()),
            UserError::PasswordTooWeak => GatewayError::InvalidRequest("password too weak".to_string()),
            UserError::UserNotFound => GatewayError::NotFound("user not found".to_string()),
            UserError::Database(err) => GatewayError::DatabaseError(err.to_string()),
            UserError::PasswordHash(err) => GatewayError::InternalError(err.to_string()),
            UserError::Credential(err) => GatewayError::InternalError(err.to_string()),
        }
    }
}

impl From<ProjectError> for GatewayError {
    fn from(error: ProjectError) -> Self {
        match error {
            ProjectError::NotFound => GatewayError::NotFound("project not found".to_string()),
            ProjectError::NotCreator => {
                GatewayError::AuthorizationFailed("only the project creator can add users".to_string())
            }
            ProjectError::NameTaken
            | ProjectError::InvalidName
            | ProjectError::NotMember
            | ProjectError::UnknownMember(_) => GatewayError::InvalidRequest(error.to_string()),
            ProjectError::Database(err) => GatewayError::DatabaseError(err.to_string()),
        }
    }
}

impl From<IdentityError> for GatewayError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::InvalidCredential(message) => GatewayError::AuthenticationFailed(message),
            IdentityError::TokenCreation(message) => GatewayError::InternalError(message),
            IdentityError::RevocationBackend(err) => GatewayError::InternalError(err.to_string()),
        }
    }
}

/// Handshake rejections map to statuses that let a client distinguish
/// "retry with a new credential" from "room does not exist".
impl From<GateError> for GatewayError {
    fn from(error: GateError) -> Self {
        match error {
            GateError::MissingRoom => GatewayError::InvalidRequest(error.to_string()),
            GateError::RoomNotFound => GatewayError::NotFound(error.to_string()),
            GateError::MissingCredential
            | GateError::RevokedCredential
            | GateError::InvalidCredential(_) => GatewayError::AuthenticationFailed(error.to_string()),
            GateError::Lookup(message) | GateError::Revocation(message) => {
                GatewayError::InternalError(message)
            }
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        GatewayError::InvalidRequest(format!("JSON serialization error: {}", error))
    }
}
