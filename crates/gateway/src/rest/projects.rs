//! Project REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use huddle_identity::Identity;
use huddle_projects::ProjectDetail;

use crate::error::GatewayResult;
use crate::rest::users::MessageResponse;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddUsersRequest {
    pub project_id: String,
    /// Public identifiers of the users to add.
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaveProjectRequest {
    pub project_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectMemberResponse {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub members: Vec<ProjectMemberResponse>,
}

impl From<ProjectDetail> for ProjectResponse {
    fn from(project: ProjectDetail) -> Self {
        Self {
            id: project.id,
            name: project.name,
            created_at: project.created_at,
            members: project
                .members
                .into_iter()
                .map(|member| ProjectMemberResponse {
                    id: member.id,
                    email: member.email,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectResponse>,
}

#[utoipa::path(
    post,
    path = "/api/projects/create",
    tag = "Projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Missing or duplicate project name")
    )
)]
pub async fn create_project(
    State(state): State<Arc<GatewayState>>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateProjectRequest>,
) -> GatewayResult<Response> {
    let caller = state.users.profile(&identity.id).await?;
    let project = state.projects.create(&payload.name, caller.id).await?;
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))).into_response())
}

#[utoipa::path(
    put,
    path = "/api/projects/add-user",
    tag = "Projects",
    request_body = AddUsersRequest,
    responses(
        (status = 200, description = "Users added", body = ProjectResponse),
        (status = 400, description = "Unknown user in the list"),
        (status = 403, description = "Caller is not the project creator"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn add_user(
    State(state): State<Arc<GatewayState>>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<AddUsersRequest>,
) -> GatewayResult<Json<ProjectResponse>> {
    let caller = state.users.profile(&identity.id).await?;
    let project = state
        .projects
        .add_members(&payload.project_id, caller.id, &payload.users)
        .await?;
    Ok(Json(project.into()))
}

#[utoipa::path(
    get,
    path = "/api/projects/all",
    tag = "Projects",
    responses(
        (status = 200, description = "All projects with their members", body = ProjectsResponse)
    )
)]
pub async fn list_projects(
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<ProjectsResponse>> {
    let projects = state.projects.list_all().await?;
    Ok(Json(ProjectsResponse {
        projects: projects.into_iter().map(ProjectResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/projects/{project_id}",
    tag = "Projects",
    params(("project_id" = String, Path, description = "Public project identifier")),
    responses(
        (status = 200, description = "Project detail", body = ProjectResponse),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project(
    State(state): State<Arc<GatewayState>>,
    Path(project_id): Path<String>,
) -> GatewayResult<Json<ProjectResponse>> {
    let project = state.projects.get(&project_id).await?;
    Ok(Json(project.into()))
}

#[utoipa::path(
    put,
    path = "/api/projects/leave",
    tag = "Projects",
    request_body = LeaveProjectRequest,
    responses(
        (status = 200, description = "Left the project", body = MessageResponse),
        (status = 400, description = "Caller is not a member"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn leave_project(
    State(state): State<Arc<GatewayState>>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<LeaveProjectRequest>,
) -> GatewayResult<Json<MessageResponse>> {
    let caller = state.users.profile(&identity.id).await?;
    state.projects.leave(&payload.project_id, caller.id).await?;
    Ok(Json(MessageResponse {
        message: "User left the project".to_string(),
    }))
}
