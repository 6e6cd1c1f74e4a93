//! Project records and persisted membership.
//!
//! Persisted membership is the historical record of who belongs to a project;
//! live presence in a room is owned by the realtime registry. The two are
//! synchronized through [`ProjectStore::append_member`], never conflated.

use chrono::Utc;
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::info;

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project not found")]
    NotFound,
    #[error("project name must be unique")]
    NameTaken,
    #[error("project name is required")]
    InvalidName,
    #[error("only the project creator can add users")]
    NotCreator,
    #[error("user is not a member of this project")]
    NotMember,
    #[error("unknown user: {0}")]
    UnknownMember(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A project member as exposed to clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MemberRecord {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub members: Vec<MemberRecord>,
}

/// Lightweight project reference used by the realtime handshake.
#[derive(Debug, Clone)]
pub struct RoomRef {
    pub id: String,
    pub name: String,
}

/// Project service over the shared database pool.
#[derive(Clone)]
pub struct ProjectStore {
    pool: SqlitePool,
}

impl ProjectStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a project; the creator becomes its first member. Project names
    /// are stored lowercase and must be unique among the creator's projects.
    pub async fn create(&self, name: &str, creator_id: i64) -> Result<ProjectDetail, ProjectError> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(ProjectError::InvalidName);
        }

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            "SELECT p.id FROM projects p \
             JOIN project_members pm ON pm.project_id = p.id \
             WHERE p.name = ? AND pm.user_id = ?",
        )
        .bind(&name)
        .bind(creator_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(ProjectError::NameTaken);
        }

        let now = Utc::now().to_rfc3339();
        let public_id = CUID.create_id();

        let result = sqlx::query(
            "INSERT INTO projects (public_id, name, creator_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&name)
        .bind(creator_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO project_members (project_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(result.last_insert_rowid())
            .bind(creator_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(project = %public_id, %name, "created project");
        self.get(&public_id).await
    }

    /// Add users to a project. Only the creator may add; already-present
    /// users are skipped (set-add semantics).
    pub async fn add_members(
        &self,
        project_id: &str,
        caller_id: i64,
        user_ids: &[String],
    ) -> Result<ProjectDetail, ProjectError> {
        let project = self.fetch_project(project_id).await?;
        if project.creator_id != caller_id {
            return Err(ProjectError::NotCreator);
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        for public_id in user_ids {
            let row = sqlx::query("SELECT id FROM users WHERE public_id = ?")
                .bind(public_id)
                .fetch_optional(&mut *tx)
                .await?;
            let Some(row) = row else {
                return Err(ProjectError::UnknownMember(public_id.clone()));
            };
            let user_id: i64 = row.try_get("id")?;

            sqlx::query(
                "INSERT OR IGNORE INTO project_members (project_id, user_id, joined_at) VALUES (?, ?, ?)",
            )
            .bind(project.id)
            .bind(user_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get(project_id).await
    }

    /// Fetch a project with its member list.
    pub async fn get(&self, project_id: &str) -> Result<ProjectDetail, ProjectError> {
        let project = self.fetch_project(project_id).await?;
        let members = self.members_of(project.id).await?;

        Ok(ProjectDetail {
            id: project.public_id,
            name: project.name,
            created_at: project.created_at,
            members,
        })
    }

    /// All projects with their member lists.
    pub async fn list_all(&self) -> Result<Vec<ProjectDetail>, ProjectError> {
        let rows = sqlx::query("SELECT id, public_id, name, created_at FROM projects ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            projects.push(ProjectDetail {
                id: row.try_get("public_id")?,
                name: row.try_get("name")?,
                created_at: row.try_get("created_at")?,
                members: self.members_of(id).await?,
            });
        }
        Ok(projects)
    }

    /// Remove a member; the project itself is deleted when the last member
    /// leaves.
    pub async fn leave(&self, project_id: &str, user_id: i64) -> Result<(), ProjectError> {
        let project = self.fetch_project(project_id).await?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
            .bind(project.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ProjectError::NotMember);
        }

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM project_members WHERE project_id = ?")
                .bind(project.id)
                .fetch_one(&mut *tx)
                .await?;
        if remaining == 0 {
            sqlx::query("DELETE FROM projects WHERE id = ?")
                .bind(project.id)
                .execute(&mut *tx)
                .await?;
            info!(project = %project.public_id, "deleted empty project");
        }

        tx.commit().await?;
        Ok(())
    }

    /// Resolve a room identifier for the realtime handshake.
    pub async fn resolve_room(&self, room_id: &str) -> Result<RoomRef, ProjectError> {
        let project = self.fetch_project(room_id).await?;
        Ok(RoomRef {
            id: project.public_id,
            name: project.name,
        })
    }

    /// Persist a first-time live joiner into the membership record. Returns
    /// whether the user was newly added.
    pub async fn append_member(
        &self,
        room_id: &str,
        user_public_id: &str,
    ) -> Result<bool, ProjectError> {
        let project = self.fetch_project(room_id).await?;

        let row = sqlx::query("SELECT id FROM users WHERE public_id = ?")
            .bind(user_public_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Err(ProjectError::UnknownMember(user_public_id.to_string()));
        };
        let user_id: i64 = row.try_get("id")?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO project_members (project_id, user_id, joined_at) VALUES (?, ?, ?)",
        )
        .bind(project.id)
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_project(&self, public_id: &str) -> Result<ProjectRow, ProjectError> {
        let row = sqlx::query(
            "SELECT id, public_id, name, creator_id, created_at FROM projects WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(ProjectError::NotFound);
        };

        Ok(ProjectRow {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            name: row.try_get("name")?,
            creator_id: row.try_get("creator_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn members_of(&self, project_id: i64) -> Result<Vec<MemberRecord>, ProjectError> {
        let rows = sqlx::query(
            "SELECT u.public_id, u.email FROM project_members pm \
             JOIN users u ON u.id = pm.user_id \
             WHERE pm.project_id = ? \
             ORDER BY pm.joined_at, u.id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            members.push(MemberRecord {
                id: row.try_get("public_id")?,
                email: row.try_get("email")?,
            });
        }
        Ok(members)
    }
}

struct ProjectRow {
    id: i64,
    public_id: String,
    name: String,
    creator_id: i64,
    created_at: String,
}
