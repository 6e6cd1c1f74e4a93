use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tempfile::TempDir;

use huddle_config::AuthConfig;
use huddle_identity::TokenAuthority;
use huddle_projects::{ProjectError, ProjectStore};
use huddle_users::{User, UserDirectory};

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

struct TestContext {
    store: ProjectStore,
    directory: UserDirectory,
    _pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestContext {
    async fn new() -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("projects.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let tokens = TokenAuthority::new(&AuthConfig {
            jwt_secret: "test_secret_key_that_is_long_enough_for_hs256".to_string(),
            issuer: "huddle-test".to_string(),
            audience: "huddle-test-users".to_string(),
            token_ttl_seconds: 3_600,
            revocation_ttl_seconds: 3_600,
        });

        Ok(Self {
            store: ProjectStore::new(pool.clone()),
            directory: UserDirectory::new(pool.clone(), tokens),
            _pool: pool,
            _temp_dir: temp_dir,
        })
    }

    async fn user(&self, email: &str) -> TestResult<User> {
        let (user, _) = self.directory.register(email, "s3cret-pass").await?;
        Ok(user)
    }
}

#[tokio::test]
async fn create_makes_creator_the_first_member() -> TestResult {
    let ctx = TestContext::new().await?;
    let alice = ctx.user("alice@example.com").await?;

    let project = ctx.store.create("  Apollo  ", alice.id).await?;

    assert_eq!(project.name, "apollo");
    assert_eq!(project.members.len(), 1);
    assert_eq!(project.members[0].id, alice.public_id);
    assert_eq!(project.members[0].email, "alice@example.com");

    Ok(())
}

#[tokio::test]
async fn create_rejects_duplicate_name_for_same_owner_only() -> TestResult {
    let ctx = TestContext::new().await?;
    let alice = ctx.user("alice@example.com").await?;
    let bob = ctx.user("bob@example.com").await?;

    ctx.store.create("apollo", alice.id).await?;

    assert!(matches!(
        ctx.store.create("Apollo", alice.id).await,
        Err(ProjectError::NameTaken)
    ));

    // A different owner may reuse the name.
    let other = ctx.store.create("apollo", bob.id).await?;
    assert_eq!(other.name, "apollo");

    Ok(())
}

#[tokio::test]
async fn add_members_is_creator_only_and_idempotent() -> TestResult {
    let ctx = TestContext::new().await?;
    let alice = ctx.user("alice@example.com").await?;
    let bob = ctx.user("bob@example.com").await?;

    let project = ctx.store.create("apollo", alice.id).await?;

    let updated = ctx
        .store
        .add_members(&project.id, alice.id, &[bob.public_id.clone()])
        .await?;
    assert_eq!(updated.members.len(), 2);

    // Adding again changes nothing.
    let again = ctx
        .store
        .add_members(&project.id, alice.id, &[bob.public_id.clone()])
        .await?;
    assert_eq!(again.members.len(), 2);

    assert!(matches!(
        ctx.store
            .add_members(&project.id, bob.id, &[alice.public_id.clone()])
            .await,
        Err(ProjectError::NotCreator)
    ));

    assert!(matches!(
        ctx.store
            .add_members(&project.id, alice.id, &["usr_missing".to_string()])
            .await,
        Err(ProjectError::UnknownMember(_))
    ));

    Ok(())
}

#[tokio::test]
async fn leave_removes_member_and_deletes_empty_project() -> TestResult {
    let ctx = TestContext::new().await?;
    let alice = ctx.user("alice@example.com").await?;
    let bob = ctx.user("bob@example.com").await?;

    let project = ctx.store.create("apollo", alice.id).await?;
    ctx.store
        .add_members(&project.id, alice.id, &[bob.public_id.clone()])
        .await?;

    ctx.store.leave(&project.id, bob.id).await?;
    let detail = ctx.store.get(&project.id).await?;
    assert_eq!(detail.members.len(), 1);

    assert!(matches!(
        ctx.store.leave(&project.id, bob.id).await,
        Err(ProjectError::NotMember)
    ));

    ctx.store.leave(&project.id, alice.id).await?;
    assert!(matches!(
        ctx.store.get(&project.id).await,
        Err(ProjectError::NotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn resolve_room_and_append_member() -> TestResult {
    let ctx = TestContext::new().await?;
    let alice = ctx.user("alice@example.com").await?;
    let bob = ctx.user("bob@example.com").await?;

    let project = ctx.store.create("apollo", alice.id).await?;

    let room = ctx.store.resolve_room(&project.id).await?;
    assert_eq!(room.id, project.id);
    assert_eq!(room.name, "apollo");

    assert!(matches!(
        ctx.store.resolve_room("prj_missing").await,
        Err(ProjectError::NotFound)
    ));

    // First live join persists membership; repeats are no-ops.
    assert!(ctx.store.append_member(&project.id, &bob.public_id).await?);
    assert!(!ctx.store.append_member(&project.id, &bob.public_id).await?);

    let detail = ctx.store.get(&project.id).await?;
    assert_eq!(detail.members.len(), 2);

    Ok(())
}

#[tokio::test]
async fn list_all_expands_members() -> TestResult {
    let ctx = TestContext::new().await?;
    let alice = ctx.user("alice@example.com").await?;

    ctx.store.create("apollo", alice.id).await?;
    ctx.store.create("gemini", alice.id).await?;

    let projects = ctx.store.list_all().await?;
    assert_eq!(projects.len(), 2);
    assert!(projects.iter().all(|p| p.members.len() == 1));

    Ok(())
}
