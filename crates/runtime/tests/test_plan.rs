//! Bootstrap tests: the service container comes up against a fresh SQLite
//! database and the domain services are wired to the same pool.

use tempfile::TempDir;

use huddle_config::{AppConfig, DatabaseConfig};
use huddle_runtime::{initialize_database, BackendServices};

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn config_for(temp_dir: &TempDir) -> AppConfig {
    let db_path = temp_dir.path().join("runtime.sqlite");
    AppConfig {
        database: DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 5,
        },
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn initialize_database_creates_file_and_runs_migrations() -> TestResult {
    let temp_dir = TempDir::new()?;
    let config = config_for(&temp_dir);

    let pool = initialize_database(&config.database).await?;

    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    assert_eq!(user_count, 0);

    Ok(())
}

#[tokio::test]
async fn services_share_one_database() -> TestResult {
    let temp_dir = TempDir::new()?;
    let config = config_for(&temp_dir);

    let services = BackendServices::initialise(&config).await?;

    let (user, credential) = services
        .users
        .register("alice@example.com", "s3cret-pass")
        .await?;
    let project = services.projects.create("apollo", user.id).await?;

    // The issued credential verifies against the shared token authority.
    let identity = services.tokens.verify(&credential.token)?;
    assert_eq!(identity.id, user.public_id);

    // The project store sees the registered user as the first member.
    assert_eq!(project.members.len(), 1);
    assert_eq!(project.members[0].email, "alice@example.com");

    // Without redis configured, the revocation store still works.
    services
        .revocations
        .revoke(&credential.token, std::time::Duration::from_secs(60))
        .await?;
    assert!(services.revocations.is_revoked(&credential.token).await?);

    Ok(())
}
