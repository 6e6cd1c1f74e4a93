use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use tempfile::TempDir;

use huddle_config::AuthConfig;
use huddle_identity::TokenAuthority;
use huddle_users::{UserDirectory, UserError};

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test_secret_key_that_is_long_enough_for_hs256".to_string(),
        issuer: "huddle-test".to_string(),
        audience: "huddle-test-users".to_string(),
        token_ttl_seconds: 3_600,
        revocation_ttl_seconds: 3_600,
    }
}

struct TestContext {
    pool: SqlitePool,
    directory: UserDirectory,
    tokens: TokenAuthority,
    _temp_dir: TempDir,
}

impl TestContext {
    async fn new() -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("users.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let tokens = TokenAuthority::new(&test_auth_config());
        let directory = UserDirectory::new(pool.clone(), tokens.clone());

        Ok(Self {
            pool,
            directory,
            tokens,
            _temp_dir: temp_dir,
        })
    }
}

#[tokio::test]
async fn register_persists_user_with_argon2_hash() -> TestResult {
    let ctx = TestContext::new().await?;

    let (user, credential) = ctx
        .directory
        .register("Alice@Example.com", "s3cret-pass")
        .await?;

    assert_eq!(user.email, "alice@example.com");
    assert!(!credential.token.is_empty());

    let row = sqlx::query("SELECT email, password_hash FROM users WHERE public_id = ?")
        .bind(&user.public_id)
        .fetch_one(&ctx.pool)
        .await?;

    let email: String = row.get("email");
    let hash: String = row.get("password_hash");
    assert_eq!(email, "alice@example.com");
    assert!(hash.starts_with("$argon2"), "secret must be an argon2 hash");

    Ok(())
}

#[tokio::test]
async fn register_rejects_duplicate_email() -> TestResult {
    let ctx = TestContext::new().await?;

    ctx.directory
        .register("alice@example.com", "s3cret-pass")
        .await?;
    let result = ctx
        .directory
        .register("ALICE@example.com", "other-pass")
        .await;

    assert!(matches!(result, Err(UserError::UserExists)));
    Ok(())
}

#[tokio::test]
async fn register_validates_email_and_password() -> TestResult {
    let ctx = TestContext::new().await?;

    assert!(matches!(
        ctx.directory.register("not-an-email", "s3cret-pass").await,
        Err(UserError::InvalidEmail)
    ));
    assert!(matches!(
        ctx.directory.register("bob@example.com", "abc").await,
        Err(UserError::PasswordTooWeak)
    ));
    Ok(())
}

#[tokio::test]
async fn login_issues_credential_that_verifies_to_the_user() -> TestResult {
    let ctx = TestContext::new().await?;

    let (registered, _) = ctx
        .directory
        .register("alice@example.com", "s3cret-pass")
        .await?;
    let (user, credential) = ctx.directory.login("alice@example.com", "s3cret-pass").await?;

    assert_eq!(user.public_id, registered.public_id);

    let identity = ctx.tokens.verify(&credential.token)?;
    assert_eq!(identity.id, user.public_id);
    assert_eq!(identity.email, "alice@example.com");
    assert_eq!(identity.expires_at, credential.expires_at);

    Ok(())
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email_alike() -> TestResult {
    let ctx = TestContext::new().await?;

    ctx.directory
        .register("alice@example.com", "s3cret-pass")
        .await?;

    assert!(matches!(
        ctx.directory.login("alice@example.com", "wrong").await,
        Err(UserError::InvalidCredentials)
    ));
    assert!(matches!(
        ctx.directory.login("nobody@example.com", "s3cret-pass").await,
        Err(UserError::InvalidCredentials)
    ));
    Ok(())
}

#[tokio::test]
async fn profile_and_list_others() -> TestResult {
    let ctx = TestContext::new().await?;

    let (alice, _) = ctx
        .directory
        .register("alice@example.com", "s3cret-pass")
        .await?;
    let (bob, _) = ctx
        .directory
        .register("bob@example.com", "s3cret-pass")
        .await?;

    let fetched = ctx.directory.profile(&alice.public_id).await?;
    assert_eq!(fetched.email, "alice@example.com");

    assert!(matches!(
        ctx.directory.profile("usr_missing").await,
        Err(UserError::UserNotFound)
    ));

    let others = ctx.directory.list_others(&alice.public_id).await?;
    assert_eq!(others.len(), 1);
    assert_eq!(others[0].public_id, bob.public_id);

    Ok(())
}
