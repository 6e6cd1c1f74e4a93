use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use huddle_ai::{AiResponder, HttpResponder};
use huddle_config::{AppConfig, DatabaseConfig};
use huddle_identity::{RevocationStore, TokenAuthority};
use huddle_projects::ProjectStore;
use huddle_users::UserDirectory;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the gateway needs, initialised once at startup.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub tokens: TokenAuthority,
    pub revocations: RevocationStore,
    pub users: UserDirectory,
    pub projects: ProjectStore,
    pub responder: Arc<dyn AiResponder>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;

        let tokens = TokenAuthority::new(&config.auth);
        let users = UserDirectory::new(db_pool.clone(), tokens.clone());
        let projects = ProjectStore::new(db_pool.clone());

        let revocations = connect_revocation_store(config).await;

        let responder: Arc<dyn AiResponder> = Arc::new(
            HttpResponder::new(&config.ai).context("failed to initialise ai responder")?,
        );
        if config.ai.api_key.is_none() {
            warn!("no ai api key configured, mentions will receive the fallback reply");
        }

        info!("backend services ready");

        Ok(Self {
            db_pool,
            tokens,
            revocations,
            users,
            projects,
            responder,
        })
    }
}

/// Open the SQLite pool, creating the database file and its parent
/// directory when missing, and run pending migrations.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    if let Some(sqlite_path) = config.url.strip_prefix("sqlite://") {
        if sqlite_path != ":memory:" {
            let path = Path::new(sqlite_path);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.with_context(|| {
                        format!("failed to create sqlite directory {}", parent.display())
                    })?;
                }
            }
        }
    }

    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("invalid database url {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database {}", config.url))?;

    MIGRATOR
        .run(&pool)
        .await
        .context("database migrations failed")?;

    Ok(pool)
}

async fn connect_revocation_store(config: &AppConfig) -> RevocationStore {
    let Some(url) = config.redis.url.as_deref() else {
        info!("no redis configured, using in-process revocation store");
        return RevocationStore::in_memory();
    };

    match redis::Client::open(url) {
        Ok(client) => match ConnectionManager::new(client).await {
            Ok(conn) => {
                info!("redis connection established");
                RevocationStore::redis(conn)
            }
            Err(e) => {
                warn!("failed to connect to redis, falling back to in-process store: {e}");
                RevocationStore::in_memory()
            }
        },
        Err(e) => {
            warn!("failed to create redis client, falling back to in-process store: {e}");
            RevocationStore::in_memory()
        }
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
