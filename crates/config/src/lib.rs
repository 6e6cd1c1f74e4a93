use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "huddle.toml",
    "config/huddle.toml",
    "crates/config/huddle.toml",
    "../huddle.toml",
    "../config/huddle.toml",
    "../crates/config/huddle.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    /// No defaults are seeded for this section; it may be absent entirely.
    #[serde(default)]
    pub redis: RedisConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://huddle.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Credential issuing and verification settings.
///
/// `token_ttl_seconds` bounds the lifetime of issued credentials;
/// `revocation_ttl_seconds` is how long a logged-out credential stays
/// blacklisted and should not be shorter than the token lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_issuer")]
    pub issuer: String,
    #[serde(default = "AuthConfig::default_audience")]
    pub audience: String,
    #[serde(default = "AuthConfig::default_token_ttl")]
    pub token_ttl_seconds: u64,
    #[serde(default = "AuthConfig::default_revocation_ttl")]
    pub revocation_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            issuer: Self::default_issuer(),
            audience: Self::default_audience(),
            token_ttl_seconds: Self::default_token_ttl(),
            revocation_ttl_seconds: Self::default_revocation_ttl(),
        }
    }
}

impl AuthConfig {
    fn default_issuer() -> String {
        "huddle".to_string()
    }

    fn default_audience() -> String {
        "huddle-users".to_string()
    }

    const fn default_token_ttl() -> u64 {
        86_400
    }

    const fn default_revocation_ttl() -> u64 {
        86_400
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RedisConfig {
    /// Connection URL for the revocation store, e.g. `redis://127.0.0.1:6379`.
    /// When unset the server falls back to an in-process store.
    #[serde(default)]
    pub url: Option<String>,
}

/// Configuration options for the AI responder integration.
///
/// ```
/// use huddle_config::AiConfig;
///
/// let ai = AiConfig::default();
/// assert_eq!(ai.base_url, "https://openrouter.ai/api/v1");
/// assert_eq!(ai.request_timeout_seconds, 30);
/// assert!(ai.api_key.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "AiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "AiConfig::default_model")]
    pub model: String,
    #[serde(default = "AiConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl AiConfig {
    fn default_base_url() -> String {
        "https://openrouter.ai/api/v1".to_string()
    }

    fn default_model() -> String {
        "google/gemini-2.5-flash".to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use huddle_config::load;
///
/// std::env::remove_var("HUDDLE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .unwrap()
        .set_default("auth.jwt_secret", defaults.auth.jwt_secret.clone())
        .unwrap()
        .set_default("auth.issuer", defaults.auth.issuer.clone())
        .unwrap()
        .set_default("auth.audience", defaults.auth.audience.clone())
        .unwrap()
        .set_default(
            "auth.token_ttl_seconds",
            i64::try_from(defaults.auth.token_ttl_seconds).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "auth.revocation_ttl_seconds",
            i64::try_from(defaults.auth.revocation_ttl_seconds).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default("ai.base_url", defaults.ai.base_url.clone())
        .unwrap()
        .set_default("ai.model", defaults.ai.model.clone())
        .unwrap()
        .set_default(
            "ai.request_timeout_seconds",
            i64::try_from(defaults.ai.request_timeout_seconds).unwrap_or(i64::MAX),
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("HUDDLE").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("HUDDLE_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via HUDDLE_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.token_ttl_seconds > i64::MAX as u64 {
        config.auth.token_ttl_seconds = i64::MAX as u64;
    }
    if config.auth.revocation_ttl_seconds > i64::MAX as u64 {
        config.auth.revocation_ttl_seconds = i64::MAX as u64;
    }

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
