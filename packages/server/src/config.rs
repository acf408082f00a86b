use std::path::PathBuf;

use axum::http::HeaderValue;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// A TOML array, or a comma-separated string when set from the environment.
    #[serde(deserialize_with = "origin_list")]
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Any SeaORM URL, e.g. `postgres://...` or `sqlite://posters.db?mode=rwc`.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Shared secret expected in the `X-Admin-Key` header. Has no default.
    pub admin_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the filesystem blob store.
    pub data_dir: PathBuf,
    /// Largest single image or PDF accepted, in bytes.
    pub max_blob_size: u64,
    /// Cap on a whole multipart request body, in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Path the media endpoint is mounted at.
    pub url_prefix: String,
    /// When set, file URLs are built from this base instead of the request host.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Self::environment())
    }

    /// Values stay strings here; numeric fields are converted on deserialize,
    /// so secrets such as `007` reach `auth.admin_key` untouched.
    fn environment() -> Environment {
        Environment::with_prefix("POSTERS").separator("__")
    }

    fn load_with(env: Environment) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://posters.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            // Blank so a missing key fails in validate() with a clear message.
            .set_default("auth.admin_key", "")?
            .set_default("storage.data_dir", "./media")?
            .set_default("storage.max_blob_size", 64 * 1024 * 1024)?
            .set_default("storage.max_upload_bytes", 130 * 1024 * 1024)?
            .set_default("media.url_prefix", "/media")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., POSTERS__AUTH__ADMIN_KEY)
            .add_source(env)
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that deserialize fine but cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.admin_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.admin_key must be set (e.g. POSTERS__AUTH__ADMIN_KEY)".into(),
            ));
        }
        if !self.media.url_prefix.starts_with('/') || self.media.url_prefix.len() < 2 {
            return Err(ConfigError::Message(
                "media.url_prefix must be an absolute path such as /media".into(),
            ));
        }
        if self.media.url_prefix.ends_with('/') {
            return Err(ConfigError::Message(
                "media.url_prefix must not end with '/'".into(),
            ));
        }
        if let Some(origin) = self
            .server
            .cors
            .allow_origins
            .iter()
            .find(|o| HeaderValue::from_str(o).is_err())
        {
            return Err(ConfigError::Message(format!(
                "server.cors.allow_origins contains an invalid origin: {origin:?}"
            )));
        }
        Ok(())
    }
}

fn origin_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Origins {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Origins::deserialize(deserializer)? {
        Origins::List(list) => list,
        Origins::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect(),
    })
}
