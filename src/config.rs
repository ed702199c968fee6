use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::env;
use thiserror::Error;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_upload_bytes: usize,
    pub storage: StorageBackend,
}

/// Where uploaded objects live.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3-compatible store configured through `R2_*` variables.
    R2,
    /// Process-local map; objects vanish on restart.
    Memory,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Educational portal resource API")]
pub struct Args {
    /// Host to bind to (overrides PORTAL_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORTAL_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides PORTAL_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Request body ceiling for multipart uploads, in bytes (overrides PORTAL_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Object storage backend (overrides PORTAL_STORAGE)
    #[arg(long, value_enum)]
    pub storage: Option<StorageBackend>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 60 * 1024 * 1024;

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        let env_host = env::var("PORTAL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("PORTAL_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PORTAL_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading PORTAL_PORT"),
        };
        let env_db = env::var("PORTAL_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/portal.db?mode=rwc".into());
        let env_max_upload = match env::var("PORTAL_MAX_UPLOAD_BYTES") {
            Ok(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing PORTAL_MAX_UPLOAD_BYTES value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_MAX_UPLOAD_BYTES,
            Err(err) => return Err(err).context("reading PORTAL_MAX_UPLOAD_BYTES"),
        };

        let env_storage = match env::var("PORTAL_STORAGE") {
            Ok(value) => StorageBackend::from_str(&value, true)
                .map_err(|e| anyhow::anyhow!("parsing PORTAL_STORAGE value `{}`: {}", value, e))?,
            Err(_) => StorageBackend::R2,
        };

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            storage: args.storage.unwrap_or(env_storage),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing object storage environment variables: {}", .0.join(", "))]
    MissingVars(Vec<&'static str>),
}

/// Connection settings for the S3-compatible (R2) object store.
#[derive(Clone)]
pub struct StorageConfig {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub public_url: String,
}

// Keeps the secret out of startup logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_id", &self.account_id)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

pub const DEFAULT_REGION: &str = "auto";

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Every absent (or blank)
    /// required variable is reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |name: &'static str| -> String {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(value) => value,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let account_id = required("R2_ACCOUNT_ID");
        let access_key_id = required("R2_ACCESS_KEY_ID");
        let secret_access_key = required("R2_SECRET_ACCESS_KEY");
        let bucket = required("R2_BUCKET_NAME");
        let endpoint = required("R2_ENDPOINT");
        let public_url = required("R2_PUBLIC_URL");

        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        let region = lookup("R2_REGION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Ok(Self {
            account_id,
            access_key_id,
            secret_access_key,
            bucket,
            region,
            endpoint,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }
}
