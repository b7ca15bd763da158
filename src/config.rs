use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt};

const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Centralized application configuration.
/// Combines environment variables (optionally from `.env`) and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub account_name: String,
    pub account_key: String,
    pub container: String,
    pub blob_endpoint: Option<String>,
    pub allowed_origins: Vec<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Read-only device/operation image catalog over Azure Blob Storage")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage account name (overrides AZURE_STORAGE_ACCOUNT_NAME)
    #[arg(long)]
    pub account_name: Option<String>,

    /// Blob container holding device/operation/image keys (overrides AZURE_CONTAINER_NAME)
    #[arg(long)]
    pub container: Option<String>,

    /// Blob service endpoint, e.g. a storage emulator (overrides AZURE_STORAGE_BLOB_ENDPOINT)
    #[arg(long)]
    pub blob_endpoint: Option<String>,

    /// Comma-separated frontend origins allowed to call the API (overrides CORS_ALLOWED_ORIGINS)
    #[arg(long, value_delimiter = ',')]
    pub allowed_origins: Option<Vec<String>>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |name| env::var(name))
    }

    /// Merge `args` over values read through `lookup`. The account key is
    /// only ever read from the environment.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let optional = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };
        let required = |name: &str, arg: Option<String>| -> Result<String> {
            match arg {
                Some(value) => Ok(value),
                None => optional(name)?.with_context(|| format!("{} must be set", name)),
            }
        };

        // --- Environment fallback ---
        let env_port = match optional("PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PORT value `{}`", value))?,
            None => 5000,
        };
        let env_host = optional("HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_origins = optional("CORS_ALLOWED_ORIGINS")?
            .map(|value| value.split(',').map(|o| o.trim().to_string()).collect())
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]);

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            account_name: required("AZURE_STORAGE_ACCOUNT_NAME", args.account_name)?,
            account_key: required("AZURE_STORAGE_ACCOUNT_KEY", None)?,
            container: required("AZURE_CONTAINER_NAME", args.container)?,
            blob_endpoint: args
                .blob_endpoint
                .or(optional("AZURE_STORAGE_BLOB_ENDPOINT")?),
            allowed_origins: args
                .allowed_origins
                .unwrap_or(env_origins)
                .into_iter()
                .filter(|o| !o.is_empty())
                .collect(),
        };

        if cfg.allowed_origins.is_empty() {
            bail!("at least one allowed origin is required");
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("container", &self.container)
            .field("blob_endpoint", &self.blob_endpoint)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}
