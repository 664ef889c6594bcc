use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

/// Placeholder secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = var_or("HYDRATE_HOST", "0.0.0.0");
        let port: u16 = var_or("HYDRATE_PORT", "3000")
            .parse()
            .context("HYDRATE_PORT must be a port number")?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let jwt_secret = env::var("HYDRATE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HYDRATE_JWT_SECRET is unset or still a placeholder; it must match the identity provider's signing secret");
        }

        Ok(Self {
            addr,
            db_path: var_or("HYDRATE_DB_PATH", "hydrate.db").into(),
            jwt_secret,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}
