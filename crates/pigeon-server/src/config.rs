use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Read `PIGEON_*` variables, falling back to development defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("PIGEON_JWT_SECRET").unwrap_or_else(|| {
            warn!("PIGEON_JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.into()
        });
        let db_path = lookup("PIGEON_DB_PATH").unwrap_or_else(|| "pigeon.db".into());
        let host = lookup("PIGEON_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = lookup("PIGEON_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("PIGEON_PORT must be a port number")?;

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(db_path),
            host,
            port,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
