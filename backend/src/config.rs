//! Environment-driven service configuration.

use std::path::PathBuf;

/// Settings read once at startup.
///
/// `BIND_ADDR` picks the listen address (default `0.0.0.0:3000`) and
/// `DB_PATH`, when set, points the store at an on-disk snapshot file.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub db_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let db_path = std::env::var_os("DB_PATH").map(PathBuf::from);
        Self { bind_addr, db_path }
    }
}
