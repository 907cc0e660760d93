//! Configuration module for the OKR backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which repository implementation backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Sqlite,
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment API key required on every /api request when set
    pub api_key: Option<String>,
    /// Repository backend
    pub storage: StorageKind,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Lifetime of an issued session
    pub session_ttl_hours: i64,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let api_key = env::var("OKR_API_KEY").ok().filter(|k| !k.is_empty());

        let storage = match env::var("OKR_STORAGE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .as_str()
        {
            "sqlite" => StorageKind::Sqlite,
            "memory" => StorageKind::Memory,
            other => return Err(format!("Invalid OKR_STORAGE value: {}", other)),
        };

        let db_path = env::var("OKR_DB_PATH")
            .unwrap_or_else(|_| "./data/okr.sqlite".to_string())
            .into();

        let bind_addr = env::var("OKR_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| format!("Invalid OKR_BIND_ADDR format: {}", e))?;

        let log_level = env::var("OKR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let session_ttl_hours = env::var("OKR_SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "168".to_string())
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| "OKR_SESSION_TTL_HOURS must be a positive integer".to_string())?;

        let bcrypt_cost = env::var("OKR_BCRYPT_COST")
            .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
            .parse::<u32>()
            .ok()
            .filter(|c| (4..=31).contains(c))
            .ok_or_else(|| "OKR_BCRYPT_COST must be between 4 and 31".to_string())?;

        Ok(Self {
            api_key,
            storage,
            db_path,
            bind_addr,
            log_level,
            session_ttl_hours,
            bcrypt_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "OKR_API_KEY",
        "OKR_STORAGE",
        "OKR_DB_PATH",
        "OKR_BIND_ADDR",
        "OKR_LOG_LEVEL",
        "OKR_SESSION_TTL_HOURS",
        "OKR_BCRYPT_COST",
    ];

    // Both cases share one test so they never race on the process environment.
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();

        assert!(config.api_key.is_none());
        assert_eq!(config.storage, StorageKind::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("./data/okr.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.session_ttl_hours, 168);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);

        env::set_var("OKR_STORAGE", "postgres");
        assert!(Config::from_env().is_err());
        env::set_var("OKR_STORAGE", "memory");
        env::set_var("OKR_BCRYPT_COST", "2");
        assert!(Config::from_env().is_err());
        env::set_var("OKR_BCRYPT_COST", "4");
        assert_eq!(Config::from_env().unwrap().storage, StorageKind::Memory);

        for var in VARS {
            env::remove_var(var);
        }
    }
}
