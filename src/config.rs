use crate::error::{FyyurError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Sqlite,
            path: PathBuf::from("fyyur.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "fyyur.log".to_string(),
        }
    }
}

impl Config {
    /// Reads `path`; a missing file yields the built-in defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(path).map_err(|e| {
            FyyurError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `FYYUR_DATABASE_PATH`, `FYYUR_HOST` and `PORT` when set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = env::var("FYYUR_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(host) = env::var("FYYUR_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| FyyurError::Config(format!("Invalid PORT '{}': {}", port, e)))?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(FyyurError::Config("server.host must not be empty".to_string()));
        }
        if self.database.backend == DatabaseBackend::Sqlite
            && self.database.path.as_os_str().is_empty()
        {
            return Err(FyyurError::Config(
                "database.path is required for the sqlite backend".to_string(),
            ));
        }
        if self.logging.file_name.trim().is_empty() {
            return Err(FyyurError::Config("logging.file_name must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.backend, DatabaseBackend::Sqlite);
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn partial_sections_override_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [database]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.backend, DatabaseBackend::Memory);
        assert_eq!(config.logging.file_name, "fyyur.log");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_toml("[database]\nbackend = \"postgres\""),
            Err(FyyurError::Toml(_))
        ));
        assert!(matches!(
            Config::from_toml("[server]\nhost = \" \""),
            Err(FyyurError::Config(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.logging.directory, PathBuf::from("logs"));
    }
}
