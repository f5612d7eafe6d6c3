//! Application configuration, read from a TOML file.
//!
//! ```toml
//! data_dir = "/home/me/.local/share/flashdeck"
//! default_user = 1
//!
//! [server]
//! bind = "127.0.0.1:7878"
//!
//! [remote]
//! base_url = "https://cards.example.com"
//! token = "..."
//!
//! [[users]]
//! id = 1
//! name = "me"
//! token = "..."
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::{FlashcardStorage, UserId};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("Data directory not found")]
    DataDirNotFound,

    #[error("Duplicate token for users {0} and {1}")]
    DuplicateToken(UserId, UserId),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_bind() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_user() -> UserId {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where card files live. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// User the CLI acts as when `--user` is not given
    #[serde(default = "default_user")]
    pub default_user: UserId,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Known users and their bearer tokens
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_user: default_user(),
            server: ServerConfig::default(),
            remote: RemoteConfig::default(),
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Card server used by `--remote`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    pub token: String,
}

impl AppConfig {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("flashdeck").join("config.toml"))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Load a config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.token_table()?;
        Ok(config)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => FlashcardStorage::default_data_dir().map_err(|_| ConfigError::DataDirNotFound),
        }
    }

    /// Map of bearer token to user
    pub fn token_table(&self) -> Result<HashMap<String, UserId>> {
        let mut table = HashMap::new();
        for user in &self.users {
            if let Some(existing) = table.insert(user.token.clone(), user.id) {
                return Err(ConfigError::DuplicateToken(existing, user.id));
            }
        }
        Ok(table)
    }

    pub fn token_for(&self, user_id: UserId) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.token.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::parse(
            r#"
            data_dir = "/tmp/cards"
            default_user = 2

            [server]
            bind = "0.0.0.0:9000"

            [remote]
            base_url = "https://cards.example.com"
            token = "remote-token"

            [[users]]
            id = 1
            name = "ada"
            token = "tok-1"

            [[users]]
            id = 2
            token = "tok-2"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/cards"));
        assert_eq!(config.default_user, 2);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.remote.token.as_deref(), Some("remote-token"));
        assert_eq!(config.token_for(1), Some("tok-1"));
        assert_eq!(config.token_table().unwrap().get("tok-2"), Some(&2));
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.default_user, 1);
        assert_eq!(config.server.bind, "127.0.0.1:7878");
        assert!(config.remote.base_url.is_none());
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_duplicate_tokens_rejected() {
        let err = AppConfig::parse(
            r#"
            [[users]]
            id = 1
            token = "same"

            [[users]]
            id = 2
            token = "same"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateToken(1, 2)));
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_user, 1);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "default_user = \"not a number\"").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
