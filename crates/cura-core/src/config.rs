//! Runtime configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheResult, LocalCache};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level configuration. Every field has a default, so `{}` is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuraConfig {
    pub cache: CacheConfig,
    pub views: ViewConfig,
    pub chat: ChatConfig,
    pub pharmacy: PharmacyConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite file; in-memory when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Window for "recent" lists, in days
    pub recent_window_days: u32,
    /// Items shown in "recently added" panels
    pub recently_added_limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            recent_window_days: 7,
            recently_added_limit: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_messages: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_messages: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PharmacyConfig {
    /// Pharmacy named on orders placed from the cart
    pub default_pharmacy_name: String,
}

impl Default for PharmacyConfig {
    fn default() -> Self {
        Self {
            default_pharmacy_name: "HealthPlus Pharmacy".to_string(),
        }
    }
}

impl CuraConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Open the configured cache.
    pub fn open_cache(&self) -> CacheResult<LocalCache> {
        match &self.cache.path {
            Some(path) => LocalCache::open(path),
            None => LocalCache::open_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CuraConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CuraConfig::default());
        assert_eq!(config.views.recent_window_days, 7);
        assert_eq!(config.views.recently_added_limit, 3);
        assert_eq!(config.chat.max_messages, 200);
        assert!(config.cache.path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config =
            CuraConfig::from_json_str(r#"{ "views": { "recent_window_days": 30 } }"#).unwrap();
        assert_eq!(config.views.recent_window_days, 30);
        assert_eq!(config.views.recently_added_limit, 3);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cura.json");
        std::fs::write(&path, r#"{ "pharmacy": { "default_pharmacy_name": "CityCare" } }"#)
            .unwrap();

        let config = CuraConfig::from_file(&path).unwrap();
        assert_eq!(config.pharmacy.default_pharmacy_name, "CityCare");
        assert!(config.open_cache().is_ok());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            CuraConfig::from_json_str("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }
}
