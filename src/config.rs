//! Runtime configuration
//!
//! Values come from the environment (optionally via a `.env` file), with
//! defaults for anything unset.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::property::coordinator::DEFAULT_WORKSPACE_NAME;

pub const ENV_DATABASE: &str = "HOMESCORE_DB";
pub const ENV_USER: &str = "HOMESCORE_USER";
pub const ENV_WORKSPACE_NAME: &str = "HOMESCORE_WORKSPACE_NAME";
pub const ENV_LOG: &str = "HOMESCORE_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomescoreConfig {
    /// SQLite database holding properties and workspaces
    pub database_path: PathBuf,
    /// Session user; every record and workspace is scoped to it
    pub user_id: String,
    /// Name given to a lazily provisioned workspace
    pub workspace_name: String,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for HomescoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("homescore.db"),
            user_id: "local".to_string(),
            workspace_name: DEFAULT_WORKSPACE_NAME.to_string(),
            log_filter: "homescore=info".to_string(),
        }
    }
}

impl HomescoreConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            database_path: get(ENV_DATABASE).map(PathBuf::from).unwrap_or(defaults.database_path),
            user_id: get(ENV_USER).unwrap_or(defaults.user_id),
            workspace_name: get(ENV_WORKSPACE_NAME).unwrap_or(defaults.workspace_name),
            log_filter: get(ENV_LOG).unwrap_or(defaults.log_filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = HomescoreConfig::from_lookup(|_| None);
        assert_eq!(config, HomescoreConfig::default());
    }

    #[test]
    fn test_lookup_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DATABASE, "/tmp/homes.db"),
            (ENV_USER, "alex"),
            (ENV_LOG, "   "),
        ]);
        let config = HomescoreConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database_path, PathBuf::from("/tmp/homes.db"));
        assert_eq!(config.user_id, "alex");
        assert_eq!(config.log_filter, "homescore=info");
        assert_eq!(config.workspace_name, DEFAULT_WORKSPACE_NAME);
    }
}
