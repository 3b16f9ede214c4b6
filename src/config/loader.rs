//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (platform config dir, e.g. ~/.config/articlegen/config.toml)
//! 3. Project config (.articlegen/config.toml)
//! 4. Environment variables (ARTICLEGEN_* prefix, `__` between sections)
//!
//! Provider variables (`GOOGLE_API_KEY`, `AI_GATEWAY_*`) fill whatever the
//! layers above left unset.

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::ai::provider::GatewayRoute;
use crate::types::{ArticleError, Result};

const ENV_PREFIX: &str = "ARTICLEGEN_";
const PROJECT_DIR: &str = ".articlegen";
const DATABASE_FILE: &str = "articlegen.db";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. ARTICLEGEN_LLM__SEARCH_MODEL -> llm.search_model
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let mut config: Config = figment
            .extract()
            .map_err(|e| ArticleError::Config(format!("Configuration error: {}", e)))?;

        apply_env_fallbacks(&mut config, |name| env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ArticleError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory (platform specific)
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "articlegen").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(PROJECT_DIR)
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Database path from config, else the project default
    pub fn database_path(config: &Config) -> PathBuf {
        config
            .storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::project_dir().join(DATABASE_FILE))
    }
}

/// Fill unset provider credentials from their conventional variables.
pub fn apply_env_fallbacks<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if config.llm.api_key.is_none() {
        config.llm.api_key = lookup("GOOGLE_API_KEY");
    }

    if config.llm.gateway.is_none()
        && let (Some(account_id), Some(name)) =
            (lookup("AI_GATEWAY_ACCOUNT_ID"), lookup("AI_GATEWAY_NAME"))
    {
        config.llm.gateway = Some(GatewayRoute {
            account_id,
            name,
            api_key: None,
        });
    }

    if let Some(gateway) = config.llm.gateway.as_mut()
        && gateway.api_key.is_none()
    {
        gateway.api_key = lookup("AI_GATEWAY_API_KEY");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[llm]
writer_model = "gemini-1.5-pro"
temperature = 0.2

[workflow]
step_retries = 2
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.llm.writer_model, "gemini-1.5-pro");
        assert_eq!(config.llm.search_model, "gemini-2.0-flash");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.workflow.step_retries, 2);
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm]\ntemperature = 5.0\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(ArticleError::Config(_))
        ));
    }

    #[test]
    fn test_env_fallbacks_fill_unset_values() {
        let env = vars(&[
            ("GOOGLE_API_KEY", "google-key"),
            ("AI_GATEWAY_ACCOUNT_ID", "acct"),
            ("AI_GATEWAY_NAME", "articles"),
            ("AI_GATEWAY_API_KEY", "gw-key"),
        ]);
        let mut config = Config::default();
        apply_env_fallbacks(&mut config, |name| env.get(name).cloned());

        assert_eq!(config.llm.api_key.as_deref(), Some("google-key"));
        let gateway = config.llm.gateway.unwrap();
        assert_eq!(gateway.account_id, "acct");
        assert_eq!(gateway.name, "articles");
        assert_eq!(gateway.api_key.as_deref(), Some("gw-key"));
    }

    #[test]
    fn test_env_fallbacks_keep_configured_values() {
        let env = vars(&[("GOOGLE_API_KEY", "from-env"), ("AI_GATEWAY_NAME", "only-name")]);
        let mut config = Config::default();
        config.llm.api_key = Some("from-file".to_string());
        apply_env_fallbacks(&mut config, |name| env.get(name).cloned());

        assert_eq!(config.llm.api_key.as_deref(), Some("from-file"));
        assert!(config.llm.gateway.is_none());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert_eq!(
            ConfigLoader::database_path(&config),
            PathBuf::from(".articlegen/articlegen.db")
        );
    }
}
