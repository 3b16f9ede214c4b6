//! Config Command
//!
//! Usage:
//!   articlegen config show [-f json|toml]
//!   articlegen config path

use crate::config::ConfigLoader;
use crate::types::{ArticleError, Result};

/// Show the merged effective configuration (secrets omitted)
pub fn show(format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!(
            "{}",
            toml::to_string_pretty(&config).map_err(|e| ArticleError::Config(e.to_string()))?
        );
    }

    let key_state = if config.llm.api_key.is_some() { "set" } else { "not set" };
    println!("# api key: {}", key_state);
    Ok(())
}

/// Show configuration file paths
pub fn path() -> Result<()> {
    println!("Configuration paths:");
    println!();

    if let Some(global) = ConfigLoader::global_config_path() {
        let exists = if global.exists() { "✓" } else { "✗" };
        println!("  Global:   {} {}", exists, global.display());
    } else {
        println!("  Global:   (not available)");
    }

    let project = ConfigLoader::project_config_path();
    let exists = if project.exists() { "✓" } else { "✗" };
    println!("  Project:  {} {}", exists, project.display());

    let config = ConfigLoader::load()?;
    let database = ConfigLoader::database_path(&config);
    let exists = if database.exists() { "✓" } else { "✗" };
    println!("  Database: {} {}", exists, database.display());

    Ok(())
}
