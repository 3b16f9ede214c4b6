//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (platform config dir)
//! 3. Project config (.articlegen/config.toml)
//! 4. Environment variables (ARTICLEGEN_*)
//! 5. Provider variables (GOOGLE_API_KEY, AI_GATEWAY_*) for unset credentials

mod loader;
mod types;

pub use loader::{ConfigLoader, apply_env_fallbacks};
pub use types::*;
