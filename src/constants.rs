//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Research output micro-format
pub mod markers {
    /// Prefix of a learning line
    pub const LEARNING: &str = "LEARNING:";

    /// Prefix of a source title line (applies to the next URL only)
    pub const SOURCE_TITLE: &str = "SOURCE_TITLE:";

    /// Prefix of a source URL line
    pub const SOURCE_URL: &str = "SOURCE_URL:";

    /// Family prefix excluded from fallback learnings
    pub const SOURCE_FAMILY: &str = "SOURCE_";

    /// Fallback learnings must be strictly longer than this (in chars)
    pub const FALLBACK_MIN_CHARS: usize = 10;

    /// Top-level markdown heading marker
    pub const HEADING: &str = "# ";
}

/// Workflow step names, used as checkpoint keys
pub mod steps {
    pub const GATHER: &str = "gather information";
    pub const EXTRACT: &str = "extract learnings";
    pub const WRITE: &str = "write article";
    pub const SPLIT: &str = "split title";
    pub const PERSIST: &str = "persist article";
}

/// Topic validation limits (in chars)
pub mod topic {
    pub const MIN_CHARS: usize = 10;
    pub const MAX_CHARS: usize = 500;
}

/// Step substrate retry defaults
pub mod retry {
    /// Retries after the first attempt of a step
    pub const DEFAULT_STEP_RETRIES: usize = 5;

    /// First backoff delay (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1000;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 60;

    /// Per-attempt step timeout (seconds)
    pub const STEP_TIMEOUT_SECS: u64 = 600;
}

/// Network constants
pub mod network {
    /// Default HTTP request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Google Generative Language API base
    pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Cloudflare AI Gateway base
    pub const AI_GATEWAY_BASE: &str = "https://gateway.ai.cloudflare.com/v1";
}
