//! Engine configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file
//! (`chime.toml` in the working directory, or the path in
//! `CHIME_CONFIG_PATH`), then `CHIME_*` environment variables.
//!
//! ```rust,no_run
//! use chime_core::config::EngineConfig;
//!
//! let config = EngineConfig::load()?.with_pool(false);
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, Source};
use serde::{Deserialize, Serialize};

const DEFAULT_STACK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reuse idle method bodies instead of building a fresh tree per call
    pub pool_enabled: bool,

    /// Undo plain and augmented assignments when they are resumed
    pub trail_assignments: bool,

    /// Stack size for co-expression threads, in bytes
    pub coexpr_stack_size: usize,

    /// Default tracing filter when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_enabled: true,
            trail_assignments: false,
            coexpr_stack_size: DEFAULT_STACK_SIZE,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from the default file search and the environment
    pub fn load() -> Result<Self> {
        match std::env::var("CHIME_CONFIG_PATH") {
            Ok(path) => Self::load_from(&path),
            Err(_) => Self::layered(File::with_name("chime").required(false)),
        }
    }

    /// Load from an explicit file, then the environment
    pub fn load_from(path: &str) -> Result<Self> {
        Self::layered(File::with_name(path).required(true))
            .with_context(|| format!("Failed to load configuration from {}", path))
    }

    fn layered(file: impl Source + Send + Sync + 'static) -> Result<Self> {
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("CHIME").try_parsing(true))
            .build()
            .context("Failed to read configuration sources")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn with_pool(mut self, enabled: bool) -> Self {
        self.pool_enabled = enabled;
        self
    }

    pub fn with_trail(mut self, enabled: bool) -> Self {
        self.trail_assignments = enabled;
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.coexpr_stack_size = bytes;
        self
    }
}
