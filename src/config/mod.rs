//! Retrieval configuration
//!
//! Loaded from a JSON file. Every field is optional and falls back to its
//! default.
//!
//! ```json
//! { "page_size": 25, "log_severity": "TRACE" }
//! ```

mod errors;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

pub use errors::{ConfigError, ConfigErrorCode, ConfigResult};

/// Default number of records read per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Configuration for the retrieval engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveConfig {
    /// Records read per page in streaming mode (must be > 0)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Minimum severity written by the logger
    #[serde(default)]
    pub log_severity: Severity,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for RetrieveConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            log_severity: Severity::default(),
        }
    }
}

impl RetrieveConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::read_failed(format!("{}: {}", path.display(), e))
        })?;

        let config = Self::from_json(&content)?;
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("page_size", &config.page_size.to_string()),
                ("path", &path.display().to_string()),
            ],
        );
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: RetrieveConfig = serde_json::from_str(content)
            .map_err(|e| ConfigError::invalid_json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder-style page size override
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.page_size == 0 {
            return Err(ConfigError::invalid_value("page_size must be > 0"));
        }
        Ok(())
    }

    /// Applies the logging threshold process-wide. Call once after `load`.
    pub fn apply_logging(&self) {
        Logger::set_min_severity(self.log_severity);
    }
}
