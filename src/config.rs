use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cron::DEFAULT_SEARCH_YEARS;
use crate::error::{RecurrenceError, Result};

/// Tunables for next-run resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Hard bound on month-step candidates tried before giving up (default: 100)
    #[serde(default = "default_max_month_step_attempts")]
    pub max_month_step_attempts: u32,

    /// How many years ahead a cron expression is searched for its next fire time (default: 4)
    #[serde(default = "default_cron_search_years")]
    pub cron_search_years: u32,
}

fn default_max_month_step_attempts() -> u32 {
    100
}

fn default_cron_search_years() -> u32 {
    DEFAULT_SEARCH_YEARS
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_month_step_attempts: default_max_month_step_attempts(),
            cron_search_years: default_cron_search_years(),
        }
    }
}

impl ResolverConfig {
    /// Parse and validate a JSON configuration string.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: ResolverConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    /// Returns default config if the file does not exist.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Reject bounds that would make resolution fail unconditionally.
    pub fn validate(&self) -> Result<()> {
        if self.max_month_step_attempts == 0 {
            return Err(RecurrenceError::Config(
                "max_month_step_attempts must be at least 1".to_string(),
            ));
        }
        if self.cron_search_years == 0 {
            return Err(RecurrenceError::Config(
                "cron_search_years must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
