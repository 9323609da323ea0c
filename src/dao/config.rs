//! DAO configuration
//!
//! Every field has a default, so `{}` is a complete configuration.

use serde::{Deserialize, Serialize};

use super::errors::{DaoError, DaoResult};

/// Per-DAO tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoConfig {
    /// Page size used when a caller asks for 0 (default: 100)
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Larger requests are clamped to this (default: 5000)
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Append ALLOW FILTERING to predicate statements (default: true)
    #[serde(default = "default_allow_filtering")]
    pub allow_filtering: bool,
}

fn default_page_size() -> usize {
    100
}

fn default_max_page_size() -> usize {
    5000
}

fn default_allow_filtering() -> bool {
    true
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            allow_filtering: default_allow_filtering(),
        }
    }
}

impl DaoConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json(text: &str) -> DaoResult<Self> {
        let config: DaoConfig = serde_json::from_str(text)
            .map_err(|e| DaoError::Definition(format!("invalid DAO config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DaoResult<()> {
        if self.default_page_size == 0 {
            return Err(DaoError::Definition(
                "default_page_size must be at least 1".into(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(DaoError::Definition(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }

    /// Effective page size for a request; 0 selects the default
    pub fn resolve_page_size(&self, requested: usize) -> usize {
        match requested {
            0 => self.default_page_size,
            n => n.min(self.max_page_size),
        }
    }
}
