//! Configuration for bramble
//!
//! Centralized configuration with sensible defaults.

use crate::error::{BrambleError, Result};

/// Default maximum number of values per node (production-sized)
pub const DEFAULT_MAX_NODE_VALUES: usize = 1001;

/// Main configuration for a tree handle
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Fullness Configuration
    // -------------------------------------------------------------------------
    /// A node is full (and will split on insertion) once it holds this many
    /// values. Must be odd so a split produces equal halves around a unique
    /// median.
    pub max_node_values: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_node_values: DEFAULT_MAX_NODE_VALUES,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validate the configuration
    ///
    /// The fullness maximum must be odd: splits partition values around a
    /// median, and internal-node child lists partition into equal halves only
    /// when the maximum is odd.
    pub fn validate(&self) -> Result<()> {
        if self.max_node_values % 2 == 0 {
            return Err(BrambleError::Config(format!(
                "max_node_values must be odd, got {}",
                self.max_node_values
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the fullness maximum (values per node before a split fires)
    pub fn max_node_values(mut self, max: usize) -> Self {
        self.config.max_node_values = max;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
