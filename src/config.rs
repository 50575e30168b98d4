//! Configuration for ikv
//!
//! Centralized configuration with sensible defaults.

use crate::error::{IkvError, Result};

/// Build configuration shared by [`IkvIndexBuilder`](crate::IkvIndexBuilder)
/// and [`IkvWriter`](crate::IkvWriter)
#[derive(Debug, Clone)]
pub struct IkvConfig {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Store payload sizes next to offsets (8-byte table records instead of 4)
    pub write_size: bool,

    /// Position of the first payload byte in the output channel.
    /// Anything before it belongs to the caller.
    pub start_offset: u64,

    // -------------------------------------------------------------------------
    // Perfect Hash Configuration
    // -------------------------------------------------------------------------
    /// Seed of the first hash level; later levels derive from it
    pub hash_seed: u64,

    /// Bins allocated per remaining key on each level (>= 1.0)
    pub gamma: f64,

    /// Give up construction after this many levels
    pub max_levels: usize,
}

impl Default for IkvConfig {
    fn default() -> Self {
        Self {
            write_size: true,
            start_offset: 0,
            hash_seed: 0x9E37_79B9_7F4A_7C15,
            gamma: 2.0,
            max_levels: 64,
        }
    }
}

impl IkvConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject parameters the perfect hash cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma >= 1.0) {
            return Err(IkvError::Config(format!(
                "gamma must be >= 1.0, got {}",
                self.gamma
            )));
        }
        if self.max_levels == 0 {
            return Err(IkvError::Config("max_levels must be at least 1".to_string()));
        }
        if self.start_offset > u32::MAX as u64 {
            return Err(IkvError::Config(format!(
                "start_offset {} does not fit in 32 bits",
                self.start_offset
            )));
        }
        Ok(())
    }
}

/// Builder for IkvConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: IkvConfig,
}

impl ConfigBuilder {
    /// Store payload sizes in the offset table
    pub fn write_size(mut self, write_size: bool) -> Self {
        self.config.write_size = write_size;
        self
    }

    /// Set the position of the first payload byte
    pub fn start_offset(mut self, offset: u64) -> Self {
        self.config.start_offset = offset;
        self
    }

    /// Set the base seed of the perfect hash
    pub fn hash_seed(mut self, seed: u64) -> Self {
        self.config.hash_seed = seed;
        self
    }

    /// Set the per-level bin oversizing factor
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.config.gamma = gamma;
        self
    }

    /// Set the maximum number of hash levels
    pub fn max_levels(mut self, levels: usize) -> Self {
        self.config.max_levels = levels;
        self
    }

    pub fn build(self) -> IkvConfig {
        self.config
    }
}
