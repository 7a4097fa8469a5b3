// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-plane tolerance as a fraction of the operands' bounding-box diagonal.
///
/// This is the main robustness/accuracy knob: larger values merge more
/// near-coincident features, smaller values keep more floating-point slivers.
pub const DEFAULT_RELATIVE_EPSILON: f64 = 1e-8;

/// Maximum number of items in a BVH leaf
pub const DEFAULT_BVH_LEAF_SIZE: usize = 4;

/// Number of extra ray directions tried before a classification gives up
pub const DEFAULT_CLASSIFICATION_RETRIES: usize = 8;

/// Default config file looked up by [`EngineConfig::load`]
pub const CONFIG_FILE_NAME: &str = "csg.toml";

/// Tunables for one boolean evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tolerance relative to the bounding-box diagonal of both operands
    pub relative_epsilon: f64,
    /// Maximum BVH leaf size
    pub bvh_leaf_size: usize,
    /// Perturbed ray retries before `NumericDegeneracy`
    pub max_classification_retries: usize,
    /// Reject self-intersecting operands (quadratic in the worst case)
    pub check_self_intersection: bool,
    /// Seed for the perturbed ray directions
    pub ray_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relative_epsilon: DEFAULT_RELATIVE_EPSILON,
            bvh_leaf_size: DEFAULT_BVH_LEAF_SIZE,
            max_classification_retries: DEFAULT_CLASSIFICATION_RETRIES,
            check_self_intersection: true,
            ray_seed: 0x5eed_c56d,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `csg.toml` from the working directory if present, then apply
    /// `POLYFRAME_CSG_*` environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE_NAME).exists() {
            Self::from_file(CONFIG_FILE_NAME)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `POLYFRAME_CSG_*` overrides resolved through `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(eps) = lookup("POLYFRAME_CSG_EPSILON") {
            self.relative_epsilon = eps
                .parse()
                .with_context(|| format!("Invalid POLYFRAME_CSG_EPSILON: {}", eps))?;
        }

        if let Some(leaf) = lookup("POLYFRAME_CSG_LEAF_SIZE") {
            self.bvh_leaf_size = leaf
                .parse()
                .with_context(|| format!("Invalid POLYFRAME_CSG_LEAF_SIZE: {}", leaf))?;
        }

        if let Some(check) = lookup("POLYFRAME_CSG_CHECK_SELF_INTERSECTION") {
            self.check_self_intersection = check.parse().with_context(|| {
                format!("Invalid POLYFRAME_CSG_CHECK_SELF_INTERSECTION: {}", check)
            })?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.relative_epsilon > 0.0 && self.relative_epsilon < 1e-2) {
            bail!(
                "relative_epsilon must be in (0, 0.01), got {}",
                self.relative_epsilon
            );
        }
        if self.bvh_leaf_size == 0 {
            bail!("bvh_leaf_size must be at least 1");
        }
        Ok(())
    }

    /// Absolute tolerance for a scene whose bounding-box diagonal is `diagonal`
    pub fn epsilon_for(&self, diagonal: f64) -> f64 {
        // Point-sized scenes still get a non-zero tolerance
        self.relative_epsilon * diagonal.max(1e-3)
    }
}
