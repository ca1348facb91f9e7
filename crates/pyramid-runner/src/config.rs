//! Pipeline configuration loaded from YAML.
//!
//! Every field is optional. A minimal file only names what differs from the
//! defaults:
//!
//! ```yaml
//! base_dir: /data/pyramid
//! directories:
//!   srtm: SRTM3
//! corner_averaging: present_tiles
//! workers: 8
//! fine_in_flight: 2
//! ```

use crate::error::{Result, RunnerError};
use pyramid_dem::{
    default_directory, CornerAveraging, Level, PipelineOptions, ReconcilePolicy, StoreLayout,
    VoidPolicy, DEFAULT_FINE_IN_FLIGHT,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory the level directories are resolved against.
    pub base_dir: PathBuf,
    /// Level directory names.
    pub directories: Directories,
    /// Samples above this height are voids during resampling.
    pub void_threshold: i16,
    /// Height substituted for voids during resampling.
    pub void_fill: i16,
    /// Corner divisor rule for reconciliation.
    pub corner_averaging: CornerAveraging,
    /// Reconcile disagreements above this many metres are logged as warnings.
    pub disagreement_warn: i32,
    /// Build worker threads, 0 for one per core.
    pub workers: usize,
    /// Fine tiles built at once, 0 for no limit. Each needs about 350 MB.
    pub fine_in_flight: usize,
}

/// Per-level directory names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Directories {
    /// Raw 1° source tiles. Must exist.
    pub srtm: PathBuf,
    /// 3.75° tiles, created when missing.
    pub fine: PathBuf,
    /// 15° tiles, created when missing.
    pub medium: PathBuf,
    /// 60° tiles, created when missing.
    pub coarse: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            srtm: default_directory(Level::Srtm).into(),
            fine: default_directory(Level::Fine).into(),
            medium: default_directory(Level::Medium).into(),
            coarse: default_directory(Level::Coarse).into(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let void = VoidPolicy::default();
        let reconcile = ReconcilePolicy::default();
        Self {
            base_dir: PathBuf::from("."),
            directories: Directories::default(),
            void_threshold: void.threshold,
            void_fill: void.fill,
            corner_averaging: reconcile.corners,
            disagreement_warn: reconcile.disagreement_warn,
            workers: 0,
            fine_in_flight: DEFAULT_FINE_IN_FLIGHT,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from YAML text. `origin` names the source in
    /// error messages.
    pub fn from_yaml_str(yaml: &str, origin: &Path) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| RunnerError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| RunnerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml, path)
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> Result<()> {
        if self.void_fill > self.void_threshold {
            return Err(RunnerError::Config(format!(
                "void_fill ({}) must not exceed void_threshold ({})",
                self.void_fill, self.void_threshold
            )));
        }
        if self.disagreement_warn < 0 {
            return Err(RunnerError::Config(
                "disagreement_warn must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory layout of the store.
    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.base_dir)
            .with_directory(Level::Srtm, &self.directories.srtm)
            .with_directory(Level::Fine, &self.directories.fine)
            .with_directory(Level::Medium, &self.directories.medium)
            .with_directory(Level::Coarse, &self.directories.coarse)
    }

    /// Pipeline options.
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            void: VoidPolicy {
                threshold: self.void_threshold,
                fill: self.void_fill,
            },
            reconcile: ReconcilePolicy {
                corners: self.corner_averaging,
                disagreement_warn: self.disagreement_warn,
            },
            workers: self.workers,
            fine_in_flight: self.fine_in_flight,
        }
    }
}
