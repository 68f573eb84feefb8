//! Run configuration for hard linear molecule Monte Carlo
//!
//! This module handles the YAML schema, its defaults and validation, and the
//! command-line overrides applied on top of it.

mod args;

pub use args::Args;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::engine::{Ensemble, MoveParameters};
use crate::error::{McError, Result};
use crate::overlap::HardSpherocylinder;

/// Main configuration structure for a Monte Carlo run
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RunConfig {
    /// Where the starting configuration comes from
    #[serde(default)]
    pub initial: InitialConfig,
    /// Prefix for checkpoint and final configuration files
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// Random seed; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Molecular shape
    #[serde(default)]
    pub molecule: MoleculeConfig,
    /// Block/step counts and particle move sizes
    #[serde(default)]
    pub run: RunParams,
    /// Ensemble type and parameters
    pub ensemble: EnsembleConfig,
}

/// Starting configuration options
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum InitialConfig {
    /// Read from a configuration file
    #[serde(rename = "file")]
    File {
        #[serde(default = "default_input_path")]
        path: String,
    },
    /// Simple cubic lattice of molecules
    #[serde(rename = "lattice")]
    Lattice {
        /// Molecules per box edge
        n_per_side: usize,
        /// Box length in molecular units
        box_length: f64,
        /// Align all molecules along z; random orientations otherwise
        #[serde(default = "default_aligned")]
        aligned: bool,
        /// Attempts per molecule when drawing random orientations
        #[serde(default = "default_max_attempts")]
        max_attempts: usize,
    },
}

impl Default for InitialConfig {
    fn default() -> Self {
        InitialConfig::File {
            path: default_input_path(),
        }
    }
}

/// Molecular shape parameters
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct MoleculeConfig {
    /// Cylinder length of the spherocylinder (diameter = 1)
    #[serde(default = "default_length")]
    pub length: f64,
}

impl Default for MoleculeConfig {
    fn default() -> Self {
        MoleculeConfig {
            length: default_length(),
        }
    }
}

impl MoleculeConfig {
    pub fn oracle(&self) -> HardSpherocylinder {
        HardSpherocylinder::new(self.length)
    }
}

/// Run length and particle move parameters
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct RunParams {
    #[serde(default = "default_block_count")]
    pub block_count: usize,
    #[serde(default = "default_steps_per_block")]
    pub steps_per_block: usize,
    /// Maximum displacement in molecular units
    #[serde(default = "default_max_step")]
    pub max_displacement: f64,
    /// Maximum rotation parameter
    #[serde(default = "default_max_step")]
    pub max_rotation: f64,
}

impl Default for RunParams {
    fn default() -> Self {
        RunParams {
            block_count: default_block_count(),
            steps_per_block: default_steps_per_block(),
            max_displacement: default_max_step(),
            max_rotation: default_max_step(),
        }
    }
}

/// Ensemble configuration
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(tag = "type")]
pub enum EnsembleConfig {
    /// Canonical (NVT) ensemble
    #[serde(rename = "nvt")]
    NVT {
        /// Relative box compression used by the virial pressure estimator
        #[serde(default = "default_eps_box")]
        pressure_virial_epsilon: f64,
    },
    /// Isothermal-isobaric (NPT) ensemble
    #[serde(rename = "npt")]
    NPT {
        /// Reduced pressure
        #[serde(default = "default_pressure")]
        pressure: f64,
        /// Maximum change of ln(box) per volume move
        #[serde(default = "default_db_max")]
        max_box_displacement: f64,
    },
}

// Default value functions
fn default_output_prefix() -> String {
    "cnf.".to_string()
}
fn default_input_path() -> String {
    "cnf.inp".to_string()
}
fn default_aligned() -> bool {
    true
}
fn default_max_attempts() -> usize {
    10_000
}
fn default_length() -> f64 {
    5.0
}
fn default_block_count() -> usize {
    10
}
fn default_steps_per_block() -> usize {
    10_000
}
fn default_max_step() -> f64 {
    0.05
}
fn default_eps_box() -> f64 {
    0.005
}
fn default_pressure() -> f64 {
    2.0
}
fn default_db_max() -> f64 {
    0.005
}

impl RunConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: RunConfig = serde_yml::from_str(content)
            .map_err(|e| McError::Config(format!("failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yml::to_string(self)
            .map_err(|e| McError::Config(format!("failed to serialise configuration: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply command-line overrides; the result is validated again
    pub fn with_overrides(mut self, args: &Args) -> Result<Self> {
        self.run.block_count = args.blocks.unwrap_or(self.run.block_count);
        self.run.steps_per_block = args.steps.unwrap_or(self.run.steps_per_block);
        self.seed = args.seed.or(self.seed);
        if let Some(path) = &args.input {
            self.initial = InitialConfig::File { path: path.clone() };
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(McError::Config(msg.to_string()));

        if self.run.block_count == 0 {
            return fail("block_count must be positive");
        }
        if self.run.steps_per_block == 0 {
            return fail("steps_per_block must be positive");
        }
        if !(self.run.max_displacement >= 0.0) {
            return fail("max_displacement must not be negative");
        }
        if !(self.run.max_rotation >= 0.0) {
            return fail("max_rotation must not be negative");
        }
        if !(self.molecule.length >= 0.0) {
            return fail("molecule length must not be negative");
        }
        if self.output_prefix.is_empty() {
            return fail("output_prefix must not be empty");
        }

        match &self.ensemble {
            EnsembleConfig::NVT {
                pressure_virial_epsilon,
            } => {
                if !(*pressure_virial_epsilon > 0.0) {
                    return fail("pressure_virial_epsilon must be positive");
                }
            }
            EnsembleConfig::NPT {
                pressure,
                max_box_displacement,
            } => {
                if !(*pressure >= 0.0) {
                    return fail("pressure must not be negative");
                }
                if !(*max_box_displacement >= 0.0) {
                    return fail("max_box_displacement must not be negative");
                }
            }
        }

        match &self.initial {
            InitialConfig::File { path } => {
                if path.is_empty() {
                    return fail("initial configuration path must not be empty");
                }
            }
            InitialConfig::Lattice {
                n_per_side,
                box_length,
                max_attempts,
                ..
            } => {
                if *n_per_side == 0 {
                    return fail("lattice n_per_side must be positive");
                }
                if n_per_side.checked_pow(3).is_none() {
                    return fail("lattice n_per_side is too large");
                }
                if !(*box_length > 0.0) {
                    return fail("lattice box_length must be positive");
                }
                if *max_attempts == 0 {
                    return fail("lattice max_attempts must be positive");
                }
            }
        }

        Ok(())
    }

    pub fn ensemble(&self) -> Ensemble {
        match self.ensemble {
            EnsembleConfig::NVT {
                pressure_virial_epsilon,
            } => Ensemble::Nvt {
                pressure_virial_epsilon,
            },
            EnsembleConfig::NPT {
                pressure,
                max_box_displacement,
            } => Ensemble::Npt {
                pressure,
                max_box_displacement,
            },
        }
    }

    pub fn move_parameters(&self) -> MoveParameters {
        MoveParameters {
            max_displacement: self.run.max_displacement,
            max_rotation: self.run.max_rotation,
        }
    }

    /// Checkpoint tag for a block: zero-padded block number when the run has
    /// fewer than 1000 blocks, otherwise a single overwritten "sav" file.
    pub fn checkpoint_tag(&self, block: usize) -> String {
        if self.run.block_count < 1000 {
            format!("{block:03}")
        } else {
            "sav".to_string()
        }
    }

    pub fn checkpoint_path(&self, block: usize) -> String {
        format!("{}{}", self.output_prefix, self.checkpoint_tag(block))
    }

    pub fn final_path(&self) -> String {
        format!("{}out", self.output_prefix)
    }
}
