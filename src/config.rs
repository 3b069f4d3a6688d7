// Project and layer configuration, defaults follow the generated firmware header

use crate::dense::DEFAULT_WEIGHTS_DIR;
use crate::error::ConfigError;
use crate::fixed::{ap_fixed, FixedSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const N_INPUT_1_1: usize = 1540;
pub const N_LAYER_2: usize = 2;

pub const INPUT_T: FixedSpec = ap_fixed(12, 12);
pub const FC1_DEFAULT_T: FixedSpec = ap_fixed(22, 14);

/// Precision of every tensor the dense layer touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerPrecision {
    pub input: FixedSpec,
    pub weight: FixedSpec,
    pub bias: FixedSpec,
    pub accum: FixedSpec,
    pub result: FixedSpec,
}

impl Default for LayerPrecision {
    fn default() -> Self {
        Self {
            input: INPUT_T,
            weight: FC1_DEFAULT_T,
            bias: FC1_DEFAULT_T,
            accum: FC1_DEFAULT_T,
            result: FC1_DEFAULT_T,
        }
    }
}

/// Transfer discipline of the top-level entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IoType {
    /// Element-at-a-time FIFO transfer.
    #[default]
    Stream,
    /// Whole-tensor block transfer.
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseConfig {
    pub name: String,
    pub n_in: usize,
    pub n_out: usize,
    pub precision: LayerPrecision,
    pub weights_file: String,
    pub bias_file: String,
}

impl Default for DenseConfig {
    fn default() -> Self {
        Self {
            name: "fc1".to_string(),
            n_in: N_INPUT_1_1,
            n_out: N_LAYER_2,
            precision: LayerPrecision::default(),
            weights_file: "w2.txt".to_string(),
            bias_file: "b2.txt".to_string(),
        }
    }
}

impl DenseConfig {
    /// Layer of the given shape with default precisions and file names.
    pub fn with_shape(n_in: usize, n_out: usize) -> Self {
        Self { n_in, n_out, ..Self::default() }
    }

    pub fn n_weights(&self) -> usize { self.n_in * self.n_out }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub project_name: String,
    pub weights_dir: PathBuf,
    pub io_type: IoType,
    /// Directory for layer output traces; tracing is off when unset.
    pub trace_dir: Option<PathBuf>,
    pub layer: DenseConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_name: "myproject".to_string(),
            weights_dir: PathBuf::from(DEFAULT_WEIGHTS_DIR),
            io_type: IoType::default(),
            trace_dir: None,
            layer: DenseConfig::default(),
        }
    }
}

impl ProjectConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text)
            .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
