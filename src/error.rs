use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading a weight or bias resource.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: token {index} ({token:?}) is not a number")]
    Parse { origin: String, index: usize, token: String },

    #[error("{origin}: value {index} is not finite")]
    NonFinite { origin: String, index: usize },

    #[error("{origin}: expected {expected} values, found {found}")]
    Count { origin: String, expected: usize, found: usize },
}

/// Tensor lengths that do not match the layer shape.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShapeError {
    #[error("input has {found} elements, layer expects {expected}")]
    Input { expected: usize, found: usize },

    #[error("weights have {found} elements, layer expects {expected}")]
    Weights { expected: usize, found: usize },

    #[error("biases have {found} elements, layer expects {expected}")]
    Biases { expected: usize, found: usize },

    #[error("output buffer has {found} slots, layer produces {expected}")]
    Output { expected: usize, found: usize },

    #[error("input stream holds {found} elements, layer needs {expected}")]
    StreamUnderflow { expected: usize, found: usize },

    #[error("layer shape must be non-empty, got {n_in}x{n_out}")]
    Empty { n_in: usize, n_out: usize },
}

#[derive(Error, Debug, PartialEq)]
pub enum PrecisionError {
    #[error("invalid precision string {0:?}")]
    Syntax(String),

    #[error("unknown quantization mode {0:?}")]
    Quantization(String),

    #[error("unknown overflow mode {0:?}")]
    Overflow(String),

    #[error("width {0} is out of range (1..=32)")]
    Width(u32),

    #[error("integer bits {0} are out of range (-32..=64)")]
    IntBits(i32),

    #[error("saturation bits are not supported (got {0})")]
    SaturationBits(u32),

    #[error("cannot quantize non-finite value {0}")]
    NonFinite(f64),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error for kernel construction and evaluation.
#[derive(Error, Debug)]
pub enum DenseError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Precision(#[from] PrecisionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DenseError>;
