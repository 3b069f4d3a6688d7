// Fixed-point dense layer evaluation for generated HLS firmware projects
pub mod config;
pub mod dense;
pub mod error;
pub mod fixed;
pub mod project;
pub mod stream;
pub mod testbench;
pub mod trace;
pub mod weights;

pub use config::{DenseConfig, IoType, LayerPrecision, ProjectConfig};
pub use dense::{dense, DenseKernel, DenseKernelBuilder};
pub use error::{DenseError, LoadError, PrecisionError, ShapeError};
pub use fixed::{Fixed, FixedSpec, Overflow, QTensor, Quantization};
pub use project::Project;
pub use stream::Stream;
