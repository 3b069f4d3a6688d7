// Top-level firmware entry point: one dense layer behind the configured transfer discipline

use crate::config::{IoType, ProjectConfig};
use crate::dense::DenseKernel;
use crate::error::{Result, ShapeError};
use crate::fixed::{Fixed, QTensor};
use crate::stream::Stream;
use crate::trace;
use log::info;
use std::path::{Path, PathBuf};

pub struct Project {
    name: String,
    io: IoType,
    kernel: DenseKernel,
    trace_dir: Option<PathBuf>,
}

impl Project {
    /// Loads the layer parameters from `config.weights_dir`.
    pub fn new(config: &ProjectConfig) -> Result<Self> {
        let kernel = DenseKernel::builder(config.layer.clone())
            .weights_dir(&config.weights_dir)
            .build()?;
        info!("{}: {} io, layer {} ({} -> {})", config.project_name, io_name(config.io_type),
            kernel.config().name, kernel.n_in(), kernel.n_out());
        Ok(Self::from_kernel(&config.project_name, kernel, config.io_type, config.trace_dir.clone()))
    }

    pub fn from_kernel(name: &str, kernel: DenseKernel, io: IoType, trace_dir: Option<PathBuf>) -> Self {
        Self { name: name.to_string(), io, kernel, trace_dir }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn kernel(&self) -> &DenseKernel { &self.kernel }
    pub fn io_type(&self) -> IoType { self.io }
    pub fn trace_dir(&self) -> Option<&Path> { self.trace_dir.as_deref() }
    pub fn tracing(&self) -> bool { self.trace_dir.is_some() }

    /// Evaluates one sample through the configured transfer discipline.
    pub fn predict(&self, sample: &[f64]) -> Result<QTensor> {
        let cfg = self.kernel.config();
        if sample.len() != cfg.n_in {
            return Err(ShapeError::Input { expected: cfg.n_in, found: sample.len() }.into());
        }
        let input = QTensor::from_f64s(cfg.precision.input, sample)?;
        let result_spec = cfg.precision.result;
        match self.io {
            IoType::Stream => {
                let mut fc1_input: Stream<Fixed> = input.iter().collect();
                let mut layer_out = Stream::with_capacity(cfg.n_out);
                self.kernel.forward_stream(&mut fc1_input, &mut layer_out)?;
                Ok(QTensor::from_fixed(result_spec, layer_out))
            }
            IoType::Parallel => {
                let fc1_input: Vec<Fixed> = input.iter().collect();
                let mut layer_out = vec![Fixed::zero(result_spec); cfg.n_out];
                self.kernel.forward_array(&fc1_input, &mut layer_out)?;
                Ok(QTensor::from_fixed(result_spec, layer_out))
            }
        }
    }

    /// Appends `output` to the layer trace when tracing is enabled.
    pub fn trace(&self, output: &QTensor) -> Result<()> {
        match &self.trace_dir {
            Some(dir) => trace::save_layer_output(dir, &self.kernel.config().name, output),
            None => Ok(()),
        }
    }

    pub fn clear_trace(&self) -> Result<()> {
        match &self.trace_dir {
            Some(dir) => trace::clear_layer_output(dir, &self.kernel.config().name),
            None => Ok(()),
        }
    }
}

fn io_name(io: IoType) -> &'static str {
    match io {
        IoType::Stream => "io_stream",
        IoType::Parallel => "io_parallel",
    }
}
