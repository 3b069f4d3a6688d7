// Quantized dense layer: out[j] = result(accum(bias[j]) + sum_i accum(in[i] * w[i * n_out + j]))

use crate::config::{DenseConfig, LayerPrecision};
use crate::error::{DenseError, PrecisionError, ShapeError};
use crate::fixed::{Fixed, FixedSpec, QTensor};
use crate::stream::Stream;
use crate::weights::load_weights_from_txt;
use log::{debug, info};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub const DEFAULT_WEIGHTS_DIR: &str = "firmware/weights";

fn in_spec(t: &QTensor, spec: FixedSpec) -> Cow<'_, QTensor> {
    if t.spec() == spec { Cow::Borrowed(t) } else { Cow::Owned(t.cast(spec)) }
}

/// Evaluates one dense layer. Shapes come from the arguments: `n_in = input.len()`,
/// `n_out = biases.len()`, and `weights` must hold `n_in * n_out` values laid out
/// row-major by input index. Tensors in another precision are cast first.
pub fn dense(input: &QTensor, weights: &QTensor, biases: &QTensor, precision: &LayerPrecision) -> Result<QTensor, ShapeError> {
    let n_in = input.len();
    let n_out = biases.len();
    if n_in == 0 || n_out == 0 { return Err(ShapeError::Empty { n_in, n_out }); }
    if weights.len() != n_in * n_out {
        return Err(ShapeError::Weights { expected: n_in * n_out, found: weights.len() });
    }
    let input = in_spec(input, precision.input);
    let weights = in_spec(weights, precision.weight);
    let biases = in_spec(biases, precision.bias);

    let accum = precision.accum;
    let acc_frac = accum.frac_bits();
    let prod_frac = precision.input.frac_bits() + precision.weight.frac_bits();
    let bias_frac = precision.bias.frac_bits();
    let x = input.raw();
    let w = weights.raw();

    let acc: Vec<i64> = biases.raw().iter().enumerate().map(|(j, &b)| {
        let mut acc = accum.cast_raw(b as i128, bias_frac);
        for (i, &xi) in x.iter().enumerate() {
            let term = accum.cast_raw(xi as i128 * w[i * n_out + j] as i128, prod_frac);
            acc = accum.cast_raw(acc as i128 + term as i128, acc_frac);
        }
        acc
    }).collect();
    Ok(QTensor::from_raw(accum, acc).cast(precision.result))
}

enum ParamSource {
    Dir(PathBuf),
    Values { weights: QTensor, biases: QTensor },
}

/// One-time initialization of a [`DenseKernel`]: parameters are loaded and checked
/// here, so a built kernel is always complete.
pub struct DenseKernelBuilder {
    config: DenseConfig,
    source: ParamSource,
}

impl DenseKernelBuilder {
    /// Read `config.weights_file` and `config.bias_file` from `dir`.
    pub fn weights_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.source = ParamSource::Dir(dir.as_ref().to_path_buf());
        self
    }

    /// Use in-memory parameters instead of files.
    pub fn parameters(mut self, weights: QTensor, biases: QTensor) -> Self {
        self.source = ParamSource::Values { weights, biases };
        self
    }

    /// Quantizes real-valued parameters to the configured weight and bias precisions.
    pub fn parameters_f64(self, weights: &[f64], biases: &[f64]) -> Result<Self, PrecisionError> {
        let w = QTensor::from_f64s(self.config.precision.weight, weights)?;
        let b = QTensor::from_f64s(self.config.precision.bias, biases)?;
        Ok(self.parameters(w, b))
    }

    pub fn build(self) -> Result<DenseKernel, DenseError> {
        let cfg = self.config;
        if cfg.n_in == 0 || cfg.n_out == 0 {
            return Err(ShapeError::Empty { n_in: cfg.n_in, n_out: cfg.n_out }.into());
        }
        let (weights, biases) = match self.source {
            ParamSource::Dir(dir) => {
                let w = load_weights_from_txt(dir.join(&cfg.weights_file), cfg.precision.weight, cfg.n_weights())?;
                let b = load_weights_from_txt(dir.join(&cfg.bias_file), cfg.precision.bias, cfg.n_out)?;
                info!("{}: loaded {} weights and {} biases from {}", cfg.name, w.len(), b.len(), dir.display());
                (w, b)
            }
            ParamSource::Values { weights, biases } => {
                if weights.len() != cfg.n_weights() {
                    return Err(ShapeError::Weights { expected: cfg.n_weights(), found: weights.len() }.into());
                }
                if biases.len() != cfg.n_out {
                    return Err(ShapeError::Biases { expected: cfg.n_out, found: biases.len() }.into());
                }
                (weights.cast(cfg.precision.weight), biases.cast(cfg.precision.bias))
            }
        };
        debug!("{}: {}x{} input {} accum {} result {}", cfg.name, cfg.n_in, cfg.n_out,
            cfg.precision.input, cfg.precision.accum, cfg.precision.result);
        Ok(DenseKernel { config: cfg, weights, biases })
    }
}

/// A ready dense layer: immutable parameters plus the block and stream adapters
/// over [`dense`].
#[derive(Debug, Clone)]
pub struct DenseKernel {
    config: DenseConfig,
    weights: QTensor,
    biases: QTensor,
}

impl DenseKernel {
    pub fn builder(config: DenseConfig) -> DenseKernelBuilder {
        DenseKernelBuilder { config, source: ParamSource::Dir(PathBuf::from(DEFAULT_WEIGHTS_DIR)) }
    }

    pub fn config(&self) -> &DenseConfig { &self.config }
    pub fn weights(&self) -> &QTensor { &self.weights }
    pub fn biases(&self) -> &QTensor { &self.biases }
    pub fn n_in(&self) -> usize { self.config.n_in }
    pub fn n_out(&self) -> usize { self.config.n_out }

    /// Block evaluation of a whole input tensor.
    pub fn forward(&self, input: &QTensor) -> Result<QTensor, DenseError> {
        if input.len() != self.n_in() {
            return Err(ShapeError::Input { expected: self.n_in(), found: input.len() }.into());
        }
        Ok(dense(input, &self.weights, &self.biases, &self.config.precision)?)
    }

    /// Quantizes `input` to the layer's input precision and evaluates it.
    pub fn forward_f64(&self, input: &[f64]) -> Result<QTensor, DenseError> {
        if input.len() != self.n_in() {
            return Err(ShapeError::Input { expected: self.n_in(), found: input.len() }.into());
        }
        let q = QTensor::from_f64s(self.config.precision.input, input)?;
        self.forward(&q)
    }

    /// Array transfer: reads all of `input`, fills all of `output`.
    pub fn forward_array(&self, input: &[Fixed], output: &mut [Fixed]) -> Result<(), DenseError> {
        if output.len() != self.n_out() {
            return Err(ShapeError::Output { expected: self.n_out(), found: output.len() }.into());
        }
        let q = QTensor::from_fixed(self.config.precision.input, input.iter().copied());
        let res = self.forward(&q)?;
        for (slot, v) in output.iter_mut().zip(res.iter()) {
            *slot = v;
        }
        Ok(())
    }

    /// Stream transfer: consumes `n_in` elements from `input` and writes `n_out`
    /// elements to `output`. On underflow nothing is consumed.
    pub fn forward_stream(&self, input: &mut Stream<Fixed>, output: &mut Stream<Fixed>) -> Result<(), DenseError> {
        let n = self.n_in();
        let found = input.len();
        let elems = input.read_n(n).ok_or(ShapeError::StreamUnderflow { expected: n, found })?;
        let q = QTensor::from_fixed(self.config.precision.input, elems);
        let res = self.forward(&q)?;
        output.extend(res.iter());
        Ok(())
    }
}
