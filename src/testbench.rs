// C-simulation testbench over tb_input_features.dat / tb_output_predictions.dat

use crate::error::{DenseError, LoadError, Result};
use crate::fixed::QTensor;
use crate::project::Project;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const INPUT_FEATURES: &str = "tb_input_features.dat";
pub const OUTPUT_PREDICTIONS: &str = "tb_output_predictions.dat";
pub const CSIM_RESULTS: &str = "csim_results.log";

#[derive(Debug, Clone)]
pub struct TestbenchOptions {
    pub tb_dir: PathBuf,
    /// Maximum absolute difference accepted per output element.
    pub tolerance: f64,
    /// Number of leading predictions echoed to the log.
    pub show: usize,
    pub progress: bool,
}

impl Default for TestbenchOptions {
    fn default() -> Self {
        Self { tb_dir: PathBuf::from("tb_data"), tolerance: 1e-3, show: 5, progress: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestbenchReport {
    pub samples: usize,
    pub compared: usize,
    pub mismatches: usize,
    pub max_abs_diff: f64,
    pub used_default_input: bool,
}

/// Reads one sample per non-blank line.
pub fn read_samples<P: AsRef<Path>>(path: P) -> std::result::Result<Vec<Vec<f64>>, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let mut samples = Vec::new();
    for (ln, line) in text.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        let origin = format!("{}:{}", path.display(), ln + 1);
        let sample = line.split_whitespace().enumerate()
            .map(|(index, tok)| tok.parse::<f64>().map_err(|_| LoadError::Parse {
                origin: origin.clone(),
                index,
                token: tok.to_string(),
            }))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        samples.push(sample);
    }
    Ok(samples)
}

pub fn write_results<P: AsRef<Path>>(path: P, results: &[QTensor]) -> Result<()> {
    let path = path.as_ref();
    let io_err = |source| DenseError::Io { path: path.to_path_buf(), source };
    let mut w = BufWriter::new(File::create(path).map_err(io_err)?);
    for r in results {
        let line = r.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        writeln!(w, "{}", line).map_err(io_err)?;
    }
    w.flush().map_err(io_err)
}

pub fn run(project: &Project, opts: &TestbenchOptions) -> Result<TestbenchReport> {
    let inputs_path = opts.tb_dir.join(INPUT_FEATURES);
    let preds_path = opts.tb_dir.join(OUTPUT_PREDICTIONS);
    let mut report = TestbenchReport::default();

    let (samples, expected) = if inputs_path.exists() {
        let samples = read_samples(&inputs_path)?;
        let expected = if preds_path.exists() { Some(read_samples(&preds_path)?) } else { None };
        (samples, expected)
    } else {
        warn!("unable to open {}, using default input", inputs_path.display());
        report.used_default_input = true;
        (vec![vec![0.0; project.kernel().n_in()]], None)
    };
    report.samples = samples.len();
    info!("{}: evaluating {} samples", project.name(), samples.len());

    let results: Vec<QTensor> = if project.tracing() {
        // trace lines must follow sample order
        project.clear_trace()?;
        samples.iter()
            .map(|s| -> Result<QTensor> {
                let out = project.predict(s)?;
                project.trace(&out)?;
                Ok(out)
            })
            .collect::<Result<_>>()?
    } else if opts.progress {
        let pb = ProgressBar::new(samples.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} ({eta}) {per_sec}")
        {
            pb.set_style(style.progress_chars("##>-"));
        }
        samples.par_iter().progress_with(pb).map(|s| project.predict(s)).collect::<Result<_>>()?
    } else {
        samples.par_iter().map(|s| project.predict(s)).collect::<Result<_>>()?
    };

    std::fs::create_dir_all(&opts.tb_dir)
        .map_err(|source| DenseError::Io { path: opts.tb_dir.clone(), source })?;
    write_results(opts.tb_dir.join(CSIM_RESULTS), &results)?;

    for (i, r) in results.iter().take(opts.show).enumerate() {
        info!("prediction {}: {}", i, r.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" "));
    }

    if let Some(expected) = expected {
        if expected.len() != results.len() {
            warn!("{} reference predictions for {} samples, comparing the first {}",
                expected.len(), results.len(), expected.len().min(results.len()));
        }
        for (i, (got, want)) in results.iter().zip(expected.iter()).enumerate() {
            report.compared += 1;
            let got = got.to_f64s();
            if got.len() != want.len() {
                warn!("sample {}: {} outputs, reference has {}", i, got.len(), want.len());
                report.mismatches += 1;
                continue;
            }
            let diff = got.iter().zip(want).map(|(g, w)| (g - w).abs()).fold(0.0f64, f64::max);
            report.max_abs_diff = report.max_abs_diff.max(diff);
            if diff > opts.tolerance {
                report.mismatches += 1;
            }
        }
        info!("compared {} samples, {} mismatches, max |diff| {:.6}", report.compared, report.mismatches, report.max_abs_diff);
    }
    Ok(report)
}
