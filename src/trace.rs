use crate::error::DenseError;
use crate::fixed::QTensor;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn trace_path<P: AsRef<Path>>(dir: P, layer: &str) -> PathBuf {
    dir.as_ref().join(format!("{}_output.log", layer))
}

/// Appends one space-separated line with `output` to `<dir>/<layer>_output.log`.
pub fn save_layer_output<P: AsRef<Path>>(dir: P, layer: &str, output: &QTensor) -> Result<(), DenseError> {
    let dir = dir.as_ref();
    let path = trace_path(dir, layer);
    let io_err = |source| DenseError::Io { path: path.clone(), source };
    fs::create_dir_all(dir).map_err(io_err)?;
    let mut f = OpenOptions::new().create(true).append(true).open(&path).map_err(io_err)?;
    let line = output.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
    writeln!(f, "{}", line).map_err(io_err)
}

/// Removes a previous trace so a new run starts from an empty file.
pub fn clear_layer_output<P: AsRef<Path>>(dir: P, layer: &str) -> Result<(), DenseError> {
    let path = trace_path(dir, layer);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DenseError::Io { path, source }),
    }
}
