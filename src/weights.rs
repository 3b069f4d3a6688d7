// Text weight resources; values separated by any mix of commas and whitespace

use crate::error::LoadError;
use crate::fixed::{FixedSpec, QTensor};
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Reads `expected` values from `path` and quantizes them to `spec`.
pub fn load_weights_from_txt<P: AsRef<Path>>(path: P, spec: FixedSpec, expected: usize) -> Result<QTensor, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let t = parse_weights(&text, spec, expected, &path.display().to_string())?;
    debug!("loaded {} values from {} as {}", t.len(), path.display(), spec);
    Ok(t)
}

/// Parses a weight resource held in memory; `origin` names it in errors.
pub fn parse_weights(text: &str, spec: FixedSpec, expected: usize, origin: &str) -> Result<QTensor, LoadError> {
    let mut raw = Vec::with_capacity(expected);
    let tokens = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty());
    for (index, token) in tokens.enumerate() {
        let v: f64 = token.parse().map_err(|_| LoadError::Parse {
            origin: origin.to_string(),
            index,
            token: token.to_string(),
        })?;
        let q = spec.quantize(v)
            .map_err(|_| LoadError::NonFinite { origin: origin.to_string(), index })?;
        raw.push(q.raw());
    }
    if raw.len() != expected {
        return Err(LoadError::Count { origin: origin.to_string(), expected, found: raw.len() });
    }
    Ok(QTensor::from_raw(spec, raw))
}

/// Writes `tensor` as a single comma-separated line.
pub fn write_weights_txt<P: AsRef<Path>>(path: P, tensor: &QTensor) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let line = tensor.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
    writeln!(w, "{}", line)?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FC1_DEFAULT_T;

    #[test]
    fn accepts_mixed_separators() {
        let t = parse_weights("0.5, -1.25\n3\t4 ,\n", FC1_DEFAULT_T, 4, "mem").unwrap();
        assert_eq!(t.to_f64s(), vec![0.5, -1.25, 3.0, 4.0]);
    }

    #[test]
    fn values_are_quantized_to_the_weight_precision() {
        // lsb of ap_fixed<22,14> is 1/256; truncation goes toward minus infinity
        let t = parse_weights("0.001,-0.001", FC1_DEFAULT_T, 2, "mem").unwrap();
        assert_eq!(t.to_f64s(), vec![0.0, -1.0 / 256.0]);
    }

    #[test]
    fn reports_bad_token_position() {
        match parse_weights("1,2,abc,4", FC1_DEFAULT_T, 4, "mem") {
            Err(LoadError::Parse { index, token, .. }) => {
                assert_eq!(index, 2);
                assert_eq!(token, "abc");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_nan() {
        assert!(matches!(parse_weights("1,nan", FC1_DEFAULT_T, 2, "mem"), Err(LoadError::NonFinite { index: 1, .. })));
    }
}
