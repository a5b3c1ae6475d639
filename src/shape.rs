//! Shape construction and validation for IR buffers.
//!
//! Every IR handed to a caller is a 2-D `(channels, samples)` array. A
//! small channel axis is the convention marker: an adapter that returns
//! `(samples,)` or `(samples, channels)` by accident produces a first
//! dimension in the thousands, which the check below rejects.

use ndarray::Array2;

use crate::error::{DatasetError, Result};

/// An impulse response: a `(channels, samples)` buffer.
pub type Ir = Array2<f32>;

/// Upper bound (exclusive) on the channel axis of a valid IR.
pub const MAX_CHANNELS: usize = 10;

/// Assemble an IR from per-channel rows, checking that all rows have the
/// same length.
///
/// Ragged rows mean the adapter mixed up sub-arrays of different items;
/// that is reported as a shape error carrying the accumulated row lengths.
pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Ir> {
    let samples = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != samples) {
        let mut shape: Vec<usize> = vec![rows.len()];
        shape.extend(rows.iter().map(Vec::len));
        return Err(DatasetError::BadShape { shape });
    }

    let channels = rows.len();
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((channels, samples), flat)
        .map_err(|_| DatasetError::BadShape {
            shape: vec![channels, samples],
        })
}

/// Check that `ir` is of shape `(channels, samples)`.
///
/// The buffer is 2-D by construction; what is actually verified is that
/// the channel axis is plausibly a channel axis.
pub fn validate_nonmono(ir: &Ir) -> Result<()> {
    let (channels, samples) = ir.dim();
    if channels >= MAX_CHANNELS {
        return Err(DatasetError::BadShape {
            shape: vec![channels, samples],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_builds_channels_by_samples() {
        let ir = from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(ir.dim(), (2, 3));
        assert_eq!(ir[[1, 2]], 6.0);
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, DatasetError::BadShape { .. }));
    }

    #[test]
    fn validate_accepts_few_channels() {
        let ir = from_rows(vec![vec![0.0; 128]]).unwrap();
        validate_nonmono(&ir).unwrap();
    }

    #[test]
    fn validate_rejects_transposed_buffers() {
        // A (samples, channels) buffer slips past nothing: 128 "channels".
        let ir = Ir::zeros((128, 2));
        let err = validate_nonmono(&ir).unwrap_err();
        assert!(err.to_string().contains("[128, 2]"), "got: {err}");
    }
}
