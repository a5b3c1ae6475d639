//! Raw binary sample dumps: headerless single-channel streams.
//!
//! The dataset declares the element encoding and a fixed sample rate;
//! the sample count falls out of the file size. A size that does not
//! divide evenly by the element width means a truncated or corrupt file
//! and is a hard error, never a silently rounded count.

use std::fs;
use std::path::Path;

use crate::error::{DatasetError, Result};
use crate::shape::{self, Ir};

/// Sample element encoding of a raw dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    /// 32-bit little-endian IEEE float.
    F32Le,
    /// 16-bit little-endian signed integer, scaled to [-1, 1).
    I16Le,
}

impl Element {
    /// Byte width of one sample.
    pub fn width(self) -> u64 {
        match self {
            Self::F32Le => 4,
            Self::I16Le => 2,
        }
    }
}

/// Sample count of a dump, from its file size alone.
pub fn probe(path: &Path, element: Element) -> Result<usize> {
    let size = fs::metadata(path)
        .map_err(|e| DatasetError::io(path, e))?
        .len();
    let width = element.width();
    if size % width != 0 {
        return Err(DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: format!("size {size} is not a multiple of the element width {width}"),
        });
    }
    Ok((size / width) as usize)
}

/// Decode the whole dump to a `(1, samples)` buffer.
pub fn decode(path: &Path, element: Element) -> Result<Ir> {
    let bytes = fs::read(path).map_err(|e| DatasetError::io(path, e))?;
    let width = element.width() as usize;
    if bytes.len() % width != 0 {
        return Err(DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: format!(
                "size {} is not a multiple of the element width {width}",
                bytes.len()
            ),
        });
    }

    let samples: Vec<f32> = match element {
        Element::F32Le => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        Element::I16Le => bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
            .collect(),
    };

    shape::from_rows(vec![samples])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn probe_divides_exactly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ir.raw");
        fs::write(&path, vec![0u8; 4000]).unwrap();
        assert_eq!(probe(&path, Element::F32Le).unwrap(), 1000);
    }

    #[test]
    fn uneven_size_is_malformed_not_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ir.raw");
        fs::write(&path, vec![0u8; 4001]).unwrap();
        assert!(matches!(
            probe(&path, Element::F32Le).unwrap_err(),
            DatasetError::Malformed { .. }
        ));
        assert!(decode(&path, Element::F32Le).is_err());
    }

    #[test]
    fn decode_reads_little_endian_floats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ir.raw");
        let mut bytes = Vec::new();
        for v in [0.0f32, 0.5, -0.25] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        fs::write(&path, bytes).unwrap();

        let ir = decode(&path, Element::F32Le).unwrap();
        assert_eq!(ir.dim(), (1, 3));
        assert_eq!(ir[[0, 1]], 0.5);
        assert_eq!(ir[[0, 2]], -0.25);
    }
}
