//! MATLAB v5 array containers (`.mat` files holding numeric arrays).
//!
//! The `matfile` parser has no dimensions-only probe, so "cheap metadata"
//! for these files is a full parse. Datasets route every load through
//! their [`DecodeCache`](crate::cache::DecodeCache), keyed `(path, var)`,
//! so the parse that builds the index is the same one that later serves
//! the payloads.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use matfile::NumericData;

use crate::error::{DatasetError, Result};
use crate::shape::Ir;

/// One 2-D numeric MATLAB variable, in MATLAB's column-major layout.
#[derive(Debug, Clone)]
pub struct MatMatrix {
    rows: usize,
    cols: usize,
    /// Column-major: column `c` occupies `data[c * rows .. (c + 1) * rows]`.
    data: Vec<f32>,
}

impl MatMatrix {
    /// `(rows, cols)` as declared by the file.
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// One column as a contiguous slice.
    pub fn col(&self, index: usize) -> Option<&[f32]> {
        if index >= self.cols {
            return None;
        }
        Some(&self.data[index * self.rows..(index + 1) * self.rows])
    }

    /// One row, gathered across the column-major storage.
    pub fn row(&self, index: usize) -> Option<Vec<f32>> {
        if index >= self.rows {
            return None;
        }
        Some((0..self.cols).map(|c| self.data[c * self.rows + index]).collect())
    }

    /// The whole matrix as a `(rows, cols)` IR, rows being channels.
    pub fn to_ir(&self) -> Result<Ir> {
        // Column-major (rows, cols) is row-major (cols, rows); transpose back.
        ndarray::Array2::from_shape_vec((self.cols, self.rows), self.data.clone())
            .map(ndarray::Array2::reversed_axes)
            .map_err(|_| DatasetError::BadShape {
                shape: vec![self.rows, self.cols],
            })
    }

    pub(crate) fn from_parts(rows: usize, cols: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == rows * cols).then(|| Self { rows, cols, data })
    }
}

fn to_f32(data: &NumericData) -> Vec<f32> {
    match data {
        NumericData::Double { real, .. } => real.iter().map(|&v| v as f32).collect(),
        NumericData::Single { real, .. } => real.clone(),
        NumericData::Int8 { real, .. } => real.iter().map(|&v| f32::from(v)).collect(),
        NumericData::UInt8 { real, .. } => real.iter().map(|&v| f32::from(v)).collect(),
        NumericData::Int16 { real, .. } => real.iter().map(|&v| f32::from(v)).collect(),
        NumericData::UInt16 { real, .. } => real.iter().map(|&v| f32::from(v)).collect(),
        NumericData::Int32 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        NumericData::UInt32 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        NumericData::Int64 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        NumericData::UInt64 { real, .. } => real.iter().map(|&v| v as f32).collect(),
    }
}

fn convert(path: &Path, array: &matfile::Array) -> Result<MatMatrix> {
    let size = array.size();
    if size.len() != 2 {
        return Err(DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: format!("variable '{}' has dimensions {size:?}, expected 2", array.name()),
        });
    }
    let data = to_f32(array.data());
    if data.len() != size[0] * size[1] {
        return Err(DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: format!(
                "variable '{}' declares {:?} but holds {} values",
                array.name(),
                size,
                data.len()
            ),
        });
    }
    Ok(MatMatrix {
        rows: size[0],
        cols: size[1],
        data,
    })
}

fn parse(path: &Path) -> Result<matfile::MatFile> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    matfile::MatFile::parse(BufReader::new(file)).map_err(|e| DatasetError::Malformed {
        path: path.to_path_buf(),
        reason: format!("{e:?}"),
    })
}

/// Load one named 2-D variable from a `.mat` file.
pub fn load_matrix(path: &Path, var: &str) -> Result<MatMatrix> {
    let mat = parse(path)?;
    let array = mat
        .find_by_name(var)
        .ok_or_else(|| DatasetError::MissingVariable {
            path: path.to_path_buf(),
            variable: var.to_string(),
        })?;
    convert(path, array)
}

/// Load the first variable of a `.mat` file, whatever its name.
///
/// Some containers store their single matrix under a per-file name.
pub fn load_first_matrix(path: &Path) -> Result<MatMatrix> {
    let mat = parse(path)?;
    let array = mat
        .arrays()
        .first()
        .ok_or_else(|| DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: "file contains no numeric arrays".into(),
        })?;
    convert(path, array)
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

/// Write a minimal MAT-File 5 container holding `f64` matrices.
///
/// Header (128 bytes), then one miMATRIX element per variable with array
/// flags, dimensions, name and miDOUBLE data sub-elements, all 8-byte
/// aligned. `vars` entries are `(name, rows, cols, column_major_data)`.
#[cfg(test)]
pub(crate) fn write_mat5_vars(path: &Path, vars: &[(&str, usize, usize, &[f64])]) {
    fn element(tag: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + payload.len() + 7);
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        while out.len() % 8 != 0 {
            out.push(0);
        }
        out
    }

    let mut out = Vec::new();
    let mut header = [0u8; 128];
    let text = b"MATLAB 5.0 MAT-file, written by realrirs tests";
    header[..text.len()].copy_from_slice(text);
    // Pad the description with spaces as MATLAB does.
    for b in header[text.len()..116].iter_mut() {
        *b = b' ';
    }
    header[124] = 0x00;
    header[125] = 0x01; // version 0x0100
    header[126] = b'I';
    header[127] = b'M';
    out.extend_from_slice(&header);

    for &(var, rows, cols, col_major) in vars {
        assert_eq!(col_major.len(), rows * cols);

        // Array flags: class mxDOUBLE_CLASS (6), no complex/global/logical.
        let flags = element(6, &{
            let mut f = Vec::new();
            f.extend_from_slice(&6u32.to_le_bytes());
            f.extend_from_slice(&0u32.to_le_bytes());
            f
        });
        let dims = element(5, &{
            let mut d = Vec::new();
            d.extend_from_slice(&(rows as i32).to_le_bytes());
            d.extend_from_slice(&(cols as i32).to_le_bytes());
            d
        });
        let name = element(1, var.as_bytes());
        let data = element(9, &{
            let mut d = Vec::new();
            for v in col_major {
                d.extend_from_slice(&v.to_le_bytes());
            }
            d
        });

        let mut matrix_payload = Vec::new();
        matrix_payload.extend_from_slice(&flags);
        matrix_payload.extend_from_slice(&dims);
        matrix_payload.extend_from_slice(&name);
        matrix_payload.extend_from_slice(&data);

        out.extend_from_slice(&14u32.to_le_bytes()); // miMATRIX
        out.extend_from_slice(&(matrix_payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&matrix_payload);
    }

    std::fs::write(path, out).unwrap();
}

/// Single-variable convenience over [`write_mat5_vars`].
#[cfg(test)]
pub(crate) fn write_mat5(path: &Path, var: &str, rows: usize, cols: usize, col_major: &[f64]) {
    write_mat5_vars(path, &[(var, rows, cols, col_major)]);
}
