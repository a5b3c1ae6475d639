//! SOFA spatial-audio containers (netCDF-4, i.e. HDF5 underneath).
//!
//! A SOFA file stores its IRs as a `Data.IR` tensor of shape
//! `(M, R, N)`: measurements x receivers x samples. The probe reads the
//! declared dimension sizes without touching the payload; the decode
//! pulls the whole tensor, which datasets cache per file so the many
//! `(measurement, receiver)` items of one container share a single read.
//!
//! Compiled only with the `sofa` feature (system libhdf5); without it,
//! the operations report the missing backend at first use.

use std::path::Path;

use ndarray::Array3;

use crate::error::Result;

/// Declared dimension sizes of a SOFA container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SofaDims {
    /// Number of measurements (M).
    pub measurements: usize,
    /// Number of receivers (R).
    pub receivers: usize,
    /// Number of samples per IR (N).
    pub samples: usize,
}

#[cfg(feature = "sofa")]
fn ir_dataset(path: &Path) -> Result<hdf5::Dataset> {
    use crate::error::DatasetError;

    let file = hdf5::File::open(path)?;
    file.dataset("Data.IR")
        .map_err(|_| DatasetError::MissingVariable {
            path: path.to_path_buf(),
            variable: "Data.IR".to_string(),
        })
}

/// Probe the `(M, R, N)` dimension sizes without loading the tensor.
#[cfg(feature = "sofa")]
pub fn dims(path: &Path) -> Result<SofaDims> {
    use crate::error::DatasetError;

    let shape = ir_dataset(path)?.shape();
    match shape.as_slice() {
        &[m, r, n] => Ok(SofaDims {
            measurements: m,
            receivers: r,
            samples: n,
        }),
        other => Err(DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: format!("Data.IR has shape {other:?}, expected (M, R, N)"),
        }),
    }
}

/// Load the full `(M, R, N)` IR tensor.
#[cfg(feature = "sofa")]
pub fn load_ir_tensor(path: &Path) -> Result<Array3<f32>> {
    use crate::error::DatasetError;

    let raw = ir_dataset(path)?.read_dyn::<f32>()?;
    raw.into_dimensionality::<ndarray::Ix3>()
        .map_err(|_| DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: "Data.IR is not a rank-3 tensor".into(),
        })
}

#[cfg(not(feature = "sofa"))]
pub fn dims(_path: &Path) -> Result<SofaDims> {
    Err(missing())
}

#[cfg(not(feature = "sofa"))]
pub fn load_ir_tensor(_path: &Path) -> Result<Array3<f32>> {
    Err(missing())
}

#[cfg(not(feature = "sofa"))]
fn missing() -> crate::error::DatasetError {
    crate::error::DatasetError::MissingFeature {
        what: "reading SOFA containers",
        feature: "sofa",
    }
}
