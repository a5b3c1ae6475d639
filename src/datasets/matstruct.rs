//! Datasets backed by MATLAB v5 struct containers.
//!
//! Both collections publish fixed, documented layouts, so their indexes
//! are pure configuration; only payload reads touch the files, and each
//! container is parsed once per instance through the decode cache.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::cache::{CachedDecodes, DecodeCache};
use crate::dataset::{DatasetInfo, IrDataset, IrItem, IrItems, IrRecord, ItemName};
use crate::error::{DatasetError, Result};
use crate::files::FileSet;
use crate::formats::mat::MatMatrix;
use crate::formats::matstruct::{self, MatValue};
use crate::shape::{self, Ir};

// ---------------------------------------------------------------------------
// KEMAR surround BRIRs
// ---------------------------------------------------------------------------

/// KEMAR dummy-head surround BRIRs: each `.mat` file holds a `brirData`
/// struct whose `impulseResponse` cell pairs a position label with a
/// `(96000, 2)` array per surround speaker.
pub struct KemarDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
    cache: DecodeCache<PathBuf, MatValue>,
}

impl KemarDataset {
    const STRUCT: &'static str = "brirData";
    const PAIRS: &'static str = "impulseResponse";
    const POSITIONS: [&'static str; 6] = ["L", "LS", "R", "RS", "C", "S"];
    const SAMPLES: usize = 96_000;
    const SAMPLE_RATE: u32 = 48_000;

    /// KEMAR dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let info = DatasetInfo::named("KEMAR surround BRIRs");
        let files = FileSet::new(info.name, root, &["**/*.mat"], &[]);
        Self {
            info,
            files,
            index: OnceCell::new(),
            cache: DecodeCache::new(),
        }
    }

    fn container(&self, path: &Path) -> Result<Rc<MatValue>> {
        self.cache.cached(path.to_path_buf(), || {
            matstruct::load_variable(path, Self::STRUCT)
        })
    }

    /// The `(label, ir)` rows of a container's `impulseResponse` cell.
    fn pairs<'v>(path: &Path, value: &'v MatValue) -> Result<Vec<(&'v str, &'v MatMatrix)>> {
        let cell = value
            .field(Self::PAIRS)
            .ok_or_else(|| DatasetError::MissingVariable {
                path: path.to_path_buf(),
                variable: format!("{}.{}", Self::STRUCT, Self::PAIRS),
            })?;
        let rows = cell.cell_rows().ok_or_else(|| DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: format!("{} is not a cell array", Self::PAIRS),
        })?;
        (0..rows)
            .map(|r| {
                let label = cell.cell(r, 0).and_then(MatValue::as_text);
                let ir = cell.cell(r, 1).and_then(MatValue::as_matrix);
                label.zip(ir).ok_or_else(|| DatasetError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!("{} row {r} is not a (label, array) pair", Self::PAIRS),
                })
            })
            .collect()
    }

    /// Resolve one position label; the array is stored `(samples, 2)`.
    fn position_ir(path: &Path, value: &MatValue, position: &str) -> Result<Ir> {
        let ir = Self::pairs(path, value)?
            .into_iter()
            .find(|(label, _)| *label == position)
            .map(|(_, m)| m.to_ir())
            .ok_or_else(|| DatasetError::MissingVariable {
                path: path.to_path_buf(),
                variable: format!("{}[{position}]", Self::PAIRS),
            })??;
        Ok(ir.reversed_axes())
    }
}

impl IrDataset for KemarDataset {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.index
            .get_or_try_init(|| {
                Ok(self
                    .files
                    .files()?
                    .iter()
                    .flat_map(|f| {
                        Self::POSITIONS.iter().map(|p| {
                            IrRecord::new(
                                ItemName::Labeled(f.clone(), (*p).to_string()),
                                2,
                                Self::SAMPLES,
                                Self::SAMPLE_RATE,
                            )
                        })
                    })
                    .collect())
            })
            .map(Vec::as_slice)
    }

    fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
        match name {
            ItemName::Labeled(path, position) => {
                let value = self.container(path)?;
                Self::position_ir(path, &value, position)
            }
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }

    /// Batched enumeration: one parse per container, positions in index
    /// order.
    fn get_all(&self) -> Result<IrItems<'_>> {
        let files = self.files.files()?.to_vec();
        Ok(Box::new(files.into_iter().flat_map(move |f| {
            let items: Vec<Result<IrItem>> = match self.container(&f) {
                Ok(value) => Self::POSITIONS
                    .iter()
                    .map(|p| {
                        let ir = Self::position_ir(&f, &value, p)?;
                        shape::validate_nonmono(&ir)?;
                        Ok((
                            ItemName::Labeled(f.clone(), (*p).to_string()),
                            Self::SAMPLE_RATE,
                            ir,
                        ))
                    })
                    .collect(),
                Err(e) => vec![Err(e)],
            };
            items
        })))
    }
}

impl CachedDecodes for KemarDataset {
    fn cached_decodes(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// TU Ilmenau in-ear / behind-the-ear BRIRs
// ---------------------------------------------------------------------------

/// TU Ilmenau BRIRs recorded in-ear and behind-the-ear in three rooms.
///
/// Three fixed container files, each holding a single struct (named after
/// the file) with `inear` and `btear` sub-structs whose `left`/`right`
/// arrays pack 32 directions as rows.
pub struct TuiInEarBehindEarDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
    cache: DecodeCache<PathBuf, MatValue>,
}

impl TuiInEarBehindEarDataset {
    const EAR_TYPES: [&'static str; 2] = ["inear", "btear"];
    const N_DIRECTIONS: usize = 32;
    const SAMPLE_RATE: u32 = 44_100;

    /// TU Ilmenau dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let info = DatasetInfo::named("TU Ilmenau in-ear and behind-the-ear BRIRs");
        let files = FileSet::new(
            info.name,
            root,
            &["lab_brirs.mat", "reha_brirs.mat", "tvstudio_brirs.mat"],
            &[],
        );
        Self {
            info,
            files,
            index: OnceCell::new(),
            cache: DecodeCache::new(),
        }
    }

    /// Per-room IR length: the lab and TV studio rooms are stored at
    /// half a second, the rehabilitation room at a full second.
    fn samples_for(path: &Path) -> Result<usize> {
        match path.file_stem().and_then(|s| s.to_str()) {
            Some("lab_brirs") | Some("tvstudio_brirs") => Ok(22_050),
            Some("reha_brirs") => Ok(44_100),
            _ => Err(DatasetError::Malformed {
                path: path.to_path_buf(),
                reason: "unexpected container name".into(),
            }),
        }
    }

    fn container(&self, path: &Path) -> Result<Rc<MatValue>> {
        // Each file holds exactly one struct, named after the room.
        self.cache
            .cached(path.to_path_buf(), || matstruct::load_first(path))
    }

    fn ear<'v>(
        path: &Path,
        value: &'v MatValue,
        ear: &str,
    ) -> Result<(&'v MatMatrix, &'v MatMatrix)> {
        let sub = value.field(ear).ok_or_else(|| DatasetError::MissingVariable {
            path: path.to_path_buf(),
            variable: ear.to_string(),
        })?;
        let side = |name: &str| {
            sub.field(name)
                .and_then(MatValue::as_matrix)
                .ok_or_else(|| DatasetError::MissingVariable {
                    path: path.to_path_buf(),
                    variable: format!("{ear}.{name}"),
                })
        };
        Ok((side("left")?, side("right")?))
    }

    fn direction(path: &Path, left: &MatMatrix, right: &MatMatrix, index: usize) -> Result<Ir> {
        let l = left.row(index);
        let r = right.row(index);
        let (l, r) = l.zip(r).ok_or_else(|| DatasetError::Malformed {
            path: path.to_path_buf(),
            reason: format!("direction {index} out of range"),
        })?;
        shape::from_rows(vec![l, r])
    }
}

impl IrDataset for TuiInEarBehindEarDataset {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.index
            .get_or_try_init(|| {
                let mut records = Vec::new();
                for f in self.files.files()? {
                    let samples = Self::samples_for(f)?;
                    for ear in Self::EAR_TYPES {
                        for i in 0..Self::N_DIRECTIONS {
                            records.push(IrRecord::new(
                                ItemName::LabeledIndexed(f.clone(), ear.to_string(), i),
                                2,
                                samples,
                                Self::SAMPLE_RATE,
                            ));
                        }
                    }
                }
                Ok(records)
            })
            .map(Vec::as_slice)
    }

    fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
        match name {
            ItemName::LabeledIndexed(path, ear, i) => {
                let value = self.container(path)?;
                let (left, right) = Self::ear(path, &value, ear)?;
                Self::direction(path, left, right, *i)
            }
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }

    /// Batched enumeration: parse each container once and yield both
    /// ears' 32 directions, in index order.
    fn get_all(&self) -> Result<IrItems<'_>> {
        let files = self.files.files()?.to_vec();
        Ok(Box::new(files.into_iter().flat_map(move |f| {
            let mut items: Vec<Result<IrItem>> = Vec::new();
            match self.container(&f) {
                Ok(value) => {
                    for ear in Self::EAR_TYPES {
                        match Self::ear(&f, &value, ear) {
                            Ok((left, right)) => {
                                for i in 0..Self::N_DIRECTIONS {
                                    items.push(Self::direction(&f, left, right, i).and_then(
                                        |ir| {
                                            shape::validate_nonmono(&ir)?;
                                            Ok((
                                                ItemName::LabeledIndexed(
                                                    f.clone(),
                                                    ear.to_string(),
                                                    i,
                                                ),
                                                Self::SAMPLE_RATE,
                                                ir,
                                            ))
                                        },
                                    ));
                                }
                            }
                            Err(e) => items.push(Err(e)),
                        }
                    }
                }
                Err(e) => items.push(Err(e)),
            }
            items
        })))
    }
}

impl CachedDecodes for TuiInEarBehindEarDataset {
    fn cached_decodes(&self) -> usize {
        self.cache.len()
    }
}
