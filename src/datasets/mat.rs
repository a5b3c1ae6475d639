//! Datasets backed by MATLAB v5 array containers.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::cache::{CachedDecodes, DecodeCache};
use crate::dataset::{DatasetInfo, IrDataset, IrItem, IrItems, IrRecord, ItemName};
use crate::error::{DatasetError, Result};
use crate::files::FileSet;
use crate::formats::{audio, mat};
use crate::shape::{self, Ir};

fn column_ir(path: &Path, matrix: &mat::MatMatrix, index: usize) -> Result<Ir> {
    let col = matrix.col(index).ok_or_else(|| DatasetError::Malformed {
        path: path.to_path_buf(),
        reason: format!(
            "column {index} out of range for {:?} matrix",
            matrix.dims()
        ),
    })?;
    shape::from_rows(vec![col.to_vec()])
}

// ---------------------------------------------------------------------------
// AIR: Aachen impulse response database
// ---------------------------------------------------------------------------

/// Aachen Impulse Response database: each `.mat` file holds one
/// `(channels, samples)` array named `h_air`.
pub struct AirDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
    cache: DecodeCache<PathBuf, mat::MatMatrix>,
}

impl AirDataset {
    const VAR: &'static str = "h_air";
    const SAMPLE_RATE: u32 = 48_000;

    /// AIR dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let info = DatasetInfo {
            name: "Aachen Impulse Response (AIR) database",
            url: Some("https://www.iks.rwth-aachen.de/en/research/tools-downloads/databases/aachen-impulse-response-database/"),
            license: None,
        };
        let files = FileSet::new(info.name, root, &["**/*.mat"], &[]);
        Self {
            info,
            files,
            index: OnceCell::new(),
            cache: DecodeCache::new(),
        }
    }

    fn matrix(&self, path: &Path) -> Result<Rc<mat::MatMatrix>> {
        self.cache
            .cached(path.to_path_buf(), || mat::load_matrix(path, Self::VAR))
    }
}

impl IrDataset for AirDataset {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.index
            .get_or_try_init(|| {
                self.files
                    .files()?
                    .iter()
                    .map(|f| {
                        let (channels, samples) = self.matrix(f)?.dims();
                        Ok(IrRecord::new(
                            ItemName::File(f.clone()),
                            channels,
                            samples,
                            Self::SAMPLE_RATE,
                        ))
                    })
                    .collect()
            })
            .map(Vec::as_slice)
    }

    fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
        match name {
            ItemName::File(path) => self.matrix(path)?.to_ir(),
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }
}

impl CachedDecodes for AirDataset {
    fn cached_decodes(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// 360° FOA/BRIR database: MAT matrices plus loose WAV files
// ---------------------------------------------------------------------------

/// 360° binaural room impulse response database for 6DOF research.
///
/// Mixes two container layouts: `.mat` files with stereo pairs packed as
/// `IR_L`/`IR_R` matrices of shape `(samples, n_irs)`, and plain WAV
/// files. Matrix items are addressed `(path, column)`.
pub struct FoaIrDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
    cache: DecodeCache<(PathBuf, &'static str), mat::MatMatrix>,
}

impl FoaIrDataset {
    const LEFT: &'static str = "IR_L";
    const RIGHT: &'static str = "IR_R";
    const SAMPLE_RATE: u32 = 48_000;

    /// FOA-IR dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let info = DatasetInfo {
            name: "360° Binaural Room Impulse Response (BRIR) Database for 6DOF spatial perception research",
            url: Some("https://zenodo.org/record/2641166"),
            license: Some("CC-BY-4.0"),
        };
        let files = FileSet::new(info.name, root, &["**/*.mat", "**/*.wav"], &[]);
        Self {
            info,
            files,
            index: OnceCell::new(),
            cache: DecodeCache::new(),
        }
    }

    fn matrix(&self, path: &Path, var: &'static str) -> Result<Rc<mat::MatMatrix>> {
        self.cache
            .cached((path.to_path_buf(), var), || mat::load_matrix(path, var))
    }

    fn is_mat(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("mat")
    }
}

impl IrDataset for FoaIrDataset {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.index
            .get_or_try_init(|| {
                let files = self.files.files()?;
                let mut records = Vec::new();
                // Matrix items first, then the loose WAV files.
                for f in files.iter().filter(|f| Self::is_mat(f)) {
                    let (samples, n_irs) = self.matrix(f, Self::LEFT)?.dims();
                    for i in 0..n_irs {
                        records.push(IrRecord::new(
                            ItemName::Indexed(f.clone(), i),
                            2,
                            samples,
                            Self::SAMPLE_RATE,
                        ));
                    }
                }
                for f in files.iter().filter(|f| !Self::is_mat(f)) {
                    let meta = audio::probe(f)?;
                    records.push(IrRecord::new(
                        ItemName::File(f.clone()),
                        meta.channels,
                        meta.frames,
                        meta.sample_rate,
                    ));
                }
                Ok(records)
            })
            .map(Vec::as_slice)
    }

    fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
        match name {
            ItemName::Indexed(path, i) => {
                let left = self.matrix(path, Self::LEFT)?;
                let right = self.matrix(path, Self::RIGHT)?;
                let l = left.col(*i).ok_or_else(|| DatasetError::Malformed {
                    path: path.clone(),
                    reason: format!("column {i} out of range in {}", Self::LEFT),
                })?;
                let r = right.col(*i).ok_or_else(|| DatasetError::Malformed {
                    path: path.clone(),
                    reason: format!("column {i} out of range in {}", Self::RIGHT),
                })?;
                shape::from_rows(vec![l.to_vec(), r.to_vec()])
            }
            ItemName::File(path) => audio::decode(path),
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }
}

impl CachedDecodes for FoaIrDataset {
    fn cached_decodes(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// MIRD: multichannel impulse response database
// ---------------------------------------------------------------------------

/// Multichannel Impulse Response Database: each `.mat` file packs eight
/// mono IRs as the columns of one `impulse_response` matrix.
pub struct MirdDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
    cache: DecodeCache<PathBuf, mat::MatMatrix>,
}

impl MirdDataset {
    const VAR: &'static str = "impulse_response";
    const N_IRS: usize = 8;
    const SAMPLES: usize = 480_000;
    const SAMPLE_RATE: u32 = 48_000;

    /// MIRD dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let info = DatasetInfo {
            name: "Multichannel Impulse Response Database (MIRD)",
            url: Some("https://www.iks.rwth-aachen.de/en/research/tools-downloads/databases/multi-channel-impulse-response-database/"),
            license: None,
        };
        let files = FileSet::new(info.name, root, &["**/*.mat"], &[]);
        Self {
            info,
            files,
            index: OnceCell::new(),
            cache: DecodeCache::new(),
        }
    }

    fn matrix(&self, path: &Path) -> Result<Rc<mat::MatMatrix>> {
        self.cache
            .cached(path.to_path_buf(), || mat::load_matrix(path, Self::VAR))
    }
}

impl IrDataset for MirdDataset {
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
                        (0..Self::N_IRS).map(|i| {
                            IrRecord::new(
                                ItemName::Indexed(f.clone(), i),
                                1,
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
            ItemName::Indexed(path, i) => column_ir(path, &*self.matrix(path)?, *i),
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }

    /// Batched enumeration: decode each container once, yield its eight
    /// columns in index order.
    fn get_all(&self) -> Result<IrItems<'_>> {
        let files = self.files.files()?.to_vec();
        Ok(Box::new(files.into_iter().flat_map(move |f| {
            let items: Vec<Result<IrItem>> = match self.matrix(&f) {
                Ok(matrix) => (0..Self::N_IRS)
                    .map(|i| {
                        let ir = column_ir(&f, &matrix, i)?;
                        shape::validate_nonmono(&ir)?;
                        Ok((ItemName::Indexed(f.clone(), i), Self::SAMPLE_RATE, ir))
                    })
                    .collect(),
                Err(e) => vec![Err(e)],
            };
            items
        })))
    }
}

impl CachedDecodes for MirdDataset {
    fn cached_decodes(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// Bell Labs varechoic chamber
// ---------------------------------------------------------------------------

/// Bell Labs varechoic chamber IRs: three `.mat` files, four mono IRs
/// each, packed as matrix columns under a per-file variable name.
pub struct BellVarechoicDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
    cache: DecodeCache<PathBuf, mat::MatMatrix>,
}

impl BellVarechoicDataset {
    // Published panel-opening order: 0%, 43%, 100%.
    const FILES: [&'static str; 3] = ["IR_00.mat", "IR_43.mat", "IR_100.mat"];
    const N_IRS: usize = 4;
    const SAMPLES: usize = 8_192;
    const SAMPLE_RATE: u32 = 10_000;

    /// Varechoic chamber dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let info = DatasetInfo::named("Bell Labs varechoic chamber IRs");
        let files = FileSet::new(info.name, root, &Self::FILES, &[]);
        Self {
            info,
            files,
            index: OnceCell::new(),
            cache: DecodeCache::new(),
        }
    }

    /// Enumerated files in the declared panel order, not the file set's
    /// lexicographic order (which would put IR_100 before IR_43).
    fn ordered_files(&self) -> Result<Vec<&PathBuf>> {
        let files = self.files.files()?;
        Ok(Self::FILES
            .iter()
            .filter_map(|name| {
                files
                    .iter()
                    .find(|f| f.file_name().and_then(|n| n.to_str()) == Some(*name))
            })
            .collect())
    }

    fn matrix(&self, path: &Path) -> Result<Rc<mat::MatMatrix>> {
        self.cache
            .cached(path.to_path_buf(), || mat::load_first_matrix(path))
    }
}

impl IrDataset for BellVarechoicDataset {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.index
            .get_or_try_init(|| {
                let files = self.ordered_files()?;
                // Column-major over the whole set: column 0 of every
                // panel configuration, then column 1, and so on.
                Ok((0..Self::N_IRS)
                    .flat_map(|i| {
                        files.iter().map(move |f| {
                            IrRecord::new(
                                ItemName::Indexed((*f).clone(), i),
                                1,
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
            ItemName::Indexed(path, i) => column_ir(path, &*self.matrix(path)?, *i),
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }
}

impl CachedDecodes for BellVarechoicDataset {
    fn cached_decodes(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::mat::write_mat5;
    use tempfile::tempdir;

    #[test]
    fn air_index_reads_dims_through_one_cached_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("air_booth.mat");
        // (2 channels, 5 samples), column-major.
        write_mat5(
            &path,
            "h_air",
            2,
            5,
            &[1., 6., 2., 7., 3., 8., 4., 9., 5., 10.],
        );

        let ds = AirDataset::new(dir.path());
        let recs = ds.list_irs().unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!((recs[0].channels, recs[0].samples), (2, 5));
        assert_eq!(ds.cached_decodes(), 1);

        let ir = ds.get_ir(&ItemName::File(path)).unwrap();
        assert_eq!(ir.dim(), (2, 5));
        assert_eq!(ir[[1, 0]], 6.0);
        // The decode reused the parse the index was built from.
        assert_eq!(ds.cached_decodes(), 1);
    }

    #[test]
    fn stereo_matrix_columns_become_indexed_items() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foa.mat");
        // Three stereo IRs of 4096 samples packed as (samples, n_irs)
        // matrices IR_L / IR_R.
        let samples = 4096;
        let n_irs = 3;
        let mut left = Vec::new();
        let mut right = Vec::new();
        for c in 0..n_irs {
            left.extend((0..samples).map(|s| (c * samples + s) as f64));
            right.extend((0..samples).map(|s| (c * samples + s) as f64 + 0.5));
        }
        crate::formats::mat::write_mat5_vars(
            &path,
            &[
                ("IR_L", samples, n_irs, &left),
                ("IR_R", samples, n_irs, &right),
            ],
        );

        let ds = FoaIrDataset::new(dir.path());
        let recs = ds.list_irs().unwrap();
        assert_eq!(recs.len(), 3);
        for (i, rec) in recs.iter().enumerate() {
            assert_eq!(rec.name, ItemName::Indexed(path.clone(), i));
            assert_eq!(rec.channels, 2);
            assert_eq!(rec.samples, 4096);
        }

        // The second item is the second column pair.
        let ir = ds.get_ir(&ItemName::Indexed(path, 1)).unwrap();
        assert_eq!(ir.dim(), (2, 4096));
        assert_eq!(ir[[0, 0]], 4096.0);
        assert_eq!(ir[[1, 0]], 4096.5);
    }

    #[test]
    fn mird_columns_resolve_and_enumerate_in_index_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mird.mat");
        let samples = 64;
        let mut data = Vec::new();
        for c in 0..MirdDataset::N_IRS {
            data.extend((0..samples).map(|s| (c * 1000 + s) as f64));
        }
        write_mat5(&path, "impulse_response", samples, MirdDataset::N_IRS, &data);

        let ds = MirdDataset::new(dir.path());
        let recs: Vec<_> = ds.list_irs().unwrap().to_vec();
        assert_eq!(recs.len(), 8);

        // Second column equals the matrix's second column.
        let ir = ds.get_ir(&ItemName::Indexed(path.clone(), 1)).unwrap();
        assert_eq!(ir.dim(), (1, samples));
        assert_eq!(ir[[0, 0]], 1000.0);
        assert_eq!(ir[[0, 63]], 1063.0);

        // Batched enumeration preserves index order and count.
        let all: Vec<_> = ds
            .get_all()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(all.len(), recs.len());
        for (rec, (name, _, _)) in recs.iter().zip(&all) {
            assert_eq!(&rec.name, name);
        }
        // One parse serves the index, the lookup and the enumeration.
        assert_eq!(ds.cached_decodes(), 1);
    }

    #[test]
    fn bell_varechoic_interleaves_columns_across_files() {
        let dir = tempdir().unwrap();
        for (name, base) in [("IR_00.mat", 0.0), ("IR_43.mat", 100.0), ("IR_100.mat", 200.0)] {
            let mut data = Vec::new();
            for c in 0..4 {
                data.extend((0..8).map(|s| base + (c * 10 + s) as f64));
            }
            write_mat5(&dir.path().join(name), "vv", 8, 4, &data);
        }

        let ds = BellVarechoicDataset::new(dir.path());
        let recs = ds.list_irs().unwrap();
        assert_eq!(recs.len(), 12);
        // Column index varies slowest; files follow the declared panel
        // order 0%, 43%, 100%, not lexicographic order.
        assert_eq!(recs[0].name, ItemName::Indexed(dir.path().join("IR_00.mat"), 0));
        assert_eq!(recs[1].name, ItemName::Indexed(dir.path().join("IR_43.mat"), 0));
        assert_eq!(recs[2].name, ItemName::Indexed(dir.path().join("IR_100.mat"), 0));
        assert_eq!(recs[3].name, ItemName::Indexed(dir.path().join("IR_00.mat"), 1));

        let ir = ds
            .get_ir(&ItemName::Indexed(dir.path().join("IR_43.mat"), 2))
            .unwrap();
        assert_eq!(ir[[0, 0]], 120.0);
    }
}
