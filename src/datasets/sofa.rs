//! Datasets backed by SOFA spatial containers.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use ndarray::{s, Array3};
use once_cell::unsync::OnceCell;

use crate::cache::{CachedDecodes, DecodeCache};
use crate::dataset::{DatasetInfo, IrDataset, IrRecord, ItemName};
use crate::error::{DatasetError, Result};
use crate::files::FileSet;
use crate::formats::sofa;
use crate::shape::{self, Ir};

// ---------------------------------------------------------------------------
// IoSR real rooms: one mono item per (measurement, receiver)
// ---------------------------------------------------------------------------

/// IoSR BRIRs measured in real rooms.
///
/// Every `(measurement, receiver)` cell of the `(M, R, N)` tensor is one
/// mono item; the tensor is loaded once per file and shared through the
/// decode cache.
pub struct IosrRealRoomsDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
    cache: DecodeCache<PathBuf, Array3<f32>>,
}

impl IosrRealRoomsDataset {
    const SAMPLE_RATE: u32 = 48_000;

    /// IoSR real-rooms dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let info = DatasetInfo {
            name: "IoSR RealRoomBRIRs",
            url: Some("https://github.com/IoSR-Surrey/RealRoomBRIRs"),
            license: Some("MIT"),
        };
        let files = FileSet::new(info.name, root, &["**/*_48k.sofa"], &[]);
        Self {
            info,
            files,
            index: OnceCell::new(),
            cache: DecodeCache::new(),
        }
    }

    fn tensor(&self, path: &Path) -> Result<Rc<Array3<f32>>> {
        self.cache
            .cached(path.to_path_buf(), || sofa::load_ir_tensor(path))
    }
}

impl IrDataset for IosrRealRoomsDataset {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.index
            .get_or_try_init(|| {
                let mut records = Vec::new();
                for f in self.files.files()? {
                    let dims = sofa::dims(f)?;
                    for m in 0..dims.measurements {
                        for r in 0..dims.receivers {
                            records.push(IrRecord::new(
                                ItemName::Grid(f.clone(), m, r),
                                1,
                                dims.samples,
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
            ItemName::Grid(path, m, r) => {
                let tensor = self.tensor(path)?;
                shape::from_rows(vec![tensor.slice(s![*m, *r, ..]).to_vec()])
            }
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }
}

impl CachedDecodes for IosrRealRoomsDataset {
    fn cached_decodes(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// IoSR listening rooms: receivers as channels
// ---------------------------------------------------------------------------

/// IoSR listening-room BRIRs: one item per measurement, with the
/// receiver axis exposed as channels.
pub struct IosrListeningRoomsDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
    cache: DecodeCache<PathBuf, Array3<f32>>,
}

impl IosrListeningRoomsDataset {
    const SAMPLE_RATE: u32 = 48_000;

    /// IoSR listening-rooms dataset rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let info = DatasetInfo {
            name: "IoSR ListeningRoom BRIRs",
            url: Some("https://github.com/IoSR-Surrey/ListeningRoomBRIRs"),
            license: Some("MIT"),
        };
        let files = FileSet::new(info.name, root, &["IoSR_ListeningRoom_BRIRs.sofa"], &[]);
        Self {
            info,
            files,
            index: OnceCell::new(),
            cache: DecodeCache::new(),
        }
    }

    fn tensor(&self, path: &Path) -> Result<Rc<Array3<f32>>> {
        self.cache
            .cached(path.to_path_buf(), || sofa::load_ir_tensor(path))
    }
}

impl IrDataset for IosrListeningRoomsDataset {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.index
            .get_or_try_init(|| {
                let mut records = Vec::new();
                for f in self.files.files()? {
                    let dims = sofa::dims(f)?;
                    for m in 0..dims.measurements {
                        records.push(IrRecord::new(
                            ItemName::Indexed(f.clone(), m),
                            dims.receivers,
                            dims.samples,
                            Self::SAMPLE_RATE,
                        ));
                    }
                }
                Ok(records)
            })
            .map(Vec::as_slice)
    }

    fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
        match name {
            ItemName::Indexed(path, m) => {
                let tensor = self.tensor(path)?;
                Ok(tensor.slice(s![*m, .., ..]).to_owned())
            }
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }
}

impl CachedDecodes for IosrListeningRoomsDataset {
    fn cached_decodes(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "sofa"))]
    #[test]
    fn index_build_reports_the_missing_backend() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("room_48k.sofa"), b"").unwrap();

        let ds = IosrRealRoomsDataset::new(dir.path());
        assert!(matches!(
            ds.list_irs().unwrap_err(),
            DatasetError::MissingFeature { feature: "sofa", .. }
        ));
    }

    #[cfg(feature = "sofa")]
    mod with_backend {
        use super::*;

        fn write_sofa(path: &Path, m: usize, r: usize, n: usize) {
            let file = hdf5::File::create(path).unwrap();
            let tensor = Array3::<f32>::from_shape_fn((m, r, n), |(i, j, k)| {
                (i * 10000 + j * 1000 + k) as f32
            });
            file.new_dataset_builder()
                .with_data(&tensor)
                .create("Data.IR")
                .unwrap();
        }

        #[test]
        fn one_item_per_measurement_receiver_cell() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("room_48k.sofa");
            write_sofa(&path, 3, 2, 64);

            let ds = IosrRealRoomsDataset::new(dir.path());
            assert_eq!(ds.len().unwrap(), 6);

            let ir = ds.get_ir(&ItemName::Grid(path, 2, 1)).unwrap();
            assert_eq!(ir.dim(), (1, 64));
            assert_eq!(ir[[0, 5]], 21005.0);
            // The tensor was read once and shared.
            assert_eq!(ds.cached_decodes(), 1);
        }

        #[test]
        fn receivers_become_channels_in_listening_rooms() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("IoSR_ListeningRoom_BRIRs.sofa");
            write_sofa(&path, 4, 2, 32);

            let ds = IosrListeningRoomsDataset::new(dir.path());
            let recs = ds.list_irs().unwrap();
            assert_eq!(recs.len(), 4);
            assert_eq!(recs[0].channels, 2);

            let ir = ds.get_ir(&ItemName::Indexed(path, 3)).unwrap();
            assert_eq!(ir.dim(), (2, 32));
            assert_eq!(ir[[1, 0]], 31000.0);
        }
    }
}
