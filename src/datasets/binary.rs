//! Datasets backed by raw headerless sample dumps.

use std::path::PathBuf;

use once_cell::unsync::OnceCell;

use crate::dataset::{DatasetInfo, IrDataset, IrRecord, ItemName};
use crate::error::{DatasetError, Result};
use crate::files::FileSet;
use crate::formats::binary::{self, Element};
use crate::shape::Ir;

/// A dataset of headerless single-channel dumps with a declared element
/// encoding and a fixed sample rate.
#[derive(Debug)]
pub struct BinaryArrayDataset {
    info: DatasetInfo,
    files: FileSet,
    element: Element,
    sample_rate: u32,
    index: OnceCell<Vec<IrRecord>>,
}

impl BinaryArrayDataset {
    /// A dataset of dumps matching `include` (minus `exclude`) under
    /// `root`, all encoded as `element` at `sample_rate`.
    pub fn new(
        info: DatasetInfo,
        root: impl Into<PathBuf>,
        include: &[&str],
        exclude: &[&str],
        element: Element,
        sample_rate: u32,
    ) -> Self {
        let files = FileSet::new(info.name, root, include, exclude);
        Self {
            info,
            files,
            element,
            sample_rate,
            index: OnceCell::new(),
        }
    }
}

impl IrDataset for BinaryArrayDataset {
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
                        let samples = binary::probe(f, self.element)?;
                        Ok(IrRecord::new(
                            ItemName::File(f.clone()),
                            1,
                            samples,
                            self.sample_rate,
                        ))
                    })
                    .collect()
            })
            .map(Vec::as_slice)
    }

    fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
        match name {
            ItemName::File(path) => binary::decode(path, self.element),
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// RWCP
// ---------------------------------------------------------------------------

/// RWCP sound scene database: near-field and microphone-array dumps of
/// 32-bit floats at 48 kHz.
///
/// Some of the raw dumps carry very large magnitudes, so every fetched
/// buffer is rescaled to unit peak.
pub struct RwcpDataset(BinaryArrayDataset);

/// RWCP dataset rooted at `root`.
pub fn rwcp(root: impl Into<PathBuf>) -> RwcpDataset {
    let info = DatasetInfo {
        name: "RWCP Sound Scene Database",
        url: Some("https://www.openslr.org/13/"),
        license: None,
    };
    RwcpDataset(BinaryArrayDataset::new(
        info,
        root,
        &["near/data/rsp*/*", "micarray/**/imp*.*"],
        &[],
        Element::F32Le,
        48_000,
    ))
}

impl IrDataset for RwcpDataset {
    fn info(&self) -> &DatasetInfo {
        self.0.info()
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.0.list_irs()
    }

    fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
        let mut ir = self.0.fetch_ir(name)?;
        let peak = ir.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
        if peak > 0.0 {
            ir.mapv_inplace(|v| v / peak);
        }
        Ok(ir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_f32le(path: &std::path::Path, values: &[f32]) {
        let mut bytes = Vec::new();
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn sample_counts_come_from_file_sizes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.raw"), vec![0u8; 4000]).unwrap();
        fs::write(dir.path().join("b.raw"), vec![0u8; 8]).unwrap();

        let ds = BinaryArrayDataset::new(
            DatasetInfo::named("raw dumps"),
            dir.path(),
            &["*.raw"],
            &[],
            Element::F32Le,
            16_000,
        );
        let recs = ds.list_irs().unwrap();
        assert_eq!(recs[0].samples, 1000);
        assert_eq!(recs[1].samples, 2);
        assert_eq!(recs[0].channels, 1);
        assert_eq!(recs[0].sample_rate, 16_000);
    }

    #[test]
    fn truncated_dump_fails_the_index_build() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.raw"), vec![0u8; 4001]).unwrap();

        let ds = BinaryArrayDataset::new(
            DatasetInfo::named("raw dumps"),
            dir.path(),
            &["*.raw"],
            &[],
            Element::F32Le,
            16_000,
        );
        assert!(matches!(
            ds.list_irs().unwrap_err(),
            DatasetError::Malformed { .. }
        ));
    }

    #[test]
    fn rwcp_rescales_to_unit_peak() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("near/data/rsp01")).unwrap();
        let path = dir.path().join("near/data/rsp01/ir01");
        write_f32le(&path, &[2.0, -8.0, 4.0]);

        let ds = rwcp(dir.path());
        assert_eq!(ds.len().unwrap(), 1);

        let ir = ds.get_ir(&ItemName::File(path)).unwrap();
        assert_eq!(ir[[0, 0]], 0.25);
        assert_eq!(ir[[0, 1]], -1.0);
        assert_eq!(ir[[0, 2]], 0.5);
    }

    #[test]
    fn rwcp_leaves_silence_alone() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("near/data/rsp01")).unwrap();
        let path = dir.path().join("near/data/rsp01/ir01");
        write_f32le(&path, &[0.0, 0.0]);

        let ds = rwcp(dir.path());
        let ir = ds.get_ir(&ItemName::File(path)).unwrap();
        assert_eq!(ir[[0, 0]], 0.0);
    }
}
