//! The IR dataset contract: the uniform interface every adapter implements.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::shape::{self, Ir};

// ---------------------------------------------------------------------------
// Item names
// ---------------------------------------------------------------------------

/// The key addressing one IR within a dataset.
///
/// A plain file path for one-IR-per-file datasets; a composite when the
/// underlying container packs several IRs into one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemName {
    /// One IR per file.
    File(PathBuf),
    /// The n-th IR in a multi-IR container (e.g. a matrix column).
    Indexed(PathBuf, usize),
    /// One (measurement, receiver) cell of a spatial container.
    Grid(PathBuf, usize, usize),
    /// A labeled sub-array of a struct container.
    Labeled(PathBuf, String),
    /// A labeled, indexed sub-array of a struct container.
    LabeledIndexed(PathBuf, String, usize),
}

impl ItemName {
    /// The file the item lives in.
    pub fn path(&self) -> &Path {
        match self {
            Self::File(p)
            | Self::Indexed(p, _)
            | Self::Grid(p, _, _)
            | Self::Labeled(p, _)
            | Self::LabeledIndexed(p, _, _) => p,
        }
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Indexed(p, i) => write!(f, "{}[{i}]", p.display()),
            Self::Grid(p, m, r) => write!(f, "{}[{m}, {r}]", p.display()),
            Self::Labeled(p, l) => write!(f, "{}[{l}]", p.display()),
            Self::LabeledIndexed(p, l, i) => write!(f, "{}[{l}, {i}]", p.display()),
        }
    }
}

impl From<PathBuf> for ItemName {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ItemName {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// Index records and catalog info
// ---------------------------------------------------------------------------

/// One entry of a dataset's index: an addressable item plus its cheap
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrRecord {
    /// The item's name.
    pub name: ItemName,
    /// Number of audio channels.
    pub channels: usize,
    /// Number of samples per channel.
    pub samples: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl IrRecord {
    /// Convenience constructor used by index builders.
    pub fn new(name: ItemName, channels: usize, samples: usize, sample_rate: u32) -> Self {
        Self {
            name,
            channels,
            samples,
            sample_rate,
        }
    }
}

/// Descriptive catalog fields attached to a dataset instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    /// Human-readable dataset name.
    pub name: &'static str,
    /// Where to find out more about the dataset.
    pub url: Option<&'static str>,
    /// Copyright notice, authors, license name/URL.
    pub license: Option<&'static str>,
}

impl DatasetInfo {
    /// Info with just a name.
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            url: None,
            license: None,
        }
    }
}

// ---------------------------------------------------------------------------
// The dataset contract
// ---------------------------------------------------------------------------

/// One fully decoded enumeration item: `(name, sample_rate, ir)`.
pub type IrItem = (ItemName, u32, Ir);

/// A lazy full enumeration of a dataset.
pub type IrItems<'a> = Box<dyn Iterator<Item = Result<IrItem>> + 'a>;

/// The uniform contract over all IR datasets.
///
/// Adapters implement [`list_irs`](Self::list_irs) (the index, built once
/// and memoized) and [`fetch_ir`](Self::fetch_ir) (raw decode of one item).
/// Callers use the provided [`get_ir`](Self::get_ir) and
/// [`get_all`](Self::get_all), which add the index-membership check and the
/// `(channels, samples)` shape validation.
///
/// Invariant: the order and count of `list_irs` exactly matches the order
/// and count of `get_all`, including for adapters that override `get_all`
/// with a batched form.
pub trait IrDataset {
    /// Descriptive catalog fields.
    fn info(&self) -> &DatasetInfo;

    /// The index: one metadata record per addressable item, in a fixed
    /// order. Built on first call, then memoized for the instance's
    /// lifetime.
    fn list_irs(&self) -> Result<&[IrRecord]>;

    /// Decode a single indexed item. Implementations may assume the name
    /// came from the index; `get_ir` has already checked membership.
    fn fetch_ir(&self, name: &ItemName) -> Result<Ir>;

    /// Number of IRs in this dataset.
    fn len(&self) -> Result<usize> {
        Ok(self.list_irs()?.len())
    }

    /// Whether the dataset contains no IRs.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.list_irs()?.is_empty())
    }

    /// Resolve one indexed name to a decoded `(channels, samples)` buffer.
    ///
    /// Fails with [`DatasetError::UnknownItem`] for names absent from the
    /// index, and with [`DatasetError::BadShape`] if the adapter returned a
    /// buffer violating the shape convention.
    fn get_ir(&self, name: &ItemName) -> Result<Ir> {
        if !self.list_irs()?.iter().any(|rec| &rec.name == name) {
            return Err(DatasetError::UnknownItem { name: name.clone() });
        }
        let ir = self.fetch_ir(name)?;
        shape::validate_nonmono(&ir)?;
        Ok(ir)
    }

    /// All IRs in index order, decoded lazily.
    ///
    /// The default resolves every index entry through [`get_ir`](Self::get_ir).
    /// Adapters backed by multi-IR containers override this with a batched
    /// form that decodes each container once, preserving index order.
    fn get_all(&self) -> Result<IrItems<'_>> {
        let records = self.list_irs()?.to_vec();
        Ok(Box::new(records.into_iter().map(move |rec| {
            let ir = self.get_ir(&rec.name)?;
            Ok((rec.name, rec.sample_rate, ir))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::unsync::OnceCell;

    /// A two-item in-memory dataset; the second item decodes to a
    /// transposed buffer on purpose.
    struct FakeDataset {
        info: DatasetInfo,
        index: OnceCell<Vec<IrRecord>>,
    }

    impl FakeDataset {
        fn new() -> Self {
            Self {
                info: DatasetInfo::named("fake"),
                index: OnceCell::new(),
            }
        }
    }

    impl IrDataset for FakeDataset {
        fn info(&self) -> &DatasetInfo {
            &self.info
        }

        fn list_irs(&self) -> Result<&[IrRecord]> {
            Ok(self.index.get_or_init(|| {
                vec![
                    IrRecord::new(ItemName::Indexed("f.bin".into(), 0), 1, 64, 48000),
                    IrRecord::new(ItemName::Indexed("f.bin".into(), 1), 1, 64, 48000),
                ]
            }))
        }

        fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
            match name {
                ItemName::Indexed(_, 0) => Ok(Ir::zeros((1, 64))),
                _ => Ok(Ir::zeros((64, 1))), // adapter bug: transposed
            }
        }
    }

    #[test]
    fn len_matches_index_and_enumeration() {
        let ds = FakeDataset::new();
        assert_eq!(ds.len().unwrap(), 2);
        assert_eq!(ds.list_irs().unwrap().len(), 2);
        assert_eq!(ds.get_all().unwrap().count(), 2);
    }

    #[test]
    fn unknown_name_is_a_lookup_error() {
        let ds = FakeDataset::new();
        let missing = ItemName::Indexed("f.bin".into(), 7);
        assert!(matches!(
            ds.get_ir(&missing).unwrap_err(),
            DatasetError::UnknownItem { .. }
        ));
        // State unchanged: the index is still the same two records.
        assert_eq!(ds.len().unwrap(), 2);
    }

    #[test]
    fn shape_violations_surface_instead_of_being_coerced() {
        let ds = FakeDataset::new();
        let good = ItemName::Indexed("f.bin".into(), 0);
        let bad = ItemName::Indexed("f.bin".into(), 1);
        assert!(ds.get_ir(&good).is_ok());
        assert!(matches!(
            ds.get_ir(&bad).unwrap_err(),
            DatasetError::BadShape { .. }
        ));
    }

    #[test]
    fn item_names_display_compactly() {
        let name = ItemName::LabeledIndexed("lab.mat".into(), "inear".into(), 4);
        assert_eq!(name.to_string(), "lab.mat[inear, 4]");
    }
}
