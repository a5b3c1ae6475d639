//! File enumeration: glob include/exclude patterns under a dataset root.

use std::path::{Path, PathBuf};

use glob::Pattern;
use once_cell::unsync::OnceCell;

use crate::error::{DatasetError, Result};

/// The set of files backing one dataset instance.
///
/// Declared as one or more include glob patterns (with `**` support) and
/// zero or more exclude patterns, both relative to a root directory. The
/// expansion is computed at most once per instance and memoized; a second
/// call returns the same list without touching the filesystem.
///
/// A root that does not exist yields an empty list rather than an error:
/// adapters fail later, more informatively, when the index turns out empty
/// or a specific file is missing.
#[derive(Debug)]
pub struct FileSet {
    dataset: String,
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    files: OnceCell<Vec<PathBuf>>,
}

impl FileSet {
    /// Creates a file set for `dataset` rooted at `root`.
    pub fn new(
        dataset: &str,
        root: impl Into<PathBuf>,
        include: &[&str],
        exclude: &[&str],
    ) -> Self {
        Self {
            dataset: dataset.to_string(),
            root: root.into(),
            include: include.iter().map(|s| (*s).to_string()).collect(),
            exclude: exclude.iter().map(|s| (*s).to_string()).collect(),
            files: OnceCell::new(),
        }
    }

    /// The dataset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All files matching the include patterns and no exclude pattern,
    /// in lexicographic path order. Scanned once, then memoized.
    pub fn files(&self) -> Result<&[PathBuf]> {
        self.files
            .get_or_try_init(|| self.scan())
            .map(Vec::as_slice)
    }

    fn scan(&self) -> Result<Vec<PathBuf>> {
        if self.include.is_empty() {
            return Err(DatasetError::NoPatterns {
                dataset: self.dataset.clone(),
            });
        }

        let mut matches = Vec::new();
        for pattern in &self.include {
            let full = self.root.join(pattern);
            let full = full
                .to_str()
                .ok_or_else(|| DatasetError::NonUtf8Path(full.clone()))?;
            let paths = glob::glob(full).map_err(|source| DatasetError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            for entry in paths {
                let path = entry.map_err(|e| {
                    let path = e.path().to_path_buf();
                    DatasetError::Io {
                        path,
                        source: e.into_error(),
                    }
                })?;
                if path.is_file() {
                    matches.push(path);
                }
            }
        }
        matches.sort();

        let excludes = self
            .exclude
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| DatasetError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if !excludes.is_empty() {
            // Excludes match against the path relative to the root.
            matches.retain(|path| {
                let rel = path.strip_prefix(&self.root).unwrap_or(path);
                !excludes.iter().any(|e| e.matches_path(rel))
            });
        }

        log::debug!(
            "{}: {} files under {}",
            self.dataset,
            matches.len(),
            self.root.display()
        );
        Ok(matches)
    }
}
