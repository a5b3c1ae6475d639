//! Soundfile-backed datasets: one IR per WAV or FLAC file.

use std::path::PathBuf;

use once_cell::unsync::OnceCell;

use crate::dataset::{DatasetInfo, IrDataset, IrRecord, ItemName};
use crate::error::{DatasetError, Result};
use crate::files::FileSet;
use crate::formats::audio;
use crate::shape::Ir;

/// A dataset whose items are individual audio files.
///
/// The index is one record per enumerated file, built from header-only
/// probes; no decode caching is involved because re-reading a single
/// audio file is cheaper than the indirection.
#[derive(Debug)]
pub struct SoundfileDataset {
    info: DatasetInfo,
    files: FileSet,
    index: OnceCell<Vec<IrRecord>>,
}

impl SoundfileDataset {
    /// A dataset of audio files matching `include` (minus `exclude`)
    /// under `root`.
    pub fn new(
        info: DatasetInfo,
        root: impl Into<PathBuf>,
        include: &[&str],
        exclude: &[&str],
    ) -> Self {
        let files = FileSet::new(info.name, root, include, exclude);
        Self {
            info,
            files,
            index: OnceCell::new(),
        }
    }

    /// The enumerated files backing this dataset.
    pub fn list_files(&self) -> Result<&[std::path::PathBuf]> {
        self.files.files()
    }
}

impl IrDataset for SoundfileDataset {
    fn info(&self) -> &DatasetInfo {
        &self.info
    }

    fn list_irs(&self) -> Result<&[IrRecord]> {
        self.index
            .get_or_try_init(|| {
                log::debug!("{}: probing audio headers", self.info.name);
                self.files
                    .files()?
                    .iter()
                    .map(|f| {
                        let meta = audio::probe(f)?;
                        Ok(IrRecord::new(
                            ItemName::File(f.clone()),
                            meta.channels,
                            meta.frames,
                            meta.sample_rate,
                        ))
                    })
                    .collect()
            })
            .map(Vec::as_slice)
    }

    fn fetch_ir(&self, name: &ItemName) -> Result<Ir> {
        match name {
            ItemName::File(path) => audio::decode(path),
            other => Err(DatasetError::UnknownItem {
                name: other.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Collection catalog
// ---------------------------------------------------------------------------

macro_rules! soundfile_collection {
    ($(#[$doc:meta])* $fn_name:ident, $name:literal, $url:expr, $license:expr,
     include: $include:expr, exclude: $exclude:expr) => {
        $(#[$doc])*
        pub fn $fn_name(root: impl Into<PathBuf>) -> SoundfileDataset {
            SoundfileDataset::new(
                DatasetInfo {
                    name: $name,
                    url: $url,
                    license: $license,
                },
                root,
                $include,
                $exclude,
            )
        }
    };
}

soundfile_collection!(
    /// Every WAV file under the root.
    wav, "WAV files", None, None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// Every FLAC file under the root.
    flac, "FLAC files", None, None,
    include: &["**/*.flac"], exclude: &[]);

soundfile_collection!(
    /// ASH-IR: BRIRs measured in real rooms for headphone surround.
    ashir, "ASH-IR Dataset", Some("https://github.com/ShanonPearce/ASH-IR-Dataset"), None,
    include: &["BRIRs/**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// The Hopkins IR Library of real spaces.
    hopkins, "Hopkins IR Library", None, None,
    include: &["Real Spaces/**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// REVERB challenge 2014 measured RIRs.
    reverb2014, "Reverb2014", None, None,
    include: &["**/RIR_*.wav"], exclude: &[]);

soundfile_collection!(
    /// BUT ReverbDB (RIR-only release).
    but, "BUT ReverbDB", None, None,
    include: &["**/IR_*.wav"], exclude: &[]);

soundfile_collection!(
    /// OpenAIR impulse response library. The `examples/` renders that
    /// ship alongside the IRs are not IRs and are excluded.
    openair, "OpenAIR", Some("https://www.openair.hosted.york.ac.uk"), None,
    include: &["**/*.wav"], exclude: &["examples/*"]);

soundfile_collection!(
    /// TU Darmstadt RIR sample sets (2017/2018 measurement campaigns).
    darmstadt, "Darmstadt RIR samples", None, None,
    include: &["**/*rir.wav"], exclude: &[]);

soundfile_collection!(
    /// DRR-scaled BRIRs.
    drr, "DRR scaled BRIRs", None, None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// Isophonics room impulse responses.
    isophonics, "Isophonics", Some("http://isophonics.net"), None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// Pori concert hall impulse responses.
    poririrs, "Pori IRs", None, None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// SPARG ambisonic IR dataset.
    spargair, "SPARG-AIR", None, None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// Voxengo free reverb impulse responses.
    voxengo, "Voxengo IMreverbs", Some("https://www.voxengo.com/impulses/"), None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// MARDY: multichannel acoustic reverberation database at York.
    mardy, "MARDY", None, None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// HybridReverb2 impulse response database (FLAC).
    hybridreverb2, "HybridReverb2", Some("https://github.com/jpcima/HybridReverb2-impulse-response-database"), None,
    include: &["**/*.flac"], exclude: &[]);

soundfile_collection!(
    /// MIT IR Survey.
    mit, "MIT IR Survey", Some("https://mcdermottlab.mit.edu/Reverb/IR_Survey.html"), None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// EchoThief impulse response library.
    echothief, "EchoThief", Some("http://www.echothief.com"), None,
    include: &["**/*.wav"], exclude: &[]);

soundfile_collection!(
    /// SMARD: single- and multichannel audio recordings database.
    smard, "SMARD", Some("https://www.smard.es.aau.dk"), None,
    include: &["**/*.wav"], exclude: &[]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::audio::write_wav;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn index_enumeration_and_len_agree() {
        let dir = tempdir().unwrap();
        write_wav(&dir.path().join("a.wav"), 1, 64, 48000);
        write_wav(&dir.path().join("b.wav"), 2, 32, 44100);

        let ds = wav(dir.path());
        let records: Vec<_> = ds.list_irs().unwrap().to_vec();
        assert_eq!(records.len(), 2);
        assert_eq!(ds.len().unwrap(), 2);

        let enumerated: Vec<_> = ds
            .get_all()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(enumerated.len(), 2);
        // Order parity, element for element.
        for (rec, (name, sr, ir)) in records.iter().zip(&enumerated) {
            assert_eq!(&rec.name, name);
            assert_eq!(rec.sample_rate, *sr);
            assert_eq!(ir.dim(), (rec.channels, rec.samples));
        }
    }

    #[test]
    fn get_ir_matches_probed_metadata() {
        let dir = tempdir().unwrap();
        write_wav(&dir.path().join("st.wav"), 2, 100, 48000);

        let ds = wav(dir.path());
        let rec = ds.list_irs().unwrap()[0].clone();
        let ir = ds.get_ir(&rec.name).unwrap();
        assert_eq!(ir.dim(), (2, 100));
        assert!(rec.channels < crate::shape::MAX_CHANNELS);
    }

    #[test]
    fn unknown_name_is_a_lookup_error() {
        let dir = tempdir().unwrap();
        write_wav(&dir.path().join("a.wav"), 1, 8, 8000);

        let ds = wav(dir.path());
        let err = ds
            .get_ir(&ItemName::File(dir.path().join("zzz.wav")))
            .unwrap_err();
        assert!(matches!(err, DatasetError::UnknownItem { .. }));
    }

    #[test]
    fn openair_excludes_example_renders() {
        let dir = tempdir().unwrap();
        write_wav(&dir.path().join("a.wav"), 1, 8, 48000);
        fs::create_dir_all(dir.path().join("examples")).unwrap();
        write_wav(&dir.path().join("examples/b.wav"), 1, 8, 48000);

        let ds = openair(dir.path());
        assert_eq!(ds.list_files().unwrap(), &[dir.path().join("a.wav")]);
        assert_eq!(ds.len().unwrap(), 1);
    }

    #[test]
    fn catalog_info_is_exposed() {
        let ds = ashir("/does/not/matter");
        assert_eq!(ds.info().name, "ASH-IR Dataset");
        assert!(ds.info().url.is_some());
    }
}
