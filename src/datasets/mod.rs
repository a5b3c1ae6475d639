//! Per-dataset adapters.
//!
//! Each real-world RIR collection is a thin configuration over the
//! reusable pieces: a [`FileSet`](crate::files::FileSet) with the
//! collection's include/exclude patterns, one or more format probes, and
//! whatever one-off index arithmetic the collection's container layout
//! requires. Soundfile-backed collections are plain constructor
//! functions returning a configured [`SoundfileDataset`]; collections
//! with container-specific addressing get their own adapter type.

mod audio;
mod binary;
mod mat;
mod matstruct;
mod sofa;

pub use audio::{
    ashir, but, darmstadt, drr, echothief, flac, hopkins, hybridreverb2, isophonics, mardy, mit,
    openair, poririrs, reverb2014, smard, spargair, voxengo, wav, SoundfileDataset,
};
pub use binary::{rwcp, BinaryArrayDataset, RwcpDataset};
pub use mat::{AirDataset, BellVarechoicDataset, FoaIrDataset, MirdDataset};
pub use matstruct::{KemarDataset, TuiInEarBehindEarDataset};
pub use sofa::{IosrListeningRoomsDataset, IosrRealRoomsDataset};
