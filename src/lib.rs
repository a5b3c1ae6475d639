//! Uniform access to heterogeneous acoustic impulse response datasets.
//!
//! Every published IR collection stores its data differently: loose WAV
//! or FLAC files, MATLAB arrays and struct containers, SOFA tensors, raw
//! float dumps. This crate puts one contract over all of them: list the
//! items with their shapes, fetch one validated `(channels, samples)`
//! buffer, or stream the whole collection.
//!
//! Architecture:
//! ```text
//!  .wav / .flac / .mat / .sofa / raw dumps
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  formats  │  probe headers, decode payloads
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ datasets  │  per-collection adapters (layout + naming)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ IrDataset │  list_irs / get_ir / get_all / len
//!   └──────────┘
//! ```
//!
//! ```no_run
//! use realrirs::{datasets, IrDataset};
//!
//! fn main() -> realrirs::Result<()> {
//!     let ds = datasets::openair("/data/openair");
//!     for rec in ds.list_irs()? {
//!         println!("{} {}x{} @ {} Hz", rec.name, rec.channels, rec.samples, rec.sample_rate);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod dataset;
pub mod datasets;
pub mod error;
pub mod files;
pub mod formats;
pub mod shape;

pub use cache::{CachedDecodes, DecodeCache};
pub use dataset::{DatasetInfo, IrDataset, IrItem, IrItems, IrRecord, ItemName};
pub use error::{DatasetError, Result};
pub use files::FileSet;
pub use shape::{Ir, MAX_CHANNELS};
