//! Format probe adapters.
//!
//! Each supported container format exposes the same two operations:
//! a *probe* that reads structural metadata (channels, samples, sample
//! rate) as cheaply as the format allows, and a *decode* that produces
//! the full sample payload. The split keeps the cost/guarantee
//! distinction explicit: index building uses probes, item resolution
//! uses decodes.

pub mod audio;
pub mod binary;
pub mod mat;
pub mod matstruct;
pub mod sofa;
