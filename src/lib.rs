//! cloudstream - streaming, slicing and shuffling of flat binary point clouds
//!
//! Point files are read on demand into pooled fixed-capacity chunks, played
//! back whole or by named slices, and randomized offline so that any prefix
//! of a file is a representative sample.

pub mod core;
pub mod streaming;
pub mod tools;

pub use crate::core::{Error, Result, StreamConfig};

#[cfg(test)]
pub(crate) mod test_support;
