//! Offline maintenance passes over point files

pub mod progress;
pub mod shuffle;

pub use progress::{LogProgress, NullProgress, ProgressSink, Progressor, SubProgress};
pub use shuffle::{shuffle_file, shuffle_file_with_rng, shuffle_records, ShuffleReport};
