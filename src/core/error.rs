//! Error types for cloudstream

use std::path::PathBuf;

use thiserror::Error;

use crate::streaming::chunk_pool::ChunkId;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("dataset not found: {0}")]
    NotFound(PathBuf),

    #[error("corrupt point file {path}: {len} bytes is not a multiple of the {record_size}-byte record")]
    CorruptFormat {
        path: PathBuf,
        len: u64,
        record_size: usize,
    },

    #[error("point position {requested} outside of [0, {point_count}]")]
    OutOfRange { requested: i128, point_count: u64 },

    #[error("point reader is closed")]
    Closed,

    #[error("chunk {0:?} returned to the pool twice")]
    DoubleReturn(ChunkId),

    #[error("chunk {0:?} does not belong to this pool")]
    ForeignChunk(ChunkId),

    #[error("stream consistency violated: {0}")]
    Consistency(String),

    #[error("slice name '{query}' is ambiguous: matches {matches:?}")]
    AmbiguousSlice { query: String, matches: Vec<String> },

    #[error("no slice matches '{0}'")]
    SliceNotFound(String),

    #[error("slice '{name}' ({offset}+{length}) exceeds the {point_count}-point stream")]
    SliceOutOfBounds {
        name: String,
        offset: u64,
        length: u64,
        point_count: u64,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("shuffle write failed, dataset must be re-imported: {0}")]
    ShuffleWrite(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
