//! Point stream reading, chunk pooling and playback

pub mod record;
pub mod reader;
pub mod chunk_pool;
pub mod lod;
pub mod slice;
pub mod resolver;
pub mod orchestrator;

pub use record::{PointBuffers, PointRecord, RECORD_SIZE};
pub use reader::{PointReader, SeekOrigin};
pub use chunk_pool::{Chunk, ChunkId, ChunkPool, ChunkState, FillStep, FillTask};
pub use lod::{
    LodConfig, LodSelector, LodUpdate, TurbulenceEffect, TurbulenceSignal,
    apply_turbulence, continuous_lod, discrete_lod, distance_to_bounds,
    LOD_BREAKPOINTS, LOD_STEPS_PER_BAND, TURBULENCE_LOD,
};
pub use slice::{Slice, SliceIdPattern, SliceIndex, bounded_request, chunks_in_slice};
pub use resolver::{PathResolver, SearchPaths, literal_path};
pub use orchestrator::{
    ChunkConsumer, OrchestratorStats, PlaybackMode, StreamingOrchestrator, TickOutcome,
};
