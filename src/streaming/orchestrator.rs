//! Streaming orchestrator: reader + pool + slices driven one tick at a time.
//!
//! Each [`StreamingOrchestrator::tick`] advances at most one bounded read.
//! Completed chunks stay owned by the orchestrator and are shown to the
//! consumer by reference; unloading hands them back to the pool and rewinds
//! the reader over the unconsumed tail, so nothing is skipped.

use glam::Vec3;
use rand::Rng;

use crate::core::config::StreamConfig;
use crate::core::error::{Error, Result};
use crate::streaming::chunk_pool::{Chunk, ChunkId, ChunkPool, FillStep, FillTask};
use crate::streaming::reader::{PointReader, SeekOrigin};
use crate::streaming::record::PointBuffers;
use crate::streaming::resolver::PathResolver;
use crate::streaming::slice::{bounded_request, chunks_in_slice, Slice, SliceIndex};

/// Receiver of chunks, implemented by the renderer/scene layer
pub trait ChunkConsumer {
    /// A chunk finished filling and may be displayed
    fn on_chunk_ready(&mut self, chunk: &Chunk);
    /// A chunk is about to go back to the pool; drop every use of it
    fn on_chunk_discard(&mut self, chunk: &Chunk);
}

/// What the orchestrator is playing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    /// The whole stream after the preview points, chunk after chunk
    FreeRunning,
    /// Only the points of one slice
    Slice(Slice),
}

/// Result of one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing left to load in the current mode
    Idle,
    /// A fill is in progress
    Filling { filled: usize, want: usize },
    /// A chunk was handed to the consumer
    Ready(ChunkId),
}

/// Statistics from streaming operations
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrchestratorStats {
    pub chunks_loaded: u64,
    pub chunks_unloaded: u64,
    /// Points delivered in ready chunks
    pub points_streamed: u64,
    /// Points given back to the stream by unloads and aborted fills
    pub points_rewound: u64,
}

/// Coordinates loading and unloading of chunks for one dataset
pub struct StreamingOrchestrator {
    reader: PointReader,
    pool: ChunkPool,
    config: StreamConfig,
    mode: PlaybackMode,
    /// Fill in progress, at most one
    in_flight: Option<FillTask>,
    /// Chunks shown to the consumer, oldest first
    ready: Vec<Chunk>,
    /// Free-running position to go back to when a slideshow stops
    resume_position: u64,
    stats: OrchestratorStats,
}

impl StreamingOrchestrator {
    /// Create an orchestrator over an opened reader and a pool
    ///
    /// The pool capacity must equal `config.points_per_mesh`. The reader is
    /// positioned after the preview points.
    pub fn new(mut reader: PointReader, pool: ChunkPool, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        if pool.capacity() != config.points_per_mesh {
            return Err(Error::Config(format!(
                "pool capacity {} differs from points_per_mesh {}",
                pool.capacity(),
                config.points_per_mesh
            )));
        }
        let origin = config.preview_points as u64;
        reader.seek_point(origin as i64, SeekOrigin::Begin)?;

        Ok(Self {
            reader,
            pool,
            config,
            mode: PlaybackMode::FreeRunning,
            in_flight: None,
            ready: Vec::new(),
            resume_position: origin,
            stats: OrchestratorStats::default(),
        })
    }

    /// Resolve a dataset by name and open it
    pub fn open(resolver: &dyn PathResolver, name: &str, config: StreamConfig) -> Result<Self> {
        let path = resolver
            .resolve(name)
            .ok_or_else(|| Error::NotFound(name.into()))?;
        let reader = PointReader::open(path)?;
        let pool = ChunkPool::new(config.points_per_mesh);
        Self::new(reader, pool, config)
    }

    /// Like [`open`](Self::open), but a failure is logged and yields `None`.
    /// The caller keeps the dataset disabled; there is no retry.
    pub fn try_open(resolver: &dyn PathResolver, name: &str, config: StreamConfig) -> Option<Self> {
        match Self::open(resolver, name, config) {
            Ok(orchestrator) => Some(orchestrator),
            Err(e) => {
                log::error!("Dataset '{}' disabled: {}", name, e);
                None
            }
        }
    }

    /// First point of free-running playback
    pub fn stream_origin(&self) -> u64 {
        self.config.preview_points as u64
    }

    /// Position that unload rewinds never go below
    fn base(&self) -> u64 {
        match &self.mode {
            PlaybackMode::FreeRunning => self.stream_origin(),
            PlaybackMode::Slice(slice) => slice.offset,
        }
    }

    /// Size of the next read request in the current mode
    pub fn next_chunk_size(&self) -> usize {
        let per_mesh = self.config.points_per_mesh;
        match &self.mode {
            PlaybackMode::FreeRunning => (per_mesh as u64).min(self.reader.points_left()) as usize,
            PlaybackMode::Slice(slice) => bounded_request(per_mesh, slice, self.reader.point_position()),
        }
    }

    /// Advance streaming by one bounded read
    pub fn tick(&mut self, consumer: &mut dyn ChunkConsumer) -> Result<TickOutcome> {
        if self.in_flight.is_none() {
            let want = self.next_chunk_size();
            if want == 0 {
                return Ok(TickOutcome::Idle);
            }
            let chunk = self.pool.borrow();
            log::trace!("Loading chunk {:?} with {} points at {}", chunk.id(), want, self.reader.point_position());
            self.in_flight = Some(FillTask::new(chunk, want, self.config.points_per_step));
        }
        let Some(task) = self.in_flight.as_mut() else {
            return Ok(TickOutcome::Idle);
        };

        match task.step(&mut self.pool, &mut self.reader)? {
            FillStep::Pending { filled } => Ok(TickOutcome::Filling {
                filled,
                want: task.want(),
            }),
            FillStep::Complete(chunk) => {
                self.in_flight = None;
                let id = chunk.id();
                self.stats.chunks_loaded += 1;
                self.stats.points_streamed += chunk.len() as u64;
                consumer.on_chunk_ready(&chunk);
                self.ready.push(chunk);
                Ok(TickOutcome::Ready(id))
            }
        }
    }

    /// Discard the most recently loaded chunk and rewind over its points
    ///
    /// A fill in flight is aborted first. Returns the discarded chunk's id,
    /// or `None` when no chunk is ready.
    pub fn unload_last(&mut self, consumer: &mut dyn ChunkConsumer) -> Result<Option<ChunkId>> {
        self.abort_fill()?;
        let Some(chunk) = self.ready.pop() else {
            return Ok(None);
        };

        consumer.on_chunk_discard(&chunk);
        let id = chunk.id();
        let discarded = chunk.len() as u64;
        self.pool.release(chunk)?;
        self.stats.chunks_unloaded += 1;
        self.rewind_tail(discarded)?;
        Ok(Some(id))
    }

    /// Unload every ready chunk, newest first
    pub fn unload_all(&mut self, consumer: &mut dyn ChunkConsumer) -> Result<usize> {
        let mut count = 0;
        while self.unload_last(consumer)?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Step back over the last, unconsumed chunk
    ///
    /// The tail is the distance from the base to the cursor modulo the chunk
    /// size, a whole chunk when that is 0. It must equal the `discarded`
    /// chunk's length, or the cursor has drifted from the loaded chunks.
    fn rewind_tail(&mut self, discarded: u64) -> Result<u64> {
        let cursor = self.reader.point_position();
        let base = self.base();
        if cursor == base {
            return Ok(0);
        }
        if cursor < base {
            return Err(Error::Consistency(format!(
                "cursor {} is below the stream base {}",
                cursor, base
            )));
        }

        let per_mesh = self.config.points_per_mesh as u64;
        let consumed = cursor - base;
        let tail = match consumed % per_mesh {
            0 => per_mesh,
            partial => partial,
        };
        if tail != discarded {
            return Err(Error::Consistency(format!(
                "tail of {} points at {} does not match the discarded chunk of {} points",
                tail, cursor, discarded
            )));
        }

        self.reader.seek_point(-(tail as i64), SeekOrigin::Current)?;
        self.stats.points_rewound += tail;
        log::debug!("Rewound {} points to {}", tail, self.reader.point_position());
        Ok(tail)
    }

    /// Cancel the fill in flight, returning its chunk to the pool and the
    /// points it read to the stream. Returns how many points were given back.
    pub fn abort_fill(&mut self) -> Result<usize> {
        let Some(task) = self.in_flight.take() else {
            return Ok(0);
        };
        let Some(chunk) = task.cancel() else {
            return Ok(0);
        };

        let filled = chunk.len();
        self.pool.release(chunk)?;
        if filled > 0 {
            self.reader.seek_point(-(filled as i64), SeekOrigin::Current)?;
            self.stats.points_rewound += filled as u64;
        }
        log::debug!("Aborted fill, {} points given back", filled);
        Ok(filled)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.in_flight.is_some() || !self.ready.is_empty() {
            return Err(Error::Consistency(
                "unload outstanding chunks before switching playback".into(),
            ));
        }
        Ok(())
    }

    /// Restrict playback to one slice, starting at its first point
    ///
    /// All chunks must be unloaded first.
    pub fn start_slideshow(&mut self, index: &SliceIndex, query: &str) -> Result<&Slice> {
        self.ensure_idle()?;
        let slice = index.find(query)?.clone();
        self.play_slice(slice)
    }

    /// Switch to a uniformly chosen slice
    pub fn next_slide<R: Rng + ?Sized>(&mut self, index: &SliceIndex, rng: &mut R) -> Result<&Slice> {
        self.ensure_idle()?;
        let slice = index
            .random_index(rng)
            .and_then(|i| index.get(i))
            .cloned()
            .ok_or_else(|| Error::SliceNotFound("<any>".into()))?;
        self.play_slice(slice)
    }

    fn play_slice(&mut self, slice: Slice) -> Result<&Slice> {
        let point_count = self.reader.point_count();
        if slice.end() > point_count {
            return Err(Error::SliceOutOfBounds {
                name: slice.name,
                offset: slice.offset,
                length: slice.length,
                point_count,
            });
        }

        if self.mode == PlaybackMode::FreeRunning {
            self.resume_position = self.reader.point_position();
        }
        self.reader.seek_point(slice.offset as i64, SeekOrigin::Begin)?;
        log::info!(
            "Slideshow on slice '{}': {} points in {} chunks",
            slice.name,
            slice.length,
            chunks_in_slice(slice.length, self.config.points_per_mesh)
        );

        self.mode = PlaybackMode::Slice(slice);
        match &self.mode {
            PlaybackMode::Slice(slice) => Ok(slice),
            PlaybackMode::FreeRunning => Err(Error::Consistency("slideshow mode lost".into())),
        }
    }

    /// Return to free-running playback where it was left
    pub fn stop_slideshow(&mut self) -> Result<()> {
        if self.mode == PlaybackMode::FreeRunning {
            return Ok(());
        }
        self.ensure_idle()?;
        self.reader.seek_point(self.resume_position as i64, SeekOrigin::Begin)?;
        self.mode = PlaybackMode::FreeRunning;
        log::info!("Slideshow stopped, resuming at {}", self.resume_position);
        Ok(())
    }

    /// Chunks needed for the current slide, `None` when free-running
    pub fn current_slide_chunks(&self) -> Option<u64> {
        match &self.mode {
            PlaybackMode::Slice(slice) => Some(chunks_in_slice(slice.length, self.config.points_per_mesh)),
            PlaybackMode::FreeRunning => None,
        }
    }

    /// Read the preview points at the front of the file without moving the
    /// streaming cursor
    pub fn read_preview(&mut self) -> Result<PointBuffers> {
        let cursor = self.reader.point_position();
        let mut preview = PointBuffers::with_capacity(self.config.preview_points);
        self.reader.seek_point(0, SeekOrigin::Begin)?;
        let read = self.reader.read_points(self.config.preview_points, &mut preview);
        self.reader.seek_point(cursor as i64, SeekOrigin::Begin)?;
        read?;
        Ok(preview)
    }

    /// Bounding box of the preview points, `None` when there are none
    pub fn preview_bounds(&mut self) -> Result<Option<(Vec3, Vec3)>> {
        let preview = self.read_preview()?;
        Ok(preview.positions.iter().fold(None, |bounds, &p| match bounds {
            None => Some((p, p)),
            Some((min, max)) => Some((min.min(p), max.max(p))),
        }))
    }

    pub fn mode(&self) -> &PlaybackMode {
        &self.mode
    }

    pub fn ready_chunks(&self) -> &[Chunk] {
        &self.ready
    }

    pub fn is_filling(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn point_position(&self) -> u64 {
        self.reader.point_position()
    }

    pub fn reader(&self) -> &PointReader {
        &self.reader
    }

    pub fn pool(&self) -> &ChunkPool {
        &self.pool
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn stats(&self) -> &OrchestratorStats {
        &self.stats
    }

    /// Release the file handle; chunks already loaded stay readable
    pub fn close(&mut self) {
        if let Some(chunk) = self.in_flight.take().and_then(FillTask::cancel) {
            if let Err(e) = self.pool.release(chunk) {
                log::warn!("Dropping in-flight chunk on close: {}", e);
            }
        }
        self.reader.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::chunk_pool::ChunkState;
    use crate::test_support::{numbered_records, write_cloud};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingConsumer {
        ready: Vec<(ChunkId, usize)>,
        discarded: Vec<ChunkId>,
        first_points: Vec<Vec3>,
    }

    impl ChunkConsumer for RecordingConsumer {
        fn on_chunk_ready(&mut self, chunk: &Chunk) {
            self.ready.push((chunk.id(), chunk.len()));
            if let Some(p) = chunk.positions().first() {
                self.first_points.push(*p);
            }
        }

        fn on_chunk_discard(&mut self, chunk: &Chunk) {
            self.discarded.push(chunk.id());
        }
    }

    fn config(points_per_mesh: usize, points_per_step: usize) -> StreamConfig {
        StreamConfig {
            points_per_mesh,
            points_per_step,
            ..Default::default()
        }
    }

    fn orchestrator(dir: &TempDir, count: usize, config: StreamConfig) -> StreamingOrchestrator {
        let path = write_cloud(dir.path(), "cloud", &numbered_records(count));
        let reader = PointReader::open(path).expect("open failed");
        let pool = ChunkPool::new(config.points_per_mesh);
        StreamingOrchestrator::new(reader, pool, config).expect("orchestrator")
    }

    fn run_until_idle(orch: &mut StreamingOrchestrator, consumer: &mut RecordingConsumer) {
        while orch.tick(consumer).unwrap() != TickOutcome::Idle {}
    }

    #[test]
    fn test_tail_rewind_after_short_last_chunk() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 10_000, config(4096, 4096));
        let mut consumer = RecordingConsumer::default();

        run_until_idle(&mut orch, &mut consumer);
        assert_eq!(orch.point_position(), 10_000);
        assert_eq!(consumer.ready.iter().map(|r| r.1).collect::<Vec<_>>(), vec![4096, 4096, 1808]);

        orch.unload_last(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 8192);
        assert_eq!(orch.point_position() % 4096, 0);
        assert_eq!(orch.stats().points_rewound, 1808);
    }

    #[test]
    fn test_full_chunk_tail_is_whole_chunk() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 100, config(10, 10));
        let mut consumer = RecordingConsumer::default();

        for _ in 0..3 {
            orch.tick(&mut consumer).unwrap();
        }
        assert_eq!(orch.point_position(), 30);

        let id = orch.unload_last(&mut consumer).unwrap().unwrap();
        assert_eq!(consumer.discarded, vec![id]);
        assert_eq!(orch.point_position(), 20);
        assert_eq!(orch.pool().state(id), Some(ChunkState::Free));

        // The next load re-reads exactly the discarded points.
        orch.tick(&mut consumer).unwrap();
        assert_eq!(consumer.first_points.last(), Some(&Vec3::new(20.0, 10.0, -20.0)));
    }

    #[test]
    fn test_unload_all_returns_to_origin() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 95, config(10, 10));
        let mut consumer = RecordingConsumer::default();

        run_until_idle(&mut orch, &mut consumer);
        assert_eq!(orch.ready_chunks().len(), 10);
        assert_eq!(orch.unload_all(&mut consumer).unwrap(), 10);
        assert_eq!(orch.point_position(), 0);
        assert_eq!(orch.pool().free_count(), orch.pool().total());
        assert_eq!(orch.unload_last(&mut consumer).unwrap(), None);
    }

    #[test]
    fn test_incremental_fill_over_ticks() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 100, config(10, 4));
        let mut consumer = RecordingConsumer::default();

        assert_eq!(orch.tick(&mut consumer).unwrap(), TickOutcome::Filling { filled: 4, want: 10 });
        assert_eq!(orch.tick(&mut consumer).unwrap(), TickOutcome::Filling { filled: 8, want: 10 });
        assert!(consumer.ready.is_empty());
        assert!(matches!(orch.tick(&mut consumer).unwrap(), TickOutcome::Ready(_)));
        assert_eq!(consumer.ready.len(), 1);
        assert!(!orch.is_filling());
    }

    #[test]
    fn test_unload_during_fill_preserves_points() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 100, config(10, 4));
        let mut consumer = RecordingConsumer::default();

        for _ in 0..3 {
            orch.tick(&mut consumer).unwrap();
        }
        orch.tick(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 14);
        assert!(orch.is_filling());

        orch.unload_last(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 0);
        assert_eq!(orch.pool().free_count(), 2);
        assert_eq!(orch.stats().points_rewound, 14);
    }

    #[test]
    fn test_slice_bounded_requests() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 2000, config(4096, 400));
        let index = SliceIndex::new(vec![Slice::new("12", 1000, 500)]);
        let mut consumer = RecordingConsumer::default();

        orch.start_slideshow(&index, "12").unwrap();
        assert_eq!(orch.point_position(), 1000);
        assert_eq!(orch.next_chunk_size(), 500);

        assert_eq!(orch.tick(&mut consumer).unwrap(), TickOutcome::Filling { filled: 400, want: 500 });
        assert_eq!(orch.point_position(), 1400);
        assert_eq!(orch.next_chunk_size(), 100);

        assert!(matches!(orch.tick(&mut consumer).unwrap(), TickOutcome::Ready(_)));
        assert_eq!(orch.point_position(), 1500);
        assert_eq!(orch.tick(&mut consumer).unwrap(), TickOutcome::Idle);
        assert_eq!(orch.current_slide_chunks(), Some(1));
    }

    #[test]
    fn test_slideshow_unload_stays_inside_slice() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 200, config(16, 16));
        let index = SliceIndex::new(vec![Slice::new("3", 50, 40)]);
        let mut consumer = RecordingConsumer::default();

        orch.start_slideshow(&index, "3").unwrap();
        run_until_idle(&mut orch, &mut consumer);
        assert_eq!(consumer.ready.iter().map(|r| r.1).collect::<Vec<_>>(), vec![16, 16, 8]);

        orch.unload_last(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 82);
        orch.unload_last(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 66);
        orch.unload_last(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 50);
    }

    #[test]
    fn test_rewind_below_base_is_fatal() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 200, config(16, 16));
        let index = SliceIndex::new(vec![Slice::new("3", 50, 40)]);
        orch.start_slideshow(&index, "3").unwrap();

        orch.reader.seek_point(10, SeekOrigin::Begin).unwrap();
        assert!(matches!(orch.rewind_tail(16), Err(Error::Consistency(_))));
        assert_eq!(orch.point_position(), 10);
    }

    #[test]
    fn test_rewind_must_match_discarded_chunk() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 200, config(16, 16));
        let index = SliceIndex::new(vec![Slice::new("3", 50, 40)]);
        let mut consumer = RecordingConsumer::default();

        orch.start_slideshow(&index, "3").unwrap();
        orch.tick(&mut consumer).unwrap();
        orch.tick(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 82);

        // A cursor moved behind the orchestrator's back no longer lines up.
        orch.reader.seek_point(-3, SeekOrigin::Current).unwrap();
        assert!(matches!(orch.unload_last(&mut consumer), Err(Error::Consistency(_))));
        assert_eq!(orch.point_position(), 79);
    }

    #[test]
    fn test_next_slide_plays_the_drawn_duplicate() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 200, config(16, 16));
        let index = SliceIndex::new(vec![Slice::new("5", 0, 10), Slice::new("5", 100, 10)]);
        let mut consumer = RecordingConsumer::default();

        assert!(matches!(orch.start_slideshow(&index, "5"), Err(Error::AmbiguousSlice { .. })));

        let mut offsets = std::collections::HashSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..32 {
            let slide = orch.next_slide(&index, &mut rng).unwrap().clone();
            assert_eq!(orch.point_position(), slide.offset);
            offsets.insert(slide.offset);
            orch.tick(&mut consumer).unwrap();
            orch.unload_all(&mut consumer).unwrap();
        }
        assert_eq!(offsets.len(), 2);
    }

    #[test]
    fn test_stop_slideshow_resumes_free_running() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let config = StreamConfig {
            preview_points: 5,
            ..config(16, 16)
        };
        let mut orch = orchestrator(&dir, 200, config);
        let index = SliceIndex::new(vec![Slice::new("a", 100, 30), Slice::new("b", 150, 30)]);
        let mut consumer = RecordingConsumer::default();

        orch.tick(&mut consumer).unwrap();
        orch.tick(&mut consumer).unwrap();
        // Chunks must go before switching.
        assert!(matches!(orch.start_slideshow(&index, "a"), Err(Error::Consistency(_))));
        orch.unload_all(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 5);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let slide = orch.next_slide(&index, &mut rng).unwrap().clone();
        assert_eq!(orch.point_position(), slide.offset);
        orch.tick(&mut consumer).unwrap();
        orch.unload_all(&mut consumer).unwrap();

        orch.stop_slideshow().unwrap();
        assert_eq!(orch.mode(), &PlaybackMode::FreeRunning);
        assert_eq!(orch.point_position(), 5);
        assert_eq!(orch.current_slide_chunks(), None);
    }

    #[test]
    fn test_slice_past_end_rejected() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 100, config(16, 16));
        let index = SliceIndex::new(vec![Slice::new("late", 90, 20)]);
        assert!(matches!(orch.start_slideshow(&index, "late"), Err(Error::SliceOutOfBounds { .. })));
        assert_eq!(orch.mode(), &PlaybackMode::FreeRunning);
    }

    #[test]
    fn test_preview_points_are_skipped_and_readable() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let config = StreamConfig {
            preview_points: 5,
            ..config(10, 10)
        };
        let mut orch = orchestrator(&dir, 50, config);
        let mut consumer = RecordingConsumer::default();

        assert_eq!(orch.point_position(), 5);
        orch.tick(&mut consumer).unwrap();
        assert_eq!(consumer.first_points[0], Vec3::new(5.0, 2.5, -5.0));

        let preview = orch.read_preview().unwrap();
        assert_eq!(preview.len(), 5);
        assert_eq!(orch.point_position(), 15);

        let (min, max) = orch.preview_bounds().unwrap().unwrap();
        assert_eq!(min, Vec3::new(0.0, 0.0, -4.0));
        assert_eq!(max, Vec3::new(4.0, 2.0, 0.0));

        orch.unload_last(&mut consumer).unwrap();
        assert_eq!(orch.point_position(), 5);
    }

    #[test]
    fn test_open_missing_dataset_is_inert() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let resolver = crate::streaming::resolver::SearchPaths::new(vec![dir.path().to_path_buf()], "bin");

        assert!(StreamingOrchestrator::try_open(&resolver, "missing", StreamConfig::default()).is_none());
        assert!(matches!(
            StreamingOrchestrator::open(&resolver, "missing", StreamConfig::default()),
            Err(Error::NotFound(_))
        ));

        write_cloud(dir.path(), "present", &numbered_records(3));
        let orch = StreamingOrchestrator::try_open(&resolver, "present", StreamConfig::default());
        assert_eq!(orch.map(|o| o.reader().point_count()), Some(3));
    }

    #[test]
    fn test_open_corrupt_dataset_fails() {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(dir.path().join("bad.bin"), [0u8; 17]).unwrap();
        let path = dir.path().join("bad.bin");
        let resolver = move |_: &str| -> Option<PathBuf> { Some(path.clone()) };

        assert!(matches!(
            StreamingOrchestrator::open(&resolver, "bad", StreamConfig::default()),
            Err(Error::CorruptFormat { .. })
        ));
    }

    #[test]
    fn test_pool_capacity_must_match_config() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = write_cloud(dir.path(), "cloud", &numbered_records(3));
        let reader = PointReader::open(path).unwrap();
        let result = StreamingOrchestrator::new(reader, ChunkPool::new(8), config(16, 16));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_close_releases_reader() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut orch = orchestrator(&dir, 20, config(10, 10));
        let mut consumer = RecordingConsumer::default();

        orch.tick(&mut consumer).unwrap();
        orch.close();
        orch.close();
        assert!(orch.reader().is_closed());
        assert_eq!(orch.ready_chunks()[0].len(), 10);
        assert!(matches!(orch.tick(&mut consumer), Err(Error::Closed)));
    }
}
