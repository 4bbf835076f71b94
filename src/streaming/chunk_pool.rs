//! Chunk Pool - recycled fixed-capacity point buffers
//!
//! - Chunks are allocated on first demand and never freed individually
//! - Released chunks go to a free list and are reused by later borrows
//! - Every chunk the pool created is in exactly one of free, filling, ready
//!
//! Filling is resumable: a [`FillTask`] performs one bounded read per
//! [`FillTask::step`], so an external scheduler can spread a large chunk
//! over several ticks.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;

use crate::core::error::{Error, Result};
use crate::streaming::reader::PointReader;
use crate::streaming::record::PointBuffers;

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a chunk: owning pool plus slot index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkId {
    pub pool: u32,
    pub index: u32,
}

/// Where a chunk is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// In the free list, contents undefined
    Free,
    /// Owned by a fill operation
    Filling,
    /// Handed to the consumer
    Ready,
}

/// Fixed-capacity buffer of decoded points
///
/// Not `Clone`: a chunk value is the only handle to its slot, so it cannot be
/// handed to the pool while something else still holds it.
#[derive(Debug)]
pub struct Chunk {
    id: ChunkId,
    capacity: usize,
    points: PointBuffers,
}

impl Chunk {
    fn new(id: ChunkId, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            points: PointBuffers::with_capacity(capacity),
        }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Fill count
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.points.len()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    pub fn points(&self) -> &PointBuffers {
        &self.points
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.points.positions
    }

    pub fn colors(&self) -> &[[u8; 4]] {
        &self.points.colors
    }

    fn reset(&mut self) {
        self.points.clear();
    }
}

/// Pool of reusable chunks with unbounded growth
pub struct ChunkPool {
    /// Distinguishes chunks of this pool from those of others
    pool_id: u32,
    /// Points per chunk
    capacity: usize,
    /// Lifecycle state per slot index
    states: Vec<ChunkState>,
    /// Chunks ready for reuse
    free: Vec<Chunk>,
}

impl ChunkPool {
    /// Create an empty pool whose chunks hold `capacity` points
    pub fn new(capacity: usize) -> Self {
        Self {
            pool_id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            states: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Take a free chunk, allocating one if none is available
    ///
    /// The chunk comes back empty and in the [`ChunkState::Filling`] state.
    pub fn borrow(&mut self) -> Chunk {
        let chunk = match self.free.pop() {
            Some(chunk) => chunk,
            None => {
                let id = ChunkId {
                    pool: self.pool_id,
                    index: self.states.len() as u32,
                };
                self.states.push(ChunkState::Free);
                log::debug!(
                    "Chunk pool {} grew to {} chunks of {} points",
                    self.pool_id,
                    self.states.len(),
                    self.capacity
                );
                Chunk::new(id, self.capacity)
            }
        };
        self.states[chunk.id.index as usize] = ChunkState::Filling;
        chunk
    }

    /// Perform one bounded read into `chunk`
    ///
    /// Reads up to `min(want, chunk.remaining_capacity())` points and returns
    /// how many were read. Fewer than that means the reader hit end of stream.
    pub fn fill(&mut self, chunk: &mut Chunk, reader: &mut PointReader, want: usize) -> Result<usize> {
        self.expect_state(chunk.id, ChunkState::Filling)?;
        let count = want.min(chunk.remaining_capacity());
        let read = reader.read_points(count, &mut chunk.points)?;
        log::trace!("Filled chunk {:?} with {} points ({}/{})", chunk.id, read, chunk.len(), self.capacity);
        Ok(read)
    }

    /// Hand a filled chunk over to the consumer side
    pub fn mark_ready(&mut self, chunk: &Chunk) -> Result<()> {
        self.expect_state(chunk.id, ChunkState::Filling)?;
        self.states[chunk.id.index as usize] = ChunkState::Ready;
        Ok(())
    }

    /// Return a chunk to the free list, resetting its contents
    ///
    /// Releasing a chunk the pool already holds as free is a bookkeeping bug
    /// and is reported as [`Error::DoubleReturn`].
    pub fn release(&mut self, mut chunk: Chunk) -> Result<()> {
        match self.state(chunk.id) {
            None => Err(Error::ForeignChunk(chunk.id)),
            Some(ChunkState::Free) => Err(Error::DoubleReturn(chunk.id)),
            Some(_) => {
                chunk.reset();
                self.states[chunk.id.index as usize] = ChunkState::Free;
                self.free.push(chunk);
                Ok(())
            }
        }
    }

    /// State of a chunk created by this pool
    pub fn state(&self, id: ChunkId) -> Option<ChunkState> {
        if id.pool != self.pool_id {
            return None;
        }
        self.states.get(id.index as usize).copied()
    }

    fn expect_state(&self, id: ChunkId, expected: ChunkState) -> Result<()> {
        match self.state(id) {
            None => Err(Error::ForeignChunk(id)),
            Some(state) if state == expected => Ok(()),
            Some(state) => Err(Error::Consistency(format!(
                "chunk {:?} is {:?}, expected {:?}",
                id, state, expected
            ))),
        }
    }

    /// Points per chunk
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of chunks ever allocated
    pub fn total(&self) -> usize {
        self.states.len()
    }

    pub fn free_count(&self) -> usize {
        self.count(ChunkState::Free)
    }

    pub fn filling_count(&self) -> usize {
        self.count(ChunkState::Filling)
    }

    pub fn ready_count(&self) -> usize {
        self.count(ChunkState::Ready)
    }

    fn count(&self, state: ChunkState) -> usize {
        self.states.iter().filter(|&&s| s == state).count()
    }
}

/// Outcome of one [`FillTask::step`]
#[derive(Debug)]
pub enum FillStep {
    /// More reads needed; `filled` points so far
    Pending { filled: usize },
    /// The chunk is ready for the consumer
    Complete(Chunk),
}

/// Resumable fill of one chunk, one bounded read per step
#[derive(Debug)]
pub struct FillTask {
    chunk: Option<Chunk>,
    want: usize,
    step_points: usize,
}

impl FillTask {
    /// Fill `chunk` with up to `want` points, reading at most `step_points`
    /// per step
    pub fn new(chunk: Chunk, want: usize, step_points: usize) -> Self {
        Self {
            want: want.min(chunk.capacity()),
            chunk: Some(chunk),
            step_points: step_points.max(1),
        }
    }

    /// Points this task was asked for
    pub fn want(&self) -> usize {
        self.want
    }

    /// Points read so far
    pub fn filled(&self) -> usize {
        self.chunk.as_ref().map_or(0, Chunk::len)
    }

    /// Run one bounded read
    ///
    /// Completes when `want` points were read or the stream ended; the chunk
    /// is then marked ready and returned.
    pub fn step(&mut self, pool: &mut ChunkPool, reader: &mut PointReader) -> Result<FillStep> {
        let chunk = self
            .chunk
            .as_mut()
            .ok_or_else(|| Error::Consistency("fill task stepped after completion".into()))?;

        let remaining = self.want.saturating_sub(chunk.len());
        let mut exhausted = false;
        if remaining > 0 {
            let request = remaining.min(self.step_points);
            let read = pool.fill(chunk, reader, request)?;
            exhausted = read < request;
        }

        if exhausted || chunk.len() >= self.want {
            if let Some(chunk) = self.chunk.take() {
                pool.mark_ready(&chunk)?;
                return Ok(FillStep::Complete(chunk));
            }
        }
        Ok(FillStep::Pending { filled: self.filled() })
    }

    /// Abandon the task, handing back the partially filled chunk
    pub fn cancel(mut self) -> Option<Chunk> {
        self.chunk.take()
    }
}
