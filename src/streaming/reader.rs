//! Sequential and random-access reader over a flat point file
//!
//! The cursor is tracked in points, not bytes. Reads go straight to the
//! file; nothing already read is cached.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytemuck::Zeroable;

use crate::core::error::{Error, Result};
use crate::streaming::record::{point_count_for_len, PointBuffers, PointRecord, RECORD_SIZE};

/// Reference point for [`PointReader::seek_point`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

/// Point stream reader with a cursor in `[0, point_count]`
#[derive(Debug)]
pub struct PointReader {
    path: PathBuf,
    /// `None` once closed
    file: Option<File>,
    point_count: u64,
    cursor: u64,
    /// Reused decode buffer for `read_points`
    scratch: Vec<PointRecord>,
}

impl PointReader {
    /// Open a point file
    ///
    /// Fails with [`Error::NotFound`] if the path does not exist and
    /// [`Error::CorruptFormat`] if its length is not a whole number of records.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.clone()),
            _ => Error::Io(e),
        })?;
        let point_count = point_count_for_len(&path, file.metadata()?.len())?;

        log::info!("Opened point stream {} ({} points)", path.display(), point_count);

        Ok(Self {
            path,
            file: Some(file),
            point_count,
            cursor: 0,
            scratch: Vec::new(),
        })
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::Closed)
    }

    /// Move the cursor to `origin + delta` points
    ///
    /// Targets outside `[0, point_count]` fail with [`Error::OutOfRange`] and
    /// leave the cursor untouched.
    pub fn seek_point(&mut self, delta: i64, origin: SeekOrigin) -> Result<u64> {
        let base = match origin {
            SeekOrigin::Begin => 0,
            SeekOrigin::Current => self.cursor,
            SeekOrigin::End => self.point_count,
        };
        let target = base as i128 + delta as i128;
        if target < 0 || target > self.point_count as i128 {
            return Err(Error::OutOfRange {
                requested: target,
                point_count: self.point_count,
            });
        }

        let target = target as u64;
        self.file()?.seek(SeekFrom::Start(target * RECORD_SIZE as u64))?;
        self.cursor = target;
        Ok(target)
    }

    /// Read up to `max_count` raw records, appending them to `out`
    ///
    /// Returns the number read; fewer than `max_count` means end of stream.
    pub fn read_records(&mut self, max_count: usize, out: &mut Vec<PointRecord>) -> Result<usize> {
        let count = (max_count as u64).min(self.points_left()) as usize;
        let cursor = self.cursor;
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        if count == 0 {
            return Ok(0);
        }

        let start = out.len();
        out.resize(start + count, PointRecord::zeroed());
        if let Err(e) = file.read_exact(bytemuck::cast_slice_mut(&mut out[start..])) {
            out.truncate(start);
            // Keep the file position in step with the cursor for the next attempt.
            file.seek(SeekFrom::Start(cursor * RECORD_SIZE as u64))?;
            return Err(e.into());
        }
        for record in &mut out[start..] {
            *record = record.to_native();
        }

        self.cursor += count as u64;
        log::trace!("Read {} points from {}, cursor {}", count, self.path.display(), self.cursor);
        Ok(count)
    }

    /// Decode up to `max_count` points into caller-owned attribute buffers
    ///
    /// Returns the number read; fewer than `max_count` means end of stream.
    pub fn read_points(&mut self, max_count: usize, dest: &mut PointBuffers) -> Result<usize> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let result = self.read_records(max_count, &mut scratch);
        if let Ok(count) = result {
            dest.extend_from_records(&scratch[..count]);
        }
        self.scratch = scratch;
        result
    }

    /// Current cursor in points
    pub fn point_position(&self) -> u64 {
        self.cursor
    }

    pub fn points_left(&self) -> u64 {
        self.point_count - self.cursor
    }

    /// Total number of points in the stream
    pub fn point_count(&self) -> u64 {
        self.point_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Release the file handle. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            log::info!("Closed point stream {}", self.path.display());
        }
    }
}
