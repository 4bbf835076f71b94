//! Fixed-width point record codec
//!
//! On disk a point is 16 bytes: three little-endian `f32` position
//! components followed by `[r, g, b, a]` color bytes. Files have no header,
//! record `k` occupies bytes `[k * 16, (k + 1) * 16)`.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::path::Path;

use crate::core::error::{Error, Result};

/// Size of one serialized point record in bytes
pub const RECORD_SIZE: usize = 16;

/// One point as stored on disk
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointRecord {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<PointRecord>() == RECORD_SIZE);

impl PointRecord {
    pub fn new(position: Vec3, color: [u8; 4]) -> Self {
        Self {
            position: position.to_array(),
            color,
        }
    }

    /// Decode a record from its on-disk bytes
    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Self {
        bytemuck::pod_read_unaligned::<PointRecord>(bytes).to_native()
    }

    /// Encode a record to its on-disk bytes
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let le = self.to_le();
        let mut out = [0u8; RECORD_SIZE];
        out.copy_from_slice(bytemuck::bytes_of(&le));
        out
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn color(&self) -> [u8; 4] {
        self.color
    }

    /// Reinterpret a record read verbatim from disk in native byte order.
    /// No-op on little-endian hosts.
    pub(crate) fn to_native(self) -> Self {
        Self {
            position: self.position.map(|c| f32::from_bits(u32::from_le(c.to_bits()))),
            color: self.color,
        }
    }

    fn to_le(self) -> Self {
        Self {
            position: self.position.map(|c| f32::from_bits(c.to_bits().to_le())),
            color: self.color,
        }
    }
}

/// Number of records in a stream of `byte_len` bytes
pub fn point_count_for_len(path: &Path, byte_len: u64) -> Result<u64> {
    if byte_len % RECORD_SIZE as u64 != 0 {
        return Err(Error::CorruptFormat {
            path: path.to_path_buf(),
            len: byte_len,
            record_size: RECORD_SIZE,
        });
    }
    Ok(byte_len / RECORD_SIZE as u64)
}

/// Decode a whole buffer of records
pub fn decode_slice(bytes: &[u8]) -> Result<Vec<PointRecord>> {
    point_count_for_len(Path::new("<memory>"), bytes.len() as u64)?;
    Ok(bytes
        .chunks_exact(RECORD_SIZE)
        .map(|rec| {
            let mut buf = [0u8; RECORD_SIZE];
            buf.copy_from_slice(rec);
            PointRecord::decode(&buf)
        })
        .collect())
}

/// Encode records into one contiguous buffer
pub fn encode_slice(records: &[PointRecord]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(records.len() * RECORD_SIZE);
    for record in records {
        bytes.extend_from_slice(&record.encode());
    }
    bytes
}

/// Caller-owned attribute buffers that decoded points are appended to
#[derive(Clone, Debug, Default)]
pub struct PointBuffers {
    pub positions: Vec<Vec3>,
    pub colors: Vec<[u8; 4]>,
}

impl PointBuffers {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: &PointRecord) {
        self.positions.push(record.position());
        self.colors.push(record.color);
    }

    pub fn extend_from_records(&mut self, records: &[PointRecord]) {
        self.positions.extend(records.iter().map(PointRecord::position));
        self.colors.extend(records.iter().map(|r| r.color));
    }

    /// Record at `index`, if present
    pub fn record(&self, index: usize) -> Option<PointRecord> {
        Some(PointRecord::new(*self.positions.get(index)?, *self.colors.get(index)?))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drop contents, keeping allocations
    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
    }
}
