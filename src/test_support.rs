//! Fixtures shared by unit tests

use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::streaming::record::{encode_slice, PointRecord};

/// Records whose position encodes their index, so order is checkable
pub fn numbered_records(count: usize) -> Vec<PointRecord> {
    (0..count)
        .map(|i| {
            let f = i as f32;
            PointRecord::new(Vec3::new(f, f * 0.5, -f), [(i % 256) as u8, (i / 256 % 256) as u8, 7, 255])
        })
        .collect()
}

/// Write `records` to `<dir>/<name>.bin`
pub fn write_cloud(dir: &Path, name: &str, records: &[PointRecord]) -> PathBuf {
    let path = dir.join(format!("{}.bin", name));
    std::fs::write(&path, encode_slice(records)).expect("failed to write test cloud");
    path
}
