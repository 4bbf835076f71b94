//! In-place random reordering of point files
//!
//! Point files produced by scanners are spatially sorted, so a partial read
//! sees one corner of the scene. Shuffling the records once makes any prefix
//! or chunk a uniform sample of the whole cloud.
//!
//! The pass runs in three phases: read (0-10%), permute (10-90%), and write
//! (90-100%). Cancellation is only checked between phases. A failure while
//! writing leaves the file half-written; there is no rollback.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::core::error::{Error, Result};
use crate::streaming::record::{point_count_for_len, RECORD_SIZE};
use crate::tools::progress::{ProgressSink, Progressor, SubProgress};

/// Bytes moved per I/O call in the read and write phases
const IO_BLOCK: usize = 16 * 1024 * 1024;

/// Swaps between progress reports in the permute phase
const PERMUTE_REPORT_STRIDE: usize = 1 << 16;

const READ_PHASE: (f32, f32) = (0.0, 0.1);
const PERMUTE_PHASE: (f32, f32) = (0.1, 0.9);
const WRITE_PHASE: (f32, f32) = (0.9, 1.0);

/// Summary of a finished shuffle
#[derive(Clone, Debug, PartialEq)]
pub struct ShuffleReport {
    pub point_count: u64,
    pub elapsed: Duration,
    pub points_per_sec: f64,
}

/// Shuffle a point file in place using the thread-local generator
pub fn shuffle_file(path: &Path, sink: &mut dyn ProgressSink) -> Result<ShuffleReport> {
    shuffle_file_with_rng(path, sink, &mut rand::rng())
}

/// Shuffle a point file in place
pub fn shuffle_file_with_rng<R: Rng + ?Sized>(
    path: &Path,
    sink: &mut dyn ProgressSink,
    rng: &mut R,
) -> Result<ShuffleReport> {
    let start = Instant::now();
    let mut progress = Progressor::new(sink);

    let mut bytes = read_phase(path, &mut SubProgress::new(&mut progress, READ_PHASE.0, READ_PHASE.1))?;
    let point_count = (bytes.len() / RECORD_SIZE) as u64;
    log::info!("Shuffling {} points of {}", point_count, path.display());
    check_cancelled(&progress, "permute")?;

    shuffle_records(
        &mut bytes,
        rng,
        &mut SubProgress::new(&mut progress, PERMUTE_PHASE.0, PERMUTE_PHASE.1),
    )?;
    check_cancelled(&progress, "write")?;

    write_phase(path, &bytes, &mut SubProgress::new(&mut progress, WRITE_PHASE.0, WRITE_PHASE.1)).map_err(|e| {
        log::error!(
            "Shuffle of {} failed while writing, dataset corrupted, re-import from backup: {}",
            path.display(),
            e
        );
        Error::ShuffleWrite(e)
    })?;

    let elapsed = start.elapsed();
    let points_per_sec = if elapsed.as_secs_f64() > 0.0 {
        point_count as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    log::info!(
        "Shuffled {} points in {:.2}s ({:.0} points/sec)",
        point_count,
        elapsed.as_secs_f64(),
        points_per_sec
    );

    Ok(ShuffleReport {
        point_count,
        elapsed,
        points_per_sec,
    })
}

/// Fisher-Yates shuffle of whole records in `bytes`
///
/// Returns the number of records. `bytes` must hold a whole number of records.
pub fn shuffle_records<R: Rng + ?Sized>(
    bytes: &mut [u8],
    rng: &mut R,
    sink: &mut dyn ProgressSink,
) -> Result<u64> {
    let count = point_count_for_len(Path::new("<memory>"), bytes.len() as u64)?;
    let records: &mut [[u8; RECORD_SIZE]] = bytemuck::try_cast_slice_mut(bytes)
        .map_err(|e| Error::Consistency(format!("record buffer cast failed: {}", e)))?;
    let n = records.len();

    sink.report(0.0, "Permuting");
    for (done, i) in (0..n).rev().enumerate() {
        let j = rng.random_range(0..=i);
        records.swap(i, j);
        if done % PERMUTE_REPORT_STRIDE == PERMUTE_REPORT_STRIDE - 1 {
            sink.report((done + 1) as f32 / n as f32, "Permuting");
        }
    }
    sink.report(1.0, "Permuted");
    Ok(count)
}

fn check_cancelled(progress: &dyn ProgressSink, next_phase: &str) -> Result<()> {
    if progress.is_cancelled() {
        log::info!("Shuffle cancelled before {} phase, file untouched", next_phase);
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn read_phase(path: &Path, sink: &mut dyn ProgressSink) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;
    let len = file.metadata()?.len();
    point_count_for_len(path, len)?;

    let mut bytes = vec![0u8; len as usize];
    sink.report(0.0, "Reading");
    let total = bytes.len();
    for (i, block) in bytes.chunks_mut(IO_BLOCK).enumerate() {
        file.read_exact(block)?;
        let done = (i * IO_BLOCK + block.len()) as f32;
        sink.report(done / total as f32, "Reading");
    }
    sink.report(1.0, "Read");
    Ok(bytes)
}

fn write_phase(path: &Path, bytes: &[u8], sink: &mut dyn ProgressSink) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(0))?;

    sink.report(0.0, "Writing");
    let total = bytes.len();
    for (i, block) in bytes.chunks(IO_BLOCK).enumerate() {
        file.write_all(block)?;
        let done = (i * IO_BLOCK + block.len()) as f32;
        sink.report(done / total as f32, "Writing");
    }
    file.set_len(total as u64)?;
    file.sync_all()?;
    sink.report(1.0, "Written");
    Ok(())
}
