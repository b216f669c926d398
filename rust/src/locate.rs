//! Locates compressed blocks in a damaged bzip2 stream.
//!
//! Block boundaries are found by their markers alone, which may sit at any
//! bit offset. The span in front of the first marker is the stream header
//! and is never reported.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::bitio::BitReader;
use crate::bzip2::{
    BlockSpan, MarkerWindow, MARKER_TRAIL, MIN_BLOCK_BITS, MIN_TRAILING_BITS,
};
use crate::error::{RecoverError, Result};

/// Upper bound on candidate blocks tracked in a single scan.
///
/// A stream with this many blocks is at least 160 GB uncompressed.
pub const MAX_HANDLED_BLOCKS: usize = 200_000;

#[derive(Clone, Debug)]
pub struct LocateOptions {
    /// Candidates (including the stream header span) allowed before the
    /// scan fails with [`RecoverError::CapacityExceeded`].
    pub max_blocks: usize,
    /// Caller side limit on candidates, reported as
    /// [`RecoverError::OutputBufferFull`] when hit.
    pub output_capacity: Option<usize>,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            max_blocks: MAX_HANDLED_BLOCKS,
            output_capacity: None,
        }
    }
}

/// Blocks recovered from one scan, ordered by start bit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockMap {
    pub blocks: Vec<BlockSpan>,
    pub bits_scanned: u64,
    pub markers_seen: usize,
}

impl BlockMap {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BlockSpan> {
        self.blocks.iter()
    }
}

impl<'a> IntoIterator for &'a BlockMap {
    type Item = &'a BlockSpan;
    type IntoIter = std::slice::Iter<'a, BlockSpan>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Percent-done counter that can be polled from another thread while a
/// scan runs.
#[derive(Clone, Debug, Default)]
pub struct SharedProgress(Arc<AtomicU8>);

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn observer(&self) -> impl FnMut(u8) + Send + 'static {
        let counter = Arc::clone(&self.0);
        move |percent| counter.store(percent, Ordering::Relaxed)
    }
}

/// Scans the file at `path` for bzip2 blocks.
pub fn locate_blocks(
    path: impl AsRef<Path>,
    options: &LocateOptions,
    progress: impl FnMut(u8),
) -> Result<BlockMap> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| RecoverError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let total_size = file.metadata()?.len();

    log::debug!("Locating blocks; path={:?}, size={}", path, total_size);

    locate_blocks_in(BufReader::new(file), total_size, options, progress)
}

/// Scans `reader` from its start. `total_size` only drives progress
/// reporting; pass 0 when unknown.
pub fn locate_blocks_in<R: Read + Seek>(
    reader: R,
    total_size: u64,
    options: &LocateOptions,
    progress: impl FnMut(u8),
) -> Result<BlockMap> {
    let mut bits = BitReader::new(reader);
    bits.seek_to_bit(0)?;

    let mut scan = Scan::new(options, total_size, progress);
    let mut window = MarkerWindow::default();

    while let Some(bit) = bits.next_bit()? {
        scan.bits_read += 1;
        window.push(bit);

        if window.marker().is_some() {
            scan.on_marker()?;
            scan.report(bits.byte_offset());
        }
    }

    scan.on_end_of_stream()?;
    let map = scan.finish()?;

    log::info!(
        "Located blocks; count={}, markers={}, bits={}",
        map.len(),
        map.markers_seen,
        map.bits_scanned
    );

    Ok(map)
}

/// Bookkeeping for a single pass. `bits_read` is the 1-indexed position of
/// the last consumed bit.
struct Scan<'o, P> {
    options: &'o LocateOptions,
    total_size: u64,
    progress: P,
    last_percent: Option<u8>,
    bits_read: u64,
    candidate: usize,
    candidate_start: u64,
    markers_seen: usize,
    blocks: Vec<BlockSpan>,
}

impl<'o, P: FnMut(u8)> Scan<'o, P> {
    fn new(options: &'o LocateOptions, total_size: u64, progress: P) -> Self {
        let mut scan = Self {
            options,
            total_size,
            progress,
            last_percent: None,
            bits_read: 0,
            candidate: 0,
            candidate_start: 0,
            markers_seen: 0,
            blocks: Vec::new(),
        };
        scan.emit(0);
        scan
    }

    fn on_marker(&mut self) -> Result<()> {
        self.markers_seen += 1;

        let end = self.bits_read.saturating_sub(MARKER_TRAIL);
        self.close_candidate(end)?;

        if self.candidate >= self.options.max_blocks {
            return Err(RecoverError::CapacityExceeded {
                limit: self.options.max_blocks,
            });
        }
        if let Some(capacity) = self.options.output_capacity {
            if self.candidate >= capacity {
                return Err(RecoverError::OutputBufferFull {
                    needed: self.candidate as u64 + 1,
                    capacity: capacity as u64,
                });
            }
        }

        self.candidate += 1;
        self.candidate_start = self.bits_read;
        Ok(())
    }

    fn on_end_of_stream(&mut self) -> Result<()> {
        let trailing = self.bits_read.saturating_sub(self.candidate_start);

        if trailing >= MIN_TRAILING_BITS {
            self.close_candidate(self.bits_read - 1)
        } else {
            log::debug!(
                "Discarding trailing candidate; start={}, bits={}",
                self.candidate_start,
                trailing
            );
            Ok(())
        }
    }

    /// Promotes the current candidate if it is a real block.
    fn close_candidate(&mut self, end: u64) -> Result<()> {
        let start = self.candidate_start;
        let long_enough = end
            .checked_sub(start)
            .is_some_and(|span| span >= MIN_BLOCK_BITS);

        if self.candidate == 0 || !long_enough {
            log::debug!(
                "Skipping candidate; index={}, start={}, end={}",
                self.candidate,
                start,
                end
            );
            return Ok(());
        }

        if self.blocks.len() >= self.options.max_blocks {
            return Err(RecoverError::CapacityExceeded {
                limit: self.options.max_blocks,
            });
        }

        let span = BlockSpan::new(start, end);
        log::debug!("Found block; index={}, span={}", self.blocks.len(), span);
        self.blocks.push(span);
        Ok(())
    }

    fn report(&mut self, byte_offset: u64) {
        if self.total_size > 0 {
            let percent = (byte_offset.min(self.total_size) * 100 / self.total_size) as u8;
            self.emit(percent);
        }
    }

    fn emit(&mut self, percent: u8) {
        if self.last_percent.is_some_and(|last| last >= percent) {
            return;
        }
        self.last_percent = Some(percent);
        (self.progress)(percent);
    }

    fn finish(mut self) -> Result<BlockMap> {
        if self.blocks.is_empty() {
            return Err(RecoverError::NoUsableBlocks);
        }

        self.emit(100);

        Ok(BlockMap {
            blocks: self.blocks,
            bits_scanned: self.bits_read,
            markers_seen: self.markers_seen,
        })
    }
}
