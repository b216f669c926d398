//! Re-frames a single located block as a standalone bzip2 stream.
//!
//! Output layout: `BZh9`, the block marker, the block bits copied verbatim,
//! the end-of-stream marker, the block CRC (which is also the combined CRC
//! of a one-block stream) and zero padding up to a byte boundary.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::bitio::{BitReader, BitWriter};
use crate::bzip2::{
    stream_header, BlockSpan, Marker, MarkerWindow, BLOCK_CRC_OFFSET, FRAMING_BYTES,
    PADDING_BYTES,
};
use crate::error::{RecoverError, Result};

/// Extracts `span` from the file at `path` into `out`, returning the number
/// of bytes written.
pub fn load_block(path: impl AsRef<Path>, span: BlockSpan, out: &mut [u8]) -> Result<usize> {
    check_capacity(span, out.len())?;

    let path = path.as_ref();
    let file = File::open(path).map_err(|source| RecoverError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    load_block_from(BufReader::new(file), span, out)
}

/// Like [`load_block`], sizing the buffer with [`BlockSpan::required_capacity`].
pub fn load_block_to_vec(path: impl AsRef<Path>, span: BlockSpan) -> Result<Vec<u8>> {
    let mut out = vec![0u8; span.required_capacity()];
    let written = load_block(path, span, &mut out)?;
    out.truncate(written);
    Ok(out)
}

pub fn load_block_from<R: Read + Seek>(
    reader: R,
    span: BlockSpan,
    out: &mut [u8],
) -> Result<usize> {
    check_capacity(span, out.len())?;

    let BlockSpan { start_bit, end_bit } = span;
    log::debug!(
        "Loading block; span={}, source_bytes={:?}",
        span,
        span.byte_range()
    );

    let mut bits = BitReader::new(reader);
    bits.seek_to_bit(start_bit)?;

    let mut writer = BitWriter::new(out);
    writer.put_bytes(&stream_header())?;
    writer.put_bytes(&Marker::BlockHeader.bytes())?;

    let mut window = MarkerWindow::default();
    let mut block_crc = 0;
    let mut position = start_bit;

    while position <= end_bit {
        let Some(bit) = bits.next_bit()? else {
            log::warn!(
                "Input ended inside block; span={}, reached={}",
                span,
                position
            );
            return Err(RecoverError::TruncatedBlock {
                reached: position,
                end: end_bit,
            });
        };

        window.push(bit);
        if position == start_bit + BLOCK_CRC_OFFSET {
            block_crc = window.leading_u32();
        }

        writer.put_bit(bit)?;
        position += 1;
    }

    writer.put_bytes(&Marker::EndOfStream.bytes())?;
    writer.put_u32(block_crc)?;
    let written = writer.finish()?;

    log::info!(
        "Extracted block; span={}, crc={:#010x}, bytes={}",
        span,
        block_crc,
        written
    );

    Ok(written)
}

fn check_capacity(span: BlockSpan, capacity: usize) -> Result<()> {
    let BlockSpan { start_bit, end_bit } = span;
    let Some(body_bits) = end_bit.checked_sub(start_bit) else {
        return Err(RecoverError::InvalidSpan {
            start: start_bit,
            end: end_bit,
        });
    };

    let required = body_bits / 8 + PADDING_BYTES + FRAMING_BYTES;
    if required >= capacity as u64 {
        return Err(RecoverError::OutputBufferFull {
            needed: required + 1,
            capacity: capacity as u64,
        });
    }

    Ok(())
}
