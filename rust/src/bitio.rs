//! Bit granular I/O.
//!
//! bzip2 blocks are not byte aligned, so both the locator and the
//! extractor walk the input one bit at a time. Bits are always
//! most-significant first, on the way in and on the way out.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::{RecoverError, Result};

/// Sequential, seekable bit reader over a byte source.
pub struct BitReader<R> {
    inner: R,
    current: u8,
    live: u8,
    byte_offset: u64,
}

impl<R> BitReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            current: 0,
            live: 0,
            byte_offset: 0,
        }
    }

    /// Absolute offset of the next byte to be pulled from the source.
    pub fn byte_offset(&self) -> u64 {
        self.byte_offset
    }
}

impl<R: Read> BitReader<R> {
    /// Returns the next bit, or `None` on a clean end of stream.
    pub fn next_bit(&mut self) -> std::io::Result<Option<u8>> {
        if self.live == 0 {
            let mut byte = [0u8; 1];
            loop {
                match self.inner.read(&mut byte) {
                    Ok(0) => return Ok(None),
                    Ok(_) => break,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                }
            }
            self.current = byte[0];
            self.live = 8;
            self.byte_offset += 1;
        }

        self.live -= 1;
        Ok(Some((self.current >> self.live) & 1))
    }
}

impl<R: Read + Seek> BitReader<R> {
    /// Positions the reader so that the next bit returned is `bit`.
    pub fn seek_to_bit(&mut self, bit: u64) -> std::io::Result<()> {
        self.byte_offset = self.inner.seek(SeekFrom::Start(bit >> 3))?;
        self.live = 0;

        for _ in 0..(bit & 7) {
            if self.next_bit()?.is_none() {
                break;
            }
        }

        Ok(())
    }
}

/// Packs bits into a caller supplied buffer without ever growing it.
///
/// All packing state lives in the writer, a fresh writer starts with an
/// empty accumulator.
pub struct BitWriter<'a> {
    out: &'a mut [u8],
    written: usize,
    pending: u8,
    live: u8,
}

impl<'a> BitWriter<'a> {
    pub fn new(out: &'a mut [u8]) -> Self {
        Self {
            out,
            written: 0,
            pending: 0,
            live: 0,
        }
    }

    pub fn put_bit(&mut self, bit: u8) -> Result<()> {
        self.pending = (self.pending << 1) | (bit & 1);
        self.live += 1;

        if self.live == 8 {
            self.emit()?;
        }

        Ok(())
    }

    pub fn put_byte(&mut self, value: u8) -> Result<()> {
        for shift in (0..8).rev() {
            self.put_bit(value >> shift)?;
        }
        Ok(())
    }

    pub fn put_bytes(&mut self, values: &[u8]) -> Result<()> {
        values.iter().try_for_each(|&value| self.put_byte(value))
    }

    /// Writes all 32 bits high to low regardless of host endianness.
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        for shift in (0..32).rev() {
            self.put_bit(((value >> shift) & 1) as u8)?;
        }
        Ok(())
    }

    /// Zero pads a partial byte up to a full one. No-op on a byte boundary.
    pub fn flush(&mut self) -> Result<()> {
        if self.live > 0 {
            self.pending <<= 8 - self.live;
            self.emit()?;
        }
        Ok(())
    }

    /// Number of complete bytes emitted so far.
    pub fn bytes_written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.written)
    }

    fn emit(&mut self) -> Result<()> {
        let Some(slot) = self.out.get_mut(self.written) else {
            return Err(RecoverError::OutputBufferFull {
                needed: self.written as u64 + 1,
                capacity: self.out.len() as u64,
            });
        };

        *slot = self.pending;
        self.written += 1;
        self.pending = 0;
        self.live = 0;
        Ok(())
    }
}
