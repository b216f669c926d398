use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

use rand::prelude::*;
use tempfile::NamedTempFile;

use crate::bitio::{BitReader, BitWriter};
use crate::bzip2::{stream_header, Marker};

/// Builds synthetic bzip2-shaped bit streams with markers at known offsets.
#[derive(Default)]
pub struct StreamBuilder {
    bits: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> u64 {
        self.bits.len() as u64
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        for &byte in bytes {
            self.bits.extend((0..8).rev().map(|shift| (byte >> shift) & 1));
        }
        self
    }

    pub fn signature(self) -> Self {
        self.bytes(&stream_header())
    }

    pub fn marker(self, marker: Marker) -> Self {
        self.bytes(&marker.bytes())
    }

    pub fn crc(self, crc: u32) -> Self {
        self.bytes(&crc.to_be_bytes())
    }

    /// Appends `len` pseudo-random bits.
    pub fn payload(mut self, len: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        self.bits.extend((0..len).map(|_| rng.gen::<u8>() & 1));
        self
    }

    /// A complete stream with one block of each given bit length.
    pub fn bzip2_stream(self, block_bits: &[usize]) -> Vec<u8> {
        block_bits
            .iter()
            .enumerate()
            .fold(self.signature(), |builder, (seed, &len)| {
                builder.marker(Marker::BlockHeader).payload(len, seed as u64)
            })
            .marker(Marker::EndOfStream)
            .crc(0x5EED_C0DE)
            .into_bytes()
    }

    /// Packs the bits, zero padding the last byte.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = vec![0u8; self.bits.len().div_ceil(8)];
        let mut writer = BitWriter::new(&mut out);
        for &bit in &self.bits {
            writer.put_bit(bit).unwrap();
        }
        let written = writer.finish().unwrap();
        out.truncate(written);
        out
    }
}

pub fn write_temp(data: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

pub fn bits_of(data: &[u8]) -> Vec<u8> {
    let mut reader = BitReader::new(Cursor::new(data));
    let mut bits = Vec::with_capacity(data.len() * 8);
    while let Some(bit) = reader.next_bit().unwrap() {
        bits.push(bit);
    }
    bits
}

pub fn u32_at(bits: &[u8], offset: usize) -> u32 {
    bits[offset..offset + 32]
        .iter()
        .fold(0, |acc, &bit| acc << 1 | u32::from(bit))
}

/// Reader that is interrupted on its first read and fails hard once its
/// position reaches `fail_at`.
pub struct FlakyReader {
    inner: Cursor<Vec<u8>>,
    interrupted: bool,
    fail_at: u64,
}

impl FlakyReader {
    pub fn new(data: Vec<u8>, fail_at: u64) -> Self {
        Self {
            inner: Cursor::new(data),
            interrupted: false,
            fail_at,
        }
    }
}

impl Read for FlakyReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.interrupted {
            self.interrupted = true;
            return Err(ErrorKind::Interrupted.into());
        }

        let position = self.inner.position();
        if position >= self.fail_at {
            return Err(std::io::Error::other("device went away"));
        }

        let limit = buf.len().min((self.fail_at - position) as usize);
        self.inner.read(&mut buf[..limit])
    }
}

impl Seek for FlakyReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}
