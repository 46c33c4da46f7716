//! Block-aligned archive reader/writer.
//!
//! The block-at-a-time contract (`read_block`/`write_bytes`/`write_data`/
//! `write_end_of_archive`) is new (the source crate has no compression or
//! archive-stream concept at this layer), but the buffering discipline --
//! read in fixed chunks, track a byte cursor, never assume a single
//! `read()` fills the caller's buffer -- mirrors
//! `reader_buffered.rs`/`writer_buffered.rs` primitives, here built over
//! `std::io::{Read, Write}` instead of the crate's own no_std IO traits
//! since everything under `ops/` is std-gated.

use std::io::{self, Read, Write};

use crate::format::constants::BLOCK_SIZE;

/// Reads exactly one block, or signals EOF/short-read.
pub trait BlockReader {
  /// Reads into `buf[..512]`. Returns `512` on a full block, `0` at a
  /// clean EOF (no bytes at all), or an error. A partial read (1..512
  /// bytes before EOF) is reported as `InvalidArchive`-worthy: callers
  /// should treat it as truncation.
  fn read_block(&mut self, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<usize>;

  /// Reads `size` logical bytes into `sink`, discarding padding to the
  /// next block boundary afterward.
  fn read_data(&mut self, size: u64, sink: &mut dyn Write) -> io::Result<()> {
    let mut remaining = size;
    let mut block = [0u8; BLOCK_SIZE];
    while remaining > 0 {
      let n = self.read_block(&mut block)?;
      if n < BLOCK_SIZE {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated archive"));
      }
      let take = remaining.min(BLOCK_SIZE as u64) as usize;
      sink.write_all(&block[..take])?;
      remaining -= take as u64;
    }
    Ok(())
  }

  /// Skips `n` blocks; on non-seekable (compressed) sources this must
  /// read and discard them.
  fn skip_blocks(&mut self, n: u64) -> io::Result<()> {
    let mut block = [0u8; BLOCK_SIZE];
    for _ in 0..n {
      let read = self.read_block(&mut block)?;
      if read < BLOCK_SIZE {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated archive"));
      }
    }
    Ok(())
  }
}

/// A `BlockReader` over any `std::io::Read` -- a plain file or a
/// compressor subprocess's stdout.
pub struct StreamBlockReader<R> {
  inner: R,
}

impl<R: Read> StreamBlockReader<R> {
  pub fn new(inner: R) -> Self {
    StreamBlockReader { inner }
  }

  pub fn into_inner(self) -> R {
    self.inner
  }
}

impl<R: Read> BlockReader for StreamBlockReader<R> {
  fn read_block(&mut self, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<usize> {
    let mut total = 0;
    while total < BLOCK_SIZE {
      let n = self.inner.read(&mut buf[total..])?;
      if n == 0 {
        break;
      }
      total += n;
    }
    Ok(total)
  }
}

/// Mirrors `BlockReader` for the write direction.
pub struct StreamBlockWriter<W> {
  inner: W,
  bytes_written: u64,
}

impl<W: Write> StreamBlockWriter<W> {
  pub fn new(inner: W) -> Self {
    StreamBlockWriter {
      inner,
      bytes_written: 0,
    }
  }

  #[must_use]
  pub fn bytes_written(&self) -> u64 {
    self.bytes_written
  }

  pub fn write_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
    self.inner.write_all(buf)?;
    self.bytes_written += buf.len() as u64;
    Ok(())
  }

  /// Writes already-encoded header/pre-entry bytes (see
  /// `format::entry_writer::encode_entry`).
  pub fn write_header(&mut self, header_bytes: &[u8]) -> io::Result<()> {
    self.write_bytes(header_bytes)
  }

  /// Streams `size` bytes from `source`, then pads to the next block
  /// boundary with zeros.
  pub fn write_data(&mut self, size: u64, source: &mut dyn Read) -> io::Result<()> {
    let mut remaining = size;
    let mut buf = [0u8; 64 * 1024];
    while remaining > 0 {
      let take = remaining.min(buf.len() as u64) as usize;
      source.read_exact(&mut buf[..take])?;
      self.write_bytes(&buf[..take])?;
      remaining -= take as u64;
    }
    let padded = (size as usize).div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    let pad_len = padded - size as usize;
    if pad_len > 0 {
      self.write_bytes(&crate::format::constants::ZERO_BLOCK[..pad_len])?;
    }
    Ok(())
  }

  /// Writes the canonical two-zero-block end-of-archive marker.
  pub fn write_end_of_archive(&mut self) -> io::Result<()> {
    self.write_bytes(&crate::format::constants::ZERO_BLOCK)?;
    self.write_bytes(&crate::format::constants::ZERO_BLOCK)
  }

  pub fn finish(mut self) -> io::Result<W> {
    self.inner.flush()?;
    Ok(self.inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn reads_whole_blocks_even_across_short_reads() {
    struct Chunky(Vec<u8>, usize);
    impl Read for Chunky {
      fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(7).min(self.0.len() - self.1);
        buf[..n].copy_from_slice(&self.0[self.1..self.1 + n]);
        self.1 += n;
        Ok(n)
      }
    }
    let data = vec![0xABu8; BLOCK_SIZE];
    let mut reader = StreamBlockReader::new(Chunky(data.clone(), 0));
    let mut block = [0u8; BLOCK_SIZE];
    let n = reader.read_block(&mut block).unwrap();
    assert_eq!(n, BLOCK_SIZE);
    assert_eq!(&block[..], &data[..]);
  }

  #[test]
  fn write_data_pads_to_block_boundary() {
    let mut writer = StreamBlockWriter::new(Cursor::new(Vec::new()));
    let mut source = Cursor::new(b"hi".to_vec());
    writer.write_data(2, &mut source).unwrap();
    let out = writer.finish().unwrap().into_inner();
    assert_eq!(out.len(), BLOCK_SIZE);
    assert_eq!(&out[..2], b"hi");
    assert!(out[2..].iter().all(|&b| b == 0));
  }

  #[test]
  fn end_of_archive_is_two_zero_blocks() {
    let mut writer = StreamBlockWriter::new(Cursor::new(Vec::new()));
    writer.write_end_of_archive().unwrap();
    let out = writer.finish().unwrap().into_inner();
    assert_eq!(out.len(), BLOCK_SIZE * 2);
    assert!(out.iter().all(|&b| b == 0));
  }
}
