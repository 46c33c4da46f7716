//! Archive-level open/close orchestration.
//!
//! Resolves `Compression::Auto`, wires the block stream over either a
//! plain file or a compressor subprocess pipe, and --
//! note that the archiver must not stall on the kernel pipe buffer --
//! drains the subprocess side on a background thread while the main
//! thread streams blocks through the other side.

use std::{
  fs::{File, OpenOptions},
  io::{self, Read, Write},
  path::Path,
  thread::JoinHandle,
};

use super::{
  block_stream::{StreamBlockReader, StreamBlockWriter},
  compressor::{self, CompressorProcess},
  config::Compression,
};

/// An open archive, ready to stream blocks from.
pub enum ArchiveReader {
  Plain(StreamBlockReader<File>),
  Compressed {
    reader: StreamBlockReader<std::process::ChildStdout>,
    process: CompressorProcess,
    feeder: JoinHandle<io::Result<()>>,
  },
}

impl ArchiveReader {
  pub fn inner(&mut self) -> &mut dyn super::block_stream::BlockReader {
    match self {
      ArchiveReader::Plain(r) => r,
      ArchiveReader::Compressed { reader, .. } => reader,
    }
  }

  /// Waits for the feeder thread and the subprocess to exit cleanly.
  pub fn finish(self) -> io::Result<()> {
    match self {
      ArchiveReader::Plain(_) => Ok(()),
      ArchiveReader::Compressed { process, feeder, .. } => {
        let feed_result = feeder.join().unwrap_or(Ok(()));
        process
          .finish()
          .map_err(|e| io::Error::other(e.to_string()))?;
        feed_result
      },
    }
  }
}

/// Opens `path` for reading, resolving `compression` (sniffing the file's
/// extension and magic bytes when `Auto`).
pub fn open_reader(path: &Path, compression: Compression) -> io::Result<ArchiveReader> {
  let resolved = resolve(path, compression)?;
  let file = File::open(path)?;
  if resolved == Compression::None {
    return Ok(ArchiveReader::Plain(StreamBlockReader::new(file)));
  }

  let mut process = CompressorProcess::spawn_decoder(resolved).map_err(|e| io::Error::other(e.to_string()))?;
  let mut stdin = process.stdin();
  let stdout = process.stdout();
  let feeder = std::thread::spawn(move || -> io::Result<()> {
    let mut file = file;
    io::copy(&mut file, &mut stdin)?;
    drop(stdin);
    Ok(())
  });
  Ok(ArchiveReader::Compressed {
    reader: StreamBlockReader::new(stdout),
    process,
    feeder,
  })
}

fn resolve(path: &Path, compression: Compression) -> io::Result<Compression> {
  if compression != Compression::Auto {
    return Ok(compression);
  }
  let header = compressor::peek_header(path, 6).unwrap_or_default();
  Ok(compressor::resolve_auto(path, &header))
}

/// Rejects a compressed archive for `append`/`update`/`delete`/`concatenate`,
///: a compressor subprocess pipe is not seekable, so these
/// four operations only work against a plain archive file.
pub fn require_uncompressed(path: &Path, compression: Compression) -> io::Result<()> {
  let resolved = resolve(path, compression)?;
  if resolved == Compression::None {
    Ok(())
  } else {
    Err(io::Error::other("archive is compressed; this operation requires an uncompressed archive"))
  }
}

/// An open archive, ready to have blocks written into it.
pub enum ArchiveWriter {
  Plain(StreamBlockWriter<File>),
  Compressed {
    writer: StreamBlockWriter<std::process::ChildStdin>,
    process: CompressorProcess,
    drainer: JoinHandle<io::Result<()>>,
  },
}

impl ArchiveWriter {
  pub fn write_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
    match self {
      ArchiveWriter::Plain(w) => w.write_bytes(buf),
      ArchiveWriter::Compressed { writer, .. } => writer.write_bytes(buf),
    }
  }

  pub fn write_header(&mut self, header_bytes: &[u8]) -> io::Result<()> {
    self.write_bytes(header_bytes)
  }

  pub fn write_data(&mut self, size: u64, source: &mut dyn Read) -> io::Result<()> {
    match self {
      ArchiveWriter::Plain(w) => w.write_data(size, source),
      ArchiveWriter::Compressed { writer, .. } => writer.write_data(size, source),
    }
  }

  pub fn write_end_of_archive(&mut self) -> io::Result<()> {
    match self {
      ArchiveWriter::Plain(w) => w.write_end_of_archive(),
      ArchiveWriter::Compressed { writer, .. } => writer.write_end_of_archive(),
    }
  }

  /// Flushes, closes the compressor's stdin (if any), and waits for the
  /// drain thread and subprocess to finish
  /// `finish()` contract.
  pub fn finish(self) -> io::Result<()> {
    match self {
      ArchiveWriter::Plain(w) => {
        w.finish()?;
        Ok(())
      },
      ArchiveWriter::Compressed { writer, process, drainer } => {
        writer.finish()?;
        process.finish().map_err(|e| io::Error::other(e.to_string()))?;
        drainer.join().unwrap_or(Ok(()))
      },
    }
  }
}

/// Opens `path` for writing (truncating unless `append`), resolving
/// `compression` by extension when `Auto`.
pub fn open_writer(path: &Path, compression: Compression, append: bool) -> io::Result<ArchiveWriter> {
  let resolved = if compression == Compression::Auto {
    let by_ext = compressor::detect_by_extension(path);
    by_ext
  } else {
    compression
  };

  let file = OpenOptions::new()
    .create(true)
    .write(true)
    .truncate(!append)
    .open(path)?;

  if resolved == Compression::None {
    return Ok(ArchiveWriter::Plain(StreamBlockWriter::new(file)));
  }

  let mut process = CompressorProcess::spawn_encoder(resolved).map_err(|e| io::Error::other(e.to_string()))?;
  let stdin = process.stdin();
  let mut stdout = process.stdout();
  let drainer = std::thread::spawn(move || -> io::Result<()> {
    let mut file = file;
    io::copy(&mut stdout, &mut file)?;
    Ok(())
  });
  Ok(ArchiveWriter::Compressed {
    writer: StreamBlockWriter::new(stdin),
    process,
    drainer,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::block_stream::BlockReader;

  #[test]
  fn plain_writer_then_reader_round_trips_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.tar");

    let mut writer = open_writer(&path, Compression::None, false).unwrap();
    writer.write_bytes(&[0xAB; 512]).unwrap();
    writer.write_end_of_archive().unwrap();
    writer.finish().unwrap();

    let mut reader = open_reader(&path, Compression::None).unwrap();
    let mut block = [0u8; 512];
    assert_eq!(reader.inner().read_block(&mut block).unwrap(), 512);
    assert_eq!(block, [0xABu8; 512]);
    reader.finish().unwrap();
  }
}
