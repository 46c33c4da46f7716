//! Compression-filter subprocess adapter.
//!
//! Grounded in `AOSC-Dev-aoscbootstrap`'s pattern of shelling out to real
//! system tools rather than linking a codec in-process (its `fs.rs`/build
//! scripts invoke `apt`, `dpkg`, etc. the same way); binary discovery uses
//! the `which` crate the way a CLI tool would look up `$PATH`. This is a
//! deliberate departure from an in-process inflate via `miniz_oxide`:
//! this needs the exact `["gzip","-d","-c"]`-style subprocess contract
//! of real GNU tar, which an in-process codec cannot reproduce for
//! bzip2/xz/zstd anyway.

use std::{
  io::{self, Read},
  path::Path,
  process::{Child, Command, Stdio},
};

use thiserror::Error;

use crate::ops::config::Compression;

#[derive(Error, Debug)]
pub enum CompressorError {
  #[error("no `{0}` binary found on PATH")]
  BinaryNotFound(&'static str),
  #[error("failed to spawn `{0}`: {1}")]
  Spawn(&'static str, io::Error),
  #[error("`{0}` exited with a failure status")]
  NonZeroExit(&'static str),
  #[error(transparent)]
  Io(#[from] io::Error),
}

fn program_for(compression: Compression) -> Option<&'static str> {
  match compression {
    Compression::None | Compression::Auto => None,
    Compression::Gzip => Some("gzip"),
    Compression::Bzip2 => Some("bzip2"),
    Compression::Xz => Some("xz"),
    Compression::Zstd => Some("zstd"),
  }
}

/// Extension-based detection, tried before magic-byte sniffing.
#[must_use]
pub fn detect_by_extension(path: &Path) -> Compression {
  let name = path.to_string_lossy();
  if name.ends_with(".gz") || name.ends_with(".tgz") {
    Compression::Gzip
  } else if name.ends_with(".bz2") || name.ends_with(".tbz") {
    Compression::Bzip2
  } else if name.ends_with(".xz") || name.ends_with(".txz") {
    Compression::Xz
  } else if name.ends_with(".zst") || name.ends_with(".tzst") {
    Compression::Zstd
  } else {
    Compression::None
  }
}

/// Magic-byte detection, the fallback when the
/// extension doesn't name a known suffix.
#[must_use]
pub fn detect_by_magic(header: &[u8]) -> Compression {
  if header.starts_with(&[0x1f, 0x8b]) {
    Compression::Gzip
  } else if header.starts_with(b"BZh") {
    Compression::Bzip2
  } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
    Compression::Xz
  } else if header.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
    Compression::Zstd
  } else {
    Compression::None
  }
}

/// Resolves `Compression::Auto` against a known archive path and the
/// first few bytes already read from it.
#[must_use]
pub fn resolve_auto(path: &Path, header: &[u8]) -> Compression {
  let by_ext = detect_by_extension(path);
  if by_ext != Compression::None {
    return by_ext;
  }
  detect_by_magic(header)
}

/// A running compressor subprocess, piping the tar stream through either
/// direction `argv`/stdio contract.
pub struct CompressorProcess {
  child: Child,
  program: &'static str,
}

impl CompressorProcess {
  /// Spawns `program -d -c` to decompress `stdin` into this process's
  /// stdout (which the caller reads the decoded tar stream from).
  pub fn spawn_decoder(compression: Compression) -> Result<Self, CompressorError> {
    Self::spawn(compression, &["-d", "-c"])
  }

  /// Spawns `program -c` to compress data written to stdin, readable back
  /// from stdout.
  pub fn spawn_encoder(compression: Compression) -> Result<Self, CompressorError> {
    Self::spawn(compression, &["-c"])
  }

  fn spawn(compression: Compression, args: &[&str]) -> Result<Self, CompressorError> {
    let program = program_for(compression).expect("spawn called with Compression::None/Auto");
    which::which(program).map_err(|_| CompressorError::BinaryNotFound(program))?;
    let child = Command::new(program)
      .args(args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .spawn()
      .map_err(|e| CompressorError::Spawn(program, e))?;
    Ok(CompressorProcess { child, program })
  }

  #[must_use]
  pub fn stdin(&mut self) -> std::process::ChildStdin {
    self.child.stdin.take().expect("stdin was piped at spawn")
  }

  #[must_use]
  pub fn stdout(&mut self) -> std::process::ChildStdout {
    self.child.stdout.take().expect("stdout was piped at spawn")
  }

  /// Closes stdin (if still held), waits for exit, and reports failure on
  /// a nonzero status `finish()` contract.
  pub fn finish(mut self) -> Result<(), CompressorError> {
    drop(self.child.stdin.take());
    let status = self.child.wait()?;
    if status.success() {
      Ok(())
    } else {
      Err(CompressorError::NonZeroExit(self.program))
    }
  }
}

/// Reads the first `len` bytes of `path` without consuming a stream,
/// for magic-byte sniffing ahead of opening the real archive reader.
pub fn peek_header(path: &Path, len: usize) -> io::Result<Vec<u8>> {
  let mut file = std::fs::File::open(path)?;
  let mut buf = vec![0u8; len];
  let n = file.read(&mut buf)?;
  buf.truncate(n);
  Ok(buf)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  #[test]
  fn detects_gzip_by_extension() {
    assert_eq!(detect_by_extension(&PathBuf::from("a.tar.gz")), Compression::Gzip);
    assert_eq!(detect_by_extension(&PathBuf::from("a.tgz")), Compression::Gzip);
  }

  #[test]
  fn detects_formats_by_magic_bytes() {
    assert_eq!(detect_by_magic(&[0x1f, 0x8b, 0x08]), Compression::Gzip);
    assert_eq!(detect_by_magic(b"BZh91AY"), Compression::Bzip2);
    assert_eq!(
      detect_by_magic(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]),
      Compression::Xz
    );
    assert_eq!(detect_by_magic(&[0x28, 0xb5, 0x2f, 0xfd]), Compression::Zstd);
    assert_eq!(detect_by_magic(b"not compressed"), Compression::None);
  }

  #[test]
  fn extension_takes_priority_over_magic_in_auto_resolve() {
    let resolved = resolve_auto(&PathBuf::from("a.tar.xz"), &[0x1f, 0x8b]);
    assert_eq!(resolved, Compression::Xz);
  }
}
