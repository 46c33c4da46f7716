//! Operation-engine error kinds.
//!
//! Shaped after `TarParserErrorKind`/`TarParserError`'s split
//! (`extended_streams/tar/parsing_errors.rs`): one `thiserror`-derived enum
//! naming every recognized failure mode, each variant carrying enough
//! context to build a "product tag + path" message.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::format::FormatError;

#[derive(Error, Debug)]
pub enum OperationError {
  #[error("no archive path given")]
  MissingArchive,
  #[error("I/O failure on {path}: {source}")]
  Io { path: PathBuf, source: io::Error },
  #[error("invalid archive ({path}): {reason}")]
  InvalidArchive { path: PathBuf, reason: String },
  #[error("checksum mismatch on entry {entry}")]
  ChecksumMismatch { entry: String },
  #[error("unsupported compression for this operation: {0}")]
  UnsupportedCompression(String),
  #[error("name too long for the selected format: {path} ({len} bytes)")]
  NameTooLong { path: PathBuf, len: usize },
  #[error("refusing to overwrite existing file: {path}")]
  OverwriteRefused { path: PathBuf },
  #[error("permission denied: {path}")]
  PermissionDenied { path: PathBuf },
  #[error("operation cancelled")]
  Cancelled,
  #[error("archive decode error: {0}")]
  Format(#[from] FormatError),
}

impl OperationError {
  #[must_use]
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
    OperationError::Io {
      path: path.into(),
      source,
    }
  }

  /// Whether this error should be reported to stderr and the operation
  /// continued, or whether it must abort the operation
  /// "Checksum, permission, and attribute failures ... do not abort."
  #[must_use]
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      OperationError::ChecksumMismatch { .. } | OperationError::PermissionDenied { .. }
    )
  }

  /// The process exit code assigns: 0 success, 1 partial
  /// failure/differences, 2 fatal.
  #[must_use]
  pub fn exit_code(&self) -> i32 {
    if self.is_recoverable() {
      1
    } else {
      2
    }
  }
}
