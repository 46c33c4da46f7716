//! Structured decode errors and the violation-handling trait.
//! Ported from `no_std_io_rs`'s `parsing_errors.rs` and
//! `tar_violations.rs`: `TarParserErrorKind`/`CorruptFieldContext` become
//! `FormatErrorKind`/`FieldContext`, and `TarViolationHandler` becomes
//! `DiagnosticSink`.

use core::fmt::Display;

use thiserror::Error;

use super::{numeric::NumericDecodeError, pax::PaxParseError, sparse::SparseMapError};

/// Which header, PAX, or sparse-map field a `CorruptField` error names.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldContext {
  HeaderMagicVersion,
  HeaderChecksum,
  HeaderSize,
  HeaderMode,
  HeaderUid,
  HeaderGid,
  HeaderMtime,
  HeaderName,
  HeaderLinkname,
  HeaderUname,
  HeaderGname,
  HeaderDevMajor,
  HeaderDevMinor,
  HeaderPrefix,
  PaxRecord,
  SparseMap,
}

impl Display for FieldContext {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let s = match self {
      FieldContext::HeaderMagicVersion => "header.magic_version",
      FieldContext::HeaderChecksum => "header.checksum",
      FieldContext::HeaderSize => "header.size",
      FieldContext::HeaderMode => "header.mode",
      FieldContext::HeaderUid => "header.uid",
      FieldContext::HeaderGid => "header.gid",
      FieldContext::HeaderMtime => "header.mtime",
      FieldContext::HeaderName => "header.name",
      FieldContext::HeaderLinkname => "header.linkname",
      FieldContext::HeaderUname => "header.uname",
      FieldContext::HeaderGname => "header.gname",
      FieldContext::HeaderDevMajor => "header.dev_major",
      FieldContext::HeaderDevMinor => "header.dev_minor",
      FieldContext::HeaderPrefix => "header.prefix",
      FieldContext::PaxRecord => "pax.record",
      FieldContext::SparseMap => "sparse.map",
    };
    f.write_str(s)
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatErrorKind {
  #[error("unrecognized header magic/version bytes")]
  UnknownMagicVersion,
  #[error("header checksum mismatch: stored {stored}, computed {computed}")]
  ChecksumMismatch { stored: u64, computed: u64 },
  #[error("field {field} is corrupt: {error}")]
  CorruptField {
    field: FieldContext,
    error: NumericDecodeError,
  },
  #[error("PAX record error: {0}")]
  Pax(#[from] PaxParseError),
  #[error("sparse map error: {0}")]
  Sparse(#[from] SparseMapError),
  #[error("name too long for the selected dialect: {len} bytes")]
  NameTooLong { len: usize },
  #[error("unexpected end of archive: expected {expected} more bytes")]
  UnexpectedEof { expected: usize },
  #[error("two consecutive zero blocks expected at end of archive were missing")]
  MissingEndOfArchive,
}

/// Whether a `FormatErrorKind` can plausibly be skipped over, or ends the
/// archive stream outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
  Fatal,
  Recoverable,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{severity:?} format error: {kind}")]
pub struct FormatError {
  pub kind: FormatErrorKind,
  pub severity: ErrorSeverity,
}

impl FormatError {
  #[must_use]
  pub fn new(kind: FormatErrorKind, severity: ErrorSeverity) -> Self {
    Self { kind, severity }
  }

  #[must_use]
  pub fn fatal(kind: FormatErrorKind) -> Self {
    Self::new(kind, ErrorSeverity::Fatal)
  }

  #[must_use]
  pub fn recoverable(kind: FormatErrorKind) -> Self {
    Self::new(kind, ErrorSeverity::Recoverable)
  }

  #[must_use]
  pub fn is_fatal(&self) -> bool {
    self.severity == ErrorSeverity::Fatal
  }
}

/// Receives every recoverable decode error as it happens and decides
/// whether the entry iterator should keep going.
///
/// Mirrors `TarViolationHandler`: the decision to stop is
/// advisory for recoverable errors and moot for fatal ones, which always
/// end iteration regardless of what `observe` returns.
pub trait DiagnosticSink {
  #[must_use]
  fn observe(&mut self, error: &FormatError) -> bool;
}

/// Stops at the first diagnostic of any severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictSink;

impl DiagnosticSink for StrictSink {
  fn observe(&mut self, _error: &FormatError) -> bool {
    false
  }
}

/// Records every diagnostic and always continues.
#[derive(Debug, Default, Clone)]
pub struct AuditSink {
  pub diagnostics: alloc::vec::Vec<FormatError>,
}

impl AuditSink {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }
}

impl DiagnosticSink for AuditSink {
  fn observe(&mut self, error: &FormatError) -> bool {
    self.diagnostics.push(error.clone());
    true
  }
}

/// Drops every diagnostic and always continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreSink;

impl DiagnosticSink for IgnoreSink {
  fn observe(&mut self, _error: &FormatError) -> bool {
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strict_sink_always_halts() {
    let mut sink = StrictSink;
    let err = FormatError::recoverable(FormatErrorKind::NameTooLong { len: 200 });
    assert!(!sink.observe(&err));
  }

  #[test]
  fn audit_sink_records_and_continues() {
    let mut sink = AuditSink::new();
    let err = FormatError::recoverable(FormatErrorKind::MissingEndOfArchive);
    assert!(sink.observe(&err));
    assert_eq!(sink.diagnostics.len(), 1);
  }
}
