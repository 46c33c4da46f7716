//! Operation-engine-side recoverable-error sink.
//!
//! Generalizes `TarViolationHandler` (decode-side) to the
//! operation engine: checksum mismatches, permission-restore failures, and
//! hard-link fallbacks are reported here instead of aborting the
//! operation.

use crate::ops::error::OperationError;

pub trait DiagnosticSink {
  fn warn(&mut self, error: &OperationError);
}

/// Writes every warning to stderr as it happens, prefixed with the
/// product tag calls for.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
  fn warn(&mut self, error: &OperationError) {
    eprintln!("gtar: {error}");
  }
}

/// Records every warning instead of printing it, for callers that want to
/// inspect them after the operation (tests, GUIs).
#[derive(Debug, Default)]
pub struct CollectingSink {
  pub warnings: Vec<String>,
}

impl CollectingSink {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }
}

impl DiagnosticSink for CollectingSink {
  fn warn(&mut self, error: &OperationError) {
    self.warnings.push(error.to_string());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn collecting_sink_records_messages() {
    let mut sink = CollectingSink::new();
    sink.warn(&OperationError::Cancelled);
    assert_eq!(sink.warnings.len(), 1);
  }
}
