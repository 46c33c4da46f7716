//! Shared decode-direction plumbing for `list`/`extract`/`diff`/`update`,
//!: pulls raw blocks off a `BlockReader` and feeds them to
//! `format::entry_iterator::EntryDecoder` until a logical entry or the
//! end-of-archive marker falls out. `delete`/`concatenate` need verbatim
//! bytes instead of a decoded entry and use `ops::raw_scan` in preference
//! to this module.

use std::io;

use crate::format::{
  constants::BLOCK_SIZE, DecodeLimits, DecodeStep, EntryDecoder, LogicalEntry,
};

use super::{block_stream::BlockReader, diagnostics::DiagnosticSink, error::OperationError};

/// Wraps a `BlockReader` with an `EntryDecoder`, surfacing one fully
/// resolved logical entry (plus its data) per call, or `None` at the
/// canonical end-of-archive marker.
pub struct EntryStream<'r> {
  reader: &'r mut dyn BlockReader,
  decoder: EntryDecoder,
  ignore_zeros: bool,
}

impl<'r> EntryStream<'r> {
  #[must_use]
  pub fn new(reader: &'r mut dyn BlockReader, limits: DecodeLimits) -> Self {
    EntryStream {
      reader,
      decoder: EntryDecoder::new(limits),
      ignore_zeros: false,
    }
  }

  /// Under `--ignore-zeros`, a run of zero blocks before genuine EOF is
  /// not itself treated as the archive terminator
  /// `IGNORE_ZEROS` state.
  #[must_use]
  pub fn with_ignore_zeros(mut self, ignore_zeros: bool) -> Self {
    self.ignore_zeros = ignore_zeros;
    self
  }

  /// Pulls the next logical entry, or `Ok(None)` at end-of-archive (either
  /// the two-zero-block marker, or a clean EOF when `ignore_zeros` is set).
  /// A checksum mismatch is reported through `sink` and the offending
  /// member is skipped rather than aborting the scan.
  pub fn next_entry(&mut self, sink: &mut dyn DiagnosticSink) -> io::Result<Option<(LogicalEntry, Vec<u8>)>> {
    loop {
      match self
        .decoder
        .next_step()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?
      {
        DecodeStep::Entry { entry, data } => return Ok(Some((entry.logical, data))),
        DecodeStep::EndOfArchive => return Ok(None),
        DecodeStep::Skipped(error) => {
          sink.warn(&OperationError::ChecksumMismatch { entry: error.to_string() });
        },
        DecodeStep::NeedMoreData => {
          let mut block = [0u8; BLOCK_SIZE];
          let n = self.reader.read_block(&mut block)?;
          if n == 0 {
            // A truncated archive with no terminator; under --ignore-zeros
            // this is the expected shape of a stream assembled without a
            // trailing marker, so treat it as a clean end rather than an
            // error "EOF under ignore_zeros".
            if self.ignore_zeros || self.decoder.pending_bytes() == 0 {
              return Ok(None);
            }
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated archive"));
          }
          self.decoder.push(&block[..n]);
        },
      }
    }
  }
}
