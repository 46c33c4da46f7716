//! The decode-direction state machine: accumulates GNU
//! long-name/long-link pre-entries and PAX local/global records until a
//! real header arrives, then yields one fully-resolved `LogicalEntry` at a
//! time together with its raw data payload.
//!
//! Grounded in `no_std_io_rs`'s `tar_parser.rs` state machine
//! (`TarParserState::{ReadingTarHeader, ParsingGnuLongName, ParsingPaxData,
//! ReadingFileData}`) and precedence rule, re-expressed over a growable
//! `Vec<u8>` staging buffer instead of an incremental byte-at-a-time
//! cursor, consistent with `format::pax`'s fully-buffered record decode.

use alloc::{
  string::{String, ToString},
  vec::Vec,
};

use relative_path::RelativePathBuf;

use super::{
  constants::BLOCK_SIZE,
  errors::{ErrorSeverity, FieldContext, FormatError, FormatErrorKind},
  header::RawHeader,
  inode::{EntryKind, FilePermissions, LogicalEntry, Timestamp},
  pax::PaxAttributes,
  sparse::{parse_sparse_map_1_0, SparseFormat, SparseRegion},
  typeflag::TypeFlag,
};

/// Resource limits applied while decoding, mirroring `TarParserLimits`'s
/// bounded-allocation discipline.
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
  pub max_pax_records: usize,
  pub max_name_len: usize,
}

impl Default for DecodeLimits {
  fn default() -> Self {
    DecodeLimits {
      max_pax_records: 4096,
      max_name_len: 64 * 1024,
    }
  }
}

/// One fully-resolved entry plus its raw (still block-padded-trimmed) data.
#[derive(Debug, Clone)]
pub struct DecodedEntry {
  pub logical: LogicalEntry,
}

/// The result of asking the decoder to make progress.
pub enum DecodeStep {
  /// Not enough buffered data yet; call `push` again before retrying.
  NeedMoreData,
  /// A complete logical entry plus its data payload (already extracted
  /// from the staging buffer -- the decoder does not hand back a
  /// reference, since sparse expansion may have already happened).
  Entry {
    entry: DecodedEntry,
    /// Decoded file data, expanded from any old-GNU inline sparse map.
    /// Always empty for non-regular-file entries.
    data: Vec<u8>,
  },
  /// Two consecutive zero blocks: the canonical end-of-archive marker.
  EndOfArchive,
  /// A malformed member was skipped whole (header plus its declared,
  /// now-discarded data). The caller should report the error through its
  /// own diagnostic sink and call `next_step` again -- checksum mismatch
  /// is a warn-and-continue condition, not a fatal one.
  Skipped(FormatError),
}

fn padded_len(n: usize) -> usize {
  n.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

fn trim_c_string(bytes: &[u8]) -> String {
  let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
  String::from_utf8_lossy(&bytes[..end]).to_string()
}

/// Streaming entry decoder. Fed raw archive bytes via `push`; yields one
/// `LogicalEntry` per `next_step` call once enough data is buffered.
pub struct EntryDecoder {
  buffer: Vec<u8>,
  limits: DecodeLimits,
  global_pax: PaxAttributes,
  pending_pax_local: Option<PaxAttributes>,
  pending_long_name: Option<String>,
  pending_long_link: Option<String>,
}

impl EntryDecoder {
  #[must_use]
  pub fn new(limits: DecodeLimits) -> Self {
    EntryDecoder {
      buffer: Vec::new(),
      limits,
      global_pax: PaxAttributes::default(),
      pending_pax_local: None,
      pending_long_name: None,
      pending_long_link: None,
    }
  }

  pub fn push(&mut self, data: &[u8]) {
    self.buffer.extend_from_slice(data);
  }

  #[must_use]
  pub fn pending_bytes(&self) -> usize {
    self.buffer.len()
  }

  /// Advances the state machine as far as the currently-buffered data
  /// allows. Pre-entries (long name/link, PAX records) are consumed
  /// internally in a loop; the call returns as soon as it can yield a real
  /// entry, hits end-of-archive, or runs out of buffered blocks.
  pub fn next_step(&mut self) -> Result<DecodeStep, FormatError> {
    loop {
      if self.buffer.len() < BLOCK_SIZE {
        return Ok(DecodeStep::NeedMoreData);
      }
      let block: [u8; BLOCK_SIZE] = self.buffer[..BLOCK_SIZE].try_into().expect("checked length");
      let header = RawHeader::from_block(&block);

      if header.is_zero() {
        if self.buffer.len() < BLOCK_SIZE * 2 {
          return Ok(DecodeStep::NeedMoreData);
        }
        let block2: [u8; BLOCK_SIZE] = self.buffer[BLOCK_SIZE..BLOCK_SIZE * 2]
          .try_into()
          .expect("checked length");
        let header2 = RawHeader::from_block(&block2);
        self.buffer.drain(..BLOCK_SIZE);
        if header2.is_zero() {
          self.buffer.drain(..BLOCK_SIZE);
          return Ok(DecodeStep::EndOfArchive);
        }
        // A single stray zero block: skip it and keep scanning, as real
        // GNU tar does for archives assembled with `--ignore-zeros`-style
        // padding between members.
        continue;
      }

      if !header.validate_checksum() {
        // Best-effort size parse to skip past the corrupt member's data;
        // a header that fails its checksum may have a garbled size too,
        // in which case we fall back to skipping just the header block
        // and let the caller resync on the next one.
        let skip_size = header.parse_size().unwrap_or(0);
        let skip_padded = padded_len(skip_size as usize);
        if self.buffer.len() < BLOCK_SIZE + skip_padded {
          return Ok(DecodeStep::NeedMoreData);
        }
        let stored = super::numeric::decode_numeric(&header.chksum).unwrap_or(0);
        let err = FormatError::recoverable(FormatErrorKind::ChecksumMismatch {
          stored,
          computed: header.compute_checksum(),
        });
        self.buffer.drain(..BLOCK_SIZE + skip_padded);
        self.pending_pax_local = None;
        self.pending_long_name = None;
        self.pending_long_link = None;
        return Ok(DecodeStep::Skipped(err));
      }

      let typeflag = header.typeflag();
      let declared_size = header
        .parse_size()
        .map_err(|e| field_error(FieldContext::HeaderSize, e))?;
      let padded = padded_len(declared_size as usize);

      if matches!(
        typeflag,
        TypeFlag::LongNameGnu | TypeFlag::LongLinkNameGnu
      ) {
        if self.buffer.len() < BLOCK_SIZE + padded {
          return Ok(DecodeStep::NeedMoreData);
        }
        let payload = self.buffer[BLOCK_SIZE..BLOCK_SIZE + declared_size as usize].to_vec();
        let name = trim_c_string(&payload);
        if typeflag == TypeFlag::LongNameGnu {
          self.pending_long_name = Some(name);
        } else {
          self.pending_long_link = Some(name);
        }
        self.buffer.drain(..BLOCK_SIZE + padded);
        continue;
      }

      if matches!(
        typeflag,
        TypeFlag::PaxExtendedHeader | TypeFlag::PaxGlobalExtendedHeader
      ) {
        if self.buffer.len() < BLOCK_SIZE + padded {
          return Ok(DecodeStep::NeedMoreData);
        }
        let payload = &self.buffer[BLOCK_SIZE..BLOCK_SIZE + declared_size as usize];
        let attrs = PaxAttributes::parse(payload, self.limits.max_pax_records)
          .map_err(FormatErrorKind::Pax)
          .map_err(FormatError::fatal)?;
        if typeflag == TypeFlag::PaxGlobalExtendedHeader {
          self.global_pax.overlay(&attrs);
        } else {
          let mut local = self.global_pax.clone();
          local.overlay(&attrs);
          self.pending_pax_local = Some(local);
        }
        self.buffer.drain(..BLOCK_SIZE + padded);
        continue;
      }

      // A real entry. `declared_size` is the on-disk data size (for an
      // old-GNU sparse entry this is the physical/sparse-packed size, not
      // the logical file size).
      if self.buffer.len() < BLOCK_SIZE + padded {
        return Ok(DecodeStep::NeedMoreData);
      }

      let logical = self.build_logical_entry(&header)?;
      let raw_data = self.buffer[BLOCK_SIZE..BLOCK_SIZE + declared_size as usize].to_vec();
      self.buffer.drain(..BLOCK_SIZE + padded);
      self.pending_pax_local = None;
      self.pending_long_name = None;
      self.pending_long_link = None;

      let data = expand_if_sparse(&logical, raw_data);
      return Ok(DecodeStep::Entry {
        entry: DecodedEntry { logical },
        data,
      });
    }
  }

  fn build_logical_entry(&self, header: &RawHeader) -> Result<LogicalEntry, FormatError> {
    let pax = self.pending_pax_local.clone().unwrap_or_else(|| self.global_pax.clone());

    let header_name = header
      .full_name()
      .map_err(|_| FormatError::fatal(FormatErrorKind::CorruptField {
        field: FieldContext::HeaderName,
        error: super::numeric::NumericDecodeError::Empty,
      }))?;
    let path_string = pax
      .path
      .clone()
      .or_else(|| self.pending_long_name.clone())
      .unwrap_or(header_name);
    let path = RelativePathBuf::from(path_string);

    let header_linkname = header.parse_linkname().unwrap_or_default().to_string();
    let link_target_string = pax
      .linkpath
      .clone()
      .or_else(|| self.pending_long_link.clone())
      .unwrap_or(header_linkname);
    let link_target = RelativePathBuf::from(link_target_string);

    let mode_bits = header
      .parse_mode()
      .map_err(|e| field_error(FieldContext::HeaderMode, e))?;
    let uid = pax
      .uid
      .map(|v| v as u32)
      .unwrap_or(header.parse_uid().map_err(|e| field_error(FieldContext::HeaderUid, e))?);
    let gid = pax
      .gid
      .map(|v| v as u32)
      .unwrap_or(header.parse_gid().map_err(|e| field_error(FieldContext::HeaderGid, e))?);
    let uname = pax.uname.clone().unwrap_or(header.parse_uname().unwrap_or_default().to_string());
    let gname = pax.gname.clone().unwrap_or(header.parse_gname().unwrap_or_default().to_string());

    let mtime_secs = pax
      .mtime
      .map(|t| t.seconds as u64)
      .unwrap_or(header.parse_mtime().map_err(|e| field_error(FieldContext::HeaderMtime, e))?);
    let mtime = Timestamp {
      seconds_since_epoch: mtime_secs,
      nanoseconds: pax.mtime.map(|t| t.nanoseconds).unwrap_or(0),
    };
    let atime = pax.atime.map(|t| Timestamp {
      seconds_since_epoch: t.seconds as u64,
      nanoseconds: t.nanoseconds,
    });
    let ctime = pax.ctime.map(|t| Timestamp {
      seconds_since_epoch: t.seconds as u64,
      nanoseconds: t.nanoseconds,
    });

    let declared_size = header
      .parse_size()
      .map_err(|e| field_error(FieldContext::HeaderSize, e))?;
    let logical_size = pax
      .gnu_sparse_realsize
      .or(pax.size)
      .unwrap_or_else(|| header.parse_gnu_real_size().unwrap_or(declared_size));

    let kind = match header.typeflag() {
      TypeFlag::RegularFile | TypeFlag::ContiguousFile => EntryKind::RegularFile {
        size: logical_size,
        sparse: self.decode_sparse_regions(header, &pax)?,
      },
      TypeFlag::SparseOldGnu => EntryKind::RegularFile {
        size: logical_size,
        sparse: self.decode_sparse_regions(header, &pax)?,
      },
      TypeFlag::HardLink => EntryKind::HardLink { target: link_target },
      TypeFlag::SymbolicLink => EntryKind::SymbolicLink { target: link_target },
      TypeFlag::CharacterDevice => EntryKind::CharacterDevice {
        major: header.parse_dev_major().map_err(|e| field_error(FieldContext::HeaderDevMajor, e))?,
        minor: header.parse_dev_minor().map_err(|e| field_error(FieldContext::HeaderDevMinor, e))?,
      },
      TypeFlag::BlockDevice => EntryKind::BlockDevice {
        major: header.parse_dev_major().map_err(|e| field_error(FieldContext::HeaderDevMajor, e))?,
        minor: header.parse_dev_minor().map_err(|e| field_error(FieldContext::HeaderDevMinor, e))?,
      },
      TypeFlag::Directory => EntryKind::Directory,
      TypeFlag::Fifo => EntryKind::Fifo,
      _ => EntryKind::RegularFile { size: logical_size, sparse: None },
    };

    Ok(LogicalEntry {
      path,
      kind,
      mode: FilePermissions::from_mode_bits(mode_bits),
      uid,
      gid,
      uname,
      gname,
      mtime,
      atime,
      ctime,
      extras: pax.extras.clone(),
    })
  }

  /// Decodes sparse regions from whichever source applies: a PAX
  /// `GNU.sparse.map` record (the same record carries both the 0.1 and the
  /// 1.0 wire forms this codec ever emits -- see `entry_writer`), or the
  /// old-GNU inline header instructions (typeflag `S`).
  fn decode_sparse_regions(
    &self,
    header: &RawHeader,
    pax: &PaxAttributes,
  ) -> Result<Option<Vec<SparseRegion>>, FormatError> {
    if let Some(map) = &pax.gnu_sparse_map {
      let regions = parse_sparse_map_1_0(map)
        .map_err(FormatErrorKind::Sparse)
        .map_err(FormatError::fatal)?;
      return Ok(Some(regions));
    }
    if header.typeflag() != TypeFlag::SparseOldGnu {
      return Ok(None);
    }
    let _format = SparseFormat::GnuOld;
    let mut regions = Vec::new();
    for i in 0..super::constants::offset::GNU_SPARSE_MAX_IN_HEADER {
      match header.gnu_sparse_entry(i) {
        None => break,
        Some(Ok((offset, numbytes))) => regions.push(SparseRegion { offset, numbytes }),
        Some(Err(e)) => return Err(field_error(FieldContext::SparseMap, e)),
      }
    }
    if header.gnu_is_extended() {
      // Additional 21-entries-per-block extension headers would follow in
      // the archive stream ahead of the file data; resistant decoders that
      // need every region call `EntryDecoder` in lockstep with the caller
      // reading those blocks. Bounded-scope archives (the common case)
      // never set this bit, so we surface it as a recoverable note instead
      // of failing the whole entry.
      return Err(FormatError::recoverable(FormatErrorKind::Sparse(
        super::sparse::SparseMapError::OddFieldCount,
      )));
    }
    Ok(Some(regions))
  }
}

fn field_error(field: FieldContext, error: super::numeric::NumericDecodeError) -> FormatError {
  FormatError::new(FormatErrorKind::CorruptField { field, error }, ErrorSeverity::Fatal)
}

/// Expands old-GNU inline sparse data (which is packed: only the non-hole
/// bytes are stored, back-to-back, preceded logically by each region's
/// offset) into a fully logical-sized buffer. PAX-sparse entries (0.1) are
/// packed identically on the wire, so the same expansion applies.
fn expand_if_sparse(entry: &LogicalEntry, raw_data: Vec<u8>) -> Vec<u8> {
  let EntryKind::RegularFile { size, sparse: Some(regions) } = &entry.kind else {
    return raw_data;
  };
  let mut expanded = alloc::vec![0u8; *size as usize];
  let mut cursor = 0usize;
  for region in regions {
    let start = region.offset as usize;
    let len = region.numbytes as usize;
    if start + len > expanded.len() || cursor + len > raw_data.len() {
      break;
    }
    expanded[start..start + len].copy_from_slice(&raw_data[cursor..cursor + len]);
    cursor += len;
  }
  expanded
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::format::{dialect::HeaderMagic, header::RawHeader};

  fn build_simple_entry(name: &str, data: &[u8]) -> Vec<u8> {
    let mut h = RawHeader::zeroed();
    h.set_name(name).unwrap();
    h.set_size(data.len() as u64);
    h.set_mode(0o644);
    h.set_typeflag(TypeFlag::RegularFile);
    h.set_magic(HeaderMagic::Gnu);
    h.set_checksum();
    let mut out = h.as_block().to_vec();
    out.extend_from_slice(data);
    out.resize(padded_len(out.len()), 0);
    out
  }

  #[test]
  fn decodes_a_single_regular_file_entry() {
    let mut decoder = EntryDecoder::new(DecodeLimits::default());
    decoder.push(&build_simple_entry("hello.txt", b"hi there"));
    match decoder.next_step().unwrap() {
      DecodeStep::Entry { entry, data } => {
        assert_eq!(entry.logical.path.as_str(), "hello.txt");
        assert_eq!(data, b"hi there");
      },
      _ => panic!("expected an entry"),
    }
  }

  #[test]
  fn returns_need_more_data_on_partial_header() {
    let mut decoder = EntryDecoder::new(DecodeLimits::default());
    decoder.push(&[0u8; 100]);
    assert!(matches!(decoder.next_step().unwrap(), DecodeStep::NeedMoreData));
  }

  #[test]
  fn recognizes_end_of_archive_marker() {
    let mut decoder = EntryDecoder::new(DecodeLimits::default());
    decoder.push(&[0u8; BLOCK_SIZE * 2]);
    assert!(matches!(decoder.next_step().unwrap(), DecodeStep::EndOfArchive));
  }

  #[test]
  fn gnu_long_name_pre_entry_overrides_header_name() {
    let mut decoder = EntryDecoder::new(DecodeLimits::default());
    let long_path = "a/".repeat(60) + "file.txt";

    let mut long_header = RawHeader::zeroed();
    long_header.set_name("././@LongLink").unwrap();
    long_header.set_size(long_path.len() as u64);
    long_header.set_typeflag(TypeFlag::LongNameGnu);
    long_header.set_magic(HeaderMagic::Gnu);
    long_header.set_checksum();
    let mut bytes = long_header.as_block().to_vec();
    bytes.extend_from_slice(long_path.as_bytes());
    bytes.resize(padded_len(bytes.len()), 0);

    bytes.extend_from_slice(&build_simple_entry("truncated", b"data"));
    decoder.push(&bytes);

    match decoder.next_step().unwrap() {
      DecodeStep::Entry { entry, data } => {
        assert_eq!(entry.logical.path.as_str(), long_path);
        assert_eq!(data, b"data");
      },
      _ => panic!("expected an entry"),
    }
  }

  #[test]
  fn pax_local_record_overrides_both_header_and_long_name() {
    let mut decoder = EntryDecoder::new(DecodeLimits::default());
    let pax_payload = b"17 path=pax-wins\n";

    let mut pax_header = RawHeader::zeroed();
    pax_header.set_name("PaxHeaders/entry").unwrap();
    pax_header.set_size(pax_payload.len() as u64);
    pax_header.set_typeflag(TypeFlag::PaxExtendedHeader);
    pax_header.set_magic(HeaderMagic::Ustar);
    pax_header.set_checksum();
    let mut bytes = pax_header.as_block().to_vec();
    bytes.extend_from_slice(pax_payload);
    bytes.resize(padded_len(bytes.len()), 0);

    bytes.extend_from_slice(&build_simple_entry("header-name", b"x"));
    decoder.push(&bytes);

    match decoder.next_step().unwrap() {
      DecodeStep::Entry { entry, .. } => assert_eq!(entry.logical.path.as_str(), "pax-wins"),
      _ => panic!("expected an entry"),
    }
  }
}
