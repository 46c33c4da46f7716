//! The encode-direction counterpart to `entry_iterator`: turns a
//! `LogicalEntry` plus its data into a self-contained byte sequence (any
//! pre-entries, the real header, and the padded data) per the create/append
//! semantics those headers encode.
//!
//! There is no direct decode-side analogue to port from (the source crate is decode-only); the
//! header-field population mirrors `format::header`'s `RawHeader` setters,
//! and the long-name/PAX fallback strategy mirrors the precedence rules
//! `entry_iterator` decodes, run in reverse.

use alloc::{
  string::{String, ToString},
  vec::Vec,
};

use super::{
  constants::BLOCK_SIZE,
  dialect::Dialect,
  errors::FormatError,
  header::{RawHeader, SetNameError},
  inode::{EntryKind, LogicalEntry},
  pax::PaxAttributes,
  sparse::{emit_sparse_map_1_0, is_worthy, SparseRegion},
  typeflag::TypeFlag,
};

fn padded_len(n: usize) -> usize {
  n.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

fn pad_to_block(buf: &mut Vec<u8>) {
  let target = padded_len(buf.len());
  buf.resize(target, 0);
}

fn typeflag_for(kind: &EntryKind) -> TypeFlag {
  match kind {
    EntryKind::RegularFile { .. } => TypeFlag::RegularFile,
    EntryKind::HardLink { .. } => TypeFlag::HardLink,
    EntryKind::SymbolicLink { .. } => TypeFlag::SymbolicLink,
    EntryKind::CharacterDevice { .. } => TypeFlag::CharacterDevice,
    EntryKind::BlockDevice { .. } => TypeFlag::BlockDevice,
    EntryKind::Directory => TypeFlag::Directory,
    EntryKind::Fifo => TypeFlag::Fifo,
  }
}

fn link_target(kind: &EntryKind) -> Option<String> {
  match kind {
    EntryKind::HardLink { target } | EntryKind::SymbolicLink { target } => {
      Some(target.as_str().to_string())
    },
    _ => None,
  }
}

/// Packs sparse `regions` out of `logical_data` (the fully-expanded file
/// contents) into the PAX 1.0 wire representation: the concatenated
/// non-hole bytes, in region order, with no in-data preamble. The map
/// itself travels separately in the PAX `GNU.sparse.map` record (see
/// `emit_sparse_map_1_0`), which is what `entry_iterator`'s
/// `decode_sparse_regions` + `expand_if_sparse` expect on the way back in.
fn pack_sparse_data(logical_data: &[u8], regions: &[SparseRegion]) -> Vec<u8> {
  let mut out = Vec::new();
  for r in regions {
    let start = r.offset as usize;
    let len = r.numbytes as usize;
    out.extend_from_slice(&logical_data[start..start + len]);
  }
  out
}

/// Encodes one logical entry (header plus any GNU long-name/PAX
/// pre-entries plus padded data) for `dialect`.
pub fn encode_entry(entry: &LogicalEntry, data: &[u8], dialect: Dialect) -> Result<Vec<u8>, FormatError> {
  let mut out = Vec::new();
  let path = entry.path.as_str().to_string();
  let link = link_target(&entry.kind);

  let mut pax = PaxAttributes::default();
  let mut gnu_long_name: Option<String> = None;
  let mut gnu_long_link: Option<String> = None;

  let mut header = RawHeader::zeroed();
  header.set_magic(dialect.header_magic());
  header.set_typeflag(typeflag_for(&entry.kind));
  header.set_mode(entry.mode.to_mode_bits());
  header.set_uid(entry.uid);
  header.set_gid(entry.gid);
  header.set_mtime(entry.mtime.seconds_since_epoch);
  header.set_uname(truncate(&entry.uname, 32));
  header.set_gname(truncate(&entry.gname, 32));

  if let EntryKind::CharacterDevice { major, minor } | EntryKind::BlockDevice { major, minor } = entry.kind {
    header.set_dev_major(major);
    header.set_dev_minor(minor);
  }

  match header.set_name(&path) {
    Ok(()) => {},
    Err(SetNameError::NameTooLong) => {
      let placeholder = truncate(&path, 100);
      header.set_name_field(placeholder);
      header.set_prefix_field("");
      if dialect.supports_pax_extension() {
        pax.path = Some(path.clone());
      } else if dialect.supports_gnu_long_name() {
        gnu_long_name = Some(path.clone());
      } else {
        return Err(FormatError::fatal(super::errors::FormatErrorKind::NameTooLong { len: path.len() }));
      }
    },
  }

  if let Some(link) = &link {
    if link.len() < 100 {
      header.set_linkname(link);
    } else {
      header.set_linkname(truncate(link, 100));
      if dialect.supports_pax_extension() {
        pax.linkpath = Some(link.clone());
      } else if dialect.supports_gnu_long_name() {
        gnu_long_link = Some(link.clone());
      } else {
        return Err(FormatError::fatal(super::errors::FormatErrorKind::NameTooLong { len: link.len() }));
      }
    }
  }

  let mut payload = Vec::new();
  let mut declared_size;
  if let EntryKind::RegularFile { size, sparse } = &entry.kind {
    declared_size = *size;
    if let Some(regions) = sparse {
      if dialect.supports_sparse_pax_1_0() && is_worthy(regions, *size) {
        payload = pack_sparse_data(data, regions);
        declared_size = payload.len() as u64;
        pax.gnu_sparse_major = Some(1);
        pax.gnu_sparse_minor = Some(0);
        pax.gnu_sparse_realsize = Some(*size);
        pax.gnu_sparse_map = Some(emit_sparse_map_1_0(regions));
        if dialect.supports_pax_extension() {
          pax.size = Some(declared_size);
        } else {
          header.set_gnu_real_size(*size);
        }
      } else {
        payload = data.to_vec();
      }
    } else {
      payload = data.to_vec();
    }
  } else {
    declared_size = 0;
    payload.clear();
  }
  header.set_size(declared_size);

  if !pax.extras.is_empty() || has_well_known(&pax) {
    for (k, v) in &entry.extras {
      if pax.extras.iter().all(|(ek, _)| ek != k) {
        pax.extras.push((k.clone(), v.clone()));
      }
    }
    emit_pax_pre_entry(&mut out, &path, &pax, TypeFlag::PaxExtendedHeader);
  } else if !entry.extras.is_empty() && dialect.supports_pax_extension() {
    let mut extras_only = PaxAttributes::default();
    extras_only.extras = entry.extras.clone();
    emit_pax_pre_entry(&mut out, &path, &extras_only, TypeFlag::PaxExtendedHeader);
  }

  if let Some(name) = &gnu_long_name {
    emit_gnu_pre_entry(&mut out, name, TypeFlag::LongNameGnu);
  }
  if let Some(link) = &gnu_long_link {
    emit_gnu_pre_entry(&mut out, link, TypeFlag::LongLinkNameGnu);
  }

  header.set_checksum();
  out.extend_from_slice(header.as_block());
  out.extend_from_slice(&payload);
  pad_to_block(&mut out);
  Ok(out)
}

fn has_well_known(pax: &PaxAttributes) -> bool {
  pax.path.is_some()
    || pax.linkpath.is_some()
    || pax.size.is_some()
    || pax.gnu_sparse_major.is_some()
    || pax.gnu_sparse_map.is_some()
}

fn truncate(s: &str, max: usize) -> &str {
  if s.len() <= max {
    s
  } else {
    // Fall back to the nearest char boundary at or below `max` so we
    // never split a multi-byte UTF-8 sequence.
    let mut end = max;
    while !s.is_char_boundary(end) {
      end -= 1;
    }
    &s[..end]
  }
}

fn emit_pax_pre_entry(out: &mut Vec<u8>, owner_path: &str, pax: &PaxAttributes, typeflag: TypeFlag) {
  let payload = pax.emit();
  let mut header = RawHeader::zeroed();
  header.set_magic(Dialect::Pax.header_magic());
  header.set_typeflag(typeflag);
  let pseudo_name = alloc::format!("PaxHeaders/{owner_path}");
  let _ = header.set_name(truncate(&pseudo_name, 100));
  header.set_mode(0o644);
  header.set_size(payload.len() as u64);
  header.set_checksum();
  out.extend_from_slice(header.as_block());
  out.extend_from_slice(&payload);
  pad_to_block(out);
}

fn emit_gnu_pre_entry(out: &mut Vec<u8>, value: &str, typeflag: TypeFlag) {
  let mut header = RawHeader::zeroed();
  header.set_magic(Dialect::Gnu.header_magic());
  header.set_typeflag(typeflag);
  let _ = header.set_name("././@LongLink");
  header.set_mode(0);
  header.set_size(value.len() as u64 + 1);
  header.set_checksum();
  out.extend_from_slice(header.as_block());
  out.extend_from_slice(value.as_bytes());
  out.push(0);
  pad_to_block(out);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::format::{
    entry_iterator::{DecodeLimits, DecodeStep, EntryDecoder},
    inode::{FilePermissions, Timestamp},
  };
  use relative_path::RelativePathBuf;

  fn sample_entry(path: &str) -> LogicalEntry {
    LogicalEntry {
      path: RelativePathBuf::from(path),
      kind: EntryKind::RegularFile { size: 4, sparse: None },
      mode: FilePermissions::default(),
      uid: 0,
      gid: 0,
      uname: String::new(),
      gname: String::new(),
      mtime: Timestamp::from_seconds(1_700_000_000),
      atime: None,
      ctime: None,
      extras: Vec::new(),
    }
  }

  #[test]
  fn round_trips_a_short_named_entry_through_the_decoder() {
    let entry = sample_entry("short.txt");
    let bytes = encode_entry(&entry, b"data", Dialect::Gnu).unwrap();

    let mut decoder = EntryDecoder::new(DecodeLimits::default());
    decoder.push(&bytes);
    match decoder.next_step().unwrap() {
      DecodeStep::Entry { entry: decoded, data } => {
        assert_eq!(decoded.logical.path.as_str(), "short.txt");
        assert_eq!(data, b"data");
      },
      _ => panic!("expected an entry"),
    }
  }

  #[test]
  fn long_name_round_trips_via_gnu_long_link_pre_entry() {
    let long_path = "d/".repeat(60) + "file.bin";
    let entry = sample_entry(&long_path);
    let bytes = encode_entry(&entry, b"data", Dialect::Gnu).unwrap();

    let mut decoder = EntryDecoder::new(DecodeLimits::default());
    decoder.push(&bytes);
    match decoder.next_step().unwrap() {
      DecodeStep::Entry { entry: decoded, .. } => assert_eq!(decoded.logical.path.as_str(), long_path),
      _ => panic!("expected an entry"),
    }
  }

  #[test]
  fn long_name_round_trips_via_pax_path_record() {
    let long_path = "d/".repeat(60) + "file.bin";
    let entry = sample_entry(&long_path);
    let bytes = encode_entry(&entry, b"data", Dialect::Pax).unwrap();

    let mut decoder = EntryDecoder::new(DecodeLimits::default());
    decoder.push(&bytes);
    match decoder.next_step().unwrap() {
      DecodeStep::Entry { entry: decoded, .. } => assert_eq!(decoded.logical.path.as_str(), long_path),
      _ => panic!("expected an entry"),
    }
  }
}
