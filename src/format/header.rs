//! The 512-byte header record: field layout, checksum discipline, and the
//! ustar/GNU prefix-split name-splitting policy.
//!
//! The raw field layout is ported from `V7Header` /
//! `CommonHeaderAdditions` / `UstarHeaderAdditions` zerocopy structs
//! (`tar_constants.rs`), flattened into one 512-byte `#[repr(C)]` record
//! since the core streams one full block at a time rather than
//! incrementally.

use alloc::string::String;
use core::str::Utf8Error;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::format::{
  constants::{find_null_terminator_index, offset, BLOCK_SIZE},
  dialect::HeaderMagic,
  numeric::{decode_numeric, encode_numeric, NumericDecodeError},
  typeflag::TypeFlag,
};

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone)]
#[repr(C)]
pub struct RawHeader {
  pub name: [u8; 100],
  pub mode: [u8; 8],
  pub uid: [u8; 8],
  pub gid: [u8; 8],
  pub size: [u8; 12],
  pub mtime: [u8; 12],
  pub chksum: [u8; 8],
  pub typeflag: u8,
  pub linkname: [u8; 100],
  pub magic_version: [u8; 8],
  pub uname: [u8; 32],
  pub gname: [u8; 32],
  pub devmajor: [u8; 8],
  pub devminor: [u8; 8],
  /// USTAR/PAX `prefix` (155 bytes) or the oldgnu/gnu extension block
  /// (atime/ctime/offset/sparse map/realsize) occupying the same bytes.
  pub prefix_or_gnu: [u8; 155],
  pub padding: [u8; 12],
}

const _: () = assert!(core::mem::size_of::<RawHeader>() == BLOCK_SIZE);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderFieldError {
  #[error("invalid UTF-8 in header field: {0}")]
  InvalidUtf8(Utf8Error),
  #[error("invalid numeric header field: {0}")]
  InvalidNumeric(#[from] NumericDecodeError),
}

impl From<Utf8Error> for HeaderFieldError {
  fn from(value: Utf8Error) -> Self {
    HeaderFieldError::InvalidUtf8(value)
  }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetNameError {
  /// Neither a bare `name` field nor a `prefix`+`name` split fits; the
  /// caller must fall back to an `L` pre-entry (GNU) or `x` pre-entry
  /// (PAX), or reject the path (v7).
  #[error("path does not fit in the header's name/prefix fields")]
  NameTooLong,
}

fn parse_c_str(bytes: &[u8]) -> Result<&str, Utf8Error> {
  let end = find_null_terminator_index(bytes);
  core::str::from_utf8(&bytes[..end])
}

fn write_c_str(out: &mut [u8], value: &str) {
  out.fill(0);
  let bytes = value.as_bytes();
  let n = bytes.len().min(out.len());
  out[..n].copy_from_slice(&bytes[..n]);
}

impl RawHeader {
  #[must_use]
  pub fn zeroed() -> Self {
    Self::from_block(&[0u8; BLOCK_SIZE])
  }

  #[must_use]
  pub fn as_block(&self) -> &[u8; BLOCK_SIZE] {
    self
      .as_bytes()
      .try_into()
      .expect("RawHeader is exactly one block")
  }

  #[must_use]
  pub fn from_block(block: &[u8; BLOCK_SIZE]) -> Self {
    RawHeader::ref_from_bytes(block)
      .expect("block is exactly sizeof(RawHeader)")
      .clone()
  }

  #[must_use]
  pub fn is_zero(&self) -> bool {
    self.as_bytes().iter().all(|&b| b == 0)
  }

  // --- name / prefix ---

  pub fn parse_name(&self) -> Result<&str, Utf8Error> {
    parse_c_str(&self.name)
  }

  pub fn set_name_field(&mut self, value: &str) {
    write_c_str(&mut self.name, value);
  }

  pub fn parse_prefix(&self) -> Result<&str, Utf8Error> {
    parse_c_str(&self.prefix_or_gnu[..155])
  }

  pub fn set_prefix_field(&mut self, value: &str) {
    write_c_str(&mut self.prefix_or_gnu, value);
  }

  /// Joins `prefix` and `name` per the ustar/PAX split, or returns `name`
  /// alone when there is no prefix.
  pub fn full_name(&self) -> Result<String, Utf8Error> {
    let name = self.parse_name()?;
    let prefix = self.parse_prefix()?;
    if prefix.is_empty() {
      Ok(String::from(name))
    } else {
      Ok(alloc::format!("{prefix}/{name}"))
    }
  }

  /// Implements the set_name contract of : paths <= 100 bytes
  /// go directly in `name`; longer paths are split at the rightmost `/`
  /// such that the prefix is <= 155 bytes and the basename <= 100 bytes.
  /// Otherwise the caller must fall back to a long-name extension.
  pub fn set_name(&mut self, path: &str) -> Result<(), SetNameError> {
    if path.len() <= 100 {
      self.set_name_field(path);
      self.set_prefix_field("");
      return Ok(());
    }
    let bytes = path.as_bytes();
    for (i, &b) in bytes.iter().enumerate().rev() {
      if b != b'/' {
        continue;
      }
      let prefix_len = i;
      let name_len = bytes.len() - i - 1;
      if prefix_len <= 155 && name_len <= 100 && name_len > 0 {
        self.set_prefix_field(&path[..i]);
        self.set_name_field(&path[i + 1..]);
        return Ok(());
      }
    }
    Err(SetNameError::NameTooLong)
  }

  // --- numeric fields ---

  pub fn parse_mode(&self) -> Result<u32, NumericDecodeError> {
    decode_numeric(&self.mode).map(|v| v as u32)
  }

  pub fn set_mode(&mut self, mode: u32) {
    encode_numeric(&mut self.mode, mode as u64);
  }

  pub fn parse_uid(&self) -> Result<u32, NumericDecodeError> {
    decode_numeric(&self.uid).map(|v| v as u32)
  }

  pub fn set_uid(&mut self, uid: u32) {
    encode_numeric(&mut self.uid, uid as u64);
  }

  pub fn parse_gid(&self) -> Result<u32, NumericDecodeError> {
    decode_numeric(&self.gid).map(|v| v as u32)
  }

  pub fn set_gid(&mut self, gid: u32) {
    encode_numeric(&mut self.gid, gid as u64);
  }

  pub fn parse_size(&self) -> Result<u64, NumericDecodeError> {
    decode_numeric(&self.size)
  }

  pub fn set_size(&mut self, size: u64) {
    encode_numeric(&mut self.size, size);
  }

  pub fn parse_mtime(&self) -> Result<u64, NumericDecodeError> {
    decode_numeric(&self.mtime)
  }

  pub fn set_mtime(&mut self, mtime: u64) {
    encode_numeric(&mut self.mtime, mtime);
  }

  pub fn parse_dev_major(&self) -> Result<u32, NumericDecodeError> {
    decode_numeric(&self.devmajor).map(|v| v as u32)
  }

  pub fn set_dev_major(&mut self, v: u32) {
    encode_numeric(&mut self.devmajor, v as u64);
  }

  pub fn parse_dev_minor(&self) -> Result<u32, NumericDecodeError> {
    decode_numeric(&self.devminor).map(|v| v as u32)
  }

  pub fn set_dev_minor(&mut self, v: u32) {
    encode_numeric(&mut self.devminor, v as u64);
  }

  // --- GNU extension fields, aliased onto `prefix_or_gnu` ---

  fn gnu_field(&self, rel: (usize, usize)) -> &[u8] {
    let base = offset::PREFIX.0;
    &self.prefix_or_gnu[(rel.0 - base)..(rel.1 - base)]
  }

  fn gnu_field_mut(&mut self, rel: (usize, usize)) -> &mut [u8] {
    let base = offset::PREFIX.0;
    &mut self.prefix_or_gnu[(rel.0 - base)..(rel.1 - base)]
  }

  pub fn parse_gnu_atime(&self) -> Result<u64, NumericDecodeError> {
    decode_numeric(self.gnu_field(offset::GNU_ATIME))
  }

  pub fn set_gnu_atime(&mut self, v: u64) {
    encode_numeric(self.gnu_field_mut(offset::GNU_ATIME), v);
  }

  pub fn parse_gnu_ctime(&self) -> Result<u64, NumericDecodeError> {
    decode_numeric(self.gnu_field(offset::GNU_CTIME))
  }

  pub fn set_gnu_ctime(&mut self, v: u64) {
    encode_numeric(self.gnu_field_mut(offset::GNU_CTIME), v);
  }

  pub fn parse_gnu_real_size(&self) -> Result<u64, NumericDecodeError> {
    decode_numeric(self.gnu_field(offset::GNU_REALSIZE))
  }

  pub fn set_gnu_real_size(&mut self, v: u64) {
    encode_numeric(self.gnu_field_mut(offset::GNU_REALSIZE), v);
  }

  #[must_use]
  pub fn gnu_is_extended(&self) -> bool {
    let base = offset::PREFIX.0;
    self.prefix_or_gnu[offset::GNU_ISEXTENDED - base] != 0
  }

  pub fn set_gnu_is_extended(&mut self, extended: bool) {
    let base = offset::PREFIX.0;
    self.prefix_or_gnu[offset::GNU_ISEXTENDED - base] = u8::from(extended);
  }

  /// Reads inline old-GNU sparse instruction slot `index` (0..=3). Returns
  /// `None` once `numbytes` is zero, i.e. the slot is unused.
  #[must_use]
  pub fn gnu_sparse_entry(&self, index: usize) -> Option<Result<(u64, u64), NumericDecodeError>> {
    use crate::format::constants::offset::{GNU_SPARSE_BASE, GNU_SPARSE_ENTRY_LEN};
    let base = offset::PREFIX.0;
    let start = GNU_SPARSE_BASE + index * GNU_SPARSE_ENTRY_LEN - base;
    let offset_field = &self.prefix_or_gnu[start..start + 12];
    let numbytes_field = &self.prefix_or_gnu[start + 12..start + 24];
    let offset_val = match decode_numeric(offset_field) {
      Ok(v) => v,
      Err(e) => return Some(Err(e)),
    };
    let numbytes_val = match decode_numeric(numbytes_field) {
      Ok(v) => v,
      Err(e) => return Some(Err(e)),
    };
    if offset_val == 0 && numbytes_val == 0 {
      return None;
    }
    Some(Ok((offset_val, numbytes_val)))
  }

  pub fn set_gnu_sparse_entry(&mut self, index: usize, offset_val: u64, numbytes_val: u64) {
    use crate::format::constants::offset::{GNU_SPARSE_BASE, GNU_SPARSE_ENTRY_LEN};
    let base = offset::PREFIX.0;
    let start = GNU_SPARSE_BASE + index * GNU_SPARSE_ENTRY_LEN - base;
    encode_numeric(&mut self.prefix_or_gnu[start..start + 12], offset_val);
    encode_numeric(&mut self.prefix_or_gnu[start + 12..start + 24], numbytes_val);
  }

  // --- strings ---

  pub fn parse_linkname(&self) -> Result<&str, Utf8Error> {
    parse_c_str(&self.linkname)
  }

  pub fn set_linkname(&mut self, value: &str) {
    write_c_str(&mut self.linkname, value);
  }

  pub fn parse_uname(&self) -> Result<&str, Utf8Error> {
    parse_c_str(&self.uname)
  }

  pub fn set_uname(&mut self, value: &str) {
    write_c_str(&mut self.uname, value);
  }

  pub fn parse_gname(&self) -> Result<&str, Utf8Error> {
    parse_c_str(&self.gname)
  }

  pub fn set_gname(&mut self, value: &str) {
    write_c_str(&mut self.gname, value);
  }

  // --- typeflag / magic ---

  #[must_use]
  pub fn typeflag(&self) -> TypeFlag {
    self.typeflag.into()
  }

  pub fn set_typeflag(&mut self, flag: TypeFlag) {
    self.typeflag = flag.into();
  }

  #[must_use]
  pub fn magic(&self) -> Option<HeaderMagic> {
    HeaderMagic::from_bytes(&self.magic_version)
  }

  pub fn set_magic(&mut self, magic: HeaderMagic) {
    self.magic_version = magic.bytes();
  }

  // --- checksum ---

  /// Sums all 512 bytes treating `chksum` as eight ASCII spaces.
  #[must_use]
  pub fn compute_checksum(&self) -> u64 {
    let block = self.as_block();
    let (start, end) = offset::CHKSUM;
    block
      .iter()
      .enumerate()
      .map(|(i, &b)| if i >= start && i < end { 0x20u64 } else { b as u64 })
      .sum()
  }

  /// Fills `chksum` with spaces, computes the sum, and stores it as
  /// `"%06o\0 "`.
  pub fn set_checksum(&mut self) {
    self.chksum = [b' '; 8];
    let sum = self.compute_checksum();
    let mut digits = [b'0'; 6];
    let mut v = sum;
    for i in (0..6).rev() {
      digits[i] = b'0' + (v & 0x7) as u8;
      v >>= 3;
    }
    self.chksum[..6].copy_from_slice(&digits);
    self.chksum[6] = 0;
    self.chksum[7] = b' ';
  }

  #[must_use]
  pub fn validate_checksum(&self) -> bool {
    match decode_numeric(&self.chksum) {
      Ok(stored) => stored == self.compute_checksum(),
      Err(_) => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decode_then_reencode_is_identity() {
    let mut h = RawHeader::zeroed();
    h.set_name("some/file.txt").unwrap();
    h.set_size(4096);
    h.set_mode(0o644);
    h.set_typeflag(TypeFlag::RegularFile);
    h.set_magic(HeaderMagic::Gnu);
    h.set_checksum();

    let block = *h.as_block();
    let decoded = RawHeader::from_block(&block);
    assert_eq!(decoded.as_bytes(), h.as_bytes());
  }

  #[test]
  fn checksum_round_trip_and_mutation_invalidates() {
    let mut h = RawHeader::zeroed();
    h.set_name("a").unwrap();
    h.set_checksum();
    assert!(h.validate_checksum());
    h.set_mode(0o755);
    assert!(!h.validate_checksum());
    h.set_checksum();
    assert!(h.validate_checksum());
  }

  #[test]
  fn set_name_fits_bare_name_at_100() {
    let mut h = RawHeader::zeroed();
    let path = "a".repeat(100);
    h.set_name(&path).unwrap();
    assert_eq!(h.parse_name().unwrap(), path);
    assert_eq!(h.parse_prefix().unwrap(), "");
  }

  #[test]
  fn set_name_splits_at_prefix_boundary() {
    let mut h = RawHeader::zeroed();
    let prefix = "p".repeat(155);
    let name = "n".repeat(100);
    let path = alloc::format!("{prefix}/{name}");
    h.set_name(&path).unwrap();
    assert_eq!(h.parse_prefix().unwrap(), prefix);
    assert_eq!(h.parse_name().unwrap(), name);
    assert_eq!(h.full_name().unwrap(), path);
  }

  #[test]
  fn set_name_rejects_path_with_no_valid_split() {
    let mut h = RawHeader::zeroed();
    let path = "n".repeat(300);
    assert_eq!(h.set_name(&path), Err(SetNameError::NameTooLong));
  }

  #[test]
  fn is_zero_detects_end_of_archive_block() {
    let h = RawHeader::zeroed();
    assert!(h.is_zero());
  }
}
