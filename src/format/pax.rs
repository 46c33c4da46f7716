//! PAX extended-attribute record parser/emitter.
//!
//! Ported in spirit from `pax_parser.rs`: the same
//! recognized-key set (`pax_keys_well_known`) and the same global/local
//! precedence rule (a PAX global entry is sticky until a local value
//! overrides it), but operating over a fully-buffered record payload
//! instead of an incremental byte-at-a-time push parser — the block stream
//! already has the whole `x`/`g` entry's data in hand before records are
//! parsed.

use alloc::{
  string::{String, ToString},
  vec::Vec,
};

use hashbrown::HashMap;
use thiserror::Error;

use crate::traits::LimitedHashMap;

/// Well-known PAX keys.
pub mod keys {
  pub const ATIME: &str = "atime";
  pub const CHARSET: &str = "charset";
  pub const COMMENT: &str = "comment";
  pub const GID: &str = "gid";
  pub const GNAME: &str = "gname";
  pub const HDRCHARSET: &str = "hdrcharset";
  pub const LINKPATH: &str = "linkpath";
  pub const MTIME: &str = "mtime";
  pub const CTIME: &str = "ctime";
  pub const PATH: &str = "path";
  pub const SIZE: &str = "size";
  pub const UID: &str = "uid";
  pub const UNAME: &str = "uname";

  pub mod gnu {
    pub const SPARSE_MAJOR: &str = "GNU.sparse.major";
    pub const SPARSE_MINOR: &str = "GNU.sparse.minor";
    pub const SPARSE_NAME: &str = "GNU.sparse.name";
    pub const SPARSE_REALSIZE: &str = "GNU.sparse.realsize";
    pub const SPARSE_MAP: &str = "GNU.sparse.map";
    pub const SPARSE_SIZE: &str = "GNU.sparse.size";
    pub const SPARSE_NUMBLOCKS: &str = "GNU.sparse.numblocks";
    pub const SPARSE_OFFSET: &str = "GNU.sparse.offset";
    pub const SPARSE_NUMBYTES: &str = "GNU.sparse.numbytes";
  }

  pub const SCHILY_XATTR_PREFIX: &str = "SCHILY.xattr.";
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaxParseError {
  #[error("PAX record length field is not a valid decimal number")]
  CorruptLength,
  #[error("PAX record is missing its `=` separator")]
  CorruptKey,
  #[error("PAX record does not end in a newline at the declared length")]
  CorruptValue,
  #[error("PAX record length {declared} runs past the end of the payload ({available} bytes available)")]
  Truncated { declared: usize, available: usize },
}

/// A fully-parsed PAX attribute payload: well-known keys decoded into typed
/// fields, everything else (including xattr/ACL/SELinux vendor keys)
/// preserved verbatim.
#[derive(Debug, Clone, Default)]
pub struct PaxAttributes {
  pub path: Option<String>,
  pub linkpath: Option<String>,
  pub size: Option<u64>,
  pub uid: Option<u64>,
  pub gid: Option<u64>,
  pub uname: Option<String>,
  pub gname: Option<String>,
  pub mtime: Option<PaxTime>,
  pub atime: Option<PaxTime>,
  pub ctime: Option<PaxTime>,
  pub hdrcharset: Option<String>,
  pub charset: Option<String>,
  pub comment: Option<String>,
  pub gnu_sparse_major: Option<u32>,
  pub gnu_sparse_minor: Option<u32>,
  pub gnu_sparse_name: Option<String>,
  pub gnu_sparse_realsize: Option<u64>,
  pub gnu_sparse_map: Option<String>,
  /// Every record not recognized above, key order preserved, value kept as
  /// raw bytes since vendor keys such as `SCHILY.xattr.*` carry arbitrary
  /// binary data that need not be valid UTF-8.
  pub extras: Vec<(String, Vec<u8>)>,
}

/// `seconds[.nanoseconds]` and the PAX standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaxTime {
  pub seconds: i64,
  pub nanoseconds: u32,
}

impl PaxTime {
  fn parse(value: &str) -> Option<Self> {
    let (sign, rest) = match value.strip_prefix('-') {
      Some(rest) => (-1i64, rest),
      None => (1i64, value),
    };
    let mut parts = rest.splitn(2, '.');
    let seconds: i64 = parts.next()?.parse().ok()?;
    let nanoseconds: u32 = match parts.next() {
      Some(frac) if !frac.is_empty() => {
        let mut digits = frac.to_string();
        digits.truncate(9);
        while digits.len() < 9 {
          digits.push('0');
        }
        digits.parse().ok()?
      },
      _ => 0,
    };
    Some(PaxTime {
      seconds: sign * seconds,
      nanoseconds,
    })
  }

  fn emit(self) -> String {
    if self.nanoseconds == 0 {
      self.seconds.to_string()
    } else {
      alloc::format!("{}.{:09}", self.seconds, self.nanoseconds)
    }
  }
}

/// Whether `key` is one of the typed fields `ingest` handles, as opposed
/// to a vendor/unknown key routed to `extras`.
fn is_well_known(key: &str) -> bool {
  matches!(
    key,
    keys::PATH
      | keys::LINKPATH
      | keys::SIZE
      | keys::UID
      | keys::GID
      | keys::UNAME
      | keys::GNAME
      | keys::MTIME
      | keys::ATIME
      | keys::CTIME
      | keys::HDRCHARSET
      | keys::CHARSET
      | keys::COMMENT
      | keys::gnu::SPARSE_MAJOR
      | keys::gnu::SPARSE_MINOR
      | keys::gnu::SPARSE_NAME
      | keys::gnu::SPARSE_REALSIZE
      | keys::gnu::SPARSE_MAP
  )
}

impl PaxAttributes {
  /// Overlays `other` (a more-local record set) on top of `self`, per the
  /// precedence rule in : later/local values override earlier.
  pub fn overlay(&mut self, other: &PaxAttributes) {
    macro_rules! take {
      ($field:ident) => {
        if other.$field.is_some() {
          self.$field = other.$field.clone();
        }
      };
    }
    take!(path);
    take!(linkpath);
    take!(size);
    take!(uid);
    take!(gid);
    take!(uname);
    take!(gname);
    take!(mtime);
    take!(atime);
    take!(ctime);
    take!(hdrcharset);
    take!(charset);
    take!(comment);
    take!(gnu_sparse_major);
    take!(gnu_sparse_minor);
    take!(gnu_sparse_name);
    take!(gnu_sparse_realsize);
    take!(gnu_sparse_map);
    for (k, v) in &other.extras {
      if let Some(existing) = self.extras.iter_mut().find(|(ek, _)| ek == k) {
        existing.1 = v.clone();
      } else {
        self.extras.push((k.clone(), v.clone()));
      }
    }
  }

  /// Ingests one record for a well-known key, where `value` has already
  /// been validated as UTF-8 by the caller.
  fn ingest(&mut self, key: &str, value: String) {
    match key {
      keys::PATH => self.path = Some(value),
      keys::LINKPATH => self.linkpath = Some(value),
      keys::SIZE => self.size = value.parse().ok(),
      keys::UID => self.uid = value.parse().ok(),
      keys::GID => self.gid = value.parse().ok(),
      keys::UNAME => self.uname = Some(value),
      keys::GNAME => self.gname = Some(value),
      keys::MTIME => self.mtime = PaxTime::parse(&value),
      keys::ATIME => self.atime = PaxTime::parse(&value),
      keys::CTIME => self.ctime = PaxTime::parse(&value),
      keys::HDRCHARSET => self.hdrcharset = Some(value),
      keys::CHARSET => self.charset = Some(value),
      keys::COMMENT => self.comment = Some(value),
      keys::gnu::SPARSE_MAJOR => self.gnu_sparse_major = value.parse().ok(),
      keys::gnu::SPARSE_MINOR => self.gnu_sparse_minor = value.parse().ok(),
      keys::gnu::SPARSE_NAME => self.gnu_sparse_name = Some(value),
      keys::gnu::SPARSE_REALSIZE => self.gnu_sparse_realsize = value.parse().ok(),
      keys::gnu::SPARSE_MAP => self.gnu_sparse_map = Some(value),
      _ => unreachable!("caller routes unknown keys to ingest_extra"),
    }
  }

  /// Ingests a vendor/unknown key with its raw value bytes, no UTF-8
  /// requirement -- `SCHILY.xattr.*` values in particular may contain
  /// arbitrary binary data, including NUL.
  fn ingest_extra(&mut self, key: String, value: Vec<u8>) {
    if let Some(existing) = self.extras.iter_mut().find(|(k, _)| *k == key) {
      existing.1 = value;
    } else {
      self.extras.push((key, value));
    }
  }

  #[must_use]
  pub fn get_extra(&self, key: &str) -> Option<&[u8]> {
    self.extras.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_slice())
  }

  /// Parses a full PAX record payload (the data section of an `x`/`g`
  /// entry) into attributes, bounded by `max_records` to resist maliciously
  /// large record counts, mirroring `TarParserLimits`.
  pub fn parse(payload: &[u8], max_records: usize) -> Result<Self, PaxParseError> {
    let mut attrs = PaxAttributes::default();
    let mut pos = 0usize;
    let mut records = 0usize;
    while pos < payload.len() {
      // skip trailing padding (NULs) after the last record
      if payload[pos] == 0 {
        break;
      }
      records += 1;
      if records > max_records {
        break;
      }
      let space_idx = payload[pos..]
        .iter()
        .position(|&b| b == b' ')
        .ok_or(PaxParseError::CorruptLength)?;
      let len_str = core::str::from_utf8(&payload[pos..pos + space_idx])
        .map_err(|_| PaxParseError::CorruptLength)?;
      let record_len: usize = len_str.parse().map_err(|_| PaxParseError::CorruptLength)?;
      if record_len == 0 || pos + record_len > payload.len() {
        return Err(PaxParseError::Truncated {
          declared: record_len,
          available: payload.len() - pos,
        });
      }
      let record = &payload[pos..pos + record_len];
      let kv = &record[space_idx + 1..record.len() - 1];
      if record[record.len() - 1] != b'\n' {
        return Err(PaxParseError::CorruptValue);
      }
      let eq_idx = kv.iter().position(|&b| b == b'=').ok_or(PaxParseError::CorruptKey)?;
      let key = core::str::from_utf8(&kv[..eq_idx]).map_err(|_| PaxParseError::CorruptKey)?;
      let value_bytes = &kv[eq_idx + 1..];
      if is_well_known(key) {
        let value = core::str::from_utf8(value_bytes).map_err(|_| PaxParseError::CorruptValue)?;
        attrs.ingest(key, value.to_string());
      } else {
        attrs.ingest_extra(key.to_string(), value_bytes.to_vec());
      }
      pos += record_len;
    }
    Ok(attrs)
  }

  /// Emits the attributes as a PAX record payload. Fixed-point length
  /// computation (the `<len>` field counts its own digits), stable
  /// insertion order so round-trips without value changes are
  /// byte-identical.
  #[must_use]
  pub fn emit(&self) -> Vec<u8> {
    let mut out = Vec::new();
    macro_rules! emit_kv {
      ($key:expr, $value:expr) => {
        emit_record(&mut out, $key, &$value);
      };
    }
    if let Some(v) = &self.path {
      emit_kv!(keys::PATH, v);
    }
    if let Some(v) = &self.linkpath {
      emit_kv!(keys::LINKPATH, v);
    }
    if let Some(v) = self.size {
      emit_kv!(keys::SIZE, v.to_string());
    }
    if let Some(v) = self.uid {
      emit_kv!(keys::UID, v.to_string());
    }
    if let Some(v) = self.gid {
      emit_kv!(keys::GID, v.to_string());
    }
    if let Some(v) = &self.uname {
      emit_kv!(keys::UNAME, v);
    }
    if let Some(v) = &self.gname {
      emit_kv!(keys::GNAME, v);
    }
    if let Some(v) = self.mtime {
      emit_kv!(keys::MTIME, v.emit());
    }
    if let Some(v) = self.atime {
      emit_kv!(keys::ATIME, v.emit());
    }
    if let Some(v) = self.ctime {
      emit_kv!(keys::CTIME, v.emit());
    }
    if let Some(v) = &self.charset {
      emit_kv!(keys::CHARSET, v);
    }
    if let Some(v) = &self.comment {
      emit_kv!(keys::COMMENT, v);
    }
    if let Some(v) = self.gnu_sparse_major {
      emit_kv!(keys::gnu::SPARSE_MAJOR, v.to_string());
    }
    if let Some(v) = self.gnu_sparse_minor {
      emit_kv!(keys::gnu::SPARSE_MINOR, v.to_string());
    }
    if let Some(v) = &self.gnu_sparse_name {
      emit_kv!(keys::gnu::SPARSE_NAME, v);
    }
    if let Some(v) = self.gnu_sparse_realsize {
      emit_kv!(keys::gnu::SPARSE_REALSIZE, v.to_string());
    }
    if let Some(v) = &self.gnu_sparse_map {
      emit_kv!(keys::gnu::SPARSE_MAP, v);
    }
    for (k, v) in &self.extras {
      emit_record_bytes(&mut out, k, v);
    }
    out
  }
}

/// Computes the fixed-point `<len>` prefix (it counts its own digits) and
/// appends `"<len> <key>=<value>\n"` to `out`.
fn emit_record(out: &mut Vec<u8>, key: &str, value: &str) {
  emit_record_bytes(out, key, value.as_bytes());
}

/// Same as `emit_record`, but `value` is raw bytes rather than `&str` --
/// used for vendor extras, which may carry non-UTF-8 data.
fn emit_record_bytes(out: &mut Vec<u8>, key: &str, value: &[u8]) {
  // body = " " + key + "=" + value + "\n"
  let body_len = 1 + key.len() + 1 + value.len() + 1;
  let mut len = body_len + decimal_digits(body_len);
  loop {
    let candidate = body_len + decimal_digits(len);
    if candidate == len {
      break;
    }
    len = candidate;
  }
  out.extend_from_slice(len.to_string().as_bytes());
  out.push(b' ');
  out.extend_from_slice(key.as_bytes());
  out.push(b'=');
  out.extend_from_slice(value);
  out.push(b'\n');
}

fn decimal_digits(mut v: usize) -> usize {
  if v == 0 {
    return 1;
  }
  let mut n = 0;
  while v > 0 {
    n += 1;
    v /= 10;
  }
  n
}

/// Unparsed extended attributes collected during parse, preserved for the
/// materializer, bounded the same way the source crate bounds its
/// `unparsed_attributes`/`unparsed_global_attributes` maps.
pub type UnparsedAttributes = LimitedHashMap<String, Vec<u8>>;

#[must_use]
pub fn extras_to_map(attrs: &PaxAttributes, max_keys: usize) -> HashMap<String, Vec<u8>> {
  let mut map = HashMap::new();
  for (k, v) in &attrs.extras {
    map.insert(k.clone(), v.clone());
    if map.len() >= max_keys {
      break;
    }
  }
  map
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn emit_for_path_hello_is_exactly_15_bytes() {
    let mut attrs = PaxAttributes::default();
    attrs.path = Some("hello".to_string());
    let emitted = attrs.emit();
    assert_eq!(emitted, b"15 path=hello\n");
  }

  #[test]
  fn parse_emit_round_trip() {
    let mut attrs = PaxAttributes::default();
    attrs.path = Some("some/file".to_string());
    attrs.size = Some(123);
    attrs.uid = Some(1000);
    let emitted = attrs.emit();
    let parsed = PaxAttributes::parse(&emitted, 64).unwrap();
    assert_eq!(parsed.path.as_deref(), Some("some/file"));
    assert_eq!(parsed.size, Some(123));
    assert_eq!(parsed.uid, Some(1000));
  }

  #[test]
  fn parses_mtime_with_fractional_seconds() {
    let data = b"30 mtime=1749954382.774290089\n";
    let parsed = PaxAttributes::parse(data, 64).unwrap();
    assert_eq!(
      parsed.mtime,
      Some(PaxTime {
        seconds: 1749954382,
        nanoseconds: 774290089
      })
    );
  }

  #[test]
  fn unknown_keys_are_preserved_as_extras() {
    let data = b"21 SCHILY.fflags=bar\n12 uid=1000\n";
    let parsed = PaxAttributes::parse(data, 64).unwrap();
    assert_eq!(parsed.get_extra("SCHILY.fflags"), Some(b"bar".as_slice()));
    assert_eq!(parsed.uid, Some(1000));
  }

  #[test]
  fn vendor_xattr_values_need_not_be_utf8() {
    let key = "SCHILY.xattr.user.blob";
    let value: &[u8] = &[0xff, 0x00, 0xfe, b'a'];
    let mut out = Vec::new();
    emit_record_bytes(&mut out, key, value);
    let parsed = PaxAttributes::parse(&out, 64).unwrap();
    assert_eq!(parsed.get_extra(key), Some(value));
  }

  #[test]
  fn gnu_sparse_map_0_1_value_preserved_for_sparse_module() {
    let data = b"45 GNU.sparse.map=1024,512,8192,2048,16384,0\n";
    let parsed = PaxAttributes::parse(data, 64).unwrap();
    assert_eq!(
      parsed.gnu_sparse_map.as_deref(),
      Some("1024,512,8192,2048,16384,0")
    );
  }

  #[test]
  fn truncated_record_is_an_error() {
    let data = b"500 path=short\n";
    assert!(matches!(
      PaxAttributes::parse(data, 64),
      Err(PaxParseError::Truncated { .. })
    ));
  }
}
