//! Sparse file region model and GNU sparse format variants.
//!
//! `SparseFormat` is ported from `sparse_format.rs`'s version
//! detector. The old-GNU in-header sparse instruction layout and the PAX
//! `GNU.sparse.map` decimal-pair grammar are grounded in
//! `gnu_sparse_1_0_parser.rs` and `tar_constants.rs`'s `GnuSparseInstruction`,
//! re-expressed over fully-buffered payloads (see `format::pax` for why).

use alloc::{
  format,
  string::{String, ToString},
  vec::Vec,
};

use thiserror::Error;

/// Which GNU sparse encoding a header/PAX record claims to use.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SparseFormat {
  /// Pre-PAX in-header sparse map (typeflag `S`), no major/minor markers.
  GnuOld,
  Gnu0_0,
  Gnu0_1,
  Gnu1_0,
  GnuUnknown { major: u32, minor: u32 },
}

impl SparseFormat {
  #[must_use]
  pub fn try_from_gnu_version(major: Option<u32>, minor: Option<u32>) -> Option<Self> {
    Some(match (major, minor) {
      (Some(0), Some(0) | None) => SparseFormat::Gnu0_0,
      (Some(0) | None, Some(1)) => SparseFormat::Gnu0_1,
      (Some(1), Some(0)) => SparseFormat::Gnu1_0,
      (None, None) => return None,
      (major, minor) => SparseFormat::GnuUnknown {
        major: major.unwrap_or(0),
        minor: minor.unwrap_or(0),
      },
    })
  }

  #[must_use]
  pub fn version_string(self) -> String {
    match self {
      SparseFormat::GnuOld => "gnu_old".to_string(),
      SparseFormat::Gnu0_0 => "gnu_0.0".to_string(),
      SparseFormat::Gnu0_1 => "gnu_0.1".to_string(),
      SparseFormat::Gnu1_0 => "gnu_1.0".to_string(),
      SparseFormat::GnuUnknown { major, minor } => format!("gnu_{major}.{minor}"),
    }
  }
}

/// One `(offset, numbytes)` data region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparseRegion {
  pub offset: u64,
  pub numbytes: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SparseMapError {
  #[error("sparse map entry is not a valid decimal number")]
  InvalidNumber,
  #[error("sparse map has an odd number of comma-separated values")]
  OddFieldCount,
}

/// Parses the PAX 1.0 `GNU.sparse.map` value: comma-separated
/// `off,len,off,len,...` pairs.
pub fn parse_sparse_map_1_0(value: &str) -> Result<Vec<SparseRegion>, SparseMapError> {
  let mut regions = Vec::new();
  let mut parts = value.split(',');
  loop {
    let Some(offset_str) = parts.next() else { break };
    if offset_str.is_empty() && regions.is_empty() {
      break;
    }
    let numbytes_str = parts.next().ok_or(SparseMapError::OddFieldCount)?;
    let offset: u64 = offset_str.parse().map_err(|_| SparseMapError::InvalidNumber)?;
    let numbytes: u64 = numbytes_str.parse().map_err(|_| SparseMapError::InvalidNumber)?;
    regions.push(SparseRegion { offset, numbytes });
  }
  Ok(regions)
}

/// Emits the PAX 1.0 sparse map value for `regions`.
#[must_use]
pub fn emit_sparse_map_1_0(regions: &[SparseRegion]) -> String {
  let mut parts = Vec::with_capacity(regions.len() * 2);
  for r in regions {
    parts.push(r.offset.to_string());
    parts.push(r.numbytes.to_string());
  }
  parts.join(",")
}

/// Old-GNU (typeflag `S`) in-header sparse instruction: a 12-byte octal
/// offset and a 12-byte octal size, repeated up to 4 times in the header
/// and 21 times per extension header, per `tar_constants.rs`'s
/// `GnuSparseInstruction`/`GnuHeaderExtSparse`.
pub const OLDGNU_SPARSE_IN_HEADER: usize = 4;
pub const OLDGNU_SPARSE_IN_EXTENSION: usize = 21;

/// Physical size (archive bytes before block padding) implied by a set of
/// regions.
#[must_use]
pub fn physical_size(regions: &[SparseRegion]) -> u64 {
  regions.iter().map(|r| r.numbytes).sum()
}

/// `is_worthy`: sparse encoding pays off when the physical
/// size is less than 90% of the logical size, or there is more than one
/// data region.
#[must_use]
pub fn is_worthy(regions: &[SparseRegion], logical_size: u64) -> bool {
  if regions.len() > 1 {
    return true;
  }
  if logical_size == 0 {
    return false;
  }
  let physical = physical_size(regions);
  physical * 10 < logical_size * 9
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_comma_separated_pairs() {
    let regions = parse_sparse_map_1_0("1024,512,8192,2048,16384,0").unwrap();
    assert_eq!(
      regions,
      alloc::vec![
        SparseRegion { offset: 1024, numbytes: 512 },
        SparseRegion { offset: 8192, numbytes: 2048 },
        SparseRegion { offset: 16384, numbytes: 0 },
      ]
    );
  }

  #[test]
  fn emit_parse_round_trip() {
    let regions = alloc::vec![
      SparseRegion { offset: 0, numbytes: 100 },
      SparseRegion { offset: 500, numbytes: 50 },
    ];
    let emitted = emit_sparse_map_1_0(&regions);
    assert_eq!(parse_sparse_map_1_0(&emitted).unwrap(), regions);
  }

  #[test]
  fn worthy_when_physical_under_90_percent_or_multi_region() {
    assert!(is_worthy(&[SparseRegion { offset: 0, numbytes: 10 }], 1000));
    assert!(is_worthy(
      &[
        SparseRegion { offset: 0, numbytes: 500 },
        SparseRegion { offset: 600, numbytes: 500 },
      ],
      1000
    ));
    assert!(!is_worthy(&[SparseRegion { offset: 0, numbytes: 950 }], 1000));
  }
}
