//! Filesystem-facing half of the sparse engine: hole
//! detection by scanning a real file, and hole-preserving extraction via
//! `File::set_len` + seek-and-write. The region model and `is_worthy`
//! policy live in `format::sparse` (no_std); this module is the std-only
//! counterpart that actually touches files.

use std::{
  fs::File,
  io::{self, Read, Seek, SeekFrom, Write},
};

use crate::format::sparse::SparseRegion;

const CHUNK_SIZE: usize = 64 * 1024;

/// Scans `file` (already positioned at the start, `size` bytes long) in
/// 64 KiB chunks, treating an all-zero chunk as a hole. This is a
/// conservative, chunk-granularity approximation: a hole
/// smaller than `CHUNK_SIZE` inside an otherwise-data chunk is reported
/// as data, which is always safe (it just forgoes some compression).
pub fn detect(file: &mut File, size: u64) -> io::Result<Vec<SparseRegion>> {
  file.seek(SeekFrom::Start(0))?;
  let mut regions = Vec::new();
  let mut buf = [0u8; CHUNK_SIZE];
  let mut offset = 0u64;
  let mut in_data = false;
  let mut region_start = 0u64;

  while offset < size {
    let want = (size - offset).min(CHUNK_SIZE as u64) as usize;
    file.read_exact(&mut buf[..want])?;
    let is_hole = buf[..want].iter().all(|&b| b == 0);

    if is_hole && in_data {
      regions.push(SparseRegion {
        offset: region_start,
        numbytes: offset - region_start,
      });
      in_data = false;
    } else if !is_hole && !in_data {
      region_start = offset;
      in_data = true;
    }
    offset += want as u64;
  }
  if in_data {
    regions.push(SparseRegion {
      offset: region_start,
      numbytes: offset - region_start,
    });
  }
  Ok(regions)
}

/// Streams each region's bytes from `file` into `sink`, seeking to
/// `offset` first; does not pad -- the caller's block writer handles
/// padding the total physical output.
pub fn write_data(file: &mut File, regions: &[SparseRegion], sink: &mut dyn Write) -> io::Result<()> {
  let mut buf = [0u8; CHUNK_SIZE];
  for region in regions {
    file.seek(SeekFrom::Start(region.offset))?;
    let mut remaining = region.numbytes;
    while remaining > 0 {
      let take = remaining.min(CHUNK_SIZE as u64) as usize;
      file.read_exact(&mut buf[..take])?;
      sink.write_all(&buf[..take])?;
      remaining -= take as u64;
    }
  }
  Ok(())
}

/// Extracts sparse `regions` from `reader` into `file`, setting the file
/// length to `logical_size` first so holes materialize lazily on
/// filesystems that support them.
pub fn extract(
  file: &mut File,
  reader: &mut dyn Read,
  regions: &[SparseRegion],
  logical_size: u64,
) -> io::Result<()> {
  file.set_len(logical_size)?;
  let mut buf = [0u8; CHUNK_SIZE];
  for region in regions {
    file.seek(SeekFrom::Start(region.offset))?;
    let mut remaining = region.numbytes;
    while remaining > 0 {
      let take = remaining.min(CHUNK_SIZE as u64) as usize;
      reader.read_exact(&mut buf[..take])?;
      file.write_all(&buf[..take])?;
      remaining -= take as u64;
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write as _;

  #[test]
  fn detects_a_hole_in_the_middle() {
    let mut file = tempfile::tempfile().unwrap();
    let mut data = vec![0xABu8; CHUNK_SIZE];
    data.extend(std::iter::repeat(0u8).take(CHUNK_SIZE));
    data.extend(std::iter::repeat(0xCDu8).take(CHUNK_SIZE));
    file.write_all(&data).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let regions = detect(&mut file, data.len() as u64).unwrap();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0], SparseRegion { offset: 0, numbytes: CHUNK_SIZE as u64 });
    assert_eq!(
      regions[1],
      SparseRegion { offset: (CHUNK_SIZE * 2) as u64, numbytes: CHUNK_SIZE as u64 }
    );
  }

  #[test]
  fn extract_round_trips_region_bytes() {
    let regions = vec![
      SparseRegion { offset: 0, numbytes: 4 },
      SparseRegion { offset: 100, numbytes: 4 },
    ];
    let packed = b"abcdwxyz";
    let mut out = tempfile::tempfile().unwrap();
    extract(&mut out, &mut &packed[..], &regions, 104).unwrap();
    assert_eq!(out.metadata().unwrap().len(), 104);

    let mut whole = Vec::new();
    out.seek(SeekFrom::Start(0)).unwrap();
    out.read_to_end(&mut whole).unwrap();
    assert_eq!(&whole[0..4], b"abcd");
    assert_eq!(&whole[100..104], b"wxyz");
    assert!(whole[4..100].iter().all(|&b| b == 0));
  }
}
