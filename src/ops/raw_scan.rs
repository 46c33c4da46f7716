//! Byte-preserving archive scanning for `delete`/`concatenate`, keeping
//! the invariant that non-matching entries' bytes in their data
//! regions stay bit-identical. Unlike `entry_source` (which fully decodes
//! into a `LogicalEntry` for read-only consumers), these two operations
//! must reproduce kept members exactly, so this walks blocks directly and
//! decodes only as much as it takes to name each member: the header via
//! `format::header::RawHeader`, and a PAX/GNU long name via the same
//! public decoders `entry_iterator` itself uses (`PaxAttributes::parse`).

use std::{
  fs::File,
  io::{self, Read, Seek, SeekFrom},
};

use crate::format::{constants::BLOCK_SIZE, header::RawHeader, pax::PaxAttributes, typeflag::TypeFlag};

use super::block_stream::BlockReader;

/// One raw archive member: any pre-entry blocks (GNU `L`/`K`, PAX `x`/`g`)
/// immediately followed by a real-type header and its data, all still
/// block-aligned, copied verbatim from the source archive.
pub struct RawMember {
  pub name: String,
  pub bytes: Vec<u8>,
}

fn padded_len(n: usize) -> usize {
  n.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

fn read_full_block(reader: &mut dyn BlockReader) -> io::Result<Option<[u8; BLOCK_SIZE]>> {
  let mut block = [0u8; BLOCK_SIZE];
  let n = reader.read_block(&mut block)?;
  if n == 0 {
    return Ok(None);
  }
  if n < BLOCK_SIZE {
    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated archive"));
  }
  Ok(Some(block))
}

/// Reads the next raw member, or `None` at the end-of-archive marker (a
/// zero block, whether or not a second one follows -- there is nothing
/// left worth copying either way).
pub fn next_raw_member(reader: &mut dyn BlockReader, max_pax_records: usize) -> io::Result<Option<RawMember>> {
  let mut bytes = Vec::new();
  let mut pending_long_name: Option<String> = None;
  let mut pending_pax_path: Option<String> = None;

  loop {
    let Some(block) = read_full_block(reader)? else {
      return Ok(None);
    };
    let header = RawHeader::from_block(&block);
    if header.is_zero() {
      return Ok(None);
    }

    let typeflag = header.typeflag();
    let size = header.parse_size().unwrap_or(0);
    let padded = padded_len(size as usize);
    bytes.extend_from_slice(&block);

    let mut payload = vec![0u8; padded];
    let mut filled = 0usize;
    while filled < padded {
      let Some(pblock) = read_full_block(reader)? else {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated archive"));
      };
      payload[filled..filled + BLOCK_SIZE].copy_from_slice(&pblock);
      filled += BLOCK_SIZE;
    }
    bytes.extend_from_slice(&payload);

    match typeflag {
      TypeFlag::LongNameGnu => {
        let name_bytes = &payload[..size as usize];
        let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        pending_long_name = Some(String::from_utf8_lossy(&name_bytes[..end]).into_owned());
        continue;
      },
      TypeFlag::LongLinkNameGnu => continue,
      TypeFlag::PaxExtendedHeader | TypeFlag::PaxGlobalExtendedHeader => {
        if let Ok(attrs) = PaxAttributes::parse(&payload[..size as usize], max_pax_records) {
          if let Some(path) = attrs.path {
            pending_pax_path = Some(path);
          }
        }
        continue;
      },
      _ => {},
    }

    let name = pending_pax_path
      .or(pending_long_name)
      .unwrap_or_else(|| header.full_name().unwrap_or_default());
    return Ok(Some(RawMember { name, bytes }));
  }
}

/// Scans `file` from the start to find the byte offset of the archive's
/// end-of-archive marker (its first zero-block, or genuine EOF if the
/// archive has none) `append`/`update`/`concatenate`
/// contract: new members get written starting at this offset, silently
/// dropping any trailing marker/garbage the old archive had.
pub fn find_append_offset(file: &mut File) -> io::Result<u64> {
  file.seek(SeekFrom::Start(0))?;
  let mut offset = 0u64;
  let mut block = [0u8; BLOCK_SIZE];

  loop {
    let mut filled = 0usize;
    while filled < BLOCK_SIZE {
      let n = file.read(&mut block[filled..])?;
      if n == 0 {
        break;
      }
      filled += n;
    }
    if filled == 0 {
      break;
    }
    if filled < BLOCK_SIZE {
      return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated archive"));
    }
    if block.iter().all(|&b| b == 0) {
      break;
    }

    let header = RawHeader::from_block(&block);
    let size = header.parse_size().unwrap_or(0);
    let padded = padded_len(size as usize) as u64;
    offset += BLOCK_SIZE as u64;
    file.seek(SeekFrom::Current(padded as i64))?;
    offset += padded;
  }

  file.seek(SeekFrom::Start(offset))?;
  Ok(offset)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::block_stream::StreamBlockReader;

  fn simple_member(name: &str, data: &[u8]) -> Vec<u8> {
    use crate::format::{dialect::HeaderMagic, header::RawHeader, typeflag::TypeFlag};
    let mut h = RawHeader::zeroed();
    h.set_name(name).unwrap();
    h.set_size(data.len() as u64);
    h.set_typeflag(TypeFlag::RegularFile);
    h.set_magic(HeaderMagic::Gnu);
    h.set_checksum();
    let mut out = h.as_block().to_vec();
    out.extend_from_slice(data);
    out.resize(padded_len(out.len()), 0);
    out
  }

  #[test]
  fn reads_members_until_the_zero_block() {
    let mut archive = simple_member("a.txt", b"one");
    archive.extend(simple_member("b.txt", b"two"));
    archive.extend_from_slice(&[0u8; BLOCK_SIZE * 2]);

    let mut reader = StreamBlockReader::new(std::io::Cursor::new(archive));
    let first = next_raw_member(&mut reader, 64).unwrap().unwrap();
    assert_eq!(first.name, "a.txt");
    let second = next_raw_member(&mut reader, 64).unwrap().unwrap();
    assert_eq!(second.name, "b.txt");
    assert!(next_raw_member(&mut reader, 64).unwrap().is_none());
  }

  #[test]
  fn append_offset_lands_right_before_the_terminator() {
    use std::io::Write as _;

    let mut archive = simple_member("a.txt", b"one");
    let offset_before_terminator = archive.len() as u64;
    archive.extend_from_slice(&[0u8; BLOCK_SIZE * 2]);

    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&archive).unwrap();

    let offset = find_append_offset(&mut file).unwrap();
    assert_eq!(offset, offset_before_terminator);
  }
}
