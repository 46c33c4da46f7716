//! `concatenate`: appends every archive in
//! `config.file_list` onto `config.archive_path`, each member copied
//! verbatim, per the same bit-identical invariant `delete.rs` upholds.

use std::{
  fs::OpenOptions,
  io::Write as _,
};

use super::{
  archive_io,
  block_stream::StreamBlockReader,
  config::OperationConfig,
  error::OperationError,
  fs_adapter,
  raw_scan::{find_append_offset, next_raw_member},
};

/// Runs `concatenate`: `config.archive_path` gains every member of every
/// archive named in `config.file_list`, in order, followed by a single
/// fresh end-of-archive marker.
pub fn run(config: &OperationConfig) -> Result<(), OperationError> {
  let archive_path = config.archive_path.as_ref().ok_or(OperationError::MissingArchive)?;
  archive_io::require_uncompressed(archive_path, config.compression).map_err(|e| OperationError::io(archive_path, e))?;

  let mut dest = OpenOptions::new()
    .read(true)
    .write(true)
    .open(archive_path)
    .map_err(|e| OperationError::io(archive_path, e))?;
  let offset = find_append_offset(&mut dest).map_err(|e| OperationError::io(archive_path, e))?;
  dest.set_len(offset).map_err(|e| OperationError::io(archive_path, e))?;

  for source_path in &config.file_list {
    archive_io::require_uncompressed(source_path, config.compression).map_err(|e| OperationError::io(source_path, e))?;
    let source = fs_adapter::open_file_read(source_path).map_err(|e| OperationError::io(source_path, e))?;
    let mut reader = StreamBlockReader::new(source);
    while let Some(member) = next_raw_member(&mut reader, config.limits.max_pax_records).map_err(|e| OperationError::io(source_path, e))? {
      dest.write_all(&member.bytes).map_err(|e| OperationError::io(archive_path, e))?;
    }
  }

  dest.write_all(&crate::format::constants::ZERO_BLOCK).map_err(|e| OperationError::io(archive_path, e))?;
  dest.write_all(&crate::format::constants::ZERO_BLOCK).map_err(|e| OperationError::io(archive_path, e))?;
  dest.flush().map_err(|e| OperationError::io(archive_path, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::{config::Compression, diagnostics::CollectingSink, entry_source::EntryStream};
  use std::fs;

  #[test]
  fn concatenate_appends_the_second_archives_members() {
    let dir = tempfile::tempdir().unwrap();
    let first_path = dir.path().join("first.tar");
    let second_path = dir.path().join("second.tar");
    fs::write(dir.path().join("a.txt"), b"one").unwrap();
    fs::write(dir.path().join("b.txt"), b"two").unwrap();

    let mut sink = CollectingSink::new();
    super::super::create::run(
      &OperationConfig {
        archive_path: Some(first_path.clone()),
        file_list: vec![dir.path().join("a.txt")],
        ..Default::default()
      },
      &mut sink,
    )
    .unwrap();
    super::super::create::run(
      &OperationConfig {
        archive_path: Some(second_path.clone()),
        file_list: vec![dir.path().join("b.txt")],
        ..Default::default()
      },
      &mut sink,
    )
    .unwrap();

    let config = OperationConfig {
      archive_path: Some(first_path.clone()),
      file_list: vec![second_path],
      ..Default::default()
    };
    run(&config).unwrap();

    let mut reader = archive_io::open_reader(&first_path, Compression::None).unwrap();
    let mut stream = EntryStream::new(reader.inner(), Default::default());
    let mut names = Vec::new();
    while let Some((entry, _)) = stream.next_entry(&mut sink).unwrap() {
      names.push(entry.path.as_str().to_string());
    }
    assert!(names.iter().any(|n| n.ends_with("a.txt")));
    assert!(names.iter().any(|n| n.ends_with("b.txt")));
  }
}
