//! `delete`: rewrites an uncompressed archive with the
//! named members removed, byte-identical otherwise. Built on
//! `raw_scan::next_raw_member` so kept members are copied verbatim
//! rather than decoded and re-encoded -- the invariant `concatenate.rs`
//! shares.

use std::io::Write as _;

use tempfile::NamedTempFile;

use super::{
  archive_io,
  block_stream::StreamBlockReader,
  config::OperationConfig,
  error::OperationError,
  fs_adapter,
  name_policy,
  raw_scan::next_raw_member,
};

/// Runs `delete`, removing every member whose name is in
/// `config.file_list` (or matches `config.exclude_patterns`, which
/// `delete` repurposes as the removal patterns) from `config.archive_path`.
pub fn run(config: &OperationConfig) -> Result<(), OperationError> {
  let archive_path = config.archive_path.as_ref().ok_or(OperationError::MissingArchive)?;
  archive_io::require_uncompressed(archive_path, config.compression).map_err(|e| OperationError::io(archive_path, e))?;

  let source = fs_adapter::open_file_read(archive_path).map_err(|e| OperationError::io(archive_path, e))?;
  let mut reader = StreamBlockReader::new(source);

  let parent = archive_path.parent().unwrap_or_else(|| std::path::Path::new("."));
  let mut tmp = NamedTempFile::new_in(parent).map_err(|e| OperationError::io(archive_path, e))?;

  while let Some(member) = next_raw_member(&mut reader, config.limits.max_pax_records).map_err(|e| OperationError::io(archive_path, e))? {
    if should_drop(&member.name, config) {
      continue;
    }
    tmp.write_all(&member.bytes).map_err(|e| OperationError::io(archive_path, e))?;
  }
  tmp.write_all(&crate::format::constants::ZERO_BLOCK).map_err(|e| OperationError::io(archive_path, e))?;
  tmp.write_all(&crate::format::constants::ZERO_BLOCK).map_err(|e| OperationError::io(archive_path, e))?;
  tmp.flush().map_err(|e| OperationError::io(archive_path, e))?;

  tmp.persist(archive_path).map_err(|e| OperationError::io(archive_path, e.error))?;
  Ok(())
}

fn should_drop(name: &str, config: &OperationConfig) -> bool {
  if config.file_list.iter().any(|p| p.as_path() == std::path::Path::new(name)) {
    return true;
  }
  name_policy::is_excluded(name, &config.exclude_patterns)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::{config::Compression, diagnostics::CollectingSink, entry_source::EntryStream};
  use std::{fs, path::PathBuf};

  fn archived(dir: &std::path::Path, config: &OperationConfig, name: &str) -> PathBuf {
    PathBuf::from(super::name_policy::archived_name(&dir.join(name), config))
  }

  #[test]
  fn delete_removes_named_members_and_keeps_the_rest_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("a.tar");
    fs::write(dir.path().join("keep.txt"), b"keep-me").unwrap();
    fs::write(dir.path().join("drop.txt"), b"drop-me").unwrap();

    let mut sink = CollectingSink::new();
    let create_config = OperationConfig {
      archive_path: Some(archive_path.clone()),
      file_list: vec![dir.path().join("keep.txt"), dir.path().join("drop.txt")],
      ..Default::default()
    };
    super::super::create::run(&create_config, &mut sink).unwrap();

    let delete_config = OperationConfig {
      archive_path: Some(archive_path.clone()),
      file_list: vec![archived(dir.path(), &create_config, "drop.txt")],
      ..Default::default()
    };
    run(&delete_config).unwrap();

    let mut reader = archive_io::open_reader(&archive_path, Compression::None).unwrap();
    let mut stream = EntryStream::new(reader.inner(), Default::default());
    let mut names = Vec::new();
    while let Some((entry, _)) = stream.next_entry(&mut sink).unwrap() {
      names.push(entry.path.as_str().to_string());
    }
    assert!(names.iter().any(|n| n.ends_with("keep.txt")));
    assert!(!names.iter().any(|n| n.ends_with("drop.txt")));
  }
}
