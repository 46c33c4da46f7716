//! `append`.
//!
//! Opens the archive file directly (bypassing `archive_io`'s
//! truncate-on-write-only path, since appending must land new members
//! right before the old end-of-archive marker, not at the start) and
//! reuses `create::write_entries` for the walk-and-encode loop.

use std::fs::OpenOptions;

use super::{
  archive_io,
  block_stream::StreamBlockWriter,
  config::OperationConfig,
  create,
  diagnostics::DiagnosticSink,
  error::OperationError,
  hardlinks::HardLinkTracker,
  raw_scan::find_append_offset,
};

/// Runs `append`, writing `config.file_list` after the last member of an
/// existing, uncompressed archive.
pub fn run(config: &OperationConfig, sink: &mut dyn DiagnosticSink) -> Result<(), OperationError> {
  let archive_path = config.archive_path.as_ref().ok_or(OperationError::MissingArchive)?;
  archive_io::require_uncompressed(archive_path, config.compression).map_err(|e| OperationError::io(archive_path, e))?;

  let mut file = OpenOptions::new()
    .read(true)
    .write(true)
    .open(archive_path)
    .map_err(|e| OperationError::io(archive_path, e))?;
  let offset = find_append_offset(&mut file).map_err(|e| OperationError::io(archive_path, e))?;
  file.set_len(offset).map_err(|e| OperationError::io(archive_path, e))?;

  let mut writer = archive_io::ArchiveWriter::Plain(StreamBlockWriter::new(file));
  let mut hardlinks = HardLinkTracker::new();
  create::write_entries(&mut writer, config, &mut hardlinks, sink)?;
  writer.write_end_of_archive().map_err(|e| OperationError::io(archive_path, e))?;
  writer.finish().map_err(|e| OperationError::io(archive_path, e))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::{config::Compression, diagnostics::CollectingSink, entry_source::EntryStream};
  use std::fs;

  #[test]
  fn append_adds_entries_after_the_existing_ones() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("a.tar");
    fs::write(dir.path().join("first.txt"), b"one").unwrap();
    fs::write(dir.path().join("second.txt"), b"two").unwrap();

    let mut sink = CollectingSink::new();
    let mut create_config = OperationConfig {
      archive_path: Some(archive_path.clone()),
      file_list: vec![dir.path().join("first.txt")],
      ..Default::default()
    };
    super::super::create::run(&create_config, &mut sink).unwrap();

    create_config.file_list = vec![dir.path().join("second.txt")];
    run(&create_config, &mut sink).unwrap();

    let mut reader = archive_io::open_reader(&archive_path, Compression::None).unwrap();
    let mut stream = EntryStream::new(reader.inner(), Default::default());
    let mut names = Vec::new();
    while let Some((entry, _)) = stream.next_entry(&mut sink).unwrap() {
      names.push(entry.path.as_str().to_string());
    }
    assert!(names.iter().any(|n| n.ends_with("first.txt")));
    assert!(names.iter().any(|n| n.ends_with("second.txt")));
  }
}
