//! `update`: like `append`, but only for filesystem
//! paths the archive doesn't already hold a current-enough copy of.
//!
//! Grounded in the same scan-then-append shape as `append.rs`; the only
//! difference is the `include` predicate handed to
//! `create::write_filtered_entries`, built from a first read-only pass
//! over the existing archive that records each member's name and mtime.

use std::{collections::HashMap, fs::OpenOptions};

use super::{
  archive_io,
  block_stream::StreamBlockWriter,
  config::OperationConfig,
  create,
  diagnostics::DiagnosticSink,
  entry_source::EntryStream,
  error::OperationError,
  fs_adapter::Stat,
  hardlinks::HardLinkTracker,
  name_policy,
  raw_scan::find_append_offset,
};

/// Runs `update`: walks `config.file_list` as `create` would, but skips
/// any path whose archived name already exists in `config.archive_path`
/// with an equal-or-newer mtime.
pub fn run(config: &OperationConfig, sink: &mut dyn DiagnosticSink) -> Result<(), OperationError> {
  let archive_path = config.archive_path.as_ref().ok_or(OperationError::MissingArchive)?;
  archive_io::require_uncompressed(archive_path, config.compression).map_err(|e| OperationError::io(archive_path, e))?;

  let known = scan_existing_mtimes(config, sink)?;

  let mut file = OpenOptions::new()
    .read(true)
    .write(true)
    .open(archive_path)
    .map_err(|e| OperationError::io(archive_path, e))?;
  let offset = find_append_offset(&mut file).map_err(|e| OperationError::io(archive_path, e))?;
  file.set_len(offset).map_err(|e| OperationError::io(archive_path, e))?;

  let mut writer = archive_io::ArchiveWriter::Plain(StreamBlockWriter::new(file));
  let mut hardlinks = HardLinkTracker::new();
  create::write_filtered_entries(&mut writer, config, &mut hardlinks, sink, |path, stat: &Stat| {
    if is_directory(stat.mode) {
      return true;
    }
    match known.get(&name_policy::archived_name(path, config)) {
      Some(&archived_mtime) => stat.mtime.seconds_since_epoch > archived_mtime,
      None => true,
    }
  })?;
  writer.write_end_of_archive().map_err(|e| OperationError::io(archive_path, e))?;
  writer.finish().map_err(|e| OperationError::io(archive_path, e))?;
  Ok(())
}

fn is_directory(mode: u32) -> bool {
  (mode & 0o170000) == 0o040000
}

fn scan_existing_mtimes(config: &OperationConfig, sink: &mut dyn DiagnosticSink) -> Result<HashMap<String, u64>, OperationError> {
  let archive_path = config.archive_path.as_ref().ok_or(OperationError::MissingArchive)?;
  let mut reader = archive_io::open_reader(archive_path, config.compression).map_err(|e| OperationError::io(archive_path, e))?;
  let mut stream = EntryStream::new(reader.inner(), config.limits);

  let mut known = HashMap::new();
  while let Some((entry, _data)) = stream.next_entry(sink).map_err(|e| OperationError::io(archive_path, e))? {
    known.insert(entry.path.as_str().to_string(), entry.mtime.seconds_since_epoch);
  }
  reader.finish().map_err(|e| OperationError::io(archive_path, e))?;
  Ok(known)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::{config::Compression, diagnostics::CollectingSink};
  use std::{fs, thread, time::Duration};

  #[test]
  fn update_skips_unchanged_files_and_adds_newer_ones() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("a.tar");
    let stale = dir.path().join("stale.txt");
    let fresh = dir.path().join("fresh.txt");
    fs::write(&stale, b"old").unwrap();

    let mut sink = CollectingSink::new();
    let mut config = OperationConfig {
      archive_path: Some(archive_path.clone()),
      file_list: vec![stale.clone()],
      ..Default::default()
    };
    super::super::create::run(&config, &mut sink).unwrap();

    thread::sleep(Duration::from_millis(10));
    fs::write(&fresh, b"new").unwrap();
    config.file_list = vec![stale.clone(), fresh.clone()];
    run(&config, &mut sink).unwrap();

    let mut reader = archive_io::open_reader(&archive_path, Compression::None).unwrap();
    let mut stream = EntryStream::new(reader.inner(), config.limits);
    let mut names = Vec::new();
    while let Some((entry, _)) = stream.next_entry(&mut sink).unwrap() {
      names.push(entry.path.as_str().to_string());
    }
    assert_eq!(names.iter().filter(|n| n.ends_with("stale.txt")).count(), 1);
    assert!(names.iter().any(|n| n.ends_with("fresh.txt")));
  }
}
