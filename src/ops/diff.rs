//! `diff`.
//!
//! Unlike the other six operations, `diff` doesn't succeed or fail on
//! its own terms -- it reports whether the archive and the filesystem
//! disagree. `run` returns that flag (`Ok(true)` meaning "differences
//! found") rather than the bare `Result<(), OperationError>` the write
//! side uses, since exit code 1 here means something other than
//! partial failure.

use std::{
  fs,
  io::Read,
  path::{Path, PathBuf},
};

use crate::format::{EntryKind, LogicalEntry};

use super::{
  archive_io, config::OperationConfig, diagnostics::DiagnosticSink, entry_source::EntryStream, error::OperationError,
  fs_adapter, name_policy,
};

const COMPARE_CHUNK: usize = 64 * 1024;

/// Runs `diff`, comparing every entry in `config.archive_path` against
/// the filesystem under `config.directory` (or the current directory).
/// Returns `true` if any entry differed; every difference found is also
/// reported through `sink` before this returns.
pub fn run(config: &OperationConfig, sink: &mut dyn DiagnosticSink) -> Result<bool, OperationError> {
  let archive_path = config.archive_path.as_ref().ok_or(OperationError::MissingArchive)?;
  let mut reader = archive_io::open_reader(archive_path, config.compression).map_err(|e| OperationError::io(archive_path, e))?;
  let mut stream = EntryStream::new(reader.inner(), config.limits).with_ignore_zeros(config.ignore_zeros);
  let root = config.directory.clone().unwrap_or_else(|| PathBuf::from("."));

  let mut differences_found = false;
  while let Some((entry, data)) = stream.next_entry(sink).map_err(|e| OperationError::io(archive_path, e))? {
    if name_policy::is_excluded(entry.path.as_str(), &config.exclude_patterns) {
      continue;
    }
    for reason in compare_one(&entry, &data, &root) {
      differences_found = true;
      sink.warn(&OperationError::InvalidArchive {
        path: root.join(entry.path.as_str()),
        reason,
      });
    }
  }
  reader.finish().map_err(|e| OperationError::io(archive_path, e))?;
  Ok(differences_found)
}

/// Returns every mismatch reason found for one entry; an empty vector
/// means the filesystem matches the archive.
fn compare_one(entry: &LogicalEntry, archived_data: &[u8], root: &Path) -> Vec<String> {
  let target = root.join(entry.path.as_str());
  let mut reasons = Vec::new();

  let stat = match fs_adapter::lstat(&target) {
    Ok(stat) => stat,
    Err(e) => {
      reasons.push(format!("cannot stat: {e}"));
      return reasons;
    },
  };

  if !kind_matches(&entry.kind, stat.mode) {
    reasons.push("file type differs".to_string());
    return reasons;
  }

  match &entry.kind {
    EntryKind::SymbolicLink { target: archived_target } => {
      match fs_adapter::read_link(&target) {
        Ok(disk_target) if disk_target.to_string_lossy() == archived_target.as_str() => {},
        Ok(disk_target) => reasons.push(format!("symlink target differs: {} vs {}", disk_target.display(), archived_target)),
        Err(e) => reasons.push(format!("cannot read symlink: {e}")),
      }
    },
    EntryKind::Directory | EntryKind::Fifo | EntryKind::CharacterDevice { .. } | EntryKind::BlockDevice { .. } | EntryKind::HardLink { .. } => {
      // Non-regular kinds (besides symlinks) only get the type/mode/mtime
      // checks below "non-regular files skip content
      // compare".
    },
    EntryKind::RegularFile { size, .. } => {
      if stat.size != *size {
        reasons.push(format!("size differs: archive {size} vs disk {}", stat.size));
      } else if let Err(reason) = compare_content(&target, archived_data) {
        reasons.push(reason);
      }
    },
  }

  if !matches!(entry.kind, EntryKind::SymbolicLink { .. }) && (stat.mode & 0o7777) != entry.mode.to_mode_bits() {
    reasons.push(format!("mode differs: archive {:o} vs disk {:o}", entry.mode.to_mode_bits(), stat.mode & 0o7777));
  }

  if stat.mtime.seconds_since_epoch != entry.mtime.seconds_since_epoch {
    reasons.push(format!(
      "mtime differs: archive {} vs disk {}",
      entry.mtime.seconds_since_epoch, stat.mtime.seconds_since_epoch
    ));
  }

  reasons
}

fn kind_matches(kind: &EntryKind, mode: u32) -> bool {
  let file_type_bits = mode & 0o170000;
  match kind {
    EntryKind::Directory => file_type_bits == 0o040000,
    EntryKind::SymbolicLink { .. } => file_type_bits == 0o120000,
    EntryKind::CharacterDevice { .. } => file_type_bits == 0o020000,
    EntryKind::BlockDevice { .. } => file_type_bits == 0o060000,
    EntryKind::Fifo => file_type_bits == 0o010000,
    EntryKind::RegularFile { .. } | EntryKind::HardLink { .. } => file_type_bits == 0o100000,
  }
}

fn compare_content(target: &Path, archived_data: &[u8]) -> Result<(), String> {
  let mut file = fs::File::open(target).map_err(|e| format!("cannot open: {e}"))?;
  let mut buf = [0u8; COMPARE_CHUNK];
  let mut offset = 0usize;

  loop {
    let n = file.read(&mut buf).map_err(|e| format!("cannot read: {e}"))?;
    if n == 0 {
      break;
    }
    if offset + n > archived_data.len() || buf[..n] != archived_data[offset..offset + n] {
      return Err("content differs".to_string());
    }
    offset += n;
  }
  if offset != archived_data.len() {
    return Err("content differs".to_string());
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::diagnostics::CollectingSink;
  use std::fs;

  #[test]
  fn diff_reports_no_differences_right_after_create() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("a.tar");
    let file_path = dir.path().join("a.txt");
    fs::write(&file_path, b"hello").unwrap();

    let mut sink = CollectingSink::new();
    let config = OperationConfig {
      archive_path: Some(archive_path.clone()),
      file_list: vec![file_path.clone()],
      directory: Some(PathBuf::from("/")),
      ..Default::default()
    };
    super::super::create::run(&config, &mut sink).unwrap();

    let differences_found = run(&config, &mut sink).unwrap();
    assert!(!differences_found, "unexpected diffs: {:?}", sink.warnings);
  }

  #[test]
  fn diff_reports_a_content_change() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("a.tar");
    let file_path = dir.path().join("a.txt");
    fs::write(&file_path, b"hello").unwrap();

    let mut sink = CollectingSink::new();
    let config = OperationConfig {
      archive_path: Some(archive_path.clone()),
      file_list: vec![file_path.clone()],
      directory: Some(PathBuf::from("/")),
      ..Default::default()
    };
    super::super::create::run(&config, &mut sink).unwrap();

    fs::write(&file_path, b"goodbye!").unwrap();
    let differences_found = run(&config, &mut sink).unwrap();
    assert!(differences_found);
  }
}
