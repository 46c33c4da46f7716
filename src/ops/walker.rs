//! Directory-tree walk for `create`/`update`.
//!
//! Built on the `walkdir` crate, the same dependency the retrieval pack's
//! filesystem-heavy examples reach for over hand-rolled recursion.

use std::{
  io,
  path::{Path, PathBuf},
};

use walkdir::WalkDir;

use super::{
  diagnostics::DiagnosticSink,
  error::OperationError,
  fs_adapter::{self, Stat},
};

/// One filesystem entry discovered by a walk, paired with its `lstat`
/// result so callers don't have to stat twice.
#[derive(Debug, Clone)]
pub struct WalkEntry {
  pub path: PathBuf,
  pub stat: Stat,
}

/// Walks `root` depth-first, yielding `root` itself first and then every
/// descendant `create` semantics. `one_file_system`
/// stops descending once a subtree's `device_id` differs from `root`'s.
pub fn walk(root: &Path, one_file_system: bool, sink: &mut dyn DiagnosticSink) -> std::io::Result<Vec<WalkEntry>> {
  let root_stat = fs_adapter::lstat(root)?;
  let mut out = Vec::new();

  let mut walker = WalkDir::new(root).follow_links(false).into_iter();
  while let Some(entry) = walker.next() {
    let entry = match entry {
      Ok(e) => e,
      Err(err) => {
        let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
        sink.warn(&OperationError::io(path, err.into_io_error().unwrap_or_else(|| io::Error::other("walk error"))));
        continue;
      },
    };
    let path = entry.path().to_path_buf();
    let stat = match fs_adapter::lstat(&path) {
      Ok(s) => s,
      Err(err) => {
        sink.warn(&OperationError::io(path, err));
        continue;
      },
    };

    if one_file_system && stat.device_id != root_stat.device_id {
      if entry.file_type().is_dir() {
        walker.skip_current_dir();
      }
      continue;
    }

    out.push(WalkEntry { path, stat });
  }
  Ok(out)
}

/// Filters a walk result down to entries whose mtime is strictly newer
/// than `threshold_secs` `--newer`/`update` support.
/// Directories always pass, since they're needed to host newer children.
#[must_use]
pub fn newer_than(entries: Vec<WalkEntry>, threshold_secs: u64) -> Vec<WalkEntry> {
  entries
    .into_iter()
    .filter(|e| e.stat.mtime.seconds_since_epoch > threshold_secs || (e.stat.mode & 0o170000) == 0o040000)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::diagnostics::CollectingSink;
  use std::fs;

  #[test]
  fn walk_includes_root_and_children() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hi").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/b.txt"), b"yo").unwrap();

    let mut sink = CollectingSink::new();
    let entries = walk(dir.path(), false, &mut sink).unwrap();
    let names: Vec<_> = entries
      .iter()
      .map(|e| e.path.strip_prefix(dir.path()).unwrap().to_path_buf())
      .collect();
    assert!(names.contains(&PathBuf::from("")));
    assert!(names.contains(&PathBuf::from("a.txt")));
    assert!(names.contains(&PathBuf::from("sub")));
    assert!(names.contains(&PathBuf::from("sub/b.txt")));
  }
}
