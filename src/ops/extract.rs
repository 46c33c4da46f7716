//! `extract`.

use std::{
  fs,
  io::{self, Write as _},
  path::{Path, PathBuf},
};

use crate::format::{EntryKind, LogicalEntry};

use super::{
  archive_io,
  config::{OperationConfig, OverwriteMode},
  diagnostics::DiagnosticSink,
  entry_source::EntryStream,
  error::OperationError,
  fs_adapter,
  name_policy,
  sparse_fs,
};

/// Runs `extract`, materializing every entry from `config.archive_path`
/// under `config.directory` (or the current directory).
pub fn run(config: &OperationConfig, sink: &mut dyn DiagnosticSink) -> Result<(), OperationError> {
  let archive_path = config.archive_path.as_ref().ok_or(OperationError::MissingArchive)?;
  let mut reader = archive_io::open_reader(archive_path, config.compression).map_err(|e| OperationError::io(archive_path, e))?;
  let mut stream = EntryStream::new(reader.inner(), config.limits).with_ignore_zeros(config.ignore_zeros);
  let dest_root = config.directory.clone().unwrap_or_else(|| PathBuf::from("."));

  while let Some((entry, data)) = stream.next_entry(sink).map_err(|e| OperationError::io(archive_path, e))? {
    if let Err(e) = extract_one(&entry, &data, &dest_root, config, sink) {
      sink.warn(&e);
      if !e.is_recoverable() {
        return Err(e);
      }
    }
  }
  reader.finish().map_err(|e| OperationError::io(archive_path, e))
}

fn wanted(entry: &LogicalEntry, config: &OperationConfig) -> bool {
  if name_policy::is_excluded(entry.path.as_str(), &config.exclude_patterns) {
    return false;
  }
  if config.file_list.is_empty() {
    return true;
  }
  config.file_list.iter().any(|p| p.as_path() == Path::new(entry.path.as_str()))
}

fn extract_one(
  entry: &LogicalEntry,
  data: &[u8],
  dest_root: &Path,
  config: &OperationConfig,
  sink: &mut dyn DiagnosticSink,
) -> Result<(), OperationError> {
  if !wanted(entry, config) {
    return Ok(());
  }

  let raw_path = Path::new(entry.path.as_str());
  let Some(stripped) = name_policy::strip_components(raw_path, config.strip_components) else {
    return Ok(());
  };
  let sanitized = name_policy::sanitize_absolute(&stripped, config.absolute_names);

  if config.to_stdout {
    if let EntryKind::RegularFile { .. } = entry.kind {
      io::stdout().write_all(data).map_err(|e| OperationError::io(dest_root, e))?;
    }
    return Ok(());
  }

  let target = dest_root.join(&sanitized);

  if matches!(entry.kind, EntryKind::Directory) {
    fs_adapter::mkdir_p(&target).map_err(|e| OperationError::io(&target, e))?;
    return finish_attributes(&target, entry, config);
  }

  if !should_materialize(&target, entry, config)? {
    return Ok(());
  }
  if target.symlink_metadata().is_ok() {
    unlink_any(&target).map_err(|e| OperationError::io(&target, e))?;
  }
  if let Some(parent) = target.parent() {
    fs_adapter::mkdir_p(parent).map_err(|e| OperationError::io(parent, e))?;
  }

  match &entry.kind {
    EntryKind::SymbolicLink { target: link } => {
      fs_adapter::make_symlink(Path::new(link.as_str()), &target).map_err(|e| OperationError::io(&target, e))?;
      // mtime/chmod on a symlink itself would follow it on most platforms;
      // skip the epilogue for this kind.
      return Ok(());
    },
    EntryKind::HardLink { target: link } => {
      // The linkname came from the archive (see `ops::create`'s hardlink
      // tracker, which now stores the archived name rather than a raw
      // filesystem path), so it must be sanitized the same way the
      // primary member name is before it can safely be joined onto
      // `dest_root` -- an absolute linkname would otherwise discard the
      // extraction root entirely.
      let sanitized_link = name_policy::sanitize_absolute(Path::new(link.as_str()), config.absolute_names);
      let existing = dest_root.join(sanitized_link);
      if let Err(source) = fs_adapter::make_hard_link(&existing, &target) {
        // Fall back to copying file contents "Failure
        // semantics" note ("Hard-link creation failure -> fall back to
        // copying file contents (loud warning)").
        sink.warn(&OperationError::io(existing, source));
        fs::write(&target, data).map_err(|e| OperationError::io(&target, e))?;
      }
    },
    EntryKind::CharacterDevice { .. } | EntryKind::BlockDevice { .. } | EntryKind::Fifo => {
      fs_adapter::mknod_for(&target, &entry.kind, entry.mode.to_mode_bits()).map_err(|e| OperationError::io(&target, e))?;
    },
    EntryKind::RegularFile { size, sparse } => {
      let mut file = fs_adapter::create_file(&target).map_err(|e| OperationError::io(&target, e))?;
      match sparse {
        Some(regions) => sparse_fs::extract(&mut file, &mut &data[..], regions, *size).map_err(|e| OperationError::io(&target, e))?,
        None => file.write_all(data).map_err(|e| OperationError::io(&target, e))?,
      }
    },
    EntryKind::Directory => unreachable!("handled above"),
  }

  finish_attributes(&target, entry, config)
}

fn finish_attributes(target: &Path, entry: &LogicalEntry, config: &OperationConfig) -> Result<(), OperationError> {
  if config.preserve_permissions {
    if let Err(source) = fs_adapter::chmod(target, entry.mode.to_mode_bits()) {
      if source.kind() == io::ErrorKind::PermissionDenied {
        return Err(OperationError::PermissionDenied { path: target.to_path_buf() });
      }
      return Err(OperationError::io(target, source));
    }
  }
  if !config.touch {
    // Non-fatal: attribute restore failures don't abort.
    let _ = fs_adapter::set_mtime(target, entry.mtime);
  }
  Ok(())
}

fn unlink_any(target: &Path) -> io::Result<()> {
  match fs_adapter::delete_file(target) {
    Ok(()) => Ok(()),
    Err(_) => fs_adapter::delete_dir(target),
  }
}

/// Implements the (file exists?, mtime compare) decision table from
/// overwrite policy.
fn should_materialize(target: &Path, entry: &LogicalEntry, config: &OperationConfig) -> Result<bool, OperationError> {
  let Ok(meta) = target.symlink_metadata() else {
    return Ok(true);
  };
  match config.overwrite_mode {
    OverwriteMode::Overwrite | OverwriteMode::UnlinkFirst => Ok(true),
    OverwriteMode::KeepOld => Err(OperationError::OverwriteRefused { path: target.to_path_buf() }),
    OverwriteMode::SkipOld => Ok(false),
    OverwriteMode::KeepNewer => {
      use std::os::unix::fs::MetadataExt;
      Ok(entry.mtime.seconds_since_epoch > meta.mtime().max(0) as u64)
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::diagnostics::CollectingSink;
  use std::fs;

  #[test]
  fn extract_round_trips_a_regular_file_and_a_directory() {
    let archive_dir = tempfile::tempdir().unwrap();
    let archive_path = archive_dir.path().join("a.tar");

    let src_dir = tempfile::tempdir().unwrap();
    fs::create_dir(src_dir.path().join("sub")).unwrap();
    fs::write(src_dir.path().join("sub/a.txt"), b"payload").unwrap();

    let mut sink = CollectingSink::new();
    let create_config = OperationConfig {
      archive_path: Some(archive_path.clone()),
      file_list: vec![src_dir.path().join("sub")],
      ..Default::default()
    };
    super::super::create::run(&create_config, &mut sink).unwrap();

    let dest_dir = tempfile::tempdir().unwrap();
    let extract_config = OperationConfig {
      archive_path: Some(archive_path),
      directory: Some(dest_dir.path().to_path_buf()),
      ..Default::default()
    };
    run(&extract_config, &mut sink).unwrap();

    let restored_name = name_policy::archived_name(&src_dir.path().join("sub/a.txt"), &create_config);
    let restored = dest_dir.path().join(restored_name);
    assert_eq!(fs::read(restored).unwrap(), b"payload");
  }
}
