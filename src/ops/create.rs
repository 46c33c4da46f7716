//! `create`.

use std::{
  io,
  path::{Path, PathBuf},
};

use crate::format::{EntryKind, FilePermissions, LogicalEntry};

use super::{
  archive_io::{self, ArchiveWriter},
  config::{Compression, OperationConfig},
  diagnostics::DiagnosticSink,
  error::OperationError,
  fs_adapter::{self, Stat},
  hardlinks::HardLinkTracker,
  name_policy,
  sparse_fs,
  walker::{self, WalkEntry},
};

fn entry_kind_for(path: &Path, stat: &Stat, config: &OperationConfig) -> io::Result<(EntryKind, Option<std::fs::File>)> {
  let file_type_bits = stat.mode & 0o170000;
  match file_type_bits {
    0o040000 => Ok((EntryKind::Directory, None)),
    0o120000 if !config.dereference => {
      let target = fs_adapter::read_link(path)?;
      Ok((
        EntryKind::SymbolicLink {
          target: relative_path::RelativePathBuf::from(target.to_string_lossy().to_string()),
        },
        None,
      ))
    },
    0o020000 => {
      let (major, minor) = fs_adapter::major_minor(stat.rdev);
      Ok((EntryKind::CharacterDevice { major, minor }, None))
    },
    0o060000 => {
      let (major, minor) = fs_adapter::major_minor(stat.rdev);
      Ok((EntryKind::BlockDevice { major, minor }, None))
    },
    0o010000 => Ok((EntryKind::Fifo, None)),
    _ => {
      let file = fs_adapter::open_file_read(path)?;
      Ok((
        EntryKind::RegularFile {
          size: stat.size,
          sparse: None,
        },
        Some(file),
      ))
    },
  }
}

/// Runs `create`, writing `config.file_list` (walked recursively) into
/// `config.archive_path`.
pub fn run(config: &OperationConfig, sink: &mut dyn DiagnosticSink) -> Result<(), OperationError> {
  let archive_path = config.archive_path.as_ref().ok_or(OperationError::MissingArchive)?;
  let mut writer = archive_io::open_writer(archive_path, config.compression, false)
    .map_err(|e| OperationError::io(archive_path, e))?;

  let mut hardlinks = HardLinkTracker::new();
  write_entries(&mut writer, config, &mut hardlinks, sink)?;

  writer.write_end_of_archive().map_err(|e| OperationError::io(archive_path, e))?;
  writer.finish().map_err(|e| OperationError::io(archive_path, e))?;
  Ok(())
}

/// Walks every root in `config.file_list` and writes every entry found,
/// unconditionally. The `append`/`create` shape.
pub(crate) fn write_entries(
  writer: &mut ArchiveWriter,
  config: &OperationConfig,
  hardlinks: &mut HardLinkTracker,
  sink: &mut dyn DiagnosticSink,
) -> Result<u32, OperationError> {
  write_filtered_entries(writer, config, hardlinks, sink, |_, _| true)
}

/// Same walk as `write_entries`, but `include` gets a final say over each
/// discovered path -- `update` uses this to skip files the archive already
/// holds a current-enough copy of `update` semantics.
pub(crate) fn write_filtered_entries(
  writer: &mut ArchiveWriter,
  config: &OperationConfig,
  hardlinks: &mut HardLinkTracker,
  sink: &mut dyn DiagnosticSink,
  mut include: impl FnMut(&Path, &Stat) -> bool,
) -> Result<u32, OperationError> {
  let mut count = 0u32;

  for root in &config.file_list {
    let entries = walker::walk(root, config.one_file_system, sink).map_err(|e| OperationError::io(root, e))?;
    let entries = match config.newer_mtime {
      Some(threshold) => walker::newer_than(entries, threshold),
      None => entries,
    };

    for WalkEntry { path, stat } in entries {
      if name_policy::is_excluded(&path.to_string_lossy(), &config.exclude_patterns) {
        continue;
      }
      if !include(&path, &stat) {
        continue;
      }
      write_one_entry(writer, &path, &stat, config, hardlinks, sink)?;
      count += 1;
      if let Some(n) = config.checkpoint {
        if n > 0 && count % n == 0 {
          sink.warn(&OperationError::io(path.clone(), std::io::Error::other(format!("checkpoint {count}"))));
        }
      }
    }
  }
  Ok(count)
}

fn write_one_entry(
  writer: &mut ArchiveWriter,
  path: &PathBuf,
  stat: &Stat,
  config: &OperationConfig,
  hardlinks: &mut HardLinkTracker,
  sink: &mut dyn DiagnosticSink,
) -> Result<(), OperationError> {
  let archived_name = name_policy::archived_name(path, config);
  let rel_path = relative_path::RelativePathBuf::from(archived_name.clone());

  let (kind, file) = entry_kind_for(path, stat, config).map_err(|e| OperationError::io(path.clone(), e))?;

  let kind = if let Some(first) = hardlinks.observe(stat.device_id, stat.inode, stat.nlink, &archived_name) {
    EntryKind::HardLink {
      target: relative_path::RelativePathBuf::from(first),
    }
  } else {
    kind
  };

  let mut logical = LogicalEntry {
    path: rel_path,
    kind,
    mode: FilePermissions::from_mode_bits(stat.mode),
    uid: stat.uid,
    gid: stat.gid,
    uname: super::owner::uid_to_name(stat.uid).unwrap_or_default(),
    gname: super::owner::gid_to_name(stat.gid).unwrap_or_default(),
    mtime: stat.mtime,
    atime: None,
    ctime: None,
    extras: Vec::new(),
  };

  let mut data = Vec::new();
  if let (EntryKind::RegularFile { size, .. }, Some(mut file)) = (logical.kind.clone(), file) {
    if config.sparse {
      if let Ok(regions) = sparse_fs::detect(&mut file, size) {
        if crate::format::sparse::is_worthy(&regions, size) {
          let mut expanded = vec![0u8; size as usize];
          for region in &regions {
            let start = region.offset as usize;
            let len = region.numbytes as usize;
            use std::io::{Read, Seek, SeekFrom};
            file.seek(SeekFrom::Start(region.offset)).map_err(|e| OperationError::io(path.clone(), e))?;
            file
              .read_exact(&mut expanded[start..start + len])
              .map_err(|e| OperationError::io(path.clone(), e))?;
          }
          data = expanded;
          logical.kind = EntryKind::RegularFile {
            size,
            sparse: Some(regions),
          };
        } else {
          read_whole(&mut file, &mut data, path)?;
        }
      } else {
        read_whole(&mut file, &mut data, path)?;
      }
    } else {
      read_whole(&mut file, &mut data, path)?;
    }
  }

  let bytes = crate::format::encode_entry(&logical, &data, config.format)
    .map_err(|e| { let _ = sink; OperationError::Format(e) })?;
  writer.write_bytes(&bytes).map_err(|e| OperationError::io(path.clone(), e))
}

fn read_whole(file: &mut std::fs::File, data: &mut Vec<u8>, path: &Path) -> Result<(), OperationError> {
  use std::io::Read;
  file.read_to_end(data).map_err(|e| OperationError::io(path, e))?;
  Ok(())
}
