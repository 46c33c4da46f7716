//! The logical, dialect-independent entry model that header fields, PAX
//! records and GNU long-name pre-entries all get folded into.
//!
//! Ported from `tar_inode.rs`: `TarInode`/`FileEntry` become
//! `LogicalEntry`/`EntryKind` here, widened to carry the sparse region list
//! from `format::sparse` instead of raw old-GNU instructions, and to carry
//! optional atime/ctime carried from PAX records when present.

use alloc::string::String;

use relative_path::RelativePathBuf;

use super::sparse::SparseRegion;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
  pub seconds_since_epoch: u64,
  pub nanoseconds: u32,
}

impl Timestamp {
  #[must_use]
  pub const fn from_seconds(seconds_since_epoch: u64) -> Self {
    Timestamp {
      seconds_since_epoch,
      nanoseconds: 0,
    }
  }
}

/// A single user class's read/write/execute bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Permission {
  pub read: bool,
  pub write: bool,
  pub execute: bool,
}

impl Permission {
  const fn from_bits(mode: u32, read_bit: u32, write_bit: u32, execute_bit: u32) -> Self {
    Permission {
      read: mode & read_bit != 0,
      write: mode & write_bit != 0,
      execute: mode & execute_bit != 0,
    }
  }

  const fn to_bits(self, read_bit: u32, write_bit: u32, execute_bit: u32) -> u32 {
    (if self.read { read_bit } else { 0 })
      | (if self.write { write_bit } else { 0 })
      | (if self.execute { execute_bit } else { 0 })
  }
}

/// Owner/group/other permission bits plus the three special bits, as stored
/// in the 12-byte octal `mode` header field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilePermissions {
  pub owner: Permission,
  pub group: Permission,
  pub other: Permission,
  pub set_uid: bool,
  pub set_gid: bool,
  pub sticky: bool,
}

impl Default for FilePermissions {
  fn default() -> Self {
    FilePermissions::from_mode_bits(0o644)
  }
}

impl FilePermissions {
  #[must_use]
  pub const fn from_mode_bits(mode: u32) -> Self {
    FilePermissions {
      owner: Permission::from_bits(mode, 0o400, 0o200, 0o100),
      group: Permission::from_bits(mode, 0o040, 0o020, 0o010),
      other: Permission::from_bits(mode, 0o004, 0o002, 0o001),
      set_uid: mode & 0o4000 != 0,
      set_gid: mode & 0o2000 != 0,
      sticky: mode & 0o1000 != 0,
    }
  }

  #[must_use]
  pub const fn to_mode_bits(self) -> u32 {
    self.owner.to_bits(0o400, 0o200, 0o100)
      | self.group.to_bits(0o040, 0o020, 0o010)
      | self.other.to_bits(0o004, 0o002, 0o001)
      | (if self.set_uid { 0o4000 } else { 0 })
      | (if self.set_gid { 0o2000 } else { 0 })
      | (if self.sticky { 0o1000 } else { 0 })
  }
}

/// The dialect-independent shape of an entry.
#[derive(Clone, Debug)]
pub enum EntryKind {
  RegularFile {
    size: u64,
    sparse: Option<alloc::vec::Vec<SparseRegion>>,
  },
  HardLink {
    target: RelativePathBuf,
  },
  SymbolicLink {
    target: RelativePathBuf,
  },
  CharacterDevice {
    major: u32,
    minor: u32,
  },
  BlockDevice {
    major: u32,
    minor: u32,
  },
  Directory,
  Fifo,
}

impl EntryKind {
  #[must_use]
  pub const fn logical_size(&self) -> u64 {
    match self {
      EntryKind::RegularFile { size, .. } => *size,
      _ => 0,
    }
  }
}

/// A fully-resolved archive entry: a real header merged with any
/// preceding PAX records and GNU long-name/long-link pre-entries, highest
/// precedence first: per-entry PAX, global PAX, then L/K.
#[derive(Clone, Debug)]
pub struct LogicalEntry {
  pub path: RelativePathBuf,
  pub kind: EntryKind,
  pub mode: FilePermissions,
  pub uid: u32,
  pub gid: u32,
  pub uname: String,
  pub gname: String,
  pub mtime: Timestamp,
  pub atime: Option<Timestamp>,
  pub ctime: Option<Timestamp>,
  /// PAX keys neither the header nor a well-known PAX key covers
  /// (e.g. `SCHILY.xattr.*`), preserved in encounter order. Values are raw
  /// bytes since vendor keys may carry non-UTF-8 data.
  pub extras: alloc::vec::Vec<(String, alloc::vec::Vec<u8>)>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mode_bits_round_trip() {
    for mode in [0o644, 0o755, 0o4755, 0o1777, 0o2644, 0] {
      let perms = FilePermissions::from_mode_bits(mode);
      assert_eq!(perms.to_mode_bits(), mode);
    }
  }

  #[test]
  fn default_permissions_are_644() {
    assert_eq!(FilePermissions::default().to_mode_bits(), 0o644);
  }
}
