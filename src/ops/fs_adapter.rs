//! Host filesystem interface.
//!
//! `mknod`/`makedev` usage is ported directly from
//! `AOSC-Dev-aoscbootstrap`'s `fs.rs::make_device_nodes`; everything else
//! is `std::fs`, the same mix that file shows (`std::fs::create_dir_all`
//! alongside `nix::sys::stat::mknod`).

use std::{
  fs,
  io,
  os::unix::fs::{symlink, MetadataExt, PermissionsExt},
  path::Path,
  time::{Duration, SystemTime, UNIX_EPOCH},
};

use nix::sys::stat::{makedev, mknod, Mode, SFlag};

use crate::format::{EntryKind, Timestamp};

/// The subset of `lstat` fields the operation engine needs.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
  pub device_id: u64,
  pub inode: u64,
  pub mode: u32,
  /// The device this file *is*, for character/block device entries
  /// (`major(rdev)`/`minor(rdev)`); meaningless for other file kinds.
  pub rdev: u64,
  pub size: u64,
  pub mtime: Timestamp,
  pub uid: u32,
  pub gid: u32,
  pub nlink: u64,
}

#[must_use]
pub fn lstat(path: &Path) -> io::Result<Stat> {
  let meta = fs::symlink_metadata(path)?;
  Ok(Stat {
    device_id: meta.dev(),
    inode: meta.ino(),
    mode: meta.mode(),
    rdev: meta.rdev(),
    size: meta.size(),
    mtime: Timestamp {
      seconds_since_epoch: meta.mtime().max(0) as u64,
      nanoseconds: meta.mtime_nsec().max(0) as u32,
    },
    uid: meta.uid(),
    gid: meta.gid(),
    nlink: meta.nlink(),
  })
}

/// Follows symlinks, used when `dereference` is set.
#[must_use]
pub fn stat_follow(path: &Path) -> io::Result<Stat> {
  let meta = fs::metadata(path)?;
  Ok(Stat {
    device_id: meta.dev(),
    inode: meta.ino(),
    mode: meta.mode(),
    rdev: meta.rdev(),
    size: meta.size(),
    mtime: Timestamp {
      seconds_since_epoch: meta.mtime().max(0) as u64,
      nanoseconds: meta.mtime_nsec().max(0) as u32,
    },
    uid: meta.uid(),
    gid: meta.gid(),
    nlink: meta.nlink(),
  })
}

/// Splits a raw `st_rdev` into GNU-tar's (major, minor) pair using the
/// glibc encoding (major in bits 8-19 and 32-63, minor in bits 0-7 and
/// 20-31). Only the low bits are populated in practice for the device
/// numbers tar cares about.
#[must_use]
pub fn major_minor(rdev: u64) -> (u32, u32) {
  let major = ((rdev >> 8) & 0xfff) as u32 | ((rdev >> 32) & !0xfff) as u32;
  let minor = (rdev & 0xff) as u32 | ((rdev >> 12) & !0xff) as u32;
  (major, minor)
}

pub fn read_link(path: &Path) -> io::Result<std::path::PathBuf> {
  fs::read_link(path)
}

pub fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
  symlink(target, link)
}

pub fn make_hard_link(existing: &Path, new: &Path) -> io::Result<()> {
  fs::hard_link(existing, new)
}

pub fn mkdir_p(path: &Path) -> io::Result<()> {
  fs::create_dir_all(path)
}

pub fn delete_file(path: &Path) -> io::Result<()> {
  match fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}

pub fn delete_dir(path: &Path) -> io::Result<()> {
  fs::remove_dir_all(path)
}

pub fn create_file(path: &Path) -> io::Result<fs::File> {
  fs::File::create(path)
}

pub fn open_file_read(path: &Path) -> io::Result<fs::File> {
  fs::File::open(path)
}

pub fn rename(from: &Path, to: &Path) -> io::Result<()> {
  fs::rename(from, to)
}

pub fn chmod(path: &Path, mode: u32) -> io::Result<()> {
  fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

pub fn set_mtime(path: &Path, mtime: Timestamp) -> io::Result<()> {
  let time = UNIX_EPOCH + Duration::new(mtime.seconds_since_epoch, mtime.nanoseconds);
  let file = fs::File::options().write(true).open(path)?;
  file.set_modified(time)
}

/// Creates a character or block device node, or a directory/FIFO-adjacent
/// node when needed device-entry materialization.
/// Grounded directly in `AOSC-Dev-aoscbootstrap`'s `make_device_nodes`.
pub fn mknod_for(path: &Path, kind: &EntryKind, mode: u32) -> io::Result<()> {
  let permission = Mode::from_bits_truncate(mode & 0o7777);
  let sflag = match kind {
    EntryKind::CharacterDevice { .. } => SFlag::S_IFCHR,
    EntryKind::BlockDevice { .. } => SFlag::S_IFBLK,
    EntryKind::Fifo => SFlag::S_IFIFO,
    _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a device/fifo kind")),
  };
  let dev = match kind {
    EntryKind::CharacterDevice { major, minor } | EntryKind::BlockDevice { major, minor } => {
      makedev(u64::from(*major), u64::from(*minor))
    },
    _ => 0,
  };
  mknod(path, sflag, permission, dev).map_err(io::Error::from)
}

/// Sets `size` exactly, creating a sparse hole if the new size is larger
/// than the current one and the filesystem supports it.
pub fn set_len(file: &fs::File, size: u64) -> io::Result<()> {
  file.set_len(size)
}

#[must_use]
pub fn now() -> SystemTime {
  SystemTime::now()
}
