//! uid/gid name-lookup adapter.
//!
//! Uses `nix::unistd::{User, Group}`, the same crate and feature
//! (`nix`'s `user` feature) other system-facing Rust repos reach for
//! when they need passwd/group lookups rather than hand-rolling one over
//! `/etc/passwd`.

use nix::unistd::{Gid, Group, Uid, User};

/// Resolves a uid to a username, or `None` if there is no such account
/// (the caller falls back to an empty string or the numeric id, per
/// `--numeric-owner` behavior).
#[must_use]
pub fn uid_to_name(uid: u32) -> Option<String> {
  User::from_uid(Uid::from_raw(uid)).ok().flatten().map(|u| u.name)
}

#[must_use]
pub fn gid_to_name(gid: u32) -> Option<String> {
  Group::from_gid(Gid::from_raw(gid)).ok().flatten().map(|g| g.name)
}

/// Reverse lookup, used by `create` when a caller wants archived entries
/// to carry the *current* uid/gid for a given name (rare, but mirrors
/// the symmetry of the interface).
#[must_use]
pub fn name_to_uid(name: &str) -> Option<u32> {
  User::from_name(name).ok().flatten().map(|u| u.uid.as_raw())
}

#[must_use]
pub fn name_to_gid(name: &str) -> Option<u32> {
  Group::from_name(name).ok().flatten().map(|g| g.gid.as_raw())
}
