//! Fixed layout constants for the 512-byte tar header record.
//!
//! https://www.gnu.org/software/tar/manual/html_node/Standard.html

/// The unit of I/O for an archive: every header and every data payload is
/// padded out to a multiple of this size.
pub const BLOCK_SIZE: usize = 512;

/// A block of zeros, used both for padding and for the two-block
/// end-of-archive marker.
pub const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

/// `magic`/`version` pair for the v7 format: all zeros.
pub const MAGIC_VERSION_V7: [u8; 8] = *b"\0\0\0\0\0\0\0\0";
/// `magic`/`version` pair shared by ustar and PAX.
pub const MAGIC_VERSION_USTAR: [u8; 8] = *b"ustar\x0000";
/// `magic`/`version` pair used by GNU/oldgnu (trailing space, null version byte).
pub const MAGIC_VERSION_GNU: [u8; 8] = *b"ustar  \0";

/// Byte offsets of every field in the 512-byte header.
pub mod offset {
  pub const NAME: (usize, usize) = (0, 100);
  pub const MODE: (usize, usize) = (100, 108);
  pub const UID: (usize, usize) = (108, 116);
  pub const GID: (usize, usize) = (116, 124);
  pub const SIZE: (usize, usize) = (124, 136);
  pub const MTIME: (usize, usize) = (136, 148);
  pub const CHKSUM: (usize, usize) = (148, 156);
  pub const TYPEFLAG: usize = 156;
  pub const LINKNAME: (usize, usize) = (157, 257);
  pub const MAGIC_VERSION: (usize, usize) = (257, 265);
  pub const UNAME: (usize, usize) = (265, 297);
  pub const GNAME: (usize, usize) = (297, 329);
  pub const DEVMAJOR: (usize, usize) = (329, 337);
  pub const DEVMINOR: (usize, usize) = (337, 345);
  pub const PREFIX: (usize, usize) = (345, 500);
  pub const GNU_ATIME: (usize, usize) = (345, 357);
  pub const GNU_CTIME: (usize, usize) = (357, 369);
  /// Multi-volume continuation offset, unused outside multi-volume sets.
  pub const GNU_OFFSET: (usize, usize) = (369, 381);
  /// Base of the four inline `(offset, numbytes)` sparse instruction pairs,
  /// 24 bytes each (12-byte octal offset + 12-byte octal numbytes).
  pub const GNU_SPARSE_BASE: usize = 386;
  pub const GNU_SPARSE_ENTRY_LEN: usize = 24;
  pub const GNU_SPARSE_MAX_IN_HEADER: usize = 4;
  pub const GNU_ISEXTENDED: usize = 482;
  pub const GNU_REALSIZE: (usize, usize) = (483, 495);
}

/// Maximum value that fits in an 11-digit octal-ASCII numeric field before
/// the codec must fall back to base-256: `0o77777777777` = 8,589,934,591.
pub const MAX_OCTAL_11: u64 = 0o77_777_777_777;

/// Index of the first NUL byte, or `bytes.len()` if there is none.
#[must_use]
pub(crate) fn find_null_terminator_index(bytes: &[u8]) -> usize {
  bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len())
}
