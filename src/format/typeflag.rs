//! The header `typeflag` byte.

/// The type of entry a header describes. Ported from
/// `TarTypeFlag`, extended with the PAX global/per-file and GNU long-name
/// variants the entry iterator must recognize explicitly.
#[derive(Debug, Eq, Hash, PartialEq, Clone, Copy)]
pub enum TypeFlag {
  RegularFile,
  HardLink,
  SymbolicLink,
  CharacterDevice,
  BlockDevice,
  Directory,
  Fifo,
  /// `'7'`, contiguous file; treated identically to a regular file.
  ContiguousFile,
  /// `'x'`, PAX per-file extended header.
  PaxExtendedHeader,
  /// `'g'`, PAX global extended header.
  PaxGlobalExtendedHeader,
  /// `'L'`, GNU long name pre-entry.
  LongNameGnu,
  /// `'K'`, GNU long link pre-entry.
  LongLinkNameGnu,
  /// `'S'`, GNU sparse (old format).
  SparseOldGnu,
  /// `'V'`, GNU volume label; metadata-only, never materialized.
  VolumeLabel,
  /// `'M'`, GNU multivolume continuation.
  MultiVolume,
  Unknown(u8),
}

impl TypeFlag {
  /// Real (non-pre-entry) types that the entry iterator materializes as a
  /// logical entry.
  #[must_use]
  pub fn is_real_entry(self) -> bool {
    matches!(
      self,
      TypeFlag::RegularFile
        | TypeFlag::HardLink
        | TypeFlag::SymbolicLink
        | TypeFlag::CharacterDevice
        | TypeFlag::BlockDevice
        | TypeFlag::Directory
        | TypeFlag::Fifo
        | TypeFlag::ContiguousFile
        | TypeFlag::SparseOldGnu
        | TypeFlag::VolumeLabel
        | TypeFlag::MultiVolume
        | TypeFlag::Unknown(_)
    )
  }

  #[must_use]
  pub fn is_pre_entry(self) -> bool {
    matches!(
      self,
      TypeFlag::PaxExtendedHeader
        | TypeFlag::PaxGlobalExtendedHeader
        | TypeFlag::LongNameGnu
        | TypeFlag::LongLinkNameGnu
    )
  }
}

impl From<u8> for TypeFlag {
  fn from(value: u8) -> Self {
    match value {
      b'\0' | b'0' => TypeFlag::RegularFile,
      b'1' => TypeFlag::HardLink,
      b'2' => TypeFlag::SymbolicLink,
      b'3' => TypeFlag::CharacterDevice,
      b'4' => TypeFlag::BlockDevice,
      b'5' => TypeFlag::Directory,
      b'6' => TypeFlag::Fifo,
      b'7' => TypeFlag::ContiguousFile,
      b'x' => TypeFlag::PaxExtendedHeader,
      b'g' => TypeFlag::PaxGlobalExtendedHeader,
      b'L' => TypeFlag::LongNameGnu,
      b'K' => TypeFlag::LongLinkNameGnu,
      b'S' => TypeFlag::SparseOldGnu,
      b'V' => TypeFlag::VolumeLabel,
      b'M' => TypeFlag::MultiVolume,
      other => TypeFlag::Unknown(other),
    }
  }
}

impl From<TypeFlag> for u8 {
  fn from(value: TypeFlag) -> Self {
    match value {
      TypeFlag::RegularFile => b'0',
      TypeFlag::HardLink => b'1',
      TypeFlag::SymbolicLink => b'2',
      TypeFlag::CharacterDevice => b'3',
      TypeFlag::BlockDevice => b'4',
      TypeFlag::Directory => b'5',
      TypeFlag::Fifo => b'6',
      TypeFlag::ContiguousFile => b'7',
      TypeFlag::PaxExtendedHeader => b'x',
      TypeFlag::PaxGlobalExtendedHeader => b'g',
      TypeFlag::LongNameGnu => b'L',
      TypeFlag::LongLinkNameGnu => b'K',
      TypeFlag::SparseOldGnu => b'S',
      TypeFlag::VolumeLabel => b'V',
      TypeFlag::MultiVolume => b'M',
      TypeFlag::Unknown(b) => b,
    }
  }
}
