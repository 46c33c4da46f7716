//! Archive format dialect selection.

/// The magic/version bytes stamped into every header, independent of which
/// extension mechanism (`Dialect`) a particular entry ends up using for an
/// over-long name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMagic {
  V7,
  Ustar,
  Gnu,
}

impl HeaderMagic {
  #[must_use]
  pub const fn bytes(self) -> [u8; 8] {
    match self {
      HeaderMagic::V7 => super::constants::MAGIC_VERSION_V7,
      HeaderMagic::Ustar => super::constants::MAGIC_VERSION_USTAR,
      HeaderMagic::Gnu => super::constants::MAGIC_VERSION_GNU,
    }
  }

  #[must_use]
  pub fn from_bytes(bytes: &[u8; 8]) -> Option<Self> {
    if *bytes == super::constants::MAGIC_VERSION_USTAR {
      Some(HeaderMagic::Ustar)
    } else if *bytes == super::constants::MAGIC_VERSION_GNU {
      Some(HeaderMagic::Gnu)
    } else if *bytes == super::constants::MAGIC_VERSION_V7 {
      Some(HeaderMagic::V7)
    } else {
      None
    }
  }
}

/// One of the five archive dialects an operation can select,
/// governing how an over-long name or a sparse file gets carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
  V7,
  Ustar,
  OldGnu,
  #[default]
  Gnu,
  Pax,
}

impl Dialect {
  #[must_use]
  pub const fn header_magic(self) -> HeaderMagic {
    match self {
      Dialect::V7 => HeaderMagic::V7,
      Dialect::Ustar | Dialect::Pax => HeaderMagic::Ustar,
      Dialect::OldGnu | Dialect::Gnu => HeaderMagic::Gnu,
    }
  }

  #[must_use]
  pub const fn supports_prefix_split(self) -> bool {
    matches!(self, Dialect::Ustar | Dialect::Pax)
  }

  #[must_use]
  pub const fn supports_gnu_long_name(self) -> bool {
    matches!(self, Dialect::OldGnu | Dialect::Gnu)
  }

  #[must_use]
  pub const fn supports_pax_extension(self) -> bool {
    matches!(self, Dialect::Pax)
  }

  #[must_use]
  pub const fn supports_sparse_pax_1_0(self) -> bool {
    matches!(self, Dialect::Gnu | Dialect::Pax)
  }
}
