//! The operation configuration bundle.
//!
//! Mirrors `parser_options.rs`'s shape: a flat options struct
//! with a nested `Limits`-style sub-bundle, all fields `Default`-able so
//! callers only need to override what they care about. There is no CLI
//! parser here (out of scope) -- a caller (a `clap`-based
//! binary, a test harness) builds one of these directly.

use std::path::PathBuf;

/// Which of the seven archive workflows to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Create,
  Extract,
  List,
  Append,
  Update,
  Delete,
  Diff,
  Concatenate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
  #[default]
  Auto,
  None,
  Gzip,
  Bzip2,
  Xz,
  Zstd,
}

pub use crate::format::Dialect as ArchiveFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
  Quiet,
  #[default]
  Normal,
  Verbose,
  VeryVerbose,
}

/// What to do when an extracted file's destination path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
  #[default]
  Overwrite,
  KeepOld,
  KeepNewer,
  SkipOld,
  UnlinkFirst,
}

/// A single path-rewrite rule applied by `ops::name_policy`, e.g. the
/// result of parsing a `-s` transform expression (the expression syntax
/// itself is out of scope; collaborators hand us the
/// already-compiled rule).
#[derive(Debug, Clone)]
pub struct NameTransform {
  pub pattern: String,
  pub replacement: String,
  pub global: bool,
}

/// The full set of options the operation engine understands.
#[derive(Debug, Clone)]
pub struct OperationConfig {
  pub operation: Operation,
  pub archive_path: Option<PathBuf>,
  pub file_list: Vec<PathBuf>,
  pub directory: Option<PathBuf>,
  pub compression: Compression,
  pub format: ArchiveFormat,
  pub verbosity: Verbosity,
  pub strip_components: u32,
  pub preserve_permissions: bool,
  pub dereference: bool,
  pub overwrite_mode: OverwriteMode,
  pub to_stdout: bool,
  pub exclude_patterns: Vec<String>,
  pub files_from: Option<PathBuf>,
  pub exclude_from: Option<PathBuf>,
  pub null_terminated: bool,
  pub absolute_names: bool,
  pub touch: bool,
  pub numeric_owner: bool,
  pub ignore_zeros: bool,
  pub sparse: bool,
  pub transforms: Vec<NameTransform>,
  pub blocking_factor: u32,
  pub one_file_system: bool,
  pub newer_mtime: Option<u64>,
  pub remove_files: bool,
  pub verify: bool,
  pub checkpoint: Option<u32>,
  pub listed_incremental: Option<PathBuf>,
  pub multi_volume: bool,
  pub tape_length: Option<u64>,
  pub xattrs: bool,
  pub acls: bool,
  pub selinux: bool,
  pub limits: DecodeLimits,
}

/// Resource bounds applied while decoding an archive, mirroring
/// `TarParserLimits`.
pub use crate::format::DecodeLimits;

impl Default for OperationConfig {
  fn default() -> Self {
    OperationConfig {
      operation: Operation::List,
      archive_path: None,
      file_list: Vec::new(),
      directory: None,
      compression: Compression::default(),
      format: ArchiveFormat::default(),
      verbosity: Verbosity::default(),
      strip_components: 0,
      preserve_permissions: false,
      dereference: false,
      overwrite_mode: OverwriteMode::default(),
      to_stdout: false,
      exclude_patterns: Vec::new(),
      files_from: None,
      exclude_from: None,
      null_terminated: false,
      absolute_names: false,
      touch: false,
      numeric_owner: false,
      ignore_zeros: false,
      sparse: true,
      transforms: Vec::new(),
      blocking_factor: 20,
      one_file_system: false,
      newer_mtime: None,
      remove_files: false,
      verify: false,
      checkpoint: None,
      listed_incremental: None,
      multi_volume: false,
      tape_length: None,
      xattrs: false,
      acls: false,
      selinux: false,
      limits: DecodeLimits::default(),
    }
  }
}
