//! The `std`-gated operation engine.
//!
//! Composes the no_std format codec (`crate::format`) into the eight
//! archive workflows: `create`, `extract`, `list`, `append`, `update`,
//! `delete`, `diff`, `concatenate`. Each operation's `run` is a free
//! function taking an `&OperationConfig`; there is no dispatcher here
//! (the shapes don't unify -- `diff` reports a differences-found flag,
//! the rest report only success or failure) so a caller matches on
//! `config.operation` itself and calls the matching module's `run`.

mod archive_io;
mod block_stream;
mod compressor;
mod config;
mod diagnostics;
mod entry_source;
mod error;
mod fs_adapter;
mod hardlinks;
mod name_policy;
mod owner;
mod raw_scan;
mod sparse_fs;
mod walker;

pub mod append;
pub mod concatenate;
pub mod create;
pub mod delete;
pub mod diff;
pub mod extract;
pub mod list;
pub mod update;

pub use config::{ArchiveFormat, Compression, NameTransform, Operation, OperationConfig, OverwriteMode, Verbosity};
pub use diagnostics::{CollectingSink, DiagnosticSink, StderrSink};
pub use error::OperationError;
