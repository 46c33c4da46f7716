//! Dialect-independent archive codec: numeric encoding, the 512-byte
//! header record, PAX records, sparse file regions, and the decode/encode
//! entry state machines. `no_std`-compatible; the filesystem- and
//! subprocess-facing operation engine lives in `crate::ops` behind the
//! `std` feature.

pub mod constants;
pub mod dialect;
pub mod entry_iterator;
pub mod entry_writer;
pub mod errors;
pub mod header;
pub mod inode;
pub mod numeric;
pub mod pax;
pub mod sparse;
pub mod typeflag;

pub use dialect::{Dialect, HeaderMagic};
pub use entry_iterator::{DecodeLimits, DecodeStep, DecodedEntry, EntryDecoder};
pub use entry_writer::encode_entry;
pub use errors::{AuditSink, DiagnosticSink, ErrorSeverity, FieldContext, FormatError, FormatErrorKind, IgnoreSink, StrictSink};
pub use header::RawHeader;
pub use inode::{EntryKind, FilePermissions, LogicalEntry, Permission, Timestamp};
pub use pax::PaxAttributes;
pub use sparse::{SparseFormat, SparseRegion};
pub use typeflag::TypeFlag;
