//! Backup Retention Library
//!
//! Decides which remote backups a "keep N most recent" policy may delete
//! without breaking incremental chains, and selects the archive codec used to
//! package and unpack backups.

pub mod codec;
pub mod config;
pub mod retention;
pub mod utils;

// Re-export commonly used types
pub use codec::{archive_reader, archive_writer, check_archive_extension, ArchiveFormat, CompressedArchive};
pub use config::Config;
pub use retention::backup::{read_listing, Backup};
pub use retention::{plan_retention, plan_retention_checked, resolve_deletable, RetentionPlan};
pub use utils::errors::{CodecError, Result, RetentionError, RetentionToolError};
