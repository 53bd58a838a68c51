//! Utility modules for the retention tool.

pub mod errors;
pub mod logger;

pub use errors::{CodecError, Result, RetentionError, RetentionToolError};
