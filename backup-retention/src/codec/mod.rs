//! Archive codec selection.
//!
//! Every backup archive is a tar stream, optionally passed through one
//! compression backend chosen by the configured format token.

pub mod extension;
pub mod stream;

pub use extension::check_archive_extension;

use crate::utils::errors::CodecError;
use std::fmt;
use std::str::FromStr;

/// Every accepted format token, aliases included.
pub const SUPPORTED_FORMATS: &[&str] = &[
    "tar", "lz4", "bzip2", "bz2", "gzip", "gz", "sz", "xz", "br", "brotli", "zstd",
];

/// Archive format named by a format token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Tar,
    Lz4,
    Bzip2,
    Gzip,
    Snappy,
    Xz,
    Brotli,
    Zstd,
}

impl ArchiveFormat {
    /// Canonical format token.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Lz4 => "lz4",
            ArchiveFormat::Bzip2 => "bzip2",
            ArchiveFormat::Gzip => "gzip",
            ArchiveFormat::Snappy => "sz",
            ArchiveFormat::Xz => "xz",
            ArchiveFormat::Brotli => "brotli",
            ArchiveFormat::Zstd => "zstd",
        }
    }

    /// File extension for archives written in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar => ".tar",
            ArchiveFormat::Lz4 => ".lz4",
            ArchiveFormat::Bzip2 => ".bz2",
            ArchiveFormat::Gzip => ".gz",
            ArchiveFormat::Snappy => ".sz",
            ArchiveFormat::Xz => ".xz",
            ArchiveFormat::Brotli => ".br",
            ArchiveFormat::Zstd => ".zstd",
        }
    }

    /// Codec pair for writing, with `level` applied where the backend has one.
    pub fn writer(self, level: i32) -> CompressedArchive {
        let compression = match self {
            ArchiveFormat::Tar => None,
            ArchiveFormat::Lz4 => Some(Compression::Lz4 { level: Some(level) }),
            ArchiveFormat::Bzip2 => Some(Compression::Bzip2 { level: Some(level) }),
            ArchiveFormat::Gzip => Some(Compression::Gzip {
                level: Some(level),
                multithreaded: true,
            }),
            ArchiveFormat::Snappy => Some(Compression::Snappy),
            ArchiveFormat::Xz => Some(Compression::Xz),
            ArchiveFormat::Brotli => Some(Compression::Brotli { quality: Some(level) }),
            ArchiveFormat::Zstd => Some(Compression::Zstd { level: Some(level) }),
        };
        CompressedArchive::new(self, compression)
    }

    /// Codec pair for reading; decompression never takes a level.
    pub fn reader(self) -> CompressedArchive {
        let compression = match self {
            ArchiveFormat::Tar => None,
            ArchiveFormat::Lz4 => Some(Compression::Lz4 { level: None }),
            ArchiveFormat::Bzip2 => Some(Compression::Bzip2 { level: None }),
            ArchiveFormat::Gzip => Some(Compression::Gzip {
                level: None,
                multithreaded: true,
            }),
            ArchiveFormat::Snappy => Some(Compression::Snappy),
            ArchiveFormat::Xz => Some(Compression::Xz),
            ArchiveFormat::Brotli => Some(Compression::Brotli { quality: None }),
            ArchiveFormat::Zstd => Some(Compression::Zstd { level: None }),
        };
        CompressedArchive::new(self, compression)
    }
}

impl FromStr for ArchiveFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tar" => Ok(ArchiveFormat::Tar),
            "lz4" => Ok(ArchiveFormat::Lz4),
            "bzip2" | "bz2" => Ok(ArchiveFormat::Bzip2),
            "gzip" | "gz" => Ok(ArchiveFormat::Gzip),
            "sz" => Ok(ArchiveFormat::Snappy),
            "xz" => Ok(ArchiveFormat::Xz),
            "br" | "brotli" => Ok(ArchiveFormat::Brotli),
            "zstd" => Ok(ArchiveFormat::Zstd),
            other => Err(CodecError::UnsupportedFormat {
                format: other.to_string(),
                supported: SUPPORTED_FORMATS,
            }),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression backend and its settings.
///
/// `None` levels mean the backend default. `Gzip::multithreaded` is advisory:
/// it lets the archive pipeline compress gzip in parallel, while the stream
/// filters in [`stream`] always compress gzip on a single thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Lz4 { level: Option<i32> },
    Bzip2 { level: Option<i32> },
    Gzip { level: Option<i32>, multithreaded: bool },
    Snappy,
    Xz,
    Brotli { quality: Option<i32> },
    Zstd { level: Option<i32> },
}

impl Compression {
    /// Algorithm family, used to check a writer and a reader are compatible.
    pub fn family(&self) -> ArchiveFormat {
        match self {
            Compression::Lz4 { .. } => ArchiveFormat::Lz4,
            Compression::Bzip2 { .. } => ArchiveFormat::Bzip2,
            Compression::Gzip { .. } => ArchiveFormat::Gzip,
            Compression::Snappy => ArchiveFormat::Snappy,
            Compression::Xz => ArchiveFormat::Xz,
            Compression::Brotli { .. } => ArchiveFormat::Brotli,
            Compression::Zstd { .. } => ArchiveFormat::Zstd,
        }
    }
}

/// Container backend. Archives are always sequential tar streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Archival {
    #[default]
    Tar,
}

/// Archival plus optional compression backend for one archive stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedArchive {
    pub format: ArchiveFormat,
    pub compression: Option<Compression>,
    pub archival: Archival,
}

impl CompressedArchive {
    fn new(format: ArchiveFormat, compression: Option<Compression>) -> Self {
        Self {
            format,
            compression,
            archival: Archival::Tar,
        }
    }

    pub fn file_extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Codec pair for writing archives in `format`.
pub fn archive_writer(format: &str, level: i32) -> Result<CompressedArchive, CodecError> {
    Ok(format.parse::<ArchiveFormat>()?.writer(level))
}

/// Codec pair for reading archives in `format`.
pub fn archive_reader(format: &str) -> Result<CompressedArchive, CodecError> {
    Ok(format.parse::<ArchiveFormat>()?.reader())
}
