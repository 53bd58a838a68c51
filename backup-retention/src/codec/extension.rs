//! Archive file extension checks used when locating existing archives.

/// Whether an archive file extension (leading dot included) fits `format`.
///
/// Formats with aliases only accept their two spellings exactly; every other
/// format matches any extension ending with the format token, so `.tar.zstd`
/// is a `zstd` archive.
pub fn check_archive_extension(ext: &str, format: &str) -> bool {
    match format {
        "gz" | "gzip" => matches!(ext, ".gz" | ".gzip"),
        "bz2" | "bzip2" => matches!(ext, ".bz2" | ".bzip2"),
        "br" | "brotli" => matches!(ext, ".br" | ".brotli"),
        _ => ext.ends_with(format),
    }
}
