//! Error types for archive reading and writing.

use std::fmt;

/// Errors raised while loading or serializing an ubershader archive.
#[derive(Debug)]
pub enum ArchiveError {
    /// The archive buffer cannot be decompressed or its decoded structure
    /// is inconsistent (bad magic, out-of-range offset, unknown ordinal).
    CorruptArchive(String),
    /// A spec-file line failed to parse. Positions are 1-based.
    SpecSyntax {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },
    /// The transport compressor failed.
    Codec(std::io::Error),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorruptArchive(msg) => write!(f, "corrupt archive: {msg}"),
            Self::SpecSyntax {
                file,
                line,
                column,
                message,
            } => write!(f, "{file}.spec({line},{column}): {message}"),
            Self::Codec(err) => write!(f, "archive codec error: {err}"),
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }
}
