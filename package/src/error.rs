//! Error types for the material-package codec.

use std::fmt;

use crate::ShaderKey;

/// Errors raised by package parsing, encoding, and rewriting.
///
/// No error is recovered internally: every failure surfaces to the caller
/// and leaves the input package untouched.
#[derive(Debug)]
pub enum PackageError {
    /// A chunk header is truncated or a declared chunk size runs past the
    /// end of the buffer.
    MalformedContainer(String),
    /// The package structure is inconsistent: bad dictionary encoding,
    /// dangling line/blob index, duplicate shader key, or a material chunk
    /// without its dictionary.
    MalformedPackage(String),
    /// None of the known material chunks is present.
    UnsupportedBackend,
    /// No shader record matches the requested key.
    NoSuchShader(ShaderKey),
    /// The external SPIR-V compiler rejected the replacement source.
    /// Carries the compiler's full diagnostic log.
    CompileError(String),
    /// Interning a line would overflow the 16-bit line index space.
    TooManyLines,
    /// A length/offset inconsistency was detected while encoding.
    InternalEncoding(String),
    /// The blob compression codec failed.
    Codec(std::io::Error),
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedContainer(msg) => write!(f, "malformed chunk container: {msg}"),
            Self::MalformedPackage(msg) => write!(f, "malformed material package: {msg}"),
            Self::UnsupportedBackend => write!(f, "package contains no known material chunk"),
            Self::NoSuchShader(key) => write!(f, "no shader record matches {key}"),
            Self::CompileError(log) => write!(f, "shader compilation failed:\n{log}"),
            Self::TooManyLines => write!(f, "too many unique code lines for 16-bit indices"),
            Self::InternalEncoding(msg) => write!(f, "internal chunk encoding error: {msg}"),
            Self::Codec(err) => write!(f, "blob codec error: {err}"),
        }
    }
}

impl std::error::Error for PackageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PackageError {
    fn from(err: std::io::Error) -> Self {
        Self::Codec(err)
    }
}
