//! External collaborator seams: blob compression and SPIR-V compilation.
//!
//! The package codec treats both as opaque, blocking functions. The SPIR-V
//! blob transform (SMOL-V in production) and the shader front-end live
//! outside this crate; callers inject them through the traits below.

use std::io;

/// Byte-level compression codec applied to individual SPIR-V blobs.
///
/// The dictionary serializer calls [`compress`](Self::compress) once per
/// blob; the deserializer calls [`decompress`](Self::decompress) with the
/// recorded decompressed size and expects exactly that many bytes back.
pub trait BlobCodec {
    fn compress(&self, bytes: &[u8]) -> io::Result<Vec<u8>>;

    fn decompress(&self, bytes: &[u8], expected_size: usize) -> io::Result<Vec<u8>>;
}

/// zstd-backed [`BlobCodec`].
///
/// Stands in for SPIR-V-specific codecs in tests and tooling; anything that
/// satisfies the size contract can be swapped in.
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new() -> Self {
        Self {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }

    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobCodec for ZstdCodec {
    fn compress(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        zstd::bulk::compress(bytes, self.level)
    }

    fn decompress(&self, bytes: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
        let out = zstd::bulk::decompress(bytes, expected_size)?;
        if out.len() != expected_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "expected {expected_size} decompressed bytes, got {}",
                    out.len()
                ),
            ));
        }
        Ok(out)
    }
}

/// External SPIR-V front-end.
///
/// Compiles shader source for the given stage and shader model into a
/// 4-byte-aligned word array. On failure the implementation returns its full
/// diagnostic log, which the rewriter attaches to
/// [`PackageError::CompileError`](crate::PackageError::CompileError).
pub trait SpirvCompiler {
    fn compile(&self, source: &str, stage: u8, model: u8) -> Result<Vec<u32>, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstd_roundtrip() {
        let codec = ZstdCodec::new();
        let blob: Vec<u8> = (0..1024u32).flat_map(|w| w.to_le_bytes()).collect();
        let compressed = codec.compress(&blob).unwrap();
        let restored = codec.decompress(&compressed, blob.len()).unwrap();
        assert_eq!(blob, restored);
    }

    #[test]
    fn zstd_rejects_wrong_expected_size() {
        let codec = ZstdCodec::new();
        let compressed = codec.compress(&[7u8; 64]).unwrap();
        assert!(codec.decompress(&compressed, 16).is_err());
    }
}
