//! Material-package codec for compiled shader programs.
//!
//! A material package is a flat, chunked binary container holding the
//! compiled shaders of one material for several backends: text-form GLSL and
//! MSL, and binary-form SPIR-V. Shaders are indexed by a
//! [`ShaderKey`] — the (shader model, variant, stage) tuple — and stored
//! compressed:
//!
//! - **Text shaders** are split into lines and encoded as 16-bit indices
//!   into a shared [`StringDictionary`], so variants that differ in a few
//!   lines share the rest.
//! - **SPIR-V shaders** reference entries of a [`BlobDictionary`] whose
//!   blobs are stored through an external byte-level codec and deduplicated
//!   by content.
//!
//! # Chunk stream
//!
//! ```text
//! (tag: u64 LE, size: u32 LE, payload: [u8; size]) ...
//! ```
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `DICTTEXT` | `count: u32`, `count` NUL-terminated UTF-8 lines |
//! | `DICTSPRV` | compressed blob table (begins 8-byte aligned) |
//! | `MAT_GLSL` / `MAT_METL` | text shader records (line indices) |
//! | `MAT_SPRV` | SPIR-V shader records (blob indices) |
//!
//! Unknown tags are preserved bit-for-bit by the rewrite path.
//!
//! # Rewriting
//!
//! [`PackageRewriter`] replaces a single shader record in an existing
//! package and re-emits a consistent package: every other chunk is copied
//! through unchanged, the affected dictionary is rebuilt, and the two
//! affected chunks are re-serialized (dictionary first, then material).
//!
//! External collaborators — the per-blob compression codec and the SPIR-V
//! front-end — enter through the [`BlobCodec`] and [`SpirvCompiler`] traits;
//! nothing in this crate reaches for global state.

pub mod chunk;
pub mod codec;
pub mod dictionary;
pub mod error;
pub mod rewriter;
pub mod spirv_index;
pub mod text_index;

#[cfg(test)]
mod tests;

pub use chunk::{ChunkContainer, ChunkTag};
pub use codec::{BlobCodec, SpirvCompiler, ZstdCodec};
pub use dictionary::{BlobDictionary, StringDictionary};
pub use error::PackageError;
pub use rewriter::PackageRewriter;
pub use spirv_index::{SpirvShaderIndex, SpirvShaderRecord};
pub use text_index::{TextShaderIndex, TextShaderRecord};

use std::fmt;

/// Identifies one shader record within a material package.
///
/// `variant` is an opaque 8-bit configuration code chosen by the caller
/// (e.g. skinned + shadow-receiving), `model` the targeted GPU feature
/// level, `stage` the pipeline stage (vertex, fragment, or any opaque
/// byte). Records are not required to be sorted by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub model: u8,
    pub variant: u8,
    pub stage: u8,
}

impl ShaderKey {
    pub const fn new(model: u8, variant: u8, stage: u8) -> Self {
        Self {
            model,
            variant,
            stage,
        }
    }
}

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(model {}, variant {}, stage {})",
            self.model, self.variant, self.stage
        )
    }
}
