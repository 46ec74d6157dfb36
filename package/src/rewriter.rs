//! Single-shader package rewriting.
//!
//! [`PackageRewriter`] takes an existing material package and a replacement
//! source for one `(model, variant, stage)` record, and produces a new
//! package with exactly that record changed. Every chunk other than the
//! affected dictionary/material pair is copied through bit-for-bit, in the
//! original order; the rewritten pair is appended at the end, dictionary
//! first.
//!
//! The backend is inferred from the chunks present in the input. For the
//! SPIR-V backend the replacement source is run through the external
//! [`SpirvCompiler`] first; text backends store the source as-is.

use crate::ShaderKey;
use crate::chunk::{ChunkContainer, ChunkTag};
use crate::codec::{BlobCodec, SpirvCompiler};
use crate::error::PackageError;
use crate::spirv_index::SpirvShaderIndex;
use crate::text_index::TextShaderIndex;

/// Rewrites one shader record of a material package.
///
/// Holds the two external seams explicitly — there is no process-wide
/// compiler or codec state.
pub struct PackageRewriter<'a> {
    codec: &'a dyn BlobCodec,
    compiler: &'a dyn SpirvCompiler,
}

impl<'a> PackageRewriter<'a> {
    pub fn new(codec: &'a dyn BlobCodec, compiler: &'a dyn SpirvCompiler) -> Self {
        Self { codec, compiler }
    }

    /// Produce a new package with the record matching `key` replaced by
    /// `source`.
    ///
    /// The input buffer is never modified; on any error no output is
    /// produced.
    pub fn rewrite(
        &self,
        package: &[u8],
        key: ShaderKey,
        source: &[u8],
    ) -> Result<Vec<u8>, PackageError> {
        let container = ChunkContainer::parse(package)
            .map_err(|err| PackageError::MalformedPackage(err.to_string()))?;

        let (dict_tag, mat_tag) = select_backend(&container)?;
        if !container.has(dict_tag) {
            return Err(PackageError::MalformedPackage(format!(
                "material chunk {mat_tag:?} present without its dictionary {dict_tag:?}"
            )));
        }

        if mat_tag == ChunkTag::MATERIAL_SPIRV {
            self.rewrite_spirv(&container, dict_tag, mat_tag, key, source)
        } else {
            self.rewrite_text(&container, dict_tag, mat_tag, key, source)
        }
    }

    fn rewrite_text(
        &self,
        container: &ChunkContainer<'_>,
        dict_tag: ChunkTag,
        mat_tag: ChunkTag,
        key: ShaderKey,
        source: &[u8],
    ) -> Result<Vec<u8>, PackageError> {
        let source = std::str::from_utf8(source).map_err(|_| {
            PackageError::MalformedPackage("replacement shader source is not UTF-8".to_owned())
        })?;

        let mut index = TextShaderIndex::parse(container, dict_tag, mat_tag)?;
        index.replace(key, source)?;

        let mut out = Vec::with_capacity(container.data().len());
        copy_passthrough(container, dict_tag, mat_tag, &mut out);
        index.write_chunks(&mut out)?;
        Ok(out)
    }

    fn rewrite_spirv(
        &self,
        container: &ChunkContainer<'_>,
        dict_tag: ChunkTag,
        mat_tag: ChunkTag,
        key: ShaderKey,
        source: &[u8],
    ) -> Result<Vec<u8>, PackageError> {
        let source = std::str::from_utf8(source).map_err(|_| {
            PackageError::MalformedPackage("replacement shader source is not UTF-8".to_owned())
        })?;
        let words = self
            .compiler
            .compile(source, key.stage, key.model)
            .map_err(|diagnostic| {
                log::error!("SPIR-V compilation failed for {key}:\n{diagnostic}");
                PackageError::CompileError(diagnostic)
            })?;
        let blob: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        log::info!("re-generated SPIR-V for {key} ({} bytes)", blob.len());

        let mut index = SpirvShaderIndex::parse(container, self.codec)?;
        index.replace(key, blob)?;

        let mut out = Vec::with_capacity(container.data().len());
        copy_passthrough(container, dict_tag, mat_tag, &mut out);
        index.write_chunks(&mut out, self.codec)?;
        Ok(out)
    }
}

/// Pick the dictionary/material tag pair from the chunks present.
fn select_backend(container: &ChunkContainer<'_>) -> Result<(ChunkTag, ChunkTag), PackageError> {
    if container.has(ChunkTag::MATERIAL_SPIRV) {
        Ok((ChunkTag::DICTIONARY_SPIRV, ChunkTag::MATERIAL_SPIRV))
    } else if container.has(ChunkTag::MATERIAL_GLSL) {
        Ok((ChunkTag::DICTIONARY_TEXT, ChunkTag::MATERIAL_GLSL))
    } else if container.has(ChunkTag::MATERIAL_METAL) {
        Ok((ChunkTag::DICTIONARY_TEXT, ChunkTag::MATERIAL_METAL))
    } else {
        Err(PackageError::UnsupportedBackend)
    }
}

/// Copy every chunk except the dictionary/material pair, bit-exact and in
/// original order.
fn copy_passthrough(
    container: &ChunkContainer<'_>,
    dict_tag: ChunkTag,
    mat_tag: ChunkTag,
    out: &mut Vec<u8>,
) {
    for (tag, raw) in container.chunks() {
        if tag == dict_tag || tag == mat_tag {
            continue;
        }
        out.extend_from_slice(raw);
    }
}
