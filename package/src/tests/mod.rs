//! Cross-module package tests: full rewrite scenarios and round-trip laws.


use crate::codec::SpirvCompiler;
use crate::{ChunkTag, ShaderKey, SpirvShaderIndex, TextShaderIndex, ZstdCodec};

/// Deterministic stand-in for the external SPIR-V front-end.
///
/// Emits a recognizable header word followed by the packed source bytes, so
/// tests can predict the exact replacement blob. Sources containing
/// `@error` fail with a diagnostic, mimicking a compiler log.
pub(crate) struct StubCompiler;

impl SpirvCompiler for StubCompiler {
    fn compile(&self, source: &str, stage: u8, model: u8) -> Result<Vec<u32>, String> {
        if source.contains("@error") {
            return Err(
                "stub.vert:1: error: unexpected token '@error'\n1 error generated.".to_owned(),
            );
        }
        let mut words = vec![0x0723_0203, u32::from_le_bytes([model, stage, 0, 0])];
        for chunk in source.as_bytes().chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            words.push(u32::from_le_bytes(word));
        }
        Ok(words)
    }
}

/// The blob the stub compiler would produce for `source`.
pub(crate) fn stub_compiled_blob(source: &str, stage: u8, model: u8) -> Vec<u8> {
    StubCompiler
        .compile(source, stage, model)
        .unwrap()
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect()
}

/// Build a GLSL package from `(key, text)` pairs.
pub(crate) fn text_package(records: &[(ShaderKey, &str)]) -> Vec<u8> {
    let mut index = TextShaderIndex::new(ChunkTag::DICTIONARY_TEXT, ChunkTag::MATERIAL_GLSL);
    for (key, text) in records {
        index.add_record(*key, text).unwrap();
    }
    let mut out = Vec::new();
    index.write_chunks(&mut out).unwrap();
    out
}

/// Build a SPIR-V package from `(key, blob)` pairs.
pub(crate) fn spirv_package(records: &[(ShaderKey, Vec<u8>)]) -> Vec<u8> {
    let codec = ZstdCodec::new();
    let mut index = SpirvShaderIndex::new();
    for (key, blob) in records {
        index.add_record(*key, blob.clone()).unwrap();
    }
    let mut out = Vec::new();
    index.write_chunks(&mut out, &codec).unwrap();
    out
}
