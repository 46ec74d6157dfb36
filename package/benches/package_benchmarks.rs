use criterion::{Criterion, black_box, criterion_group, criterion_main};

use petal_package::{
    ChunkContainer, ChunkTag, PackageRewriter, ShaderKey, SpirvCompiler, TextShaderIndex,
    ZstdCodec,
};

struct StubCompiler;

impl SpirvCompiler for StubCompiler {
    fn compile(&self, source: &str, _stage: u8, _model: u8) -> Result<Vec<u32>, String> {
        Ok(source.as_bytes().chunks(4).map(|c| c[0] as u32).collect())
    }
}

/// A package with many variants sharing most of their lines, which is the
/// shape ubershader packages take in practice.
fn sample_package(variants: u8) -> Vec<u8> {
    let mut index = TextShaderIndex::new(ChunkTag::DICTIONARY_TEXT, ChunkTag::MATERIAL_GLSL);
    for variant in 0..variants {
        let text = format!(
            "#version 310 es\n\
             precision highp float;\n\
             layout(location = 0) out vec4 color;\n\
             const int kVariant = {variant};\n\
             void main() {{\n\
             color = vec4(float(kVariant));\n\
             }}\n"
        );
        index
            .add_record(ShaderKey::new(1, variant, 0), &text)
            .unwrap();
    }
    let mut out = Vec::new();
    index.write_chunks(&mut out).unwrap();
    out
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

fn bench_parse_text_index(c: &mut Criterion) {
    let package = sample_package(32);
    c.bench_function("parse_text_index_32_variants", |b| {
        b.iter(|| {
            let container = ChunkContainer::parse(black_box(&package)).unwrap();
            TextShaderIndex::parse(
                &container,
                ChunkTag::DICTIONARY_TEXT,
                ChunkTag::MATERIAL_GLSL,
            )
            .unwrap()
        });
    });
}

// ---------------------------------------------------------------------------
// Rewrite
// ---------------------------------------------------------------------------

fn bench_rewrite_text(c: &mut Criterion) {
    let package = sample_package(32);
    let codec = ZstdCodec::new();
    let rewriter = PackageRewriter::new(&codec, &StubCompiler);
    c.bench_function("rewrite_text_32_variants", |b| {
        b.iter(|| {
            rewriter
                .rewrite(
                    black_box(&package),
                    ShaderKey::new(1, 7, 0),
                    b"void main() {}",
                )
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_parse_text_index, bench_rewrite_text);
criterion_main!(benches);
