//! Serialize → decompress → relocate round trips.

use super::build_archive;
use crate::{ArchiveFeature, BlendingMode, Shading};

#[test]
fn two_material_roundtrip() {
    let archive = build_archive(&[
        (
            "pbr_base",
            b"package-a",
            &[
                "ShadingModel = lit",
                "BlendingMode = opaque",
                "hasBaseColorMap = required",
            ],
        ),
        ("fallback", b"package-b", &[]),
    ]);

    assert_eq!(archive.spec_count(), 2);

    let first = archive.spec(0);
    assert_eq!(first.shading_model(), Some(Shading::Lit));
    assert_eq!(first.blending_mode(), Some(BlendingMode::Opaque));
    let flags: Vec<_> = first.flags().collect();
    assert_eq!(flags, vec![("hasBaseColorMap", ArchiveFeature::Required)]);
    assert_eq!(first.package(), b"package-a");

    let second = archive.spec(1);
    assert_eq!(second.shading_model(), None);
    assert_eq!(second.blending_mode(), None);
    assert_eq!(second.flag_count(), 0);
    assert_eq!(second.package(), b"package-b");
}

#[test]
fn many_flags_across_many_specs() {
    let archive = build_archive(&[
        (
            "a",
            b"A",
            &[
                "fog = optional",
                "normalMap = optional",
                "shadows = required",
            ],
        ),
        ("b", b"B", &["fog = unsupported"]),
        ("c", b"C", &[]),
        ("d", b"D", &["aoMap = required", "fog = optional"]),
    ]);

    assert_eq!(archive.spec_count(), 4);
    assert_eq!(archive.spec(0).flag_count(), 3);
    assert_eq!(archive.spec(0).flag("shadows"), Some(ArchiveFeature::Required));
    assert_eq!(archive.spec(1).flag("fog"), Some(ArchiveFeature::Unsupported));
    assert_eq!(archive.spec(2).flag("fog"), None);
    assert_eq!(archive.spec(3).flag("aoMap"), Some(ArchiveFeature::Required));
    assert_eq!(archive.spec(3).package(), b"D");
}

#[test]
fn specs_iterate_in_file_order() {
    let archive = build_archive(&[
        ("first", b"1", &["ShadingModel = unlit"]),
        ("second", b"2", &["ShadingModel = lit"]),
        ("third", b"3", &["ShadingModel = cloth"]),
    ]);

    let shadings: Vec<_> = archive.specs().map(|s| s.shading_model()).collect();
    assert_eq!(
        shadings,
        vec![
            Some(Shading::Unlit),
            Some(Shading::Lit),
            Some(Shading::Cloth)
        ]
    );
}

#[test]
fn large_packages_roundtrip() {
    let big: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 251) as u8).collect();
    let archive = build_archive(&[("big", &big, &[]), ("tiny", b"t", &[])]);
    assert_eq!(archive.spec(0).package(), big.as_slice());
    assert_eq!(archive.spec(1).package(), b"t");
}

#[test]
fn archived_material_packages_decode_end_to_end() {
    use petal_package::{ChunkContainer, ChunkTag, ShaderKey, TextShaderIndex};

    // Archive real material packages, select one, and decode its shaders
    // from the bytes the spec hands back.
    let key = ShaderKey::new(1, 0, 0);
    let mut index = TextShaderIndex::new(ChunkTag::DICTIONARY_TEXT, ChunkTag::MATERIAL_GLSL);
    index
        .add_record(key, "#version 310 es\nvoid main(){}\n")
        .unwrap();
    let mut package = Vec::new();
    index.write_chunks(&mut package).unwrap();

    let archive = build_archive(&[
        ("lit", &package, &["ShadingModel = lit"]),
        ("unlit", b"other", &["ShadingModel = unlit"]),
    ]);

    let selected = archive
        .select(&super::reqs(Shading::Lit, BlendingMode::Opaque, &[]))
        .unwrap();
    let bytes = archive.spec(selected).package();

    let container = ChunkContainer::parse(bytes).unwrap();
    let decoded =
        TextShaderIndex::parse(&container, ChunkTag::DICTIONARY_TEXT, ChunkTag::MATERIAL_GLSL)
            .unwrap();
    assert_eq!(
        decoded.record(key).unwrap().text(),
        "#version 310 es\nvoid main(){}\n"
    );
}
