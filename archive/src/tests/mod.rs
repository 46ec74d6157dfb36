//! Cross-module archive tests: write → load round trips and spec matching.

mod archive_test;

use std::collections::HashMap;

use crate::{ArchiveRequirements, ArchiveWriter, BlendingMode, ReadableArchive, Shading};

/// Build and reload an archive from `(name, package, spec lines)` triples.
pub(crate) fn build_archive(materials: &[(&str, &[u8], &[&str])]) -> ReadableArchive {
    let mut writer = ArchiveWriter::new();
    for (name, package, lines) in materials {
        writer.add_material(name, package);
        for line in *lines {
            writer.add_spec_line(line).unwrap();
        }
    }
    ReadableArchive::load(&writer.serialize().unwrap()).unwrap()
}

pub(crate) fn reqs(
    shading: Shading,
    blending: BlendingMode,
    features: &[(&str, bool)],
) -> ArchiveRequirements {
    ArchiveRequirements {
        shading_model: shading,
        blending_mode: blending,
        features: features
            .iter()
            .map(|(name, used)| (name.to_string(), *used))
            .collect::<HashMap<_, _>>(),
    }
}
