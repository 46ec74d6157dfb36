//! Archive serialization and the spec-file grammar.
//!
//! [`ArchiveWriter`] accumulates materials — name, package bytes, and the
//! metadata parsed from their spec files — and serializes the whole set into
//! one zstd-compressed buffer laid out for [`ReadableArchive`] consumption.
//!
//! # Spec-file grammar
//!
//! ```text
//! line        := comment | blank | assignment
//! comment     := '#' ...
//! assignment  := ident '=' value
//! ident       := [A-Za-z_][A-Za-z0-9_]*
//! value       := blending | shading | feature
//! ```
//!
//! `BlendingMode` and `ShadingModel` assignments constrain the material;
//! any other identifier declares a feature flag whose value is
//! `unsupported`, `optional`, or `required`.

use std::collections::BTreeMap;

use crate::error::ArchiveError;
use crate::types::{
    ARCHIVE_MAGIC, ARCHIVE_VERSION, ArchiveFeature, BlendingMode, FLAG_SIZE, HEADER_SIZE,
    SPEC_SIZE, Shading,
};

struct PendingMaterial {
    name: String,
    package: Vec<u8>,
    shading: Option<Shading>,
    blending: Option<BlendingMode>,
    // Sorted map: flags serialize in a deterministic order.
    flags: BTreeMap<String, ArchiveFeature>,
}

/// Accumulates materials and their parsed specs, then serializes the
/// compressed archive.
#[derive(Default)]
pub struct ArchiveWriter {
    materials: Vec<PendingMaterial>,
    line_number: u32,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Begin a new material. Spec lines submitted afterwards apply to it;
    /// an absent `ShadingModel`/`BlendingMode` line leaves the material
    /// unconstrained.
    pub fn add_material(&mut self, name: &str, package: &[u8]) {
        self.materials.push(PendingMaterial {
            name: name.to_owned(),
            package: package.to_vec(),
            shading: None,
            blending: None,
            flags: BTreeMap::new(),
        });
        self.line_number = 1;
    }

    /// Feed one line of the current material's spec file.
    ///
    /// Comments and blank lines are counted but otherwise ignored. Must not
    /// be called before the first [`add_material`](Self::add_material).
    pub fn add_spec_line(&mut self, line: &str) -> Result<(), ArchiveError> {
        let material = self
            .materials
            .last_mut()
            .expect("add_spec_line called before add_material");
        let line_number = self.line_number;
        self.line_number += 1;

        match parse_spec_line(line) {
            Ok(SpecLine::Empty) => Ok(()),
            Ok(SpecLine::Shading(shading)) => {
                material.shading = Some(shading);
                Ok(())
            }
            Ok(SpecLine::Blending(blending)) => {
                material.blending = Some(blending);
                Ok(())
            }
            Ok(SpecLine::Feature(name, value)) => {
                material.flags.insert(name.to_owned(), value);
                Ok(())
            }
            Err((pos, message)) => Err(ArchiveError::SpecSyntax {
                file: material.name.clone(),
                line: line_number,
                column: pos as u32 + 1,
                message,
            }),
        }
    }

    /// Serialize every accumulated material into a compressed archive.
    ///
    /// Sections follow each other with no gaps; the header and per-spec
    /// records are sized so each section starts 8-byte aligned. The whole
    /// buffer is compressed at zstd's maximum level.
    pub fn serialize(&self) -> Result<Vec<u8>, ArchiveError> {
        let specs_offset = HEADER_SIZE;
        let flags_base = specs_offset + self.materials.len() * SPEC_SIZE;
        let total_flags: usize = self.materials.iter().map(|m| m.flags.len()).sum();
        let names_base = flags_base + total_flags * FLAG_SIZE;
        let name_bytes: usize = self
            .materials
            .iter()
            .flat_map(|m| m.flags.keys())
            .map(|name| name.len() + 1)
            .sum();
        let packages_base = names_base + name_bytes;
        let total: usize =
            packages_base + self.materials.iter().map(|m| m.package.len()).sum::<usize>();

        let mut buf = Vec::with_capacity(total);

        // Header.
        buf.extend_from_slice(&ARCHIVE_MAGIC);
        buf.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.materials.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&(specs_offset as u64).to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());

        // Spec records, with absolute offsets into the later sections.
        let mut flag_cursor = flags_base;
        let mut package_cursor = packages_base;
        for material in &self.materials {
            buf.extend_from_slice(&Shading::to_wire(material.shading).to_le_bytes());
            buf.extend_from_slice(&BlendingMode::to_wire(material.blending).to_le_bytes());
            buf.extend_from_slice(&(material.flags.len() as u32).to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&(flag_cursor as u64).to_le_bytes());
            buf.extend_from_slice(&(material.package.len() as u64).to_le_bytes());
            buf.extend_from_slice(&(package_cursor as u64).to_le_bytes());
            flag_cursor += material.flags.len() * FLAG_SIZE;
            package_cursor += material.package.len();
        }

        // Flag records; names are concatenated in the same order.
        let mut name_cursor = names_base;
        for material in &self.materials {
            for (name, value) in &material.flags {
                buf.extend_from_slice(&(name_cursor as u64).to_le_bytes());
                buf.extend_from_slice(&value.to_wire().to_le_bytes());
                name_cursor += name.len() + 1;
            }
        }
        for material in &self.materials {
            for name in material.flags.keys() {
                buf.extend_from_slice(name.as_bytes());
                buf.push(0);
            }
        }

        // Package payloads.
        for material in &self.materials {
            buf.extend_from_slice(&material.package);
        }
        debug_assert_eq!(buf.len(), total);

        let level = *zstd::compression_level_range().end();
        zstd::bulk::compress(&buf, level).map_err(ArchiveError::Codec)
    }
}

enum SpecLine<'a> {
    Empty,
    Shading(Shading),
    Blending(BlendingMode),
    Feature(&'a str, ArchiveFeature),
}

fn is_ident_start(byte: u8) -> bool {
    byte == b'_' || byte.is_ascii_alphabetic()
}

fn is_ident_char(byte: u8) -> bool {
    byte == b'_' || byte.is_ascii_alphanumeric()
}

fn is_spec_whitespace(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// Parse one spec line. Errors carry the 0-based byte position.
fn parse_spec_line(line: &str) -> Result<SpecLine<'_>, (usize, String)> {
    if line.starts_with('#') || line.trim().is_empty() {
        return Ok(SpecLine::Empty);
    }
    let bytes = line.as_bytes();
    let mut pos = 0usize;

    if !is_ident_start(bytes[0]) {
        return Err((0, "expected identifier".to_owned()));
    }
    while pos < bytes.len() && is_ident_char(bytes[pos]) {
        pos += 1;
    }
    let ident = &line[..pos];

    while pos < bytes.len() && is_spec_whitespace(bytes[pos]) {
        pos += 1;
    }
    if pos >= bytes.len() || bytes[pos] != b'=' {
        return Err((pos, "expected equal sign".to_owned()));
    }
    pos += 1;
    while pos < bytes.len() && is_spec_whitespace(bytes[pos]) {
        pos += 1;
    }

    let value_start = pos;
    while pos < bytes.len() && is_ident_char(bytes[pos]) {
        pos += 1;
    }
    let value = &line[value_start..pos];

    let parsed = match ident {
        "BlendingMode" => SpecLine::Blending(BlendingMode::parse(value).ok_or((
            value_start,
            "expected lowercase blending mode enum".to_owned(),
        ))?),
        "ShadingModel" => SpecLine::Shading(
            Shading::parse(value)
                .ok_or((value_start, "expected lowercase shading enum".to_owned()))?,
        ),
        _ => SpecLine::Feature(
            ident,
            ArchiveFeature::parse(value).ok_or((
                value_start,
                "expected unsupported / optional / required".to_owned(),
            ))?,
        ),
    };

    while pos < bytes.len() && is_spec_whitespace(bytes[pos]) {
        pos += 1;
    }
    if pos != bytes.len() {
        return Err((pos, "unexpected trailing character".to_owned()));
    }
    Ok(parsed)
}

// Each section record size must keep the following section 8-byte aligned.
const _: () = assert!(HEADER_SIZE % 8 == 0 && SPEC_SIZE % 8 == 0 && FLAG_SIZE % 8 == 0);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReadableArchive;

    fn reload(writer: &ArchiveWriter) -> ReadableArchive {
        ReadableArchive::load(&writer.serialize().unwrap()).unwrap()
    }

    fn feed(writer: &mut ArchiveWriter, lines: &[&str]) {
        for line in lines {
            writer.add_spec_line(line).unwrap();
        }
    }

    #[test]
    fn spec_lines_update_the_latest_material() {
        let mut writer = ArchiveWriter::new();
        writer.add_material("lit_opaque", b"pkg0");
        feed(
            &mut writer,
            &[
                "# auto-generated",
                "",
                "ShadingModel = lit",
                "BlendingMode = opaque",
                "hasBaseColorMap = required",
                "normalMap = optional",
            ],
        );
        writer.add_material("fallback", b"pkg1");

        let archive = reload(&writer);
        assert_eq!(archive.spec_count(), 2);
        let spec = archive.spec(0);
        assert_eq!(spec.shading_model(), Some(Shading::Lit));
        assert_eq!(spec.blending_mode(), Some(BlendingMode::Opaque));
        assert_eq!(spec.flag("hasBaseColorMap"), Some(ArchiveFeature::Required));
        assert_eq!(spec.flag("normalMap"), Some(ArchiveFeature::Optional));
        assert_eq!(archive.spec(1).shading_model(), None);
        assert_eq!(archive.spec(1).flag_count(), 0);
    }

    #[test]
    fn whitespace_around_equals_is_accepted() {
        let mut writer = ArchiveWriter::new();
        writer.add_material("m", b"");
        feed(
            &mut writer,
            &["fog=optional", "shadows\t=\trequired", "decals = unsupported  "],
        );
        let archive = reload(&writer);
        let spec = archive.spec(0);
        assert_eq!(spec.flag("fog"), Some(ArchiveFeature::Optional));
        assert_eq!(spec.flag("shadows"), Some(ArchiveFeature::Required));
        assert_eq!(spec.flag("decals"), Some(ArchiveFeature::Unsupported));
    }

    #[test]
    fn syntax_errors_carry_position() {
        let mut writer = ArchiveWriter::new();
        writer.add_material("broken", b"");
        writer.add_spec_line("# comment").unwrap();
        writer.add_spec_line("fog = optional").unwrap();

        let err = writer.add_spec_line("fog optional").unwrap_err();
        match err {
            ArchiveError::SpecSyntax {
                file,
                line,
                column,
                message,
            } => {
                assert_eq!(file, "broken");
                assert_eq!(line, 3);
                assert_eq!(column, 5);
                assert_eq!(message, "expected equal sign");
            }
            other => panic!("expected SpecSyntax, got {other:?}"),
        }
    }

    #[test]
    fn bad_value_reports_value_column() {
        let mut writer = ArchiveWriter::new();
        writer.add_material("m", b"");
        let err = writer.add_spec_line("BlendingMode = shiny").unwrap_err();
        match err {
            ArchiveError::SpecSyntax { column, message, .. } => {
                assert_eq!(column, 16);
                assert_eq!(message, "expected lowercase blending mode enum");
            }
            other => panic!("expected SpecSyntax, got {other:?}"),
        }
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let mut writer = ArchiveWriter::new();
        writer.add_material("m", b"");
        let err = writer.add_spec_line("fog = optional; see docs").unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::SpecSyntax { message, .. } if message == "unexpected trailing character"
        ));
    }

    #[test]
    fn digit_leading_identifier_is_rejected() {
        let mut writer = ArchiveWriter::new();
        writer.add_material("m", b"");
        let err = writer.add_spec_line("2sided = optional").unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::SpecSyntax { column: 1, message, .. } if message == "expected identifier"
        ));
    }

    #[test]
    fn repeated_flag_keeps_last_value() {
        let mut writer = ArchiveWriter::new();
        writer.add_material("m", b"");
        feed(&mut writer, &["fog = optional", "fog = required"]);
        let archive = reload(&writer);
        assert_eq!(archive.spec(0).flag("fog"), Some(ArchiveFeature::Required));
    }

    #[test]
    fn empty_archive_serializes() {
        let writer = ArchiveWriter::new();
        let archive = reload(&writer);
        assert_eq!(archive.spec_count(), 0);
    }
}
