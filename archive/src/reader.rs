//! Archive loading and relocation.
//!
//! A serialized archive stores every internal reference as a byte offset
//! from the archive base. [`ReadableArchive::load`] decompresses the buffer
//! into 8-byte-aligned storage and performs the relocation walk once,
//! resolving each offset into a checked range (packages) or an owned name
//! (flags). After that the buffer is read-only; [`ArchiveSpec`] views
//! borrow from it for the archive's lifetime.

use std::ops::Range;

use crate::error::ArchiveError;
use crate::types::{
    ARCHIVE_MAGIC, ARCHIVE_VERSION, ArchiveFeature, BlendingMode, FLAG_SIZE, HEADER_SIZE,
    SPEC_SIZE, Shading,
};

/// Owned byte buffer whose storage is 8-byte aligned.
#[derive(Debug)]
struct AlignedBuffer {
    words: Vec<u64>,
    len: usize,
}

impl AlignedBuffer {
    fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(8)],
            len,
        }
    }

    fn as_slice(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut bytemuck::cast_slice_mut(&mut self.words)[..len]
    }
}

/// One relocated spec: constraints, resolved flags, and the package range.
#[derive(Debug)]
struct SpecRecord {
    shading: Option<Shading>,
    blending: Option<BlendingMode>,
    flags: Vec<(String, ArchiveFeature)>,
    package: Range<usize>,
}

/// A loaded, relocated ubershader archive.
#[derive(Debug)]
pub struct ReadableArchive {
    buffer: AlignedBuffer,
    version: u32,
    specs: Vec<SpecRecord>,
}

impl ReadableArchive {
    /// Decompress and relocate a serialized archive.
    ///
    /// Fails with [`ArchiveError::CorruptArchive`] when the buffer is not a
    /// valid zstd frame, the frame size is unknown, or the decoded structure
    /// is inconsistent. Misaligned section offsets abort: the writer
    /// guarantees alignment, so a violation is a codec bug rather than bad
    /// input.
    pub fn load(compressed: &[u8]) -> Result<Self, ArchiveError> {
        let frame_size = match zstd::zstd_safe::get_frame_content_size(compressed) {
            Ok(Some(size)) => size,
            Ok(None) => {
                return Err(ArchiveError::CorruptArchive(
                    "decompressed size is not recorded in the frame".to_owned(),
                ));
            }
            Err(_) => {
                return Err(ArchiveError::CorruptArchive(
                    "buffer is not a zstd frame".to_owned(),
                ));
            }
        };
        let size = usize::try_from(frame_size).map_err(|_| {
            ArchiveError::CorruptArchive(format!("frame size {frame_size} overflows usize"))
        })?;

        let mut buffer = AlignedBuffer::zeroed(size);
        let written = zstd::bulk::Decompressor::new()
            .and_then(|mut decompressor| {
                decompressor.decompress_to_buffer(compressed, buffer.as_mut_slice())
            })
            .map_err(|err| ArchiveError::CorruptArchive(format!("decompression failed: {err}")))?;
        if written != size {
            return Err(ArchiveError::CorruptArchive(format!(
                "frame declared {size} bytes but decompressed to {written}"
            )));
        }

        let (version, specs) = relocate(buffer.as_slice())?;
        Ok(Self {
            buffer,
            version,
            specs,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn spec_count(&self) -> usize {
        self.specs.len()
    }

    /// View of the spec at `index`. Panics if out of range, like slice
    /// indexing.
    pub fn spec(&self, index: usize) -> ArchiveSpec<'_> {
        ArchiveSpec {
            data: self.buffer.as_slice(),
            record: &self.specs[index],
        }
    }

    /// Iterate the specs in stored (file) order.
    pub fn specs(&self) -> impl Iterator<Item = ArchiveSpec<'_>> {
        self.specs.iter().map(|record| ArchiveSpec {
            data: self.buffer.as_slice(),
            record,
        })
    }
}

/// Borrowed view of one archived spec.
#[derive(Clone, Copy)]
pub struct ArchiveSpec<'a> {
    data: &'a [u8],
    record: &'a SpecRecord,
}

impl<'a> ArchiveSpec<'a> {
    /// The shading model constraint, or `None` for "any".
    pub fn shading_model(&self) -> Option<Shading> {
        self.record.shading
    }

    /// The blending mode constraint, or `None` for "any".
    pub fn blending_mode(&self) -> Option<BlendingMode> {
        self.record.blending
    }

    pub fn flag_count(&self) -> usize {
        self.record.flags.len()
    }

    /// Feature flags in stored order.
    pub fn flags(&self) -> impl Iterator<Item = (&'a str, ArchiveFeature)> + '_ {
        self.record
            .flags
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    /// The first flag with the given name.
    pub fn flag(&self, name: &str) -> Option<ArchiveFeature> {
        self.record
            .flags
            .iter()
            .find(|(flag_name, _)| flag_name == name)
            .map(|(_, value)| *value)
    }

    /// The embedded material package.
    pub fn package(&self) -> &'a [u8] {
        &self.data[self.record.package.clone()]
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(data[at..at + 4].try_into().unwrap())
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(data[at..at + 8].try_into().unwrap())
}

/// Walk the decompressed buffer and resolve every stored offset.
fn relocate(data: &[u8]) -> Result<(u32, Vec<SpecRecord>), ArchiveError> {
    if data.len() < HEADER_SIZE {
        return Err(ArchiveError::CorruptArchive(format!(
            "{} bytes is shorter than the archive header",
            data.len()
        )));
    }
    if data[0..4] != ARCHIVE_MAGIC {
        return Err(ArchiveError::CorruptArchive("bad magic".to_owned()));
    }
    let version = read_u32(data, 4);
    if version != ARCHIVE_VERSION {
        return Err(ArchiveError::CorruptArchive(format!(
            "unsupported archive version {version}"
        )));
    }
    let specs_count = read_u32(data, 8) as usize;
    let specs_offset = usize::try_from(read_u64(data, 16)).map_err(|_| {
        ArchiveError::CorruptArchive("spec table offset overflows usize".to_owned())
    })?;
    assert!(specs_offset % 8 == 0, "archive spec table is misaligned");
    let table_ok = specs_count
        .checked_mul(SPEC_SIZE)
        .and_then(|bytes| specs_offset.checked_add(bytes))
        .is_some_and(|end| end <= data.len());
    if !table_ok {
        return Err(ArchiveError::CorruptArchive(format!(
            "spec table ({specs_count} specs at {specs_offset}) runs past the buffer"
        )));
    }

    let mut specs = Vec::with_capacity(specs_count);
    for i in 0..specs_count {
        let at = specs_offset + i * SPEC_SIZE;
        let shading = Shading::from_wire(read_u32(data, at)).map_err(|raw| {
            ArchiveError::CorruptArchive(format!("spec {i}: unknown shading ordinal {raw}"))
        })?;
        let blending = BlendingMode::from_wire(read_u32(data, at + 4)).map_err(|raw| {
            ArchiveError::CorruptArchive(format!("spec {i}: unknown blending ordinal {raw}"))
        })?;
        let flags_count = read_u32(data, at + 8) as usize;
        let flags_offset = usize::try_from(read_u64(data, at + 16)).map_err(|_| {
            ArchiveError::CorruptArchive(format!("spec {i}: flag table offset overflows usize"))
        })?;
        let package_len = read_u64(data, at + 24) as usize;
        let package_offset = read_u64(data, at + 32) as usize;

        assert!(flags_offset % 8 == 0, "archive flag table is misaligned");
        let flags_ok = flags_count
            .checked_mul(FLAG_SIZE)
            .and_then(|bytes| flags_offset.checked_add(bytes))
            .is_some_and(|end| end <= data.len());
        if !flags_ok {
            return Err(ArchiveError::CorruptArchive(format!(
                "spec {i}: flag table runs past the buffer"
            )));
        }

        let mut flags = Vec::with_capacity(flags_count);
        for j in 0..flags_count {
            let flag_at = flags_offset + j * FLAG_SIZE;
            let name_offset = read_u64(data, flag_at) as usize;
            let value_raw = read_u64(data, flag_at + 8);
            if name_offset >= data.len() {
                return Err(ArchiveError::CorruptArchive(format!(
                    "spec {i} flag {j}: name offset runs past the buffer"
                )));
            }
            let Some(nul) = data[name_offset..].iter().position(|&b| b == 0) else {
                return Err(ArchiveError::CorruptArchive(format!(
                    "spec {i} flag {j}: unterminated name"
                )));
            };
            let name = std::str::from_utf8(&data[name_offset..name_offset + nul])
                .map_err(|_| {
                    ArchiveError::CorruptArchive(format!("spec {i} flag {j}: name is not UTF-8"))
                })?
                .to_owned();
            let value = ArchiveFeature::from_wire(value_raw).map_err(|raw| {
                ArchiveError::CorruptArchive(format!(
                    "spec {i} flag {j}: unknown feature ordinal {raw}"
                ))
            })?;
            flags.push((name, value));
        }

        let package_end = package_offset
            .checked_add(package_len)
            .filter(|&end| end <= data.len());
        let Some(package_end) = package_end else {
            return Err(ArchiveError::CorruptArchive(format!(
                "spec {i}: package runs past the buffer"
            )));
        };

        specs.push(SpecRecord {
            shading,
            blending,
            flags,
            package: package_offset..package_end,
        });
    }

    Ok((version, specs))
}
