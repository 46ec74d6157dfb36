//! Chunked container parsing.
//!
//! A material package is a flat sequence of `(tag: u64, size: u32, payload)`
//! chunks with no padding between them. [`ChunkContainer`] parses the stream
//! in place — no payload is copied — and offers random access by tag plus
//! ordered iteration for copy-through rewriting.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use crate::error::PackageError;

/// Size of a chunk header on disk: `tag: u64` + `size: u32`.
pub const CHUNK_HEADER_SIZE: usize = 12;

/// A 64-bit chunk kind identifier, spelled as eight ASCII bytes.
///
/// Tags outside the known set are legal; the rewriter copies them through
/// unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTag(pub u64);

impl ChunkTag {
    /// Shared line dictionary for text shaders.
    pub const DICTIONARY_TEXT: ChunkTag = ChunkTag::from_bytes(*b"DICTTEXT");
    /// Compressed blob dictionary for SPIR-V shaders.
    pub const DICTIONARY_SPIRV: ChunkTag = ChunkTag::from_bytes(*b"DICTSPRV");
    /// GLSL shader records.
    pub const MATERIAL_GLSL: ChunkTag = ChunkTag::from_bytes(*b"MAT_GLSL");
    /// MSL shader records.
    pub const MATERIAL_METAL: ChunkTag = ChunkTag::from_bytes(*b"MAT_METL");
    /// SPIR-V shader records.
    pub const MATERIAL_SPIRV: ChunkTag = ChunkTag::from_bytes(*b"MAT_SPRV");

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        ChunkTag(u64::from_le_bytes(bytes))
    }

    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            let mut buf = String::with_capacity(8);
            buf.extend(bytes.iter().map(|&b| b as char));
            write!(f, "ChunkTag({buf:?})")
        } else {
            write!(f, "ChunkTag({:#018x})", self.0)
        }
    }
}

/// Parsed view over a chunk stream.
///
/// Borrows the underlying buffer for its whole lifetime; lookups return
/// slices into it. If the same tag occurs more than once, lookup resolves to
/// the first occurrence while [`chunks`](Self::chunks) still yields every
/// occurrence in stream order.
#[derive(Debug)]
pub struct ChunkContainer<'a> {
    data: &'a [u8],
    index: HashMap<ChunkTag, Range<usize>>,
    order: Vec<(ChunkTag, Range<usize>)>,
}

impl<'a> ChunkContainer<'a> {
    /// Parse a byte buffer as a chunk stream.
    ///
    /// Fails with [`PackageError::MalformedContainer`] if a chunk header is
    /// truncated or a declared size runs past the end of the buffer.
    pub fn parse(data: &'a [u8]) -> Result<Self, PackageError> {
        let mut index = HashMap::new();
        let mut order = Vec::new();
        let mut cursor = 0usize;
        while cursor < data.len() {
            if data.len() - cursor < CHUNK_HEADER_SIZE {
                return Err(PackageError::MalformedContainer(format!(
                    "truncated chunk header at byte {cursor}"
                )));
            }
            let tag = ChunkTag(u64::from_le_bytes(
                data[cursor..cursor + 8].try_into().unwrap(),
            ));
            let size = u32::from_le_bytes(data[cursor + 8..cursor + 12].try_into().unwrap());
            let payload_start = cursor + CHUNK_HEADER_SIZE;
            let payload_end = payload_start + size as usize;
            if payload_end > data.len() {
                return Err(PackageError::MalformedContainer(format!(
                    "chunk {tag:?} declares {size} payload bytes but only {} remain",
                    data.len() - payload_start
                )));
            }
            index.entry(tag).or_insert(payload_start..payload_end);
            order.push((tag, cursor..payload_end));
            cursor = payload_end;
        }
        Ok(Self { data, index, order })
    }

    /// The whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn has(&self, tag: ChunkTag) -> bool {
        self.index.contains_key(&tag)
    }

    /// Payload of the first chunk with the given tag.
    pub fn payload(&self, tag: ChunkTag) -> Option<&'a [u8]> {
        self.index.get(&tag).map(|range| &self.data[range.clone()])
    }

    /// Byte range of the payload within the underlying buffer.
    ///
    /// Chunk codecs that align data relative to the buffer base (the SPIR-V
    /// blob dictionary) need the absolute payload position, not just its
    /// contents.
    pub fn payload_range(&self, tag: ChunkTag) -> Option<Range<usize>> {
        self.index.get(&tag).cloned()
    }

    /// All chunks in stream order, as `(tag, raw bytes)` where the raw bytes
    /// include the 12-byte header. Suitable for bit-exact copy-through.
    pub fn chunks(&self) -> impl Iterator<Item = (ChunkTag, &'a [u8])> + '_ {
        self.order
            .iter()
            .map(|(tag, range)| (*tag, &self.data[range.clone()]))
    }
}

/// Append a chunk header to an output stream.
pub(crate) fn write_chunk_header(out: &mut Vec<u8>, tag: ChunkTag, size: u32) {
    out.extend_from_slice(&tag.to_bytes());
    out.extend_from_slice(&size.to_le_bytes());
}
