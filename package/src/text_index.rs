//! Text shader chunk codec (GLSL / Metal).
//!
//! A `MAT_GLSL` or `MAT_METL` chunk stores one record per shader: a fixed
//! entry `(model, variant, stage, offset)` pointing at a variable-size tail
//! `(string_length, line_count, line_indices[])`. The indices reference the
//! shared [`StringDictionary`], and the reconstructed text is the
//! concatenation of each referenced line followed by `'\n'`.
//!
//! [`TextShaderIndex`] decodes both chunks into an editable in-memory form
//! and re-encodes them after a replacement. Re-encoding rebuilds the
//! dictionary from the records in order, so lines no longer referenced by
//! any record drop out.

use std::collections::HashSet;

use crate::ShaderKey;
use crate::chunk::{ChunkContainer, ChunkTag, write_chunk_header};
use crate::dictionary::StringDictionary;
use crate::error::PackageError;

/// Fixed entry: `model: u8, variant: u8, stage: u8, offset: u32`.
const ENTRY_SIZE: usize = 7;

/// One decoded text shader record.
#[derive(Debug)]
pub struct TextShaderRecord {
    pub key: ShaderKey,
    offset: u32,
    string_length: u32,
    line_indices: Vec<u16>,
    text: String,
}

impl TextShaderRecord {
    /// The reconstructed shader text. Always ends with `'\n'` unless empty.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Line indices as stored in the chunk.
    pub fn line_indices(&self) -> &[u16] {
        &self.line_indices
    }

    /// The descriptive `string_length` field as stored in the chunk.
    pub fn string_length(&self) -> u32 {
        self.string_length
    }
}

/// Editable database of text shader records and their line dictionary.
#[derive(Debug)]
pub struct TextShaderIndex {
    dict_tag: ChunkTag,
    mat_tag: ChunkTag,
    records: Vec<TextShaderRecord>,
    lines: StringDictionary,
}

impl TextShaderIndex {
    /// Create an empty index that will serialize under the given tags.
    pub fn new(dict_tag: ChunkTag, mat_tag: ChunkTag) -> Self {
        Self {
            dict_tag,
            mat_tag,
            records: Vec::new(),
            lines: StringDictionary::new(),
        }
    }

    /// Decode the dictionary and material chunks of `container`.
    pub fn parse(
        container: &ChunkContainer<'_>,
        dict_tag: ChunkTag,
        mat_tag: ChunkTag,
    ) -> Result<Self, PackageError> {
        let dict_payload = container.payload(dict_tag).ok_or_else(|| {
            PackageError::MalformedPackage(format!("missing dictionary chunk {dict_tag:?}"))
        })?;
        let lines = StringDictionary::decode(dict_payload)?;

        let payload = container.payload(mat_tag).ok_or_else(|| {
            PackageError::MalformedPackage(format!("missing material chunk {mat_tag:?}"))
        })?;
        if payload.len() < 8 {
            return Err(PackageError::MalformedPackage(
                "text material chunk is shorter than its header".to_owned(),
            ));
        }
        let record_count = u64::from_le_bytes(payload[0..8].try_into().unwrap());
        let truncated = (record_count as usize)
            .checked_mul(ENTRY_SIZE)
            .and_then(|n| n.checked_add(8))
            .is_none_or(|end| end > payload.len());
        if truncated {
            return Err(PackageError::MalformedPackage(format!(
                "text material chunk declares {record_count} records but is truncated"
            )));
        }

        let mut records = Vec::with_capacity(record_count as usize);
        let mut seen = HashSet::new();
        for i in 0..record_count as usize {
            let entry = &payload[8 + i * ENTRY_SIZE..8 + (i + 1) * ENTRY_SIZE];
            let key = ShaderKey::new(entry[0], entry[1], entry[2]);
            let offset = u32::from_le_bytes(entry[3..7].try_into().unwrap());
            if !seen.insert(key) {
                return Err(PackageError::MalformedPackage(format!(
                    "duplicate shader key {key}"
                )));
            }

            let tail = offset as usize;
            if tail + 8 > payload.len() {
                return Err(PackageError::MalformedPackage(format!(
                    "record {key} tail offset {offset} runs past the chunk"
                )));
            }
            let string_length = u32::from_le_bytes(payload[tail..tail + 4].try_into().unwrap());
            let line_count =
                u32::from_le_bytes(payload[tail + 4..tail + 8].try_into().unwrap()) as usize;
            if tail + 8 + line_count * 2 > payload.len() {
                return Err(PackageError::MalformedPackage(format!(
                    "record {key} declares {line_count} lines but the tail is truncated"
                )));
            }

            let mut line_indices = Vec::with_capacity(line_count);
            let mut text = String::new();
            for j in 0..line_count {
                let at = tail + 8 + j * 2;
                let index = u16::from_le_bytes(payload[at..at + 2].try_into().unwrap());
                let Some(line) = lines.line(index) else {
                    return Err(PackageError::MalformedPackage(format!(
                        "record {key} references line {index} outside the dictionary"
                    )));
                };
                text.push_str(line);
                text.push('\n');
                line_indices.push(index);
            }

            records.push(TextShaderRecord {
                key,
                offset,
                string_length,
                line_indices,
                text,
            });
        }

        Ok(Self {
            dict_tag,
            mat_tag,
            records,
            lines,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.lines.is_empty()
    }

    /// Decoded records in chunk order.
    pub fn records(&self) -> &[TextShaderRecord] {
        &self.records
    }

    pub fn record(&self, key: ShaderKey) -> Option<&TextShaderRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    /// The line dictionary backing the records.
    pub fn lines(&self) -> &StringDictionary {
        &self.lines
    }

    /// Append a new record. Intended for package authoring and tests.
    pub fn add_record(&mut self, key: ShaderKey, text: &str) -> Result<(), PackageError> {
        if self.records.iter().any(|r| r.key == key) {
            return Err(PackageError::MalformedPackage(format!(
                "duplicate shader key {key}"
            )));
        }
        self.records.push(TextShaderRecord {
            key,
            offset: 0,
            string_length: 0,
            line_indices: Vec::new(),
            text: text.to_owned(),
        });
        Ok(())
    }

    /// Replace the text of the record matching `key`.
    pub fn replace(&mut self, key: ShaderKey, text: &str) -> Result<(), PackageError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.key == key)
            .ok_or(PackageError::NoSuchShader(key))?;
        record.text = text.to_owned();
        Ok(())
    }

    /// Serialize the dictionary chunk followed by the material chunk.
    ///
    /// Every record is re-indexed against a dictionary rebuilt from scratch
    /// in record order; `string_length` is recomputed as the reconstructed
    /// text length (each line plus its inserted `'\n'`).
    pub fn write_chunks(&mut self, out: &mut Vec<u8>) -> Result<(), PackageError> {
        let mut lines = StringDictionary::new();
        for record in &mut self.records {
            record.line_indices.clear();
            let mut string_length = 0usize;
            if !record.text.is_empty() {
                let body = record.text.strip_suffix('\n').unwrap_or(&record.text);
                for line in body.split('\n') {
                    record.line_indices.push(lines.intern(line)?);
                    string_length += line.len() + 1;
                }
            }
            record.string_length = u32::try_from(string_length).map_err(|_| {
                PackageError::InternalEncoding("shader text exceeds 32-bit length".to_owned())
            })?;
        }

        // Offset prepass: the fixed-entry region first, then all tails in
        // record order.
        let mut offset = 8 + self.records.len() * ENTRY_SIZE;
        for record in &mut self.records {
            record.offset = u32::try_from(offset).map_err(|_| {
                PackageError::InternalEncoding("chunk offsets exceed 32 bits".to_owned())
            })?;
            offset += 8 + record.line_indices.len() * 2;
        }
        let mat_size = u32::try_from(offset).map_err(|_| {
            PackageError::InternalEncoding("material chunk exceeds 32-bit size".to_owned())
        })?;
        let dict_size = u32::try_from(lines.encoded_len()).map_err(|_| {
            PackageError::InternalEncoding("dictionary chunk exceeds 32-bit size".to_owned())
        })?;

        write_chunk_header(out, self.dict_tag, dict_size);
        lines.encode_into(out);

        write_chunk_header(out, self.mat_tag, mat_size);
        let start = out.len();
        out.extend_from_slice(&(self.records.len() as u64).to_le_bytes());
        for record in &self.records {
            out.push(record.key.model);
            out.push(record.key.variant);
            out.push(record.key.stage);
            out.extend_from_slice(&record.offset.to_le_bytes());
        }
        for record in &self.records {
            out.extend_from_slice(&record.string_length.to_le_bytes());
            out.extend_from_slice(&(record.line_indices.len() as u32).to_le_bytes());
            for index in &record.line_indices {
                out.extend_from_slice(&index.to_le_bytes());
            }
        }
        if out.len() - start != mat_size as usize {
            return Err(PackageError::InternalEncoding(format!(
                "material chunk prepass computed {mat_size} bytes, wrote {}",
                out.len() - start
            )));
        }

        self.lines = lines;
        Ok(())
    }
}
