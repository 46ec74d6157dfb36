//! SPIR-V shader chunk codec.
//!
//! A `MAT_SPRV` chunk is a flat table of `(model, variant, stage,
//! blob_index)` records; the blobs themselves live in the `DICTSPRV`
//! dictionary, stored through the external compression codec and
//! deduplicated by content.
//!
//! [`SpirvShaderIndex`] decodes both chunks (decompressing every blob up
//! front) and re-encodes them after a replacement. A replacement never
//! mutates an existing blob — other records may share it — it inserts a
//! fresh blob and retargets only the matching record. Re-encoding
//! consolidates the dictionary so unreferenced blobs drop out.

use std::collections::HashSet;

use crate::ShaderKey;
use crate::chunk::{CHUNK_HEADER_SIZE, ChunkContainer, ChunkTag, write_chunk_header};
use crate::codec::BlobCodec;
use crate::dictionary::BlobDictionary;
use crate::error::PackageError;

/// Fixed entry: `model: u8, variant: u8, stage: u8, blob_index: u32`.
const ENTRY_SIZE: usize = 7;

/// One decoded SPIR-V shader record.
#[derive(Debug, Clone, Copy)]
pub struct SpirvShaderRecord {
    pub key: ShaderKey,
    pub blob_index: u32,
}

/// Editable database of SPIR-V shader records and their blob dictionary.
pub struct SpirvShaderIndex {
    records: Vec<SpirvShaderRecord>,
    blobs: BlobDictionary,
}

impl SpirvShaderIndex {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            blobs: BlobDictionary::new(),
        }
    }

    /// Decode the `DICTSPRV` and `MAT_SPRV` chunks of `container`.
    pub fn parse(
        container: &ChunkContainer<'_>,
        codec: &dyn BlobCodec,
    ) -> Result<Self, PackageError> {
        let dict_range = container
            .payload_range(ChunkTag::DICTIONARY_SPIRV)
            .ok_or_else(|| {
                PackageError::MalformedPackage("missing SPIR-V dictionary chunk".to_owned())
            })?;
        let dict_payload = &container.data()[dict_range.clone()];
        let blobs = BlobDictionary::decode(dict_payload, dict_range.start, codec)?;

        let payload = container.payload(ChunkTag::MATERIAL_SPIRV).ok_or_else(|| {
            PackageError::MalformedPackage("missing SPIR-V material chunk".to_owned())
        })?;
        if payload.len() < 8 {
            return Err(PackageError::MalformedPackage(
                "SPIR-V material chunk is shorter than its header".to_owned(),
            ));
        }
        let record_count = u64::from_le_bytes(payload[0..8].try_into().unwrap());
        let truncated = (record_count as usize)
            .checked_mul(ENTRY_SIZE)
            .and_then(|n| n.checked_add(8))
            .is_none_or(|end| end > payload.len());
        if truncated {
            return Err(PackageError::MalformedPackage(format!(
                "SPIR-V material chunk declares {record_count} records but is truncated"
            )));
        }

        let mut records = Vec::with_capacity(record_count as usize);
        let mut seen = HashSet::new();
        for i in 0..record_count as usize {
            let entry = &payload[8 + i * ENTRY_SIZE..8 + (i + 1) * ENTRY_SIZE];
            let key = ShaderKey::new(entry[0], entry[1], entry[2]);
            let blob_index = u32::from_le_bytes(entry[3..7].try_into().unwrap());
            if !seen.insert(key) {
                return Err(PackageError::MalformedPackage(format!(
                    "duplicate shader key {key}"
                )));
            }
            if blob_index as usize >= blobs.len() {
                return Err(PackageError::MalformedPackage(format!(
                    "record {key} references blob {blob_index} outside the dictionary"
                )));
            }
            records.push(SpirvShaderRecord { key, blob_index });
        }

        Ok(Self { records, blobs })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.blobs.is_empty()
    }

    /// Decoded records in chunk order.
    pub fn records(&self) -> &[SpirvShaderRecord] {
        &self.records
    }

    pub fn record(&self, key: ShaderKey) -> Option<&SpirvShaderRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    /// The blob dictionary backing the records.
    pub fn blobs(&self) -> &BlobDictionary {
        &self.blobs
    }

    /// Append a new record whose blob is inserted with content-dedup.
    /// Intended for package authoring and tests.
    pub fn add_record(&mut self, key: ShaderKey, blob: Vec<u8>) -> Result<(), PackageError> {
        if self.records.iter().any(|r| r.key == key) {
            return Err(PackageError::MalformedPackage(format!(
                "duplicate shader key {key}"
            )));
        }
        let blob_index = self.blobs.add(blob);
        self.records.push(SpirvShaderRecord { key, blob_index });
        Ok(())
    }

    /// Replace the blob of the record matching `key`.
    ///
    /// The replacement is inserted as a fresh (deduplicated) dictionary
    /// entry and only the matching record is retargeted; records sharing
    /// the previous blob keep it.
    pub fn replace(&mut self, key: ShaderKey, blob: Vec<u8>) -> Result<(), PackageError> {
        let position = self
            .records
            .iter()
            .position(|r| r.key == key)
            .ok_or(PackageError::NoSuchShader(key))?;
        let blob_index = self.blobs.add(blob);
        self.records[position].blob_index = blob_index;
        Ok(())
    }

    /// Serialize the dictionary chunk followed by the material chunk.
    ///
    /// The dictionary is consolidated from the records in order, deduplicated
    /// by content; indices are rewritten to match. `out` is the package
    /// stream written so far — the dictionary payload aligns its blob table
    /// relative to the current stream position.
    pub fn write_chunks(
        &mut self,
        out: &mut Vec<u8>,
        codec: &dyn BlobCodec,
    ) -> Result<(), PackageError> {
        let mut blobs = BlobDictionary::new();
        for record in &mut self.records {
            let Some(blob) = self.blobs.blob(record.blob_index) else {
                return Err(PackageError::InternalEncoding(format!(
                    "record {} references a dangling blob",
                    record.key
                )));
            };
            record.blob_index = blobs.add(blob.to_vec());
        }

        let payload = blobs.encode(out.len() + CHUNK_HEADER_SIZE, codec)?;
        let dict_size = u32::try_from(payload.len()).map_err(|_| {
            PackageError::InternalEncoding("dictionary chunk exceeds 32-bit size".to_owned())
        })?;
        write_chunk_header(out, ChunkTag::DICTIONARY_SPIRV, dict_size);
        out.extend_from_slice(&payload);

        let mat_size = (8 + self.records.len() * ENTRY_SIZE) as u32;
        write_chunk_header(out, ChunkTag::MATERIAL_SPIRV, mat_size);
        out.extend_from_slice(&(self.records.len() as u64).to_le_bytes());
        for record in &self.records {
            out.push(record.key.model);
            out.push(record.key.variant);
            out.push(record.key.stage);
            out.extend_from_slice(&record.blob_index.to_le_bytes());
        }

        self.blobs = blobs;
        Ok(())
    }
}

impl Default for SpirvShaderIndex {
    fn default() -> Self {
        Self::new()
    }
}
