//! Compressed ubershader archive with runtime material matching.
//!
//! An archive aggregates many material packages, each tagged with a small
//! declarative *spec*: an optional shading model, an optional blending mode,
//! and a set of named feature flags (`unsupported` / `optional` /
//! `required`). At runtime the matcher walks the specs in stored order and
//! selects the first one that satisfies a mesh's requirements.
//!
//! # Binary layout (pre-compression)
//!
//! ```text
//! [header]  magic 'UBER', version, spec count, spec table offset
//! [specs]   shading, blending, flag count/offset, package size/offset
//! [flags]   (name offset, value) pairs
//! [names]   NUL-terminated flag names
//! [packages] raw material-package payloads
//! ```
//!
//! Every internal reference is a byte offset from the archive base, and the
//! header/spec/flag records are sized so each section starts 8-byte aligned.
//! The whole buffer is run through zstd; [`ReadableArchive::load`] queries
//! the frame size, decompresses into an 8-byte-aligned buffer, and resolves
//! every offset once ("relocation") before exposing the specs.
//!
//! # Typical flow
//!
//! ```ignore
//! use petal_archive::{ArchiveCache, ArchiveRequirements, BlendingMode, Shading};
//!
//! let mut cache: ArchiveCache<Engine> = ArchiveCache::load(&bytes)?;
//! let reqs = ArchiveRequirements {
//!     shading_model: Shading::Lit,
//!     blending_mode: BlendingMode::Opaque,
//!     features: [("hasBaseColorMap".to_owned(), true)].into(),
//! };
//! let material = cache
//!     .material(&mut engine, &reqs)
//!     .or_else(|| cache.default_material(&mut engine));
//! // ... render ...
//! cache.destroy_materials(&mut engine);
//! ```
//!
//! Spec metadata is authored in a line-based spec file consumed by
//! [`ArchiveWriter::add_spec_line`]:
//!
//! ```text
//! # one assignment per line
//! ShadingModel = lit
//! BlendingMode = opaque
//! hasBaseColorMap = required
//! normalMap = optional
//! ```

pub mod cache;
pub mod error;
pub mod matcher;
pub mod reader;
pub mod types;
pub mod writer;

#[cfg(test)]
mod tests;

pub use cache::{ArchiveCache, MaterialProvider};
pub use error::ArchiveError;
pub use matcher::ArchiveRequirements;
pub use reader::{ArchiveSpec, ReadableArchive};
pub use types::{ArchiveFeature, BlendingMode, Shading};
pub use writer::ArchiveWriter;
