//! Spec selection.
//!
//! Maps a mesh's requirements to the first suitable spec in archive order.
//! Selection is a pure function of the archive and the requirements; the
//! per-spec rejection reasons are reported at `debug` level.

use std::collections::HashMap;

use log::debug;

use crate::reader::ReadableArchive;
use crate::types::{ArchiveFeature, BlendingMode, Shading};

/// What a mesh needs from an archived material.
///
/// A feature mapped to `true` means the mesh uses that capability; `false`
/// entries are equivalent to absent ones.
#[derive(Debug, Clone)]
pub struct ArchiveRequirements {
    pub shading_model: Shading,
    pub blending_mode: BlendingMode,
    pub features: HashMap<String, bool>,
}

impl ReadableArchive {
    /// Select the first spec, in stored order, that satisfies `reqs`.
    ///
    /// A spec is suitable iff:
    /// 1. its blending mode is unconstrained or equals the requirement;
    /// 2. its shading model is unconstrained or equals the requirement;
    /// 3. every feature the mesh uses is covered by a flag that is
    ///    `optional` or `required`;
    /// 4. every flag the spec marks `required` is used by the mesh.
    ///
    /// Returns `None` when no spec matches; callers typically fall back to
    /// spec 0 as the default material.
    pub fn select(&self, reqs: &ArchiveRequirements) -> Option<usize> {
        'specs: for (i, spec) in self.specs().enumerate() {
            if let Some(blending) = spec.blending_mode()
                && blending != reqs.blending_mode
            {
                debug!("spec {i}: blending mode mismatch");
                continue;
            }
            if let Some(shading) = spec.shading_model()
                && shading != reqs.shading_model
            {
                debug!("spec {i}: shading model mismatch");
                continue;
            }

            for (name, &used) in &reqs.features {
                if !used {
                    continue;
                }
                let covered =
                    matches!(spec.flag(name), Some(value) if value != ArchiveFeature::Unsupported);
                if !covered {
                    debug!("spec {i}: no support for {name}");
                    continue 'specs;
                }
            }

            for (name, value) in spec.flags() {
                if value == ArchiveFeature::Required
                    && !reqs.features.get(name).copied().unwrap_or(false)
                {
                    debug!("spec {i}: requires {name}");
                    continue 'specs;
                }
            }

            return Some(i);
        }
        None
    }
}
