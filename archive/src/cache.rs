//! Lazy material cache over the engine boundary.
//!
//! Building a GPU material from a package is the engine's business; this
//! module only knows the boundary: `build_material(package_bytes) → handle`.
//! [`ArchiveCache`] pairs a loaded archive with one lazily-built handle per
//! spec. Handles are built on first request, never evicted, and released
//! only through [`destroy_materials`](ArchiveCache::destroy_materials) —
//! teardown must happen before the cache (and with it the archive buffer)
//! goes away.

use log::warn;

use crate::error::ArchiveError;
use crate::matcher::ArchiveRequirements;
use crate::reader::ReadableArchive;

/// The engine-side boundary that turns package bytes into materials.
pub trait MaterialProvider {
    type Material;

    fn build_material(&mut self, package: &[u8]) -> Self::Material;

    fn destroy_material(&mut self, material: Self::Material);
}

/// A loaded archive plus one cached material handle per spec.
pub struct ArchiveCache<P: MaterialProvider> {
    archive: ReadableArchive,
    materials: Vec<Option<P::Material>>,
}

impl<P: MaterialProvider> ArchiveCache<P> {
    /// Load a compressed archive and wrap it in an empty cache.
    pub fn load(compressed: &[u8]) -> Result<Self, ArchiveError> {
        Ok(Self::new(ReadableArchive::load(compressed)?))
    }

    pub fn new(archive: ReadableArchive) -> Self {
        let materials = (0..archive.spec_count()).map(|_| None).collect();
        Self { archive, materials }
    }

    pub fn archive(&self) -> &ReadableArchive {
        &self.archive
    }

    /// The material for the first spec satisfying `reqs`, built on first
    /// use. Returns `None` when no spec matches.
    pub fn material(&mut self, provider: &mut P, reqs: &ArchiveRequirements) -> Option<&P::Material> {
        let index = self.archive.select(reqs)?;
        Some(self.material_at(provider, index))
    }

    /// The material for spec 0, the conventional fallback when
    /// [`material`](Self::material) finds no match. `None` only for an
    /// empty archive.
    pub fn default_material(&mut self, provider: &mut P) -> Option<&P::Material> {
        if self.materials.is_empty() {
            return None;
        }
        Some(self.material_at(provider, 0))
    }

    fn material_at(&mut self, provider: &mut P, index: usize) -> &P::Material {
        let package = self.archive.spec(index).package();
        self.materials[index].get_or_insert_with(|| provider.build_material(package))
    }

    /// Release every built handle through the provider.
    pub fn destroy_materials(&mut self, provider: &mut P) {
        for slot in &mut self.materials {
            if let Some(material) = slot.take() {
                provider.destroy_material(material);
            }
        }
    }
}

impl<P: MaterialProvider> Drop for ArchiveCache<P> {
    fn drop(&mut self) {
        let live = self.materials.iter().filter(|slot| slot.is_some()).count();
        if live > 0 {
            warn!("archive cache dropped with {live} live material(s); call destroy_materials first");
        }
    }
}
