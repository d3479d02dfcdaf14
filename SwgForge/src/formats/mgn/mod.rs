//! `.mgn` skinned mesh format (`FORM SKMG`)
//!
//! Shared position/normal pools weighted to skeleton bones, blend shapes,
//! per-shader triangle groups (`PSDT`) and the occlusion zone system used to
//! hide body parts covered by worn items.

mod occlusion;
mod reader;
mod writer;

pub use occlusion::{OcclusionZone, ZoneCombination};

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::asset_root::AssetRoot;
use crate::error::Result;
use crate::formats::common::Triangle;
use crate::iff::Iff;

/// Top-level versions read.
pub const SUPPORTED_VERSIONS: &[&str] = &["0003", "0004"];

/// Version written.
pub const WRITE_VERSION: &str = "0004";

/// Default occlusion layer for new meshes.
pub const DEFAULT_OCCLUSION_LAYER: u16 = 2;

/// One `(bone index, weight)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub bone: u32,
    pub weight: f32,
}

impl BoneWeight {
    pub const fn new(bone: u32, weight: f32) -> Self {
        Self { bone, weight }
    }
}

/// Sparse per-vertex deltas of one blend shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub positions: Vec<(u32, Vec3)>,
    pub normals: Vec<(u32, Vec3)>,
    pub dot3: Option<Vec<(i32, Vec3)>>,
}

/// One texture coordinate set of a `PSDT`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UvSet {
    pub dimension: usize,
    /// One tuple per `PSDT` vertex, V already flipped to host convention.
    pub coords: Vec<Vec<f32>>,
}

/// Per-shader group of a skinned mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerShaderData {
    /// Shader path, e.g. `shader/body.sht`.
    pub name: String,
    /// Index into the shared position pool, one per group vertex.
    pub pidx: Vec<u32>,
    /// Index into the shared normal pool, one per group vertex.
    pub nidx: Vec<u32>,
    /// Index into the shared DOT3 pool, one per group vertex.
    pub dot3: Option<Vec<u32>>,
    /// Raw `VDCL` colors, four bytes per vertex.
    pub colors: Option<Vec<[u8; 4]>>,
    pub uvs: Vec<UvSet>,
    /// Triangle lists (`ITL ` / `OITL`), indices into this group's vertices.
    pub prims: Vec<Vec<Triangle>>,
}

impl PerShaderData {
    pub fn triangle_count(&self) -> usize {
        self.prims.iter().map(Vec::len).sum()
    }
}

/// A decoded skinned mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinnedMesh {
    pub max_transforms_vertex: u32,
    pub max_transforms_shader: u32,
    pub occlusion_layer: u16,

    /// Skeleton template paths (`SKTM`).
    pub skeletons: Vec<String>,
    /// Bone names (`XFNM`).
    pub bone_names: Vec<String>,

    pub positions: Vec<Vec3>,
    /// Per position; each list sums to 1 after loading.
    pub vertex_weights: Vec<Vec<BoneWeight>>,
    pub normals: Vec<Vec3>,
    /// Packed tangents (xyz + sign).
    pub dot3: Option<Vec<[f32; 4]>>,

    /// Whole `HPTS` form, kept byte-for-byte.
    pub binary_hardpoints: Option<Vec<u8>>,
    pub blends: Vec<BlendShape>,

    pub zones: Vec<OcclusionZone>,
    pub zone_combinations: Vec<ZoneCombination>,

    pub psdts: Vec<PerShaderData>,
    /// Whole `TRTS` form, kept byte-for-byte.
    pub binary_trts: Option<Vec<u8>>,
}

impl Default for SkinnedMesh {
    fn default() -> Self {
        Self {
            max_transforms_vertex: 0,
            max_transforms_shader: 0,
            occlusion_layer: DEFAULT_OCCLUSION_LAYER,
            skeletons: Vec::new(),
            bone_names: Vec::new(),
            positions: Vec::new(),
            vertex_weights: Vec::new(),
            normals: Vec::new(),
            dot3: None,
            binary_hardpoints: None,
            blends: Vec::new(),
            zones: Vec::new(),
            zone_combinations: Vec::new(),
            psdts: Vec::new(),
            binary_trts: None,
        }
    }
}

impl SkinnedMesh {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut iff = Iff::open(path.as_ref())?;
        tracing::info!("Loading skinned mesh {}", path.as_ref().display());
        reader::read_skinned_mesh(&mut iff)
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        reader::read_skinned_mesh(iff)
    }

    pub fn to_iff(&self) -> Result<Iff> {
        writer::write_skinned_mesh(self)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_iff()?.write(path)
    }

    pub fn weight_record_count(&self) -> usize {
        self.vertex_weights.iter().map(Vec::len).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.psdts.iter().map(PerShaderData::triangle_count).sum()
    }

    /// Zones flagged as occluded by this mesh.
    pub fn zones_this_occludes(&self) -> Vec<u16> {
        self.zones
            .iter()
            .filter(|z| z.occluded)
            .map(|z| z.index)
            .collect()
    }

    /// Resolve the skeleton templates under `root`; missing ones are skipped
    /// with a warning.
    pub fn skeleton_paths(&self, root: &AssetRoot) -> Vec<PathBuf> {
        self.skeletons
            .iter()
            .filter_map(|s| root.find_optional(s))
            .collect()
    }
}

/// Rescale every vertex's weights to sum to 1. Returns how many vertices
/// changed.
///
/// All-zero lists are left alone.
pub fn normalize_vertex_weights(weights: &mut [Vec<BoneWeight>]) -> usize {
    let mut changed = 0;
    for (vertex, list) in weights.iter_mut().enumerate() {
        let total: f32 = list.iter().map(|w| w.weight).sum();
        if total <= 0.0 {
            if !list.is_empty() {
                tracing::warn!("Vertex {vertex} has zero total weight, left unnormalized");
            }
            continue;
        }
        let mut any = false;
        for w in list.iter_mut() {
            let before = w.weight;
            w.weight /= total;
            if w.weight != before {
                tracing::debug!(
                    "Vertex {vertex} weight for bone {} changed from {before} to {}",
                    w.bone,
                    w.weight
                );
                any = true;
            }
        }
        if any {
            changed += 1;
        }
    }
    if changed > 0 {
        tracing::warn!("Normalized bone weights of {changed} vertices");
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums(weights: &[Vec<BoneWeight>]) -> Vec<f32> {
        weights.iter().map(|l| l.iter().map(|w| w.weight).sum()).collect()
    }

    #[test]
    fn test_normalize_sums_to_one() {
        let mut weights = vec![
            vec![BoneWeight::new(0, 0.2), BoneWeight::new(1, 0.2)],
            vec![BoneWeight::new(2, 3.0)],
            vec![BoneWeight::new(0, 0.25), BoneWeight::new(3, 0.75)],
        ];
        let changed = normalize_vertex_weights(&mut weights);
        assert_eq!(changed, 2);
        for s in sums(&weights) {
            assert!((s - 1.0).abs() < 1e-6);
        }
        assert_eq!(weights[0][0].weight, 0.5);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut weights = vec![
            vec![BoneWeight::new(0, 0.1), BoneWeight::new(1, 0.3), BoneWeight::new(2, 0.35)],
            vec![BoneWeight::new(4, 7.0), BoneWeight::new(5, 2.0)],
        ];
        normalize_vertex_weights(&mut weights);
        let once = weights.clone();
        normalize_vertex_weights(&mut weights);
        for (a, b) in once.iter().flatten().zip(weights.iter().flatten()) {
            assert!((a.weight - b.weight).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_weights_untouched() {
        let mut weights = vec![vec![BoneWeight::new(0, 0.0)], vec![]];
        assert_eq!(normalize_vertex_weights(&mut weights), 0);
        assert_eq!(weights[0][0].weight, 0.0);
    }
}
