//! `.msh` static mesh format
//!
//! ```text
//! FORM MESH / FORM 0004|0005
//!   FORM APPR / 0003    extents, collision, hardpoints, floor
//!   FORM SPS  / 0001
//!     CNT                    shader primitive set count
//!     FORM 0001..N
//!       NAME                 shader path
//!       INFO                 primitive count (always 1)
//!       FORM 0000|0001
//!         INFO
//!         FORM VTXA / 0003 / INFO (flags, count) + DATA
//!         INDX               count, then 16- or 32-bit indices
//! ```

mod reader;
mod writer;

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::common::{Appearance, SwgVertex, Triangle, VertexFormat};
use crate::iff::Iff;

pub use reader::read_vertex;
pub use writer::write_vertex;

/// Versions of the outer `MESH` form this tool reads.
pub const SUPPORTED_VERSIONS: &[&str] = &["0004", "0005"];

/// Version written.
pub const WRITE_VERSION: &str = "0005";

/// One shader's vertices and triangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sps {
    pub shader: String,
    pub flags: VertexFormat,
    pub verts: Vec<SwgVertex>,
    pub tris: Vec<Triangle>,
}

impl Sps {
    /// Shader name without `shader/` prefix and `.sht` suffix.
    pub fn stripped_shader_name(&self) -> &str {
        let name = self.shader.strip_prefix("shader/").unwrap_or(&self.shader);
        name.strip_suffix(".sht").unwrap_or(name)
    }

    pub fn uv_set_count(&self) -> usize {
        self.flags.effective_uv_set_count()
    }
}

/// A decoded static mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwgMesh {
    pub appearance: Appearance,
    pub spss: Vec<Sps>,
}

impl SwgMesh {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut iff = Iff::open(path.as_ref())?;
        tracing::info!("Loading mesh {}", path.as_ref().display());
        reader::read_mesh(&mut iff)
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        reader::read_mesh(iff)
    }

    pub fn to_iff(&self) -> Result<Iff> {
        writer::write_mesh(self)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_iff()?.write(path)
    }

    pub fn vertex_count(&self) -> usize {
        self.spss.iter().map(|s| s.verts.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.spss.iter().map(|s| s.tris.len()).sum()
    }

    /// Recompute the bounding box from the vertex positions.
    pub fn recompute_extents(&mut self) {
        self.appearance.extents = crate::formats::common::Extent::from_points(
            self.spss.iter().flat_map(|s| s.verts.iter().map(|v| v.pos)),
        );
    }

    /// Move every vertex position (and the bounding box) of an encoded mesh
    /// by `delta`, editing the buffer in place.
    pub fn translate_encoded(iff: &mut Iff, delta: Vec3) -> Result<()> {
        writer::translate_encoded(iff, delta)
    }
}
