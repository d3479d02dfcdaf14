//! Indexed triangle list (`IDTL`)
//!
//! Shared by collision meshes, LOD auxiliary shapes and portal polygons.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::iff::Iff;

/// Vertex pool plus flat triangle indices (three per triangle).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedTriangleList {
    pub verts: Vec<Vec3>,
    pub indices: Vec<i32>,
}

impl IndexedTriangleList {
    pub fn new(verts: Vec<Vec3>, indices: Vec<i32>) -> Self {
        Self { verts, indices }
    }

    /// Fan-triangulate a convex polygon.
    pub fn from_polygon(verts: Vec<Vec3>) -> Self {
        let mut indices = Vec::with_capacity(verts.len().saturating_sub(2) * 3);
        for i in 1..verts.len().saturating_sub(1) {
            indices.extend([0, i as i32, i as i32 + 1]);
        }
        Self { verts, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            let at = |i: i32| self.verts.get(i as usize).copied().unwrap_or(Vec3::ZERO);
            [at(t[0]), at(t[1]), at(t[2])]
        })
    }

    /// Average of the vertex pool.
    pub fn centroid(&self) -> Vec3 {
        if self.verts.is_empty() {
            return Vec3::ZERO;
        }
        self.verts.iter().copied().sum::<Vec3>() / self.verts.len() as f32
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("IDTL")?;
        iff.enter_form("0000")?;

        iff.enter_chunk("VERT")?;
        let mut verts = Vec::with_capacity(iff.remaining() / 12);
        while !iff.at_end_of_form() {
            verts.push(iff.read_vec3()?);
        }
        iff.exit_chunk("VERT")?;

        iff.enter_chunk("INDX")?;
        let mut indices = Vec::with_capacity(iff.remaining() / 4);
        while !iff.at_end_of_form() {
            indices.push(iff.read_i32()?);
        }
        iff.exit_chunk("INDX")?;

        iff.exit_form("0000")?;
        iff.exit_form("IDTL")?;
        Ok(Self { verts, indices })
    }

    pub fn write(&self, iff: &mut Iff) -> Result<()> {
        iff.insert_form("IDTL", true)?;
        iff.insert_form("0000", true)?;

        iff.insert_chunk("VERT", true)?;
        for v in &self.verts {
            iff.insert_vec3(*v)?;
        }
        iff.exit_chunk("VERT")?;

        iff.insert_chunk("INDX", true)?;
        for &i in &self.indices {
            iff.insert_i32(i)?;
        }
        iff.exit_chunk("INDX")?;

        iff.exit_form("0000")?;
        iff.exit_form("IDTL")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fan_triangulation() {
        let quad = IndexedTriangleList::from_polygon(vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::Y,
        ]);
        assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(quad.centroid(), Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_read_write() {
        let list = IndexedTriangleList::new(vec![Vec3::ZERO, Vec3::X, Vec3::Z], vec![0, 2, 1]);
        let mut iff = Iff::new(0);
        list.write(&mut iff).unwrap();
        let mut iff = Iff::from_bytes(iff.into_bytes());
        assert_eq!(IndexedTriangleList::read(&mut iff).unwrap(), list);
    }
}
