//! Floor triangle records

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::iff::Iff;

/// How a floor edge may be traversed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EdgeType {
    Uncrossable = 0,
    #[default]
    Crossable = 1,
    WallBase = 2,
    WallTop = 3,
}

impl EdgeType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uncrossable,
            1 => Self::Crossable,
            2 => Self::WallBase,
            3 => Self::WallTop,
            other => {
                tracing::warn!("Unknown floor edge type {other}, treating as uncrossable");
                Self::Uncrossable
            }
        }
    }
}

/// One walkable triangle. Edge `i` runs from corner `i` to corner `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorTriangle {
    pub corners: [i32; 3],
    pub index: i32,
    /// Triangle across each edge, -1 on the boundary.
    pub neighbors: [i32; 3],
    pub normal: Vec3,
    pub edge_types: [EdgeType; 3],
    pub fallthrough: bool,
    pub part_tag: i32,
    /// Local portal index touching each edge, -1 for none.
    pub portal_ids: [i32; 3],
}

impl FloorTriangle {
    pub fn new(index: i32, corners: [i32; 3]) -> Self {
        Self {
            corners,
            index,
            neighbors: [-1; 3],
            normal: Vec3::ZERO,
            edge_types: [EdgeType::Crossable; 3],
            fallthrough: false,
            part_tag: -1,
            portal_ids: [-1; 3],
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.neighbors.iter().any(|&n| n < 0)
    }

    pub(super) fn read(iff: &mut Iff) -> Result<Self> {
        let mut corners = [0; 3];
        for c in &mut corners {
            *c = iff.read_i32()?;
        }
        let index = iff.read_i32()?;
        let mut neighbors = [0; 3];
        for n in &mut neighbors {
            *n = iff.read_i32()?;
        }
        let normal = iff.read_vec3()?;
        let mut edge_types = [EdgeType::Crossable; 3];
        for e in &mut edge_types {
            *e = EdgeType::from_u8(iff.read_u8()?);
        }
        let fallthrough = iff.read_bool8()?;
        let part_tag = iff.read_i32()?;
        let mut portal_ids = [0; 3];
        for p in &mut portal_ids {
            *p = iff.read_i32()?;
        }
        Ok(Self {
            corners,
            index,
            neighbors,
            normal,
            edge_types,
            fallthrough,
            part_tag,
            portal_ids,
        })
    }

    pub(super) fn write(&self, iff: &mut Iff) -> Result<()> {
        for &c in &self.corners {
            iff.insert_i32(c)?;
        }
        iff.insert_i32(self.index)?;
        for &n in &self.neighbors {
            iff.insert_i32(n)?;
        }
        iff.insert_vec3(self.normal)?;
        for &e in &self.edge_types {
            iff.insert_u8(e as u8)?;
        }
        iff.insert_bool8(self.fallthrough)?;
        iff.insert_i32(self.part_tag)?;
        for &p in &self.portal_ids {
            iff.insert_i32(p)?;
        }
        Ok(())
    }
}
