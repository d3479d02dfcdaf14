//! Host floor meshes to floor triangles

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::position_from_host;
use crate::config::FloorSettings;
use crate::error::{Error, Result};
use crate::formats::flr::{EdgeType, FloorFile, FloorTriangle};

/// Crease weight above which an edge is the top of a wall.
const WALL_TOP_CREASE: f32 = 0.9;

/// A host floor mesh with its edge markings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostFloor {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Vec<u32>>,
    /// Uncrossable edges.
    pub seams: Vec<[u32; 2]>,
    /// Wall bases.
    pub sharp: Vec<[u32; 2]>,
    pub creases: Vec<([u32; 2], f32)>,
    /// Faces the player may fall through.
    pub fallthrough: Vec<usize>,
}

/// Portal geometry in host space, with the building-wide portal id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostPortal {
    pub id: i32,
    pub triangles: Vec<[Vec3; 3]>,
}

/// A converted floor plus the bookkeeping its path graph needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedFloor {
    pub floor: FloorFile,
    /// Building portal id for each local portal index.
    pub global_portal_ids: Vec<i32>,
    /// Local indices of portals no floor edge touched.
    pub unused_portals: Vec<usize>,
}

fn edge_key(a: u32, b: u32) -> (u32, u32) {
    (a.min(b), a.max(b))
}

fn edge_types(host: &HostFloor) -> HashMap<(u32, u32), EdgeType> {
    let mut types = HashMap::new();
    for &([a, b], weight) in &host.creases {
        if weight > WALL_TOP_CREASE {
            types.insert(edge_key(a, b), EdgeType::WallTop);
        }
    }
    for &[a, b] in &host.sharp {
        types.insert(edge_key(a, b), EdgeType::WallBase);
    }
    for &[a, b] in &host.seams {
        types.insert(edge_key(a, b), EdgeType::Uncrossable);
    }
    types
}

/// Whether `p` projects into triangle `abc` and lies within `tolerance` of
/// its plane.
fn near_triangle(p: Vec3, [a, b, c]: [Vec3; 3], tolerance: f32) -> bool {
    let normal = (b - a).cross(c - a);
    let area2 = normal.length_squared();
    if area2 <= f32::EPSILON {
        return false;
    }
    let n = normal / area2.sqrt();
    let distance = n.dot(p - a);
    if distance.abs() >= tolerance {
        return false;
    }
    let q = p - n * distance;
    let u = (c - b).cross(q - b).dot(normal) / area2;
    let v = (a - c).cross(q - c).dot(normal) / area2;
    let w = 1.0 - u - v;
    let slack = -1e-4;
    u >= slack && v >= slack && w >= slack
}

/// Convert a host floor into floor triangles.
///
/// Corners are stored as `(v0, v2, v1)`. A boundary triangle edge whose two
/// host vertices both lie on a portal triangle is tagged with that portal's
/// local index.
pub fn floor_from_host(host: &HostFloor, portals: &[HostPortal], settings: &FloorSettings) -> Result<ConvertedFloor> {
    let types = edge_types(host);
    let type_of = |a: u32, b: u32| types.get(&edge_key(a, b)).copied().unwrap_or_default();
    let fallthrough: HashSet<usize> = host.fallthrough.iter().copied().collect();

    let mut tris = Vec::with_capacity(host.faces.len());
    for (index, face) in host.faces.iter().enumerate() {
        let &[v0, v1, v2] = face.as_slice() else {
            return Err(Error::geometry(format!(
                "floor face {index} has {} corners, only triangles are supported",
                face.len()
            )));
        };
        if let Some(&bad) = face.iter().find(|&&v| v as usize >= host.vertices.len()) {
            return Err(Error::geometry(format!("floor face {index} references missing vertex {bad}")));
        }
        let mut tri = FloorTriangle::new(index as i32, [v0 as i32, v2 as i32, v1 as i32]);
        tri.edge_types = [type_of(v0, v2), type_of(v2, v1), type_of(v1, v0)];
        tri.fallthrough = fallthrough.contains(&index);
        tris.push(tri);
    }

    let verts = host.vertices.iter().map(|&v| position_from_host(v)).collect();
    let mut floor = FloorFile::new(verts, tris);
    floor.link_neighbors();
    floor.recompute_normals();

    let mut used = vec![false; portals.len()];
    for (tri, face) in floor.tris.iter_mut().zip(&host.faces) {
        if !tri.is_boundary() {
            continue;
        }
        let corners = [face[0], face[1], face[2]].map(|v| host.vertices[v as usize]);
        for (local, portal) in portals.iter().enumerate() {
            for &triangle in &portal.triangles {
                let on = corners.map(|p| near_triangle(p, triangle, settings.portal_vertex_tolerance));
                // host edge (v0,v1) is stored edge 2, (v1,v2) edge 1, (v2,v0) edge 0
                for (edge, (i, j)) in [(2, (0, 1)), (1, (1, 2)), (0, (2, 0))] {
                    if on[i] && on[j] {
                        tri.portal_ids[edge] = local as i32;
                        used[local] = true;
                    }
                }
            }
        }
    }

    let unused_portals: Vec<usize> = (0..portals.len()).filter(|&p| !used[p]).collect();
    for &p in &unused_portals {
        tracing::warn!("Portal {} (local {p}) touches no floor edge", portals[p].id);
    }

    Ok(ConvertedFloor {
        floor,
        global_portal_ids: portals.iter().map(|p| p.id).collect(),
        unused_portals,
    })
}
