//! Host polygon meshes to and from static meshes

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{position_from_host, position_to_host};
use crate::config::MeshSettings;
use crate::error::{Error, Result};
use crate::formats::common::{SwgVertex, Triangle, VertexFormat};
use crate::formats::msh::{Sps, SwgMesh};

/// A host mesh. Per-corner arrays are indexed by the running corner number
/// across `polygons` in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostMesh {
    pub positions: Vec<Vec3>,
    pub polygons: Vec<Vec<u32>>,
    /// Empty when the mesh has no normals.
    pub corner_normals: Vec<Vec3>,
    /// One array per UV layer.
    pub corner_uvs: Vec<Vec<[f32; 2]>>,
    /// Tangent xyz plus bitangent sign; empty when there is no DOT3 layer.
    pub corner_tangents: Vec<[f32; 4]>,
    pub material_per_polygon: Vec<usize>,
    /// Shader path per material slot.
    pub materials: Vec<String>,
}

/// Corner identity for de-duplication: vertex plus rounded normal and UVs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CornerKey {
    vertex: u32,
    normal: [i32; 3],
    uvs: Vec<[i32; 2]>,
}

fn round(v: f32) -> i32 {
    (v * 10_000.0).round() as i32
}

/// Build a static mesh with one shader primitive set per used material.
pub fn mesh_from_host(host: &HostMesh, settings: &MeshSettings) -> Result<SwgMesh> {
    let corner_count: usize = host.polygons.iter().map(Vec::len).sum();
    if let Some((index, polygon)) = host.polygons.iter().enumerate().find(|(_, p)| p.len() != 3) {
        return Err(Error::geometry(format!(
            "polygon {index} has {} corners, only triangles can be exported",
            polygon.len()
        )));
    }
    let has_normals = !host.corner_normals.is_empty();
    let has_dot3 = !host.corner_tangents.is_empty();
    if (has_normals && host.corner_normals.len() != corner_count)
        || (has_dot3 && host.corner_tangents.len() != corner_count)
        || host.corner_uvs.iter().any(|layer| layer.len() != corner_count)
    {
        return Err(Error::geometry(format!(
            "per-corner arrays do not match the {corner_count} polygon corners"
        )));
    }

    let uv_sets = host.corner_uvs.len();
    let mut flags = VertexFormat::default()
        .with_position(true)
        .with_normal(has_normals)
        .with_num_texcoord_sets(uv_sets + usize::from(has_dot3));
    for set in 0..uv_sets {
        flags = flags.with_texcoord_set_dimension(set, 2);
    }
    if has_dot3 {
        flags = flags.with_texcoord_set_dimension(uv_sets, 4);
    }

    let mut corner_starts = Vec::with_capacity(host.polygons.len());
    let mut next = 0;
    for polygon in &host.polygons {
        corner_starts.push(next);
        next += polygon.len();
    }

    let mut mesh = SwgMesh::default();
    for (material, shader) in host.materials.iter().enumerate() {
        let mut sps = Sps {
            shader: shader.clone(),
            flags,
            ..Sps::default()
        };
        let mut unique: HashMap<CornerKey, u32> = HashMap::new();

        for (poly, polygon) in host.polygons.iter().enumerate() {
            if host.material_per_polygon.get(poly).copied().unwrap_or(0) != material {
                continue;
            }
            let mut tri = [0u32; 3];
            for (slot, &vertex) in polygon.iter().enumerate() {
                let corner = corner_starts[poly] + slot;
                let Some(&position) = host.positions.get(vertex as usize) else {
                    return Err(Error::geometry(format!(
                        "polygon {poly} references missing vertex {vertex}"
                    )));
                };
                let normal = host.corner_normals.get(corner).copied().unwrap_or(Vec3::ZERO);
                let uvs: Vec<[f32; 2]> = host
                    .corner_uvs
                    .iter()
                    .map(|layer| {
                        let [u, v] = layer[corner];
                        if settings.flip_uv_v { [u, 1.0 - v] } else { [u, v] }
                    })
                    .collect();

                let key = CornerKey {
                    vertex: if settings.dedupe_vertices { vertex } else { corner as u32 },
                    normal: normal.to_array().map(round),
                    uvs: uvs.iter().map(|uv| uv.map(round)).collect(),
                };
                let index = match unique.get(&key) {
                    Some(&index) => index,
                    None => {
                        let index = sps.verts.len() as u32;
                        sps.verts.push(SwgVertex {
                            pos: position_from_host(position),
                            normal: has_normals.then(|| position_from_host(normal)),
                            texs: uvs.iter().map(|uv| uv.to_vec()).collect(),
                            dot3: host
                                .corner_tangents
                                .get(corner)
                                .map(|&[x, y, z, sign]| [-x, y, z, sign]),
                            ..SwgVertex::default()
                        });
                        unique.insert(key, index);
                        index
                    }
                };
                tri[slot] = index;
            }
            sps.tris.push(Triangle::new(tri[2], tri[1], tri[0]));
        }

        if sps.tris.is_empty() {
            tracing::debug!("Material {shader} has no polygons, skipping");
            continue;
        }
        tracing::debug!(
            "SPS {}: {} unique verts from {} triangles",
            mesh.spss.len() + 1,
            sps.verts.len(),
            sps.tris.len()
        );
        mesh.spss.push(sps);
    }

    if let Some(poly) = host
        .material_per_polygon
        .iter()
        .position(|&m| m >= host.materials.len())
    {
        tracing::warn!("Polygon {poly} uses a material slot with no shader and was dropped");
    }

    mesh.recompute_extents();
    Ok(mesh)
}

/// Flatten a static mesh back into one host mesh, one material per SPS.
pub fn mesh_to_host(mesh: &SwgMesh, settings: &MeshSettings) -> HostMesh {
    let uv_sets = mesh.spss.iter().map(Sps::uv_set_count).max().unwrap_or(0);
    let has_normals = mesh.spss.iter().any(|s| s.flags.has_normal());
    let has_dot3 = mesh.spss.iter().any(|s| s.flags.has_dot3());

    let mut host = HostMesh {
        corner_uvs: vec![Vec::new(); uv_sets],
        ..HostMesh::default()
    };
    for (material, sps) in mesh.spss.iter().enumerate() {
        let base = host.positions.len() as u32;
        host.materials.push(sps.shader.clone());
        host.positions.extend(sps.verts.iter().map(|v| position_to_host(v.pos)));

        for tri in &sps.tris {
            let corners = [tri.p3, tri.p2, tri.p1];
            host.polygons.push(corners.iter().map(|&i| i + base).collect());
            host.material_per_polygon.push(material);
            for &i in &corners {
                let vertex = sps.verts.get(i as usize);
                if has_normals {
                    let normal = vertex.and_then(|v| v.normal).unwrap_or(Vec3::ZERO);
                    host.corner_normals.push(position_to_host(normal));
                }
                for (set, layer) in host.corner_uvs.iter_mut().enumerate() {
                    let uv = vertex
                        .and_then(|v| v.texs.get(set))
                        .map(|t| [t.first().copied().unwrap_or(0.0), t.get(1).copied().unwrap_or(0.0)])
                        .unwrap_or([0.0, 0.0]);
                    layer.push(if settings.flip_uv_v { [uv[0], 1.0 - uv[1]] } else { uv });
                }
                if has_dot3 {
                    let [x, y, z, sign] = vertex.and_then(|v| v.dot3).unwrap_or([0.0; 4]);
                    host.corner_tangents.push([-x, y, z, sign]);
                }
            }
        }
    }
    host
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quad_as_two_triangles() -> HostMesh {
        HostMesh {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            polygons: vec![vec![0, 1, 2], vec![0, 2, 3]],
            corner_normals: vec![Vec3::Z; 6],
            corner_uvs: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
            corner_tangents: Vec::new(),
            material_per_polygon: vec![0, 0],
            materials: vec!["shader/wall.sht".into()],
        }
    }

    #[test]
    fn test_shared_corners_are_merged() {
        let mesh = mesh_from_host(&quad_as_two_triangles(), &MeshSettings::default()).unwrap();
        assert_eq!(mesh.spss.len(), 1);
        let sps = &mesh.spss[0];
        assert_eq!(sps.verts.len(), 4);
        assert_eq!(sps.tris.len(), 2);
        assert!(sps.flags.has_normal());
        assert_eq!(sps.uv_set_count(), 1);
        assert_eq!(sps.verts[1].pos, Vec3::new(-1.0, 0.0, 0.0));
        // V stored flipped
        assert_eq!(sps.verts[0].texs[0], vec![0.0, 1.0]);
        // winding reversed
        assert_eq!(sps.tris[0], Triangle::new(2, 1, 0));
    }

    #[test]
    fn test_no_dedupe_keeps_every_corner() {
        let settings = MeshSettings {
            dedupe_vertices: false,
            ..MeshSettings::default()
        };
        let mesh = mesh_from_host(&quad_as_two_triangles(), &settings).unwrap();
        assert_eq!(mesh.spss[0].verts.len(), 6);
    }

    #[test]
    fn test_split_normals_are_not_merged() {
        let mut host = quad_as_two_triangles();
        host.corner_normals[3] = Vec3::X;
        let mesh = mesh_from_host(&host, &MeshSettings::default()).unwrap();
        assert_eq!(mesh.spss[0].verts.len(), 5);
    }

    #[test]
    fn test_quad_rejected() {
        let mut host = quad_as_two_triangles();
        host.polygons = vec![vec![0, 1, 2, 3]];
        host.corner_normals.truncate(4);
        host.corner_uvs[0].truncate(4);
        host.material_per_polygon.truncate(1);
        let err = mesh_from_host(&host, &MeshSettings::default()).unwrap_err();
        assert!(matches!(err, Error::GeometryAssumption { .. }));
    }

    #[test]
    fn test_materials_split_into_sps() {
        let mut host = quad_as_two_triangles();
        host.materials.push("shader/trim.sht".into());
        host.material_per_polygon = vec![0, 1];
        let mesh = mesh_from_host(&host, &MeshSettings::default()).unwrap();
        assert_eq!(mesh.spss.len(), 2);
        assert_eq!(mesh.spss[1].shader, "shader/trim.sht");
        assert_eq!(mesh.spss[1].verts.len(), 3);
    }

    #[test]
    fn test_host_roundtrip() {
        let host = quad_as_two_triangles();
        let settings = MeshSettings::default();
        let back = mesh_to_host(&mesh_from_host(&host, &settings).unwrap(), &settings);
        assert_eq!(back.polygons.len(), 2);
        for (poly, original) in back.polygons.iter().zip(&host.polygons) {
            let positions: Vec<Vec3> = poly.iter().map(|&i| back.positions[i as usize]).collect();
            let expected: Vec<Vec3> = original.iter().map(|&i| host.positions[i as usize]).collect();
            assert_eq!(positions, expected);
        }
        assert_eq!(back.corner_uvs, host.corner_uvs);
        assert_eq!(back.corner_normals, host.corner_normals);
    }
}
