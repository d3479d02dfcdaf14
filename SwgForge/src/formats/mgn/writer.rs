//! `.mgn` writing

use std::collections::HashMap;

use super::{BlendShape, PerShaderData, SkinnedMesh, WRITE_VERSION};
use crate::error::{Error, Result};
use crate::formats::common::Triangle;
use crate::iff::Iff;

pub(super) fn write_skinned_mesh(mesh: &SkinnedMesh) -> Result<Iff> {
    let mut iff = Iff::new(100_000);
    iff.insert_form("SKMG", true)?;
    iff.insert_form(WRITE_VERSION, true)?;

    let zones_this_occludes = mesh.zones_this_occludes();
    // OITL ids index the OZC table, which is only written alongside OZN
    let with_combinations = !mesh.zones.is_empty() && !mesh.zone_combinations.is_empty();
    if mesh.zones.is_empty() && !mesh.zone_combinations.is_empty() {
        tracing::warn!(
            "Dropping {} zone combinations from a mesh without occlusion zones",
            mesh.zone_combinations.len()
        );
    }
    let combination_count = if with_combinations {
        mesh.zone_combinations.len()
    } else {
        0
    };

    iff.insert_chunk("INFO", true)?;
    iff.insert_u32(mesh.max_transforms_vertex)?;
    iff.insert_u32(mesh.max_transforms_shader)?;
    iff.insert_u32(mesh.skeletons.len() as u32)?;
    iff.insert_u32(mesh.bone_names.len() as u32)?;
    iff.insert_u32(mesh.positions.len() as u32)?;
    iff.insert_u32(mesh.weight_record_count() as u32)?;
    iff.insert_u32(mesh.normals.len() as u32)?;
    iff.insert_u32(mesh.psdts.len() as u32)?;
    iff.insert_u32(mesh.blends.len() as u32)?;
    iff.insert_u16(mesh.zones.len() as u16)?;
    iff.insert_u16(combination_count as u16)?;
    iff.insert_u16(zones_this_occludes.len() as u16)?;
    iff.insert_u16(mesh.occlusion_layer)?;
    iff.exit_chunk("INFO")?;

    iff.insert_chunk("SKTM", true)?;
    for skeleton in &mesh.skeletons {
        iff.insert_string(skeleton)?;
    }
    iff.exit_chunk("SKTM")?;

    iff.insert_chunk("XFNM", true)?;
    for bone in &mesh.bone_names {
        iff.insert_string(bone)?;
    }
    iff.exit_chunk("XFNM")?;

    iff.insert_chunk("POSN", true)?;
    for &p in &mesh.positions {
        iff.insert_vec3(p)?;
    }
    iff.exit_chunk("POSN")?;

    iff.insert_chunk("TWHD", true)?;
    for list in &mesh.vertex_weights {
        iff.insert_u32(list.len() as u32)?;
    }
    iff.exit_chunk("TWHD")?;

    iff.insert_chunk("TWDT", true)?;
    for w in mesh.vertex_weights.iter().flatten() {
        iff.insert_u32(w.bone)?;
        iff.insert_f32(w.weight)?;
    }
    iff.exit_chunk("TWDT")?;

    iff.insert_chunk("NORM", true)?;
    for &n in &mesh.normals {
        iff.insert_vec3(n)?;
    }
    iff.exit_chunk("NORM")?;

    if let Some(dot3) = &mesh.dot3 {
        iff.insert_chunk("DOT3", true)?;
        iff.insert_u32(dot3.len() as u32)?;
        for d in dot3 {
            iff.insert_floats(d)?;
        }
        iff.exit_chunk("DOT3")?;
    }

    if let Some(blob) = &mesh.binary_hardpoints {
        iff.insert_iff_data(blob)?;
    }

    if !mesh.blends.is_empty() {
        iff.insert_form("BLTS", true)?;
        for blend in &mesh.blends {
            write_blend(&mut iff, blend)?;
        }
        iff.exit_form("BLTS")?;
    }

    if !mesh.zones.is_empty() {
        iff.insert_chunk("OZN ", true)?;
        for zone in &mesh.zones {
            iff.insert_string(&zone.name)?;
        }
        iff.exit_chunk("OZN ")?;

        if with_combinations {
            let fully_occluded = mesh.fully_occluded_zone_combination();
            iff.insert_chunk("FOZC", true)?;
            iff.insert_u16(fully_occluded.len() as u16)?;
            for id in fully_occluded {
                iff.insert_u16(id)?;
            }
            iff.exit_chunk("FOZC")?;

            iff.insert_chunk("OZC ", true)?;
            for combo in &mesh.zone_combinations {
                iff.insert_u16(combo.zones.len() as u16)?;
                for &id in &combo.zones {
                    iff.insert_u16(id)?;
                }
            }
            iff.exit_chunk("OZC ")?;
        }

        iff.insert_chunk("ZTO ", true)?;
        for id in zones_this_occludes {
            iff.insert_i16(id as i16)?;
        }
        iff.exit_chunk("ZTO ")?;
    }

    let by_triangle = mesh.combination_by_triangle();
    let mut triangle_base = 0usize;
    let mut defaulted = 0usize;
    for psdt in &mesh.psdts {
        write_psdt(
            &mut iff,
            psdt,
            with_combinations.then_some(&by_triangle),
            &mut triangle_base,
            &mut defaulted,
        )?;
    }
    if defaulted > 0 {
        tracing::warn!("{defaulted} triangles have no zone combination, assigned combination 0");
    }

    if let Some(blob) = &mesh.binary_trts {
        iff.insert_iff_data(blob)?;
    }

    iff.exit_form(WRITE_VERSION)?;
    iff.exit_form("SKMG")?;
    Ok(iff)
}

fn write_blend(iff: &mut Iff, blend: &BlendShape) -> Result<()> {
    iff.insert_form("BLT ", true)?;
    iff.insert_chunk("INFO", true)?;
    iff.insert_u32(blend.positions.len() as u32)?;
    iff.insert_u32(blend.normals.len() as u32)?;
    iff.insert_string(&blend.name)?;
    iff.exit_chunk("INFO")?;

    iff.insert_chunk("POSN", true)?;
    for &(index, delta) in &blend.positions {
        iff.insert_u32(index)?;
        iff.insert_vec3(delta)?;
    }
    iff.exit_chunk("POSN")?;

    iff.insert_chunk("NORM", true)?;
    for &(index, delta) in &blend.normals {
        iff.insert_u32(index)?;
        iff.insert_vec3(delta)?;
    }
    iff.exit_chunk("NORM")?;

    if let Some(dot3) = &blend.dot3 {
        iff.insert_chunk("DOT3", true)?;
        iff.insert_u32(dot3.len() as u32)?;
        for &(index, delta) in dot3 {
            iff.insert_i32(index)?;
            iff.insert_vec3(delta)?;
        }
        iff.exit_chunk("DOT3")?;
    }

    iff.exit_form("BLT ")
}

fn write_psdt(
    iff: &mut Iff,
    psdt: &PerShaderData,
    combinations: Option<&HashMap<usize, usize>>,
    triangle_base: &mut usize,
    defaulted: &mut usize,
) -> Result<()> {
    iff.insert_form("PSDT", true)?;

    iff.insert_chunk("NAME", true)?;
    iff.insert_string(&psdt.name)?;
    iff.exit_chunk("NAME")?;

    iff.insert_chunk("PIDX", true)?;
    iff.insert_u32(psdt.pidx.len() as u32)?;
    for &i in &psdt.pidx {
        iff.insert_u32(i)?;
    }
    iff.exit_chunk("PIDX")?;

    if !psdt.nidx.is_empty() {
        iff.insert_chunk("NIDX", true)?;
        for &i in &psdt.nidx {
            iff.insert_u32(i)?;
        }
        iff.exit_chunk("NIDX")?;
    }

    if let Some(dot3) = &psdt.dot3 {
        iff.insert_chunk("DOT3", true)?;
        for &i in dot3 {
            iff.insert_u32(i)?;
        }
        iff.exit_chunk("DOT3")?;
    }

    if let Some(colors) = &psdt.colors {
        iff.insert_chunk("VDCL", true)?;
        for c in colors {
            iff.insert_iff_data(c)?;
        }
        iff.exit_chunk("VDCL")?;
    }

    if !psdt.uvs.is_empty() {
        iff.insert_chunk("TXCI", true)?;
        iff.insert_u32(psdt.uvs.len() as u32)?;
        for set in &psdt.uvs {
            iff.insert_u32(set.dimension as u32)?;
        }
        iff.exit_chunk("TXCI")?;

        iff.insert_form("TCSF", true)?;
        for set in &psdt.uvs {
            iff.insert_chunk("TCSD", true)?;
            for uv in &set.coords {
                for d in 0..set.dimension {
                    let value = uv.get(d).copied().unwrap_or(0.0);
                    iff.insert_f32(if d == 1 { 1.0 - value } else { value })?;
                }
            }
            iff.exit_chunk("TCSD")?;
        }
        iff.exit_form("TCSF")?;
    }

    iff.insert_form("PRIM", true)?;
    iff.insert_chunk("INFO", true)?;
    iff.insert_u32(psdt.prims.len() as u32)?;
    iff.exit_chunk("INFO")?;

    for tris in &psdt.prims {
        let tag = if combinations.is_some() { "OITL" } else { "ITL " };
        iff.insert_chunk(tag, true)?;
        iff.insert_u32(tris.len() as u32)?;
        for (i, tri) in tris.iter().enumerate() {
            if let Some(map) = combinations {
                let combo = match map.get(&(*triangle_base + i)) {
                    Some(&c) => c,
                    None => {
                        *defaulted += 1;
                        0
                    }
                };
                let combo = i16::try_from(combo).map_err(|_| {
                    Error::geometry(format!("zone combination {combo} exceeds 16 bits"))
                })?;
                iff.insert_i16(combo)?;
            }
            write_triangle(iff, tri)?;
        }
        iff.exit_chunk(tag)?;
        *triangle_base += tris.len();
    }

    iff.exit_form("PRIM")?;
    iff.exit_form("PSDT")
}

fn write_triangle(iff: &mut Iff, tri: &Triangle) -> Result<()> {
    for index in tri.indices() {
        let index = i32::try_from(index)
            .map_err(|_| Error::geometry(format!("triangle index {index} exceeds i32")))?;
        iff.insert_i32(index)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use glam::Vec3;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::formats::mgn::{BoneWeight, OcclusionZone, UvSet, ZoneCombination};

    fn zone(name: &str, index: u16, occluded: bool) -> OcclusionZone {
        OcclusionZone {
            name: name.to_string(),
            index,
            occluded,
        }
    }

    fn hpts_blob() -> Vec<u8> {
        let mut iff = Iff::new(0);
        iff.insert_form("HPTS", true).unwrap();
        iff.insert_chunk("STAT", true).unwrap();
        iff.insert_string("hold_r").unwrap();
        iff.insert_f32(0.25).unwrap();
        iff.exit_chunk("STAT").unwrap();
        iff.exit_form("HPTS").unwrap();
        iff.into_bytes()
    }

    fn sample_mesh() -> SkinnedMesh {
        let psdt = PerShaderData {
            name: "shader/body.sht".to_string(),
            pidx: vec![0, 1, 2, 3],
            nidx: vec![0, 0, 0, 0],
            dot3: None,
            colors: Some(vec![[1, 2, 3, 4]; 4]),
            uvs: vec![UvSet {
                dimension: 2,
                coords: vec![
                    vec![0.0, 0.25],
                    vec![1.0, 0.5],
                    vec![0.5, 0.75],
                    vec![0.0, 1.0],
                ],
            }],
            prims: vec![vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)]],
        };
        SkinnedMesh {
            max_transforms_vertex: 2,
            max_transforms_shader: 2,
            skeletons: vec!["appearance/skeleton/all_b.skt".to_string()],
            bone_names: vec!["root".to_string(), "spine".to_string()],
            positions: vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(1.0, 1.0, 0.0),
            ],
            vertex_weights: vec![
                vec![BoneWeight::new(0, 1.0)],
                vec![BoneWeight::new(0, 0.5), BoneWeight::new(1, 0.5)],
                vec![BoneWeight::new(1, 1.0)],
                vec![BoneWeight::new(1, 1.0)],
            ],
            normals: vec![Vec3::Z],
            binary_hardpoints: Some(hpts_blob()),
            blends: vec![BlendShape {
                name: "fat".to_string(),
                positions: vec![(1, Vec3::new(0.1, 0.0, 0.0))],
                normals: vec![],
                dot3: None,
            }],
            zones: vec![zone("face", 0, false), zone("neck", 1, true), zone("chest", 2, false)],
            zone_combinations: vec![
                ZoneCombination {
                    zones: vec![0, 1],
                    triangles: BTreeSet::from([0, 1]),
                },
                ZoneCombination {
                    zones: vec![2],
                    triangles: BTreeSet::new(),
                },
            ],
            psdts: vec![psdt],
            ..SkinnedMesh::default()
        }
    }

    #[test]
    fn test_roundtrip() {
        let mesh = sample_mesh();
        let bytes = mesh.to_iff().unwrap().into_bytes();
        let back = SkinnedMesh::read(&mut Iff::from_bytes(bytes.clone())).unwrap();
        assert_eq!(back, mesh);
        // second pass is byte-identical
        assert_eq!(back.to_iff().unwrap().into_bytes(), bytes);
    }

    #[test]
    fn test_hardpoint_blob_preserved() {
        let mesh = sample_mesh();
        let back = SkinnedMesh::read(&mut Iff::from_bytes(mesh.to_iff().unwrap().into_bytes()))
            .unwrap();
        assert_eq!(back.binary_hardpoints, Some(hpts_blob()));
    }

    #[test]
    fn test_itl_without_combinations() {
        let mut mesh = sample_mesh();
        mesh.zone_combinations.clear();
        let iff = mesh.to_iff().unwrap();
        let tags: Vec<String> = iff.walk().into_iter().map(|b| b.name).collect();
        assert!(tags.iter().any(|t| t == "ITL "));
        assert!(!tags.iter().any(|t| t == "OITL" || t == "FOZC"));
    }

    #[test]
    fn test_combinations_without_zones_fall_back_to_itl() {
        let mut mesh = sample_mesh();
        mesh.zones.clear();
        let iff = mesh.to_iff().unwrap();
        let tags: Vec<String> = iff.walk().into_iter().map(|b| b.name).collect();
        assert!(tags.iter().any(|t| t == "ITL "));
        assert!(!tags.iter().any(|t| t == "OITL" || t == "OZC " || t == "FOZC"));

        let back = SkinnedMesh::read(&mut Iff::from_bytes(iff.into_bytes())).unwrap();
        assert!(back.zone_combinations.is_empty());
        assert_eq!(back.psdts, mesh.psdts);
    }

    #[test]
    fn test_uncovered_triangle_defaults_to_first_combination() {
        let mut mesh = sample_mesh();
        mesh.zone_combinations[0].triangles = BTreeSet::from([1]);
        let back = SkinnedMesh::read(&mut Iff::from_bytes(mesh.to_iff().unwrap().into_bytes()))
            .unwrap();
        assert_eq!(back.zone_combinations[0].triangles, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_zto_only_lists_occluded_zones() {
        let back = SkinnedMesh::read(&mut Iff::from_bytes(
            sample_mesh().to_iff().unwrap().into_bytes(),
        ))
        .unwrap();
        assert_eq!(back.zones_this_occludes(), vec![1]);
    }
}
