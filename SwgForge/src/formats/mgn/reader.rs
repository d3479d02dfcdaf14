//! `.mgn` reading

use std::collections::BTreeSet;

use super::{
    BlendShape, BoneWeight, OcclusionZone, PerShaderData, SUPPORTED_VERSIONS, SkinnedMesh, UvSet,
    ZoneCombination, normalize_vertex_weights,
};
use crate::error::{Error, Result};
use crate::formats::common::{Triangle, check_version};
use crate::iff::Iff;

pub(super) fn read_skinned_mesh(iff: &mut Iff) -> Result<SkinnedMesh> {
    iff.enter_form("SKMG")?;
    let version = iff.current_name();
    check_version("SKMG", &version, SUPPORTED_VERSIONS)?;
    iff.enter_form(&version)?;
    tracing::debug!("Reading SKMG version {version}");

    let mut mesh = SkinnedMesh::default();

    iff.enter_chunk("INFO")?;
    mesh.max_transforms_vertex = iff.read_u32()?;
    mesh.max_transforms_shader = iff.read_u32()?;
    // the remaining counts are derived from the chunks themselves
    iff.read_misc(7 * 4)?;
    let _zones = iff.read_u16()?;
    let _combinations = iff.read_u16()?;
    let _zones_this_occludes = iff.read_u16()?;
    mesh.occlusion_layer = iff.read_u16()?;
    iff.exit_chunk("INFO")?;

    let mut weight_counts: Vec<u32> = Vec::new();
    let mut weight_pool: Vec<BoneWeight> = Vec::new();
    let mut occluded_ids: Option<Vec<i16>> = None;
    let mut triangle_base = 0usize;

    while !iff.at_end_of_form() {
        let name = iff.current_name();
        match name.as_str() {
            "SKTM" => {
                iff.enter_chunk("SKTM")?;
                mesh.skeletons = iff.read_strings()?;
                iff.exit_chunk("SKTM")?;
            }
            "XFNM" => {
                iff.enter_chunk("XFNM")?;
                mesh.bone_names = iff.read_strings()?;
                iff.exit_chunk("XFNM")?;
            }
            "POSN" => {
                iff.enter_chunk("POSN")?;
                while !iff.at_end_of_form() {
                    mesh.positions.push(iff.read_vec3()?);
                }
                iff.exit_chunk("POSN")?;
            }
            "TWHD" => {
                iff.enter_chunk("TWHD")?;
                while !iff.at_end_of_form() {
                    weight_counts.push(iff.read_u32()?);
                }
                iff.exit_chunk("TWHD")?;
            }
            "TWDT" => {
                iff.enter_chunk("TWDT")?;
                while !iff.at_end_of_form() {
                    let bone = iff.read_u32()?;
                    let weight = iff.read_f32()?;
                    weight_pool.push(BoneWeight::new(bone, weight));
                }
                iff.exit_chunk("TWDT")?;
            }
            "NORM" => {
                iff.enter_chunk("NORM")?;
                while !iff.at_end_of_form() {
                    mesh.normals.push(iff.read_vec3()?);
                }
                iff.exit_chunk("NORM")?;
            }
            "DOT3" => {
                iff.enter_chunk("DOT3")?;
                let count = iff.read_u32()? as usize;
                let count = iff.checked_count(count, 16)?;
                let mut dot3 = Vec::with_capacity(count);
                for _ in 0..count {
                    dot3.push(iff.read_floats::<4>()?);
                }
                iff.exit_chunk("DOT3")?;
                mesh.dot3 = Some(dot3);
            }
            "HPTS" => {
                mesh.binary_hardpoints = Some(iff.read_block_raw()?);
            }
            "TRTS" => {
                mesh.binary_trts = Some(iff.read_block_raw()?);
            }
            "BLTS" => {
                iff.enter_form("BLTS")?;
                while !iff.at_end_of_form() {
                    mesh.blends.push(read_blend(iff)?);
                }
                iff.exit_form("BLTS")?;
            }
            "OZN " => {
                iff.enter_chunk("OZN ")?;
                mesh.zones = iff
                    .read_strings()?
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| OcclusionZone {
                        name,
                        index: i as u16,
                        occluded: false,
                    })
                    .collect();
                iff.exit_chunk("OZN ")?;
            }
            "FOZC" => {
                iff.enter_chunk("FOZC")?;
                let count = usize::from(iff.read_u16()?);
                let count = iff.checked_count(count, 2)?;
                let mut ids = Vec::with_capacity(count);
                for _ in 0..count {
                    ids.push(iff.read_u16()?);
                }
                iff.exit_chunk("FOZC")?;
                tracing::debug!("Stored fully occluded zone combination {ids:?}");
            }
            "OZC " => {
                iff.enter_chunk("OZC ")?;
                while !iff.at_end_of_form() {
                    let count = usize::from(iff.read_u16()?);
                    let count = iff.checked_count(count, 2)?;
                    let mut zones = Vec::with_capacity(count);
                    for _ in 0..count {
                        zones.push(iff.read_u16()?);
                    }
                    mesh.zone_combinations.push(ZoneCombination {
                        zones,
                        triangles: BTreeSet::new(),
                    });
                }
                iff.exit_chunk("OZC ")?;
            }
            "ZTO " => {
                iff.enter_chunk("ZTO ")?;
                let mut ids = Vec::new();
                while !iff.at_end_of_form() {
                    ids.push(iff.read_i16()?);
                }
                iff.exit_chunk("ZTO ")?;
                occluded_ids = Some(ids);
            }
            "PSDT" => {
                let psdt = read_psdt(iff, &mut mesh.zone_combinations, triangle_base)?;
                triangle_base += psdt.triangle_count();
                mesh.psdts.push(psdt);
            }
            other => {
                tracing::warn!("Skipping unknown SKMG block {other:?}");
                iff.skip_block()?;
            }
        }
    }

    iff.exit_form(&version)?;
    iff.exit_form("SKMG")?;

    if let Some(ids) = occluded_ids {
        for id in ids {
            match mesh.zones.iter_mut().find(|z| i32::from(z.index) == i32::from(id)) {
                Some(zone) => zone.occluded = true,
                None => tracing::warn!("ZTO names zone {id} which does not exist"),
            }
        }
    }

    mesh.vertex_weights = split_weights(&weight_counts, &weight_pool, mesh.positions.len())?;
    normalize_vertex_weights(&mut mesh.vertex_weights);

    tracing::debug!(
        "SKMG: {} positions, {} weights, {} shaders, {} blends, {} zones",
        mesh.positions.len(),
        mesh.weight_record_count(),
        mesh.psdts.len(),
        mesh.blends.len(),
        mesh.zones.len()
    );
    Ok(mesh)
}

/// Cut the flat `TWDT` pool into one list per position using the `TWHD` counts.
fn split_weights(
    counts: &[u32],
    pool: &[BoneWeight],
    positions: usize,
) -> Result<Vec<Vec<BoneWeight>>> {
    if counts.len() != positions {
        tracing::warn!(
            "TWHD has {} entries for {positions} positions",
            counts.len()
        );
    }
    let mut out = Vec::with_capacity(counts.len());
    let mut offset = 0usize;
    for &count in counts {
        let end = offset + count as usize;
        let Some(slice) = pool.get(offset..end) else {
            return Err(Error::TruncatedData {
                wanted: end,
                available: pool.len(),
            });
        };
        out.push(slice.to_vec());
        offset = end;
    }
    Ok(out)
}

fn read_blend(iff: &mut Iff) -> Result<BlendShape> {
    iff.enter_form("BLT ")?;
    iff.enter_chunk("INFO")?;
    let num_positions = iff.read_u32()?;
    let num_normals = iff.read_u32()?;
    let name = iff.read_string()?;
    iff.exit_chunk("INFO")?;

    let mut blend = BlendShape {
        name,
        ..BlendShape::default()
    };

    iff.enter_chunk("POSN")?;
    for _ in 0..num_positions {
        let index = iff.read_u32()?;
        blend.positions.push((index, iff.read_vec3()?));
    }
    iff.exit_chunk("POSN")?;

    iff.enter_chunk("NORM")?;
    for _ in 0..num_normals {
        let index = iff.read_u32()?;
        blend.normals.push((index, iff.read_vec3()?));
    }
    iff.exit_chunk("NORM")?;

    if iff.current_name() == "DOT3" {
        iff.enter_chunk("DOT3")?;
        let count = iff.read_u32()? as usize;
        let count = iff.checked_count(count, 16)?;
        let mut dot3 = Vec::with_capacity(count);
        for _ in 0..count {
            let index = iff.read_i32()?;
            dot3.push((index, iff.read_vec3()?));
        }
        iff.exit_chunk("DOT3")?;
        blend.dot3 = Some(dot3);
    }

    iff.exit_form("BLT ")?;
    Ok(blend)
}

fn read_psdt(
    iff: &mut Iff,
    combinations: &mut [ZoneCombination],
    triangle_base: usize,
) -> Result<PerShaderData> {
    iff.enter_form("PSDT")?;
    let mut psdt = PerShaderData::default();

    iff.enter_chunk("NAME")?;
    psdt.name = iff.read_string()?;
    iff.exit_chunk("NAME")?;

    iff.enter_chunk("PIDX")?;
    let count = iff.read_u32()? as usize;
    let count = iff.checked_count(count, 4)?;
    psdt.pidx.reserve(count);
    for _ in 0..count {
        psdt.pidx.push(iff.read_u32()?);
    }
    iff.exit_chunk("PIDX")?;

    if iff.current_name() == "NIDX" {
        iff.enter_chunk("NIDX")?;
        for _ in 0..count {
            psdt.nidx.push(iff.read_u32()?);
        }
        iff.exit_chunk("NIDX")?;
    }

    if iff.current_name() == "DOT3" {
        iff.enter_chunk("DOT3")?;
        let mut dot3 = Vec::with_capacity(iff.checked_count(count, 4)?);
        for _ in 0..count {
            dot3.push(iff.read_u32()?);
        }
        iff.exit_chunk("DOT3")?;
        psdt.dot3 = Some(dot3);
    }

    if iff.current_name() == "VDCL" {
        iff.enter_chunk("VDCL")?;
        let mut colors = Vec::with_capacity(iff.checked_count(count, 4)?);
        for _ in 0..count {
            let bytes = iff.read_misc(4)?;
            colors.push([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        iff.exit_chunk("VDCL")?;
        psdt.colors = Some(colors);
    }

    if iff.current_name() == "TXCI" {
        iff.enter_chunk("TXCI")?;
        let sets = iff.read_u32()? as usize;
        let sets = iff.checked_count(sets, 4)?;
        let mut dims = Vec::with_capacity(sets);
        for _ in 0..sets {
            dims.push(iff.read_u32()? as usize);
        }
        iff.exit_chunk("TXCI")?;

        iff.enter_form("TCSF")?;
        for dimension in dims {
            iff.enter_chunk("TCSD")?;
            iff.checked_count(count, dimension.saturating_mul(4))?;
            let mut coords = Vec::with_capacity(count);
            for _ in 0..count {
                let mut uv = Vec::with_capacity(dimension);
                for _ in 0..dimension {
                    uv.push(iff.read_f32()?);
                }
                if let Some(v) = uv.get_mut(1) {
                    *v = 1.0 - *v;
                }
                coords.push(uv);
            }
            iff.exit_chunk("TCSD")?;
            psdt.uvs.push(UvSet { dimension, coords });
        }
        iff.exit_form("TCSF")?;
    }

    iff.enter_form("PRIM")?;
    iff.enter_chunk("INFO")?;
    let prim_count = iff.read_u32()?;
    iff.exit_chunk("INFO")?;

    let mut base = triangle_base;
    for _ in 0..prim_count {
        let tag = iff.current_name();
        iff.enter_chunk(&tag)?;
        let record_size = if tag == "OITL" { 14 } else { 12 };
        let tri_count = iff.read_u32()? as usize;
        let tri_count = iff.checked_count(tri_count, record_size)?;
        let mut tris = Vec::with_capacity(tri_count);
        match tag.as_str() {
            "ITL " => {
                for _ in 0..tri_count {
                    tris.push(read_triangle(iff)?);
                }
            }
            "OITL" => {
                for i in 0..tri_count {
                    let combo = iff.read_i16()?;
                    tris.push(read_triangle(iff)?);
                    match usize::try_from(combo).ok().and_then(|c| combinations.get_mut(c)) {
                        Some(c) => {
                            c.triangles.insert(base + i);
                        }
                        None => tracing::warn!(
                            "Triangle {} references zone combination {combo} which does not exist",
                            base + i
                        ),
                    }
                }
            }
            other => {
                return Err(Error::mismatch("ITL  or OITL", other));
            }
        }
        iff.exit_chunk(&tag)?;
        base += tris.len();
        psdt.prims.push(tris);
    }
    iff.exit_form("PRIM")?;
    iff.exit_form("PSDT")?;

    Ok(psdt)
}

fn read_triangle(iff: &mut Iff) -> Result<Triangle> {
    let mut corner = || -> Result<u32> {
        let value = iff.read_i32()?;
        u32::try_from(value).map_err(|_| Error::geometry(format!("negative triangle index {value}")))
    };
    Ok(Triangle::new(corner()?, corner()?, corner()?))
}
