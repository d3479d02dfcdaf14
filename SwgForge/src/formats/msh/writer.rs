//! `.msh` writing

use glam::Vec3;

use super::{SUPPORTED_VERSIONS, SwgMesh, WRITE_VERSION};
use crate::error::{Error, Result};
use crate::formats::common::{SwgVertex, VertexFormat, check_version};
use crate::iff::Iff;

pub(super) fn write_mesh(mesh: &SwgMesh) -> Result<Iff> {
    let mut iff = Iff::new(100_000);
    iff.insert_form("MESH", true)?;
    iff.insert_form(WRITE_VERSION, true)?;

    mesh.appearance.write(&mut iff)?;

    iff.insert_form("SPS ", true)?;
    iff.insert_form("0001", true)?;
    iff.insert_chunk("CNT ", true)?;
    iff.insert_u32(mesh.spss.len() as u32)?;
    iff.exit_chunk("CNT ")?;

    for (i, sps) in mesh.spss.iter().enumerate() {
        iff.insert_numbered_form(i + 1, true)?;

        iff.insert_chunk("NAME", true)?;
        iff.insert_string(&sps.shader)?;
        iff.exit_chunk("NAME")?;

        // shader primitive count
        iff.insert_chunk("INFO", true)?;
        iff.insert_u32(1)?;
        iff.exit_chunk("INFO")?;

        iff.insert_form("0001", true)?;
        iff.insert_chunk("INFO", true)?;
        iff.insert_u32(9)?;
        iff.insert_bool8(true)?;
        iff.insert_bool8(false)?;
        iff.exit_chunk("INFO")?;

        iff.insert_form("VTXA", true)?;
        iff.insert_form("0003", true)?;
        iff.insert_chunk("INFO", true)?;
        iff.insert_u32(sps.flags.bits())?;
        iff.insert_u32(sps.verts.len() as u32)?;
        iff.exit_chunk("INFO")?;
        iff.insert_chunk("DATA", true)?;
        for v in &sps.verts {
            write_vertex(&mut iff, sps.flags, v)?;
        }
        iff.exit_chunk("DATA")?;
        iff.exit_form("0003")?;
        iff.exit_form("VTXA")?;

        iff.insert_chunk("INDX", true)?;
        iff.insert_u32((sps.tris.len() * 3) as u32)?;
        for t in &sps.tris {
            for index in t.indices() {
                let index = u16::try_from(index).map_err(|_| {
                    Error::geometry(format!(
                        "SPS {} index {index} does not fit a 16-bit index buffer",
                        i + 1
                    ))
                })?;
                iff.insert_u16(index)?;
            }
        }
        iff.exit_chunk("INDX")?;

        iff.exit_form("0001")?;
        iff.exit_form("")?;
    }

    iff.exit_form("0001")?;
    iff.exit_form("SPS ")?;
    iff.exit_form(WRITE_VERSION)?;
    iff.exit_form("MESH")?;
    Ok(iff)
}

/// Encode one vertex. Missing attributes the flags ask for are written as zeros.
pub fn write_vertex(iff: &mut Iff, flags: VertexFormat, v: &SwgVertex) -> Result<()> {
    if flags.has_position() {
        iff.insert_vec3(v.pos)?;
    }
    if flags.has_normal() {
        iff.insert_vec3(v.normal.unwrap_or(Vec3::Y))?;
    }
    if flags.has_point_size() {
        iff.insert_f32(v.point_size.unwrap_or(1.0))?;
    }
    if flags.has_color0() {
        iff.insert_color(v.color0.unwrap_or([1.0; 4]))?;
    }
    if flags.has_color1() {
        iff.insert_color(v.color1.unwrap_or([1.0; 4]))?;
    }
    for set in 0..flags.effective_uv_set_count() {
        let dim = flags.texcoord_set_dimension(set);
        let uv = v.texs.get(set).map(Vec::as_slice).unwrap_or_default();
        for d in 0..dim {
            iff.insert_f32(uv.get(d).copied().unwrap_or(0.0))?;
        }
    }
    if flags.has_dot3() {
        iff.insert_floats(&v.dot3.unwrap_or([1.0, 0.0, 0.0, 1.0]))?;
    }
    Ok(())
}

pub(super) fn translate_encoded(iff: &mut Iff, delta: Vec3) -> Result<()> {
    iff.enter_form("MESH")?;
    let version = iff.current_name();
    check_version("MESH", &version, SUPPORTED_VERSIONS)?;
    iff.enter_form(&version)?;

    iff.enter_form("APPR")?;
    iff.enter_form("0003")?;
    if iff.current_name() == "EXBX" {
        iff.enter_form("EXBX")?;
        iff.enter_form("0001")?;
        iff.enter_form("EXSP")?;
        iff.enter_form("0001")?;
        iff.enter_chunk("SPHR")?;
        iff.update_vec3(delta)?;
        iff.exit_chunk("SPHR")?;
        iff.exit_form("0001")?;
        iff.exit_form("EXSP")?;
        iff.enter_chunk("BOX ")?;
        iff.update_vec3(delta)?;
        iff.update_vec3(delta)?;
        iff.exit_chunk("BOX ")?;
        iff.exit_form("0001")?;
        iff.exit_form("EXBX")?;
    }
    while !iff.at_end_of_form() {
        iff.skip_block()?;
    }
    iff.exit_form("0003")?;
    iff.exit_form("APPR")?;

    iff.enter_form("SPS ")?;
    iff.enter_form("0001")?;
    iff.skip_block()?;
    while !iff.at_end_of_form() {
        let number = iff.enter_form_unchecked()?;
        iff.skip_block()?;
        iff.skip_block()?;
        let sps_version = iff.enter_form_unchecked()?;
        iff.skip_block()?;
        iff.enter_form("VTXA")?;
        iff.enter_form("0003")?;
        iff.enter_chunk("INFO")?;
        let flags = VertexFormat(iff.read_u32()?);
        let count = iff.read_u32()? as usize;
        iff.exit_chunk("INFO")?;
        iff.enter_chunk("DATA")?;
        let rest = flags.vertex_size().saturating_sub(12);
        if flags.has_position() {
            for _ in 0..count {
                iff.update_vec3(delta)?;
                iff.read_misc(rest)?;
            }
        }
        iff.exit_chunk("DATA")?;
        iff.exit_form("0003")?;
        iff.exit_form("VTXA")?;
        iff.skip_block()?;
        iff.exit_form(&sps_version)?;
        iff.exit_form(&number)?;
    }
    iff.exit_form("0001")?;
    iff.exit_form("SPS ")?;
    iff.exit_form(&version)?;
    iff.exit_form("MESH")?;
    Ok(())
}
