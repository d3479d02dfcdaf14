//! `.msh` reading

use super::{SUPPORTED_VERSIONS, Sps, SwgMesh};
use crate::error::Result;
use crate::formats::common::{Appearance, SwgVertex, Triangle, VertexFormat, check_version};
use crate::iff::Iff;

const SPS_VERSIONS: &[&str] = &["0000", "0001"];

pub(super) fn read_mesh(iff: &mut Iff) -> Result<SwgMesh> {
    iff.enter_form("MESH")?;
    let version = iff.current_name();
    check_version("MESH", &version, SUPPORTED_VERSIONS)?;
    iff.enter_form(&version)?;
    tracing::debug!("Reading MESH version {version}");

    let appearance = Appearance::read(iff)?;

    iff.enter_form("SPS ")?;
    iff.enter_form("0001")?;
    iff.enter_chunk("CNT ")?;
    let count = iff.read_u32()? as usize;
    iff.exit_chunk("CNT ")?;

    let mut spss = Vec::new();
    while !iff.at_end_of_form() {
        spss.push(read_sps(iff)?);
    }
    if spss.len() != count {
        tracing::warn!("SPS count says {count}, found {}", spss.len());
    }

    iff.exit_form("0001")?;
    iff.exit_form("SPS ")?;
    iff.exit_form(&version)?;
    iff.exit_form("MESH")?;

    Ok(SwgMesh { appearance, spss })
}

fn read_sps(iff: &mut Iff) -> Result<Sps> {
    let number = iff.enter_form_unchecked()?;

    iff.enter_chunk("NAME")?;
    let shader = iff.read_string()?;
    iff.exit_chunk("NAME")?;

    iff.enter_chunk("INFO")?;
    iff.exit_chunk("INFO")?;

    let version = iff.current_name();
    check_version("SPS", &version, SPS_VERSIONS)?;
    iff.enter_form(&version)?;
    iff.enter_chunk("INFO")?;
    iff.exit_chunk("INFO")?;

    iff.enter_form("VTXA")?;
    iff.enter_form("0003")?;
    iff.enter_chunk("INFO")?;
    let flags = VertexFormat(iff.read_u32()?);
    let num_verts = iff.read_u32()? as usize;
    iff.exit_chunk("INFO")?;
    if flags.has_color1() {
        tracing::debug!("SPS {number} uses color1 (flags {:#x})", flags.bits());
    }

    iff.enter_chunk("DATA")?;
    let num_verts = iff.checked_count(num_verts, flags.vertex_size())?;
    let mut verts = Vec::with_capacity(num_verts);
    for _ in 0..num_verts {
        verts.push(read_vertex(iff, flags)?);
    }
    iff.exit_chunk("DATA")?;
    iff.exit_form("0003")?;
    iff.exit_form("VTXA")?;

    let size = iff.current_length();
    iff.enter_chunk("INDX")?;
    let index_count = iff.read_u32()? as usize;
    let index_count = iff.checked_count(index_count, 2)?;
    let width = if index_count == 0 {
        2
    } else {
        (size - 4) / index_count
    };
    let mut tris = Vec::with_capacity(index_count / 3);
    for _ in 0..index_count / 3 {
        let tri = if width == 4 {
            Triangle::new(iff.read_u32()?, iff.read_u32()?, iff.read_u32()?)
        } else {
            Triangle::new(
                u32::from(iff.read_u16()?),
                u32::from(iff.read_u16()?),
                u32::from(iff.read_u16()?),
            )
        };
        tris.push(tri);
    }
    iff.exit_chunk("INDX")?;

    iff.exit_form(&version)?;
    iff.exit_form(&number)?;

    tracing::debug!(
        "SPS {number} shader {shader}: {} verts, {} tris, {width}-byte indices",
        verts.len(),
        tris.len()
    );
    Ok(Sps {
        shader,
        flags,
        verts,
        tris,
    })
}

/// Decode one vertex laid out according to `flags`.
///
/// Order: position, normal, point size, color0, color1, UV sets, DOT3.
pub fn read_vertex(iff: &mut Iff, flags: VertexFormat) -> Result<SwgVertex> {
    let mut v = SwgVertex::default();
    if flags.has_position() {
        v.pos = iff.read_vec3()?;
    }
    if flags.has_normal() {
        v.normal = Some(iff.read_vec3()?);
    }
    if flags.has_point_size() {
        v.point_size = Some(iff.read_f32()?);
    }
    if flags.has_color0() {
        v.color0 = Some(iff.read_color()?);
    }
    if flags.has_color1() {
        v.color1 = Some(iff.read_color()?);
    }
    for set in 0..flags.effective_uv_set_count() {
        let dim = flags.texcoord_set_dimension(set);
        let mut uv = Vec::with_capacity(dim);
        for _ in 0..dim {
            uv.push(iff.read_f32()?);
        }
        v.texs.push(uv);
    }
    if flags.has_dot3() {
        v.dot3 = Some(iff.read_floats::<4>()?);
    }
    Ok(v)
}
