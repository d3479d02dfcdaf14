//! Types shared by several SWG formats

mod extents;
mod hardpoint;
mod idtl;
mod vertex_format;

pub use extents::{BoxExtent, Extent, Sphere};
pub use hardpoint::{Hardpoint, read_hardpoints, write_hardpoints};
pub use idtl::IndexedTriangleList;
pub use vertex_format::{MAX_TEXCOORD_SETS, VertexFormat};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::iff::Iff;

/// Three indices into a vertex list. Winding defines the front face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    pub p1: u32,
    pub p2: u32,
    pub p3: u32,
}

impl Triangle {
    pub const fn new(p1: u32, p2: u32, p3: u32) -> Self {
        Self { p1, p2, p3 }
    }

    pub const fn indices(&self) -> [u32; 3] {
        [self.p1, self.p2, self.p3]
    }

    /// Same triangle with the opposite winding.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        Self::new(self.p3, self.p2, self.p1)
    }
}

/// One vertex of a static mesh stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwgVertex {
    pub pos: Vec3,
    pub normal: Option<Vec3>,
    pub point_size: Option<f32>,
    /// RGBA in `0.0..=1.0`.
    pub color0: Option<[f32; 4]>,
    pub color1: Option<[f32; 4]>,
    /// One tuple per ordinary UV set.
    pub texs: Vec<Vec<f32>>,
    /// Tangent xyz plus bitangent sign.
    pub dot3: Option<[f32; 4]>,
}

impl SwgVertex {
    pub fn at(pos: Vec3) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }
}

/// Accept `version` only if it is in `supported`.
pub(crate) fn check_version(format: &str, version: &str, supported: &[&str]) -> Result<()> {
    if supported.contains(&version) {
        Ok(())
    } else {
        tracing::error!("Unsupported {format} version: {version}");
        Err(Error::unsupported(format, version))
    }
}

/// Optional floor reference (`FORM FLOR` / `DATA`: bool8 present, string).
pub(crate) fn read_floor_reference(iff: &mut Iff) -> Result<Option<String>> {
    iff.enter_form("FLOR")?;
    iff.enter_chunk("DATA")?;
    let floor = if iff.read_bool8()? {
        Some(iff.read_string()?)
    } else {
        None
    };
    iff.exit_chunk("DATA")?;
    iff.exit_form("FLOR")?;
    Ok(floor)
}

pub(crate) fn write_floor_reference(iff: &mut Iff, floor: Option<&str>) -> Result<()> {
    iff.insert_form("FLOR", true)?;
    iff.insert_chunk("DATA", true)?;
    iff.insert_bool8(floor.is_some())?;
    if let Some(floor) = floor {
        iff.insert_string(floor)?;
    }
    iff.exit_chunk("DATA")?;
    iff.exit_form("FLOR")?;
    Ok(())
}

/// Appearance block shared by meshes and LOD containers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub extents: Extent,
    pub collision: Extent,
    pub hardpoints: Vec<Hardpoint>,
    pub floor: Option<String>,
}

impl Appearance {
    /// `FORM APPR / FORM 0003`.
    pub fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("APPR")?;
        let version = iff.current_name();
        check_version("APPR", &version, &["0003"])?;
        iff.enter_form("0003")?;

        let extents = Extent::read(iff)?;
        let collision = if iff.at_end_of_form() {
            Extent::Null
        } else {
            Extent::read(iff)?
        };
        let hardpoints = if iff.current_name() == "HPTS" {
            read_hardpoints(iff)?
        } else {
            Vec::new()
        };
        let floor = if iff.current_name() == "FLOR" {
            read_floor_reference(iff)?
        } else {
            None
        };

        iff.exit_form("0003")?;
        iff.exit_form("APPR")?;
        Ok(Self {
            extents,
            collision,
            hardpoints,
            floor,
        })
    }

    pub fn write(&self, iff: &mut Iff) -> Result<()> {
        iff.insert_form("APPR", true)?;
        iff.insert_form("0003", true)?;
        self.extents.write_to(iff)?;
        self.collision.write_to(iff)?;
        write_hardpoints(iff, &self.hardpoints)?;
        write_floor_reference(iff, self.floor.as_deref())?;
        iff.exit_form("0003")?;
        iff.exit_form("APPR")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_appearance_roundtrip() {
        let appr = Appearance {
            extents: Extent::from_points([Vec3::ZERO, Vec3::ONE]),
            collision: Extent::Null,
            hardpoints: vec![Hardpoint {
                name: "hp_weapon".to_string(),
                transform: [1.0, 0.0, 0.0, 0.5, 0.0, 1.0, 0.0, 1.5, 0.0, 0.0, 1.0, 2.5],
            }],
            floor: Some("appearance/collision/hut.flr".to_string()),
        };
        let mut iff = Iff::new(0);
        appr.write(&mut iff).unwrap();
        let mut iff = Iff::from_bytes(iff.into_bytes());
        assert_eq!(Appearance::read(&mut iff).unwrap(), appr);
    }

    #[test]
    fn test_version_gate() {
        let err = check_version("MESH", "0099", &["0004", "0005"]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { ref version, .. } if version == "0099"));
    }
}
