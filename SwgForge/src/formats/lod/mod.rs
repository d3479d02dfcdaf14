//! `.lod` detail-level container (`FORM DTLA`)
//!
//! ```text
//! FORM DTLA / FORM 0005|0007|0008
//!   FORM APPR / 0003
//!   PIVT                 bool8
//!   INFO                 (i32 id, f32 near, f32 far)*
//!   FORM DATA            CHLD (i32 id, string reference)*
//!   FORM RADR|TEST|WRIT  INFO (i32 present) [IDTL]
//! ```

mod builder;

pub use builder::{LodBuilder, LodPlan};

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::apt::AptFile;
use crate::formats::common::{Appearance, IndexedTriangleList, check_version};
use crate::iff::Iff;

pub const SUPPORTED_VERSIONS: &[&str] = &["0005", "0007", "0008"];

pub const WRITE_VERSION: &str = "0008";

/// One distance band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    pub near: f32,
    pub far: f32,
    /// Child appearance, relative to `appearance/`.
    pub reference: String,
}

/// A decoded LOD container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LodFile {
    pub appearance: Appearance,
    pub pivot: bool,
    pub lods: BTreeMap<i32, LodLevel>,
    pub radar: Option<IndexedTriangleList>,
    pub test_shape: Option<IndexedTriangleList>,
    pub write_shape: Option<IndexedTriangleList>,
}

impl LodFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut iff = Iff::open(path.as_ref())?;
        tracing::info!("Loading LOD {}", path.as_ref().display());
        Self::read(&mut iff)
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("DTLA")?;
        let version = iff.current_name();
        check_version("DTLA", &version, SUPPORTED_VERSIONS)?;
        iff.enter_form(&version)?;
        tracing::debug!("Reading DTLA version {version}");

        let mut lod = Self::default();
        let mut bands: BTreeMap<i32, (f32, f32)> = BTreeMap::new();
        let mut children: BTreeMap<i32, String> = BTreeMap::new();

        while !iff.at_end_of_form() {
            match iff.current_name().as_str() {
                "APPR" => lod.appearance = Appearance::read(iff)?,
                "PIVT" => {
                    iff.enter_chunk("PIVT")?;
                    lod.pivot = iff.read_bool8()?;
                    iff.exit_chunk("PIVT")?;
                }
                "INFO" => {
                    iff.enter_chunk("INFO")?;
                    while !iff.at_end_of_form() {
                        let id = iff.read_i32()?;
                        let near = iff.read_f32()?;
                        let far = iff.read_f32()?;
                        bands.insert(id, (near, far));
                    }
                    iff.exit_chunk("INFO")?;
                }
                "DATA" => {
                    iff.enter_form("DATA")?;
                    while !iff.at_end_of_form() {
                        iff.enter_chunk("CHLD")?;
                        let id = iff.read_i32()?;
                        children.insert(id, iff.read_string()?);
                        iff.exit_chunk("CHLD")?;
                    }
                    iff.exit_form("DATA")?;
                }
                "RADR" => lod.radar = read_shape(iff, "RADR")?,
                "TEST" => lod.test_shape = read_shape(iff, "TEST")?,
                "WRIT" => lod.write_shape = read_shape(iff, "WRIT")?,
                other => {
                    tracing::warn!("Skipping unknown DTLA block {other:?}");
                    iff.skip_block()?;
                }
            }
        }

        iff.exit_form(&version)?;
        iff.exit_form("DTLA")?;

        for (id, reference) in children {
            let (near, far) = bands.remove(&id).unwrap_or_else(|| {
                tracing::warn!("LOD child {id} ({reference}) has no distance band");
                (0.0, 0.0)
            });
            lod.lods.insert(
                id,
                LodLevel {
                    near,
                    far,
                    reference,
                },
            );
        }
        for id in bands.keys() {
            tracing::warn!("Distance band {id} has no child reference");
        }
        Ok(lod)
    }

    pub fn to_iff(&self) -> Result<Iff> {
        let mut iff = Iff::new(4096);
        iff.insert_form("DTLA", true)?;
        iff.insert_form(WRITE_VERSION, true)?;

        self.appearance.write(&mut iff)?;

        iff.insert_chunk("PIVT", true)?;
        iff.insert_bool8(self.pivot)?;
        iff.exit_chunk("PIVT")?;

        iff.insert_chunk("INFO", true)?;
        for (&id, level) in &self.lods {
            iff.insert_i32(id)?;
            iff.insert_f32(level.near)?;
            iff.insert_f32(level.far)?;
        }
        iff.exit_chunk("INFO")?;

        iff.insert_form("DATA", true)?;
        for (&id, level) in &self.lods {
            iff.insert_chunk("CHLD", true)?;
            iff.insert_i32(id)?;
            iff.insert_string(&level.reference)?;
            iff.exit_chunk("CHLD")?;
        }
        iff.exit_form("DATA")?;

        write_shape(&mut iff, "RADR", self.radar.as_ref())?;
        write_shape(&mut iff, "TEST", self.test_shape.as_ref())?;
        write_shape(&mut iff, "WRIT", self.write_shape.as_ref())?;

        iff.exit_form(WRITE_VERSION)?;
        iff.exit_form("DTLA")?;
        Ok(iff)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_iff()?.write(path)
    }

    /// Write the `.apt` redirect for a LOD written to `lod_path`.
    ///
    /// `appearance/lod/<name>.lod` gets `appearance/<name>.apt`.
    pub fn write_companion_apt(lod_path: &Path) -> Result<AptFile> {
        let name = lod_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let appearance_dir = lod_path
            .parent()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."));
        let apt = AptFile::for_lod(&name);
        apt.write(appearance_dir.join(format!("{name}.apt")))?;
        Ok(apt)
    }
}

fn read_shape(iff: &mut Iff, name: &str) -> Result<Option<IndexedTriangleList>> {
    iff.enter_form(name)?;
    iff.enter_chunk("INFO")?;
    let present = iff.read_i32()? != 0;
    iff.exit_chunk("INFO")?;
    let shape = if present {
        Some(IndexedTriangleList::read(iff)?)
    } else {
        None
    };
    iff.exit_form(name)?;
    Ok(shape)
}

/// Absent shapes are written with a zero flag, never omitted.
fn write_shape(iff: &mut Iff, name: &str, shape: Option<&IndexedTriangleList>) -> Result<()> {
    iff.insert_form(name, true)?;
    iff.insert_chunk("INFO", true)?;
    iff.insert_i32(i32::from(shape.is_some()))?;
    iff.exit_chunk("INFO")?;
    if let Some(shape) = shape {
        shape.write(iff)?;
    }
    iff.exit_form(name)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Error;
    use crate::formats::common::Extent;

    fn sample() -> LodFile {
        let mut lods = BTreeMap::new();
        lods.insert(
            0,
            LodLevel {
                near: 0.0,
                far: 32.0,
                reference: "mesh/hut_l0.msh".to_string(),
            },
        );
        lods.insert(
            1,
            LodLevel {
                near: 32.0,
                far: 128.0,
                reference: "mesh/hut_l1.msh".to_string(),
            },
        );
        LodFile {
            appearance: Appearance {
                extents: Extent::from_points([Vec3::splat(-2.0), Vec3::splat(2.0)]),
                ..Appearance::default()
            },
            pivot: false,
            lods,
            radar: Some(IndexedTriangleList::from_polygon(vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Z,
            ])),
            test_shape: None,
            write_shape: None,
        }
    }

    #[test]
    fn test_lod_roundtrip() {
        let lod = sample();
        let back = LodFile::read(&mut Iff::from_bytes(lod.to_iff().unwrap().into_bytes())).unwrap();
        assert_eq!(back, lod);
    }

    #[test]
    fn test_absent_shapes_still_written() {
        let names: Vec<String> = sample()
            .to_iff()
            .unwrap()
            .walk()
            .into_iter()
            .map(|b| b.name)
            .collect();
        for shape in ["RADR", "TEST", "WRIT"] {
            assert!(names.iter().any(|n| n == shape), "{shape} missing");
        }
    }

    #[test]
    fn test_unsupported_version() {
        let mut iff = Iff::new(0);
        iff.insert_form("DTLA", true).unwrap();
        iff.insert_form("0006", true).unwrap();
        iff.exit_form("0006").unwrap();
        iff.exit_form("DTLA").unwrap();
        let err = LodFile::read(&mut Iff::from_bytes(iff.into_bytes())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_companion_apt() {
        let dir = tempfile::tempdir().unwrap();
        let lod_dir = dir.path().join("appearance").join("lod");
        std::fs::create_dir_all(&lod_dir).unwrap();
        let lod_path = lod_dir.join("hut.lod");
        sample().write(&lod_path).unwrap();
        LodFile::write_companion_apt(&lod_path).unwrap();

        let apt = AptFile::load(dir.path().join("appearance").join("hut.apt")).unwrap();
        assert_eq!(apt.reference, "appearance/lod/hut.lod");
        assert_eq!(LodFile::load(&lod_path).unwrap(), sample());
    }
}
