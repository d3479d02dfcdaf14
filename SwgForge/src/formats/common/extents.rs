//! Extents (bounding and collision volumes)
//!
//! | variant   | on disk                                             |
//! |-----------|-----------------------------------------------------|
//! | Null      | `FORM NULL`                                         |
//! | Sphere    | `EXSP/0001/SPHR` center, radius                     |
//! | Box       | `EXBX/0001/{EXSP, BOX }` max, min                   |
//! | Cylinder  | `XCYL/0000/CYLN` base, radius, height               |
//! | Mesh      | `CMSH/0000/IDTL`                                    |
//! | Component | `CMPT/0000/{child}`                                 |
//! | Composite | `CPST/0000/{children...}`                           |
//! | Detail    | `DTAL/0000/CPST{broad, fine}`                       |

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::IndexedTriangleList;
use crate::error::Result;
use crate::iff::Iff;

/// Bounding sphere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxExtent {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoxExtent {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_and_scale(center: Vec3, half_size: Vec3) -> Self {
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    /// Smallest box enclosing every point; `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_size(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grow to also enclose `other`.
    pub fn expand(&mut self, other: &BoxExtent) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// The sphere stored alongside the box on disk.
    pub fn bounding_sphere(&self) -> Sphere {
        Sphere {
            center: self.center(),
            radius: self.half_size().length(),
        }
    }
}

/// Bounding/collision volume tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Extent {
    #[default]
    Null,
    Sphere(Sphere),
    Box(BoxExtent),
    Cylinder {
        base: Vec3,
        radius: f32,
        height: f32,
    },
    Mesh(IndexedTriangleList),
    /// Exactly one nested extent (normally a composite).
    Component(Box<Extent>),
    Composite(Vec<Extent>),
    /// Broad-phase plus fine extent.
    Detail {
        broad: Box<Extent>,
        fine: Box<Extent>,
    },
}

impl Extent {
    pub fn is_null(&self) -> bool {
        matches!(self, Extent::Null)
    }

    /// Axis-aligned box around a point set, or `Null` when empty.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        BoxExtent::from_points(points).map_or(Extent::Null, Extent::Box)
    }

    /// Union `other` into this extent. Only box-to-box is supported.
    pub fn expand(&mut self, other: &Extent) {
        match (self, other) {
            (Extent::Box(this), Extent::Box(that)) => this.expand(that),
            (this, that) => tracing::warn!(
                "Cannot expand {} extent by {} extent",
                this.kind(),
                that.kind()
            ),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Extent::Null => "NULL",
            Extent::Sphere(_) => "EXSP",
            Extent::Box(_) => "EXBX",
            Extent::Cylinder { .. } => "XCYL",
            Extent::Mesh(_) => "CMSH",
            Extent::Component(_) => "CMPT",
            Extent::Composite(_) => "CPST",
            Extent::Detail { .. } => "DTAL",
        }
    }

    /// Decode the extent block at the cursor.
    pub fn read(iff: &mut Iff) -> Result<Self> {
        let tag = iff.current_name();
        match tag.as_str() {
            "NULL" => {
                iff.enter_form("NULL")?;
                iff.exit_form("NULL")?;
                Ok(Extent::Null)
            }
            "EXSP" => {
                iff.enter_form("EXSP")?;
                let sphere = read_sphere_body(iff)?;
                iff.exit_form("EXSP")?;
                Ok(Extent::Sphere(sphere))
            }
            "EXBX" => {
                iff.enter_form("EXBX")?;
                iff.enter_form("0001")?;
                // bounding sphere is derived from the box on write
                iff.enter_form("EXSP")?;
                read_sphere_body(iff)?;
                iff.exit_form("EXSP")?;
                iff.enter_chunk("BOX ")?;
                let max = iff.read_vec3()?;
                let min = iff.read_vec3()?;
                iff.exit_chunk("BOX ")?;
                iff.exit_form("0001")?;
                iff.exit_form("EXBX")?;
                Ok(Extent::Box(BoxExtent { min, max }))
            }
            "XCYL" => {
                iff.enter_form("XCYL")?;
                iff.enter_form("0000")?;
                iff.enter_chunk("CYLN")?;
                let base = iff.read_vec3()?;
                let radius = iff.read_f32()?;
                let height = iff.read_f32()?;
                iff.exit_chunk("CYLN")?;
                iff.exit_form("0000")?;
                iff.exit_form("XCYL")?;
                Ok(Extent::Cylinder {
                    base,
                    radius,
                    height,
                })
            }
            "CMSH" => {
                iff.enter_form("CMSH")?;
                iff.enter_form("0000")?;
                let mesh = IndexedTriangleList::read(iff)?;
                iff.exit_form("0000")?;
                iff.exit_form("CMSH")?;
                Ok(Extent::Mesh(mesh))
            }
            "CMPT" => {
                iff.enter_form("CMPT")?;
                iff.enter_form("0000")?;
                let child = Extent::read(iff)?;
                iff.exit_form("0000")?;
                iff.exit_form("CMPT")?;
                Ok(Extent::Component(Box::new(child)))
            }
            "CPST" => Ok(Extent::Composite(read_composite(iff)?)),
            "DTAL" => {
                iff.enter_form("DTAL")?;
                iff.enter_form("0000")?;
                let children = read_composite(iff)?;
                iff.exit_form("0000")?;
                iff.exit_form("DTAL")?;
                if children.len() != 2 {
                    tracing::warn!(
                        "Detail extent has {} children, expected 2 (broad, fine)",
                        children.len()
                    );
                }
                let mut children = children.into_iter();
                let broad = children.next().unwrap_or_default();
                let fine = children.next().unwrap_or_default();
                Ok(Extent::Detail {
                    broad: Box::new(broad),
                    fine: Box::new(fine),
                })
            }
            other => {
                tracing::warn!("Unhandled extent type: {other:?}, skipping");
                if !iff.at_end_of_form() {
                    iff.skip_block()?;
                }
                Ok(Extent::Null)
            }
        }
    }

    /// Encode; `None` is written as an explicit `NULL` form.
    pub fn write(extent: Option<&Extent>, iff: &mut Iff) -> Result<()> {
        match extent {
            Some(e) => e.write_to(iff),
            None => Extent::Null.write_to(iff),
        }
    }

    pub fn write_to(&self, iff: &mut Iff) -> Result<()> {
        match self {
            Extent::Null => {
                iff.insert_form("NULL", true)?;
                iff.exit_form("NULL")?;
            }
            Extent::Sphere(sphere) => write_sphere(iff, sphere)?,
            Extent::Box(bx) => {
                iff.insert_form("EXBX", true)?;
                iff.insert_form("0001", true)?;
                write_sphere(iff, &bx.bounding_sphere())?;
                iff.insert_chunk("BOX ", true)?;
                iff.insert_vec3(bx.max)?;
                iff.insert_vec3(bx.min)?;
                iff.exit_chunk("BOX ")?;
                iff.exit_form("0001")?;
                iff.exit_form("EXBX")?;
            }
            Extent::Cylinder {
                base,
                radius,
                height,
            } => {
                iff.insert_form("XCYL", true)?;
                iff.insert_form("0000", true)?;
                iff.insert_chunk("CYLN", true)?;
                iff.insert_vec3(*base)?;
                iff.insert_f32(*radius)?;
                iff.insert_f32(*height)?;
                iff.exit_chunk("CYLN")?;
                iff.exit_form("0000")?;
                iff.exit_form("XCYL")?;
            }
            Extent::Mesh(mesh) => {
                iff.insert_form("CMSH", true)?;
                iff.insert_form("0000", true)?;
                mesh.write(iff)?;
                iff.exit_form("0000")?;
                iff.exit_form("CMSH")?;
            }
            Extent::Component(child) => {
                iff.insert_form("CMPT", true)?;
                iff.insert_form("0000", true)?;
                child.write_to(iff)?;
                iff.exit_form("0000")?;
                iff.exit_form("CMPT")?;
            }
            Extent::Composite(children) => write_composite(iff, children.iter())?,
            Extent::Detail { broad, fine } => {
                iff.insert_form("DTAL", true)?;
                iff.insert_form("0000", true)?;
                write_composite(iff, [broad.as_ref(), fine.as_ref()].into_iter())?;
                iff.exit_form("0000")?;
                iff.exit_form("DTAL")?;
            }
        }
        Ok(())
    }
}

fn read_sphere_body(iff: &mut Iff) -> Result<Sphere> {
    iff.enter_form("0001")?;
    iff.enter_chunk("SPHR")?;
    let center = iff.read_vec3()?;
    let radius = iff.read_f32()?;
    iff.exit_chunk("SPHR")?;
    iff.exit_form("0001")?;
    Ok(Sphere { center, radius })
}

fn write_sphere(iff: &mut Iff, sphere: &Sphere) -> Result<()> {
    iff.insert_form("EXSP", true)?;
    iff.insert_form("0001", true)?;
    iff.insert_chunk("SPHR", true)?;
    iff.insert_vec3(sphere.center)?;
    iff.insert_f32(sphere.radius)?;
    iff.exit_chunk("SPHR")?;
    iff.exit_form("0001")?;
    iff.exit_form("EXSP")?;
    Ok(())
}

fn read_composite(iff: &mut Iff) -> Result<Vec<Extent>> {
    iff.enter_form("CPST")?;
    iff.enter_form("0000")?;
    let mut children = Vec::new();
    while !iff.at_end_of_form() {
        children.push(Extent::read(iff)?);
    }
    iff.exit_form("0000")?;
    iff.exit_form("CPST")?;
    Ok(children)
}

fn write_composite<'a>(iff: &mut Iff, children: impl Iterator<Item = &'a Extent>) -> Result<()> {
    iff.insert_form("CPST", true)?;
    iff.insert_form("0000", true)?;
    for child in children {
        child.write_to(iff)?;
    }
    iff.exit_form("0000")?;
    iff.exit_form("CPST")?;
    Ok(())
}
