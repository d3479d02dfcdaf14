//! Cells, their portal references and lights

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::common::{Extent, Hardpoint, check_version};
use crate::iff::Iff;

const LIGHT_RECORD_SIZE: usize = 93;

/// A cell's use of one building portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalData {
    pub disabled: bool,
    pub passable: bool,
    /// Index into the building's portal list.
    pub id: i32,
    /// Whether this cell owns the portal's outward winding.
    pub clockwise: bool,
    /// Cell on the other side, -1 until resolved.
    pub connecting_cell: i32,
    pub door_style: Option<String>,
    pub door_hardpoint: Option<[f32; 12]>,
}

impl PortalData {
    pub fn new(id: i32, passable: bool) -> Self {
        Self {
            disabled: false,
            passable,
            id,
            clockwise: true,
            connecting_cell: -1,
            door_style: None,
            door_hardpoint: None,
        }
    }

    fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("PRTL")?;
        let version = iff.current_name();
        check_version("PRTL", &version, &["0005"])?;
        iff.enter_form("0005")?;
        iff.enter_chunk("DATA")?;
        let disabled = iff.read_bool8()?;
        let passable = iff.read_bool8()?;
        let id = iff.read_i32()?;
        let clockwise = iff.read_bool8()?;
        let connecting_cell = iff.read_i32()?;
        let door_style = iff.read_string()?;
        let has_hardpoint = iff.read_bool8()?;
        let transform = iff.read_floats::<12>()?;
        iff.exit_chunk("DATA")?;
        iff.exit_form("0005")?;
        iff.exit_form("PRTL")?;
        Ok(Self {
            disabled,
            passable,
            id,
            clockwise,
            connecting_cell,
            door_style: (!door_style.is_empty()).then_some(door_style),
            door_hardpoint: has_hardpoint.then_some(transform),
        })
    }

    fn write(&self, iff: &mut Iff) -> Result<()> {
        iff.insert_form("PRTL", true)?;
        iff.insert_form("0005", true)?;
        iff.insert_chunk("DATA", true)?;
        iff.insert_bool8(self.disabled)?;
        iff.insert_bool8(self.passable)?;
        iff.insert_i32(self.id)?;
        iff.insert_bool8(self.clockwise)?;
        iff.insert_i32(self.connecting_cell)?;
        iff.insert_string(self.door_style.as_deref().unwrap_or_default())?;
        iff.insert_bool8(self.door_hardpoint.is_some())?;
        iff.insert_floats(&self.door_hardpoint.unwrap_or(Hardpoint::IDENTITY))?;
        iff.exit_chunk("DATA")?;
        iff.exit_form("0005")?;
        iff.exit_form("PRTL")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub light_type: u8,
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub transform: [f32; 12],
    /// Constant, linear, quadratic.
    pub attenuation: [f32; 3],
}

/// One room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
    pub can_see_parent_cell: bool,
    /// Appearance reference (`.msh`, `.lod` or `.apt`).
    pub appearance: String,
    pub floor: Option<String>,
    pub collision: Extent,
    pub portals: Vec<PortalData>,
    pub lights: Vec<Light>,
}

impl Cell {
    pub(super) fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("CELL")?;
        let version = iff.current_name();
        check_version("CELL", &version, &["0005"])?;
        iff.enter_form("0005")?;

        iff.enter_chunk("DATA")?;
        let portal_count = iff.read_i32()?.max(0) as usize;
        let can_see_parent_cell = iff.read_bool8()?;
        let name = iff.read_string()?;
        let appearance = iff.read_string()?;
        let floor = if iff.read_bool8()? {
            Some(iff.read_string()?)
        } else {
            None
        };
        iff.exit_chunk("DATA")?;

        let collision = Extent::read(iff)?;

        // each portal is at least a form header
        let portal_count = iff.checked_count(portal_count, 8)?;
        let mut portals = Vec::with_capacity(portal_count);
        for _ in 0..portal_count {
            portals.push(PortalData::read(iff)?);
        }

        let mut lights = Vec::new();
        if iff.current_name() == "LGHT" {
            iff.enter_chunk("LGHT")?;
            let count = iff.read_i32()?.max(0) as usize;
            let count = iff.checked_count(count, LIGHT_RECORD_SIZE)?;
            lights.reserve(count);
            for _ in 0..count {
                lights.push(Light {
                    light_type: iff.read_u8()?,
                    diffuse: iff.read_floats::<4>()?,
                    specular: iff.read_floats::<4>()?,
                    transform: iff.read_floats::<12>()?,
                    attenuation: iff.read_floats::<3>()?,
                });
            }
            iff.exit_chunk("LGHT")?;
        }

        iff.exit_form("0005")?;
        iff.exit_form("CELL")?;
        Ok(Self {
            name,
            can_see_parent_cell,
            appearance,
            floor,
            collision,
            portals,
            lights,
        })
    }

    pub(super) fn write(&self, iff: &mut Iff) -> Result<()> {
        iff.insert_form("CELL", true)?;
        iff.insert_form("0005", true)?;

        iff.insert_chunk("DATA", true)?;
        iff.insert_i32(self.portals.len() as i32)?;
        iff.insert_bool8(self.can_see_parent_cell)?;
        iff.insert_string(&self.name)?;
        iff.insert_string(&self.appearance)?;
        iff.insert_bool8(self.floor.is_some())?;
        if let Some(floor) = &self.floor {
            iff.insert_string(floor)?;
        }
        iff.exit_chunk("DATA")?;

        self.collision.write_to(iff)?;

        for portal in &self.portals {
            portal.write(iff)?;
        }

        iff.insert_chunk("LGHT", true)?;
        iff.insert_i32(self.lights.len() as i32)?;
        for light in &self.lights {
            iff.insert_u8(light.light_type)?;
            iff.insert_floats(&light.diffuse)?;
            iff.insert_floats(&light.specular)?;
            iff.insert_floats(&light.transform)?;
            iff.insert_floats(&light.attenuation)?;
        }
        iff.exit_chunk("LGHT")?;

        iff.exit_form("0005")?;
        iff.exit_form("CELL")?;
        Ok(())
    }

    /// Whether any of this cell's portals uses building portal `id`.
    pub fn uses_portal(&self, id: i32) -> bool {
        self.portals.iter().any(|p| p.id == id)
    }
}
