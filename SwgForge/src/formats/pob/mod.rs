//! `.pob` portal container (`FORM PRTO`)
//!
//! ```text
//! FORM PRTO / FORM 0003|0004
//!   DATA        i32 portal count, i32 cell count
//!   FORM PRTS   IDTL per portal (0004), PRTL polygon chunks (0003)
//!   FORM CELS   FORM CELL per cell
//!   [FORM PGRF] building path graph
//!   [CRC ]      u32 identity checksum, always last
//! ```

mod cell;

pub use cell::{Cell, Light, PortalData};

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::asset_root::AssetRoot;
use crate::error::{Error, Result};
use crate::formats::common::{IndexedTriangleList, check_version};
use crate::formats::flr::FloorFile;
use crate::iff::Iff;
use crate::pathgraph::PathGraph;
use crate::pathgraph::building::{build_building_graph, resolve_portal_connections};

pub const SUPPORTED_VERSIONS: &[&str] = &["0003", "0004"];

pub const WRITE_VERSION: &str = "0004";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalContainer {
    /// Shared portal geometry, indexed by portal id.
    pub portals: Vec<IndexedTriangleList>,
    pub cells: Vec<Cell>,
    pub path_graph: Option<PathGraph>,
    /// Checksum read from an existing file.
    pub crc: Option<u32>,
}

impl PortalContainer {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut iff = Iff::open(path.as_ref())?;
        tracing::info!("Loading portal container {}", path.as_ref().display());
        Self::read(&mut iff)
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("PRTO")?;
        let version = iff.current_name();
        check_version("PRTO", &version, SUPPORTED_VERSIONS)?;
        iff.enter_form(&version)?;

        iff.enter_chunk("DATA")?;
        let portal_count = iff.read_i32()?.max(0) as usize;
        let cell_count = iff.read_i32()?.max(0) as usize;
        iff.exit_chunk("DATA")?;

        let mut container = Self::default();

        iff.enter_form("PRTS")?;
        for _ in 0..portal_count {
            let portal = if version == "0003" {
                read_polygon(iff)?
            } else {
                IndexedTriangleList::read(iff)?
            };
            container.portals.push(portal);
        }
        iff.exit_form("PRTS")?;

        iff.enter_form("CELS")?;
        for _ in 0..cell_count {
            container.cells.push(Cell::read(iff)?);
        }
        iff.exit_form("CELS")?;

        while !iff.at_end_of_form() {
            match iff.current_name().as_str() {
                "PGRF" => container.path_graph = Some(PathGraph::read(iff)?),
                "CRC " => {
                    iff.enter_chunk("CRC ")?;
                    container.crc = Some(iff.read_u32()?);
                    iff.exit_chunk("CRC ")?;
                }
                other => {
                    tracing::warn!("Skipping unknown PRTO block {other:?}");
                    iff.skip_block()?;
                }
            }
        }

        iff.exit_form(&version)?;
        iff.exit_form("PRTO")?;
        tracing::debug!(
            "PRTO {version}: {} portals, {} cells",
            container.portals.len(),
            container.cells.len()
        );
        Ok(container)
    }

    /// Encode at version `0004`. With `use_imported_crc` the loaded
    /// checksum is written back; otherwise a fresh one is computed over
    /// everything before the `CRC ` chunk.
    pub fn to_iff(&self, use_imported_crc: bool) -> Result<Iff> {
        if use_imported_crc && self.crc.is_none() {
            tracing::error!("Asked to keep the imported CRC, but none was loaded");
            return Err(Error::IdentityUnavailable);
        }

        let mut iff = Iff::new(1024);
        iff.insert_form("PRTO", true)?;
        iff.insert_form(WRITE_VERSION, true)?;

        iff.insert_chunk("DATA", true)?;
        iff.insert_i32(self.portals.len() as i32)?;
        iff.insert_i32(self.cells.len() as i32)?;
        iff.exit_chunk("DATA")?;

        iff.insert_form("PRTS", true)?;
        for portal in &self.portals {
            portal.write(&mut iff)?;
        }
        iff.exit_form("PRTS")?;

        iff.insert_form("CELS", true)?;
        for cell in &self.cells {
            cell.write(&mut iff)?;
        }
        iff.exit_form("CELS")?;

        if let Some(graph) = &self.path_graph {
            graph.write(&mut iff)?;
        }

        let crc = match self.crc {
            Some(crc) if use_imported_crc => crc,
            _ => iff.calculate(),
        };
        tracing::debug!("PRTO CRC {crc:#010x}");
        iff.insert_chunk("CRC ", true)?;
        iff.insert_u32(crc)?;
        iff.exit_chunk("CRC ")?;

        iff.exit_form(WRITE_VERSION)?;
        iff.exit_form("PRTO")?;
        Ok(iff)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P, use_imported_crc: bool) -> Result<()> {
        self.to_iff(use_imported_crc)?.write(path)
    }

    /// Resolve every cell's portal partner and replace the building path
    /// graph. `floor_graphs[i]` is cell `i`'s floor graph, if any.
    pub fn assemble_building_graph(&mut self, floor_graphs: &[Option<&PathGraph>]) -> Result<()> {
        resolve_portal_connections(&mut self.cells)?;
        self.path_graph = Some(build_building_graph(&self.portals, &self.cells, floor_graphs));
        Ok(())
    }

    /// Load each cell's floor graph from under `root`. Cells without a
    /// floor, or whose floor is missing or has no graph, yield `None`.
    pub fn load_floor_graphs(&self, root: &AssetRoot) -> Vec<Option<PathGraph>> {
        self.cells
            .iter()
            .map(|cell| {
                let path = root.find_optional(cell.floor.as_deref()?)?;
                match FloorFile::load(&path) {
                    Ok(floor) => floor.path_graph,
                    Err(e) => {
                        tracing::warn!("Failed to read floor {}: {e}", path.display());
                        None
                    }
                }
            })
            .collect()
    }

    /// Index of the cell named `name`.
    pub fn cell_index(&self, name: &str) -> Option<usize> {
        self.cells.iter().position(|c| c.name == name)
    }
}

/// Version 0003 portal: `PRTL` chunk holding a convex polygon.
fn read_polygon(iff: &mut Iff) -> Result<IndexedTriangleList> {
    iff.enter_chunk("PRTL")?;
    let count = iff.read_i32()?.max(0) as usize;
    let count = iff.checked_count(count, 12)?;
    let mut verts: Vec<Vec3> = Vec::with_capacity(count);
    for _ in 0..count {
        verts.push(iff.read_vec3()?);
    }
    iff.exit_chunk("PRTL")?;
    Ok(IndexedTriangleList::from_polygon(verts))
}
