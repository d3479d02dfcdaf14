//! `.flr` walkable floor format (`FORM FLOR`)
//!
//! ```text
//! FORM FLOR / FORM 0005|0006
//!   VERT   i32 n, vec3*
//!   TRIS   i32 n, 60-byte triangle records
//!   [FORM BTRE]          spatial tree, kept opaque
//!   [BEDG] i32 n, (i32 triangle, i32 edge, i8 crossable)*
//!   [FORM PGRF]          cell path graph
//! ```

mod triangle;

pub use triangle::{EdgeType, FloorTriangle};

use std::collections::HashMap;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::FloorSettings;
use crate::error::Result;
use crate::formats::common::check_version;
use crate::iff::Iff;
use crate::pathgraph::floor::{self as pipeline, FloorGeometry};
use crate::pathgraph::geometry::triangle_normal;
use crate::pathgraph::{PathGraph, PathGraphType, PathNodeType};

pub const SUPPORTED_VERSIONS: &[&str] = &["0005", "0006"];

pub const WRITE_VERSION: &str = "0006";

const TRIANGLE_RECORD_SIZE: usize = 60;

/// One edge on the floor's outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryEdge {
    pub triangle: i32,
    pub edge: i32,
    pub crossable: bool,
}

/// Outcome of [`FloorFile::build_path_graph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathGraphReport {
    pub portal_nodes: usize,
    pub connections: usize,
    pub pruned: usize,
    pub unconnected_portals: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloorFile {
    pub verts: Vec<Vec3>,
    pub tris: Vec<FloorTriangle>,
    /// Whole `BTRE` form, kept byte-for-byte.
    pub box_tree: Option<Vec<u8>>,
    pub boundary_edges: Option<Vec<BoundaryEdge>>,
    pub path_graph: Option<PathGraph>,
}

impl FloorFile {
    pub fn new(verts: Vec<Vec3>, tris: Vec<FloorTriangle>) -> Self {
        Self {
            verts,
            tris,
            ..Self::default()
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut iff = Iff::open(path.as_ref())?;
        tracing::info!("Loading floor {}", path.as_ref().display());
        Self::read(&mut iff)
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("FLOR")?;
        let version = iff.current_name();
        check_version("FLOR", &version, SUPPORTED_VERSIONS)?;
        iff.enter_form(&version)?;

        let mut floor = Self::default();

        iff.enter_chunk("VERT")?;
        let count = iff.read_i32()?.max(0) as usize;
        let count = iff.checked_count(count, 12)?;
        floor.verts.reserve(count);
        for _ in 0..count {
            floor.verts.push(iff.read_vec3()?);
        }
        iff.exit_chunk("VERT")?;

        iff.enter_chunk("TRIS")?;
        let count = iff.read_i32()?.max(0) as usize;
        let count = iff.checked_count(count, TRIANGLE_RECORD_SIZE)?;
        floor.tris.reserve(count);
        for _ in 0..count {
            floor.tris.push(FloorTriangle::read(iff)?);
        }
        iff.exit_chunk("TRIS")?;

        while !iff.at_end_of_form() {
            match iff.current_name().as_str() {
                "BTRE" => floor.box_tree = Some(iff.read_block_raw()?),
                "BEDG" => {
                    iff.enter_chunk("BEDG")?;
                    let count = iff.read_i32()?.max(0) as usize;
                    let count = iff.checked_count(count, 9)?;
                    let mut edges = Vec::with_capacity(count);
                    for _ in 0..count {
                        edges.push(BoundaryEdge {
                            triangle: iff.read_i32()?,
                            edge: iff.read_i32()?,
                            crossable: iff.read_i8()? != 0,
                        });
                    }
                    iff.exit_chunk("BEDG")?;
                    floor.boundary_edges = Some(edges);
                }
                "PGRF" => floor.path_graph = Some(PathGraph::read(iff)?),
                other => {
                    tracing::warn!("Skipping unknown FLOR block {other:?}");
                    iff.skip_block()?;
                }
            }
        }

        iff.exit_form(&version)?;
        iff.exit_form("FLOR")?;
        tracing::debug!(
            "FLOR {version}: {} verts, {} tris, path graph: {}",
            floor.verts.len(),
            floor.tris.len(),
            floor.path_graph.is_some()
        );
        Ok(floor)
    }

    pub fn to_iff(&self) -> Result<Iff> {
        let mut iff = Iff::new(16 + self.verts.len() * 12 + self.tris.len() * 60);
        iff.insert_form("FLOR", true)?;
        iff.insert_form(WRITE_VERSION, true)?;

        iff.insert_chunk("VERT", true)?;
        iff.insert_i32(self.verts.len() as i32)?;
        for &v in &self.verts {
            iff.insert_vec3(v)?;
        }
        iff.exit_chunk("VERT")?;

        iff.insert_chunk("TRIS", true)?;
        iff.insert_i32(self.tris.len() as i32)?;
        for tri in &self.tris {
            tri.write(&mut iff)?;
        }
        iff.exit_chunk("TRIS")?;

        if let Some(blob) = &self.box_tree {
            iff.insert_iff_data(blob)?;
        }

        if let Some(edges) = &self.boundary_edges {
            iff.insert_chunk("BEDG", true)?;
            iff.insert_i32(edges.len() as i32)?;
            for e in edges {
                iff.insert_i32(e.triangle)?;
                iff.insert_i32(e.edge)?;
                iff.insert_i8(i8::from(e.crossable))?;
            }
            iff.exit_chunk("BEDG")?;
        }

        if let Some(graph) = &self.path_graph {
            graph.write(&mut iff)?;
        }

        iff.exit_form(WRITE_VERSION)?;
        iff.exit_form("FLOR")?;
        Ok(iff)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_iff()?.write(path)
    }

    pub fn geometry(&self, tolerance: f32) -> FloorGeometry<'_> {
        FloorGeometry::new(&self.verts, &self.tris, tolerance)
    }

    /// Set each triangle's neighbours from shared corner pairs. Edges not
    /// shared by exactly two triangles stay boundaries (-1).
    pub fn link_neighbors(&mut self) {
        let mut by_edge: HashMap<(i32, i32), Vec<(usize, usize)>> = HashMap::new();
        for (t, tri) in self.tris.iter().enumerate() {
            for e in 0..3 {
                let (a, b) = (tri.corners[e], tri.corners[(e + 1) % 3]);
                by_edge.entry((a.min(b), a.max(b))).or_default().push((t, e));
            }
        }
        for tri in &mut self.tris {
            tri.neighbors = [-1; 3];
        }
        for (key, sides) in by_edge {
            match sides[..] {
                [(t1, e1), (t2, e2)] => {
                    let (i1, i2) = (self.tris[t1].index, self.tris[t2].index);
                    self.tris[t1].neighbors[e1] = i2;
                    self.tris[t2].neighbors[e2] = i1;
                }
                [_] => {}
                _ => tracing::warn!(
                    "Floor edge {key:?} is shared by {} triangles, left unlinked",
                    sides.len()
                ),
            }
        }
    }

    /// Recompute every triangle normal from its corners.
    pub fn recompute_normals(&mut self) {
        let geometry = FloorGeometry::new(&self.verts, &self.tris, 0.0);
        let normals: Vec<Vec3> = self
            .tris
            .iter()
            .map(|t| {
                let [a, b, c] = geometry.corners(t);
                triangle_normal(a, b, c)
            })
            .collect();
        for (tri, n) in self.tris.iter_mut().zip(normals) {
            tri.normal = n;
        }
    }

    /// Outline edges (no neighbour), crossable unless marked uncrossable.
    pub fn derive_boundary_edges(&self) -> Vec<BoundaryEdge> {
        self.tris
            .iter()
            .flat_map(|t| {
                (0..3).filter(|&e| t.neighbors[e] < 0).map(move |e| BoundaryEdge {
                    triangle: t.index,
                    edge: e as i32,
                    crossable: t.edge_types[e] != EdgeType::Uncrossable,
                })
            })
            .collect()
    }

    /// Build the cell path graph from caller-placed waypoints
    /// (`(position, radius)`) and the floor's portal-tagged edges.
    ///
    /// `global_portal_ids` maps local portal indices to building portal ids.
    pub fn build_path_graph(
        &mut self,
        waypoints: &[(Vec3, f32)],
        global_portal_ids: &[i32],
        settings: &FloorSettings,
    ) -> PathGraphReport {
        let mut graph = PathGraph::new(PathGraphType::Cell);
        for &(position, radius) in waypoints {
            graph.add_node(PathNodeType::CellWaypoint, position, radius, -1);
        }

        let geometry = self.geometry(settings.containment_tolerance);
        let report = PathGraphReport {
            portal_nodes: pipeline::add_portal_nodes(&mut graph, &geometry, global_portal_ids),
            connections: pipeline::make_waypoint_connections(&mut graph, &geometry),
            pruned: graph.prune_redundant_edges(settings.prune_angle_degrees),
            unconnected_portals: pipeline::add_portal_edges(&mut graph, &geometry),
        };
        graph.edges.sort_by_key(|e| (e.a, e.b));
        tracing::info!(
            "Floor path graph: {} nodes, {} edges ({} pruned, {} unconnected portals)",
            graph.nodes.len(),
            graph.edges.len(),
            report.pruned,
            report.unconnected_portals
        );
        self.path_graph = Some(graph);
        report
    }
}
