//! Navigation path graphs
//!
//! A [`PathGraph`] is a list of typed nodes plus directed edges between node
//! indices. Each undirected connection is stored as two directed edges.
//! Floors carry a cell graph built from their waypoints and portal edges
//! ([`floor`]); portal containers carry a building graph linking cells
//! through their portals ([`building`]).
//!
//! ```text
//! FORM PGRF / FORM 0001
//!   META   i32 graph type
//!   PNOD   i32 n, (i32 index, i32 id, i32 key, i32 type, vec3 pos, f32 radius)*
//!   PEDG   i32 n, (i32 a, i32 b, f32 width right, f32 width left)*
//!   ECNT   i32 n, i32 outgoing edge count per node
//!   ESTR   i32 n, i32 first outgoing edge per node
//! ```

pub mod building;
pub mod floor;
pub mod geometry;

use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::common::check_version;
use crate::iff::Iff;

/// `PNOD` record: index, id, key, type, position, radius.
const NODE_RECORD_SIZE: usize = 32;
const EDGE_RECORD_SIZE: usize = 16;

/// What a node stands for. Discriminants are the on-disk values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum PathNodeType {
    CellPortal = 0,
    CellWaypoint = 1,
    CellPoi = 2,
    BuildingEntrance = 3,
    BuildingCell = 4,
    BuildingPortal = 5,
    CityBuildingEntrance = 6,
    CityWaypoint = 7,
    CityPoi = 8,
    CityBuilding = 9,
    CityEntrance = 10,
    BuildingCellPart = 11,
    Invalid = 12,
}

impl PathNodeType {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::CellPortal,
            1 => Self::CellWaypoint,
            2 => Self::CellPoi,
            3 => Self::BuildingEntrance,
            4 => Self::BuildingCell,
            5 => Self::BuildingPortal,
            6 => Self::CityBuildingEntrance,
            7 => Self::CityWaypoint,
            8 => Self::CityPoi,
            9 => Self::CityBuilding,
            10 => Self::CityEntrance,
            11 => Self::BuildingCellPart,
            12 => Self::Invalid,
            other => {
                tracing::warn!("Unknown path node type {other}, treating as invalid");
                Self::Invalid
            }
        }
    }
}

/// Scope of a whole graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum PathGraphType {
    #[default]
    Cell = 0,
    Building = 1,
    City = 2,
    None = 3,
}

impl PathGraphType {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Cell,
            1 => Self::Building,
            2 => Self::City,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathGraphNode {
    /// Position in the node array.
    pub index: i32,
    pub id: i32,
    /// Portal or cell id for portal/cell nodes, otherwise -1.
    pub key: i32,
    pub node_type: PathNodeType,
    pub position: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PathGraphEdge {
    pub a: i32,
    pub b: i32,
    pub width_right: f32,
    pub width_left: f32,
}

impl PathGraphEdge {
    pub const fn new(a: i32, b: i32) -> Self {
        Self {
            a,
            b,
            width_right: 0.0,
            width_left: 0.0,
        }
    }

    /// Node pair with the smaller index first.
    pub fn unordered(&self) -> (i32, i32) {
        (self.a.min(self.b), self.a.max(self.b))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathGraph {
    pub graph_type: PathGraphType,
    pub nodes: Vec<PathGraphNode>,
    pub edges: Vec<PathGraphEdge>,
}

impl PathGraph {
    pub fn new(graph_type: PathGraphType) -> Self {
        Self {
            graph_type,
            ..Self::default()
        }
    }

    /// Append a node and return its index.
    pub fn add_node(&mut self, node_type: PathNodeType, position: Vec3, radius: f32, key: i32) -> i32 {
        let index = self.nodes.len() as i32;
        self.nodes.push(PathGraphNode {
            index,
            id: index,
            key,
            node_type,
            position,
            radius,
        });
        index
    }

    /// Add `a -> b` and `b -> a`.
    pub fn connect(&mut self, a: i32, b: i32) {
        self.edges.push(PathGraphEdge::new(a, b));
        self.edges.push(PathGraphEdge::new(b, a));
    }

    pub fn node(&self, index: i32) -> Option<&PathGraphNode> {
        usize::try_from(index).ok().and_then(|i| self.nodes.get(i))
    }

    pub fn nodes_of_type(&self, node_type: PathNodeType) -> impl Iterator<Item = &PathGraphNode> {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    /// Whether an edge `a -> b` exists.
    pub fn has_edge(&self, a: i32, b: i32) -> bool {
        self.edges.iter().any(|e| e.a == a && e.b == b)
    }

    /// Average node position, or the origin for an empty graph.
    pub fn average_position(&self) -> Vec3 {
        if self.nodes.is_empty() {
            return Vec3::ZERO;
        }
        self.nodes.iter().map(|n| n.position).sum::<Vec3>() / self.nodes.len() as f32
    }

    /// Remove the longer of every two edges that leave a shared node less
    /// than `max_angle_degrees` apart. Returns the number of connections
    /// removed.
    pub fn prune_redundant_edges(&mut self, max_angle_degrees: f32) -> usize {
        let max_angle = max_angle_degrees.to_radians();

        // first-seen order decides which of two candidates is examined first
        let mut seen = HashSet::new();
        let keys: Vec<(i32, i32)> = self
            .edges
            .iter()
            .map(PathGraphEdge::unordered)
            .filter(|key| key.0 != key.1 && seen.insert(*key))
            .collect();

        let mut removed: HashSet<(i32, i32)> = HashSet::new();
        for x in 0..keys.len() {
            for y in (x + 1)..keys.len() {
                let (e1, e2) = (keys[x], keys[y]);
                if removed.contains(&e1) || removed.contains(&e2) {
                    continue;
                }
                let Some((shared, o1, o2)) = shared_endpoint(e1, e2) else {
                    continue;
                };
                let (Some(s), Some(p1), Some(p2)) = (self.node(shared), self.node(o1), self.node(o2))
                else {
                    continue;
                };
                let v1 = p1.position - s.position;
                let v2 = p2.position - s.position;
                let angle = v1.angle_between(v2);
                if angle < max_angle {
                    let longer = if v2.length() >= v1.length() { e2 } else { e1 };
                    tracing::debug!(
                        "Pruning edge {longer:?}: {:.1} degrees from its neighbour",
                        angle.to_degrees()
                    );
                    removed.insert(longer);
                }
            }
        }

        self.edges.retain(|e| !removed.contains(&e.unordered()));
        removed.len()
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        iff.enter_form("PGRF")?;
        let version = iff.current_name();
        check_version("PGRF", &version, &["0001"])?;
        iff.enter_form("0001")?;

        iff.enter_chunk("META")?;
        let graph_type = PathGraphType::from_i32(iff.read_i32()?);
        iff.exit_chunk("META")?;

        iff.enter_chunk("PNOD")?;
        let count = iff.read_i32()?.max(0) as usize;
        let count = iff.checked_count(count, NODE_RECORD_SIZE)?;
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(PathGraphNode {
                index: iff.read_i32()?,
                id: iff.read_i32()?,
                key: iff.read_i32()?,
                node_type: PathNodeType::from_i32(iff.read_i32()?),
                position: iff.read_vec3()?,
                radius: iff.read_f32()?,
            });
        }
        iff.exit_chunk("PNOD")?;

        iff.enter_chunk("PEDG")?;
        let count = iff.read_i32()?.max(0) as usize;
        let count = iff.checked_count(count, EDGE_RECORD_SIZE)?;
        let mut edges = Vec::with_capacity(count);
        for _ in 0..count {
            edges.push(PathGraphEdge {
                a: iff.read_i32()?,
                b: iff.read_i32()?,
                width_right: iff.read_f32()?,
                width_left: iff.read_f32()?,
            });
        }
        iff.exit_chunk("PEDG")?;

        // ECNT / ESTR are derived from the edge list
        while !iff.at_end_of_form() {
            iff.skip_block()?;
        }

        iff.exit_form("0001")?;
        iff.exit_form("PGRF")?;
        Ok(Self {
            graph_type,
            nodes,
            edges,
        })
    }

    /// Edges are written grouped by source node so the `ECNT`/`ESTR` tables
    /// can index them.
    pub fn write(&self, iff: &mut Iff) -> Result<()> {
        let mut edges = self.edges.clone();
        edges.sort_by_key(|e| e.a);

        iff.insert_form("PGRF", true)?;
        iff.insert_form("0001", true)?;

        iff.insert_chunk("META", true)?;
        iff.insert_i32(self.graph_type as i32)?;
        iff.exit_chunk("META")?;

        iff.insert_chunk("PNOD", true)?;
        iff.insert_i32(self.nodes.len() as i32)?;
        for node in &self.nodes {
            iff.insert_i32(node.index)?;
            iff.insert_i32(node.id)?;
            iff.insert_i32(node.key)?;
            iff.insert_i32(node.node_type as i32)?;
            iff.insert_vec3(node.position)?;
            iff.insert_f32(node.radius)?;
        }
        iff.exit_chunk("PNOD")?;

        iff.insert_chunk("PEDG", true)?;
        iff.insert_i32(edges.len() as i32)?;
        for edge in &edges {
            iff.insert_i32(edge.a)?;
            iff.insert_i32(edge.b)?;
            iff.insert_f32(edge.width_right)?;
            iff.insert_f32(edge.width_left)?;
        }
        iff.exit_chunk("PEDG")?;

        let (counts, starts) = edge_tables(self.nodes.len(), &edges);

        iff.insert_chunk("ECNT", true)?;
        iff.insert_i32(counts.len() as i32)?;
        for c in counts {
            iff.insert_i32(c)?;
        }
        iff.exit_chunk("ECNT")?;

        iff.insert_chunk("ESTR", true)?;
        iff.insert_i32(starts.len() as i32)?;
        for s in starts {
            iff.insert_i32(s)?;
        }
        iff.exit_chunk("ESTR")?;

        iff.exit_form("0001")?;
        iff.exit_form("PGRF")?;
        Ok(())
    }
}

/// Per-node outgoing edge count and first edge index (-1 when none), for
/// edges sorted by source node.
fn edge_tables(node_count: usize, edges: &[PathGraphEdge]) -> (Vec<i32>, Vec<i32>) {
    let mut counts = vec![0; node_count];
    let mut starts = vec![-1; node_count];
    for (i, edge) in edges.iter().enumerate() {
        let Ok(a) = usize::try_from(edge.a) else {
            continue;
        };
        if a >= node_count {
            tracing::warn!("Edge {i} starts at missing node {}", edge.a);
            continue;
        }
        if starts[a] < 0 {
            starts[a] = i as i32;
        }
        counts[a] += 1;
    }
    (counts, starts)
}

/// `(shared, other of first, other of second)` when two node pairs share
/// exactly one endpoint.
fn shared_endpoint(e1: (i32, i32), e2: (i32, i32)) -> Option<(i32, i32, i32)> {
    if e1 == e2 {
        return None;
    }
    if e1.0 == e2.0 {
        Some((e1.0, e1.1, e2.1))
    } else if e1.0 == e2.1 {
        Some((e1.0, e1.1, e2.0))
    } else if e1.1 == e2.0 {
        Some((e1.1, e1.0, e2.1))
    } else if e1.1 == e2.1 {
        Some((e1.1, e1.0, e2.0))
    } else {
        None
    }
}
