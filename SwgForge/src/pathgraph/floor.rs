//! Cell path graph construction over a floor mesh
//!
//! The pipeline run on export, in order: [`add_portal_nodes`],
//! [`make_waypoint_connections`], [`PathGraph::prune_redundant_edges`],
//! [`add_portal_edges`]. Waypoint nodes are supplied by the caller.

use std::collections::HashSet;

use glam::Vec3;
use rayon::prelude::*;

use super::geometry::{point_in_triangle, segment_crosses_edge};
use super::{PathGraph, PathNodeType};
use crate::formats::flr::{EdgeType, FloorTriangle};

/// Borrowed view of a floor's vertices and triangles.
#[derive(Debug, Clone, Copy)]
pub struct FloorGeometry<'a> {
    pub verts: &'a [Vec3],
    pub tris: &'a [FloorTriangle],
    /// Allowed distance outside a triangle for a node to rest on it.
    pub tolerance: f32,
}

impl<'a> FloorGeometry<'a> {
    pub fn new(verts: &'a [Vec3], tris: &'a [FloorTriangle], tolerance: f32) -> Self {
        Self {
            verts,
            tris,
            tolerance,
        }
    }

    fn vertex(&self, index: i32) -> Vec3 {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.verts.get(i))
            .copied()
            .unwrap_or_else(|| {
                tracing::warn!("Floor triangle references missing vertex {index}");
                Vec3::ZERO
            })
    }

    pub fn corners(&self, tri: &FloorTriangle) -> [Vec3; 3] {
        tri.corners.map(|c| self.vertex(c))
    }

    /// Endpoints of edge `edge` (corner `edge` to corner `edge + 1`).
    pub fn edge(&self, tri: &FloorTriangle, edge: usize) -> (Vec3, Vec3) {
        let c = self.corners(tri);
        (c[edge % 3], c[(edge + 1) % 3])
    }

    /// Index of the first triangle `p` rests on.
    pub fn containing_triangle(&self, p: Vec3) -> Option<usize> {
        self.tris.iter().position(|t| {
            let [a, b, c] = self.corners(t);
            point_in_triangle(p, a, b, c, self.tolerance)
        })
    }

    /// Two positions connect when both rest on the floor and the straight
    /// line between them crosses no uncrossable edge.
    pub fn do_nodes_connect(&self, a: Vec3, b: Vec3) -> bool {
        if self.containing_triangle(a).is_none() || self.containing_triangle(b).is_none() {
            return false;
        }
        for tri in self.tris {
            for edge in 0..3 {
                if tri.edge_types[edge] != EdgeType::Uncrossable {
                    continue;
                }
                let (p, q) = self.edge(tri, edge);
                if segment_crosses_edge(a, b, p, q) {
                    return false;
                }
            }
        }
        true
    }
}

/// One `CellPortal` node per distinct building portal touching this floor,
/// at the midpoint of the tagged edge. Triangles tagged on more than one
/// edge are ignored.
///
/// `global_portal_ids` maps the floor's local portal index to the
/// building-wide portal id. Returns the number of nodes added.
pub fn add_portal_nodes(graph: &mut PathGraph, floor: &FloorGeometry<'_>, global_portal_ids: &[i32]) -> usize {
    let mut seen: HashSet<i32> = graph
        .nodes_of_type(PathNodeType::CellPortal)
        .map(|n| n.key)
        .collect();
    let mut added = 0;
    for tri in floor.tris {
        let tagged: Vec<usize> = (0..3).filter(|&e| tri.portal_ids[e] >= 0).collect();
        let [edge] = tagged[..] else {
            continue;
        };
        let local = tri.portal_ids[edge];
        let Some(&global) = global_portal_ids.get(local as usize) else {
            tracing::warn!(
                "Floor triangle {} is tagged with local portal {local}, which has no building portal",
                tri.index
            );
            continue;
        };
        if !seen.insert(global) {
            continue;
        }
        let (p, q) = floor.edge(tri, edge);
        graph.add_node(PathNodeType::CellPortal, (p + q) * 0.5, 0.0, global);
        added += 1;
    }
    tracing::debug!("Added {added} portal nodes");
    added
}

/// Connect every pair of waypoints that can see each other across the
/// floor. Connectivity tests run in parallel. Returns the number of
/// connections made.
pub fn make_waypoint_connections(graph: &mut PathGraph, floor: &FloorGeometry<'_>) -> usize {
    let waypoints: Vec<(i32, Vec3)> = graph
        .nodes_of_type(PathNodeType::CellWaypoint)
        .map(|n| (n.index, n.position))
        .collect();

    let pairs: Vec<(usize, usize)> = (0..waypoints.len())
        .flat_map(|i| ((i + 1)..waypoints.len()).map(move |j| (i, j)))
        .collect();

    let connected: Vec<(i32, i32)> = pairs
        .par_iter()
        .filter(|&&(i, j)| floor.do_nodes_connect(waypoints[i].1, waypoints[j].1))
        .map(|&(i, j)| (waypoints[i].0, waypoints[j].0))
        .collect();

    for &(a, b) in &connected {
        graph.connect(a, b);
    }
    graph.edges.sort_by_key(|e| (e.a, e.b));
    tracing::debug!(
        "{} of {} waypoint pairs connect",
        connected.len(),
        pairs.len()
    );
    connected.len()
}

/// Link every portal node to its nearest connectable non-portal node.
///
/// Returns how many portal nodes found no partner.
pub fn add_portal_edges(graph: &mut PathGraph, floor: &FloorGeometry<'_>) -> usize {
    let portals: Vec<(i32, Vec3)> = graph
        .nodes_of_type(PathNodeType::CellPortal)
        .map(|n| (n.index, n.position))
        .collect();

    let mut unconnected = 0;
    for (portal, position) in portals {
        let mut candidates: Vec<(i32, Vec3, f32)> = graph
            .nodes
            .iter()
            .filter(|n| n.node_type != PathNodeType::CellPortal)
            .map(|n| (n.index, n.position, n.position.distance(position)))
            .collect();
        candidates.sort_by(|a, b| a.2.total_cmp(&b.2));

        match candidates
            .into_iter()
            .find(|&(_, p, _)| floor.do_nodes_connect(position, p))
        {
            Some((nearest, _, distance)) => {
                tracing::debug!("Portal node {portal} connects to node {nearest} at {distance:.2}");
                graph.connect(portal, nearest);
            }
            None => {
                tracing::warn!("Portal node {portal} has no reachable node");
                unconnected += 1;
            }
        }
    }
    if unconnected > 0 {
        tracing::warn!("{unconnected} portal nodes are unconnected");
    }
    unconnected
}
