//! Building-wide path graph over a portal container's cells

use glam::Vec3;

use super::{PathGraph, PathGraphType, PathNodeType};
use crate::error::{Error, Result};
use crate::formats::common::IndexedTriangleList;
use crate::formats::pob::Cell;

/// Fill in `connecting_cell` and `clockwise` for every cell portal.
///
/// Each portal id must be shared with exactly one other cell. The first
/// cell (by index) to reference a portal owns its clockwise winding.
pub fn resolve_portal_connections(cells: &mut [Cell]) -> Result<()> {
    let mut resolved = Vec::new();
    for (index, cell) in cells.iter().enumerate() {
        for (slot, portal) in cell.portals.iter().enumerate() {
            let partners: Vec<usize> = cells
                .iter()
                .enumerate()
                .filter(|&(other, c)| other != index && c.uses_portal(portal.id))
                .map(|(other, _)| other)
                .collect();
            let [partner] = partners[..] else {
                tracing::error!(
                    "Portal {} of cell {index} ({}) has {} partner cells",
                    portal.id,
                    cell.name,
                    partners.len()
                );
                return Err(Error::AmbiguousConnectivity {
                    portal: portal.id,
                    cell: index,
                    partners: partners.len(),
                });
            };
            resolved.push((index, slot, partner));
        }
    }
    for (index, slot, partner) in resolved {
        let portal = &mut cells[index].portals[slot];
        portal.connecting_cell = partner as i32;
        portal.clockwise = index < partner;
    }
    Ok(())
}

/// Build the `Building` graph: one node per portal, one per cell, and a
/// cell↔portal edge pair for every portal a cell references.
///
/// `floor_graphs[i]` is cell `i`'s already-built floor graph, if it has a
/// floor. Portals used by cell 0 become building entrances.
pub fn build_building_graph(
    portals: &[IndexedTriangleList],
    cells: &[Cell],
    floor_graphs: &[Option<&PathGraph>],
) -> PathGraph {
    let mut graph = PathGraph::new(PathGraphType::Building);

    let mut portal_nodes = Vec::with_capacity(portals.len());
    for (id, polygon) in portals.iter().enumerate() {
        let id = id as i32;
        let node_type = match cells.first() {
            Some(exterior) if exterior.uses_portal(id) => PathNodeType::BuildingEntrance,
            _ => PathNodeType::BuildingPortal,
        };
        portal_nodes.push(graph.add_node(node_type, polygon.centroid(), 0.0, id));
    }

    for (index, cell) in cells.iter().enumerate() {
        let position = floor_graphs
            .get(index)
            .copied()
            .flatten()
            .map(waypoint_center)
            .unwrap_or(Vec3::ZERO);
        let cell_node = graph.add_node(PathNodeType::BuildingCell, position, 0.0, index as i32);

        for portal in &cell.portals {
            match usize::try_from(portal.id).ok().and_then(|i| portal_nodes.get(i)) {
                Some(&portal_node) => graph.connect(cell_node, portal_node),
                None => tracing::warn!(
                    "Cell {index} references portal {} but the building has {} portals",
                    portal.id,
                    portals.len()
                ),
            }
        }
    }

    graph.edges.sort_by_key(|e| (e.a, e.b));
    tracing::debug!(
        "Building graph: {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );
    graph
}

/// Average of a floor graph's waypoints, falling back to all its nodes.
fn waypoint_center(floor: &PathGraph) -> Vec3 {
    let waypoints: Vec<Vec3> = floor
        .nodes_of_type(PathNodeType::CellWaypoint)
        .map(|n| n.position)
        .collect();
    if waypoints.is_empty() {
        floor.average_position()
    } else {
        waypoints.iter().copied().sum::<Vec3>() / waypoints.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::pob::PortalData;
    use pretty_assertions::assert_eq;

    fn square_portal(x: f32) -> IndexedTriangleList {
        IndexedTriangleList::from_polygon(vec![
            Vec3::new(x, 0.0, 0.0),
            Vec3::new(x, 2.0, 0.0),
            Vec3::new(x, 2.0, 2.0),
            Vec3::new(x, 0.0, 2.0),
        ])
    }

    fn cell(name: &str, portal_ids: &[i32]) -> Cell {
        Cell {
            name: name.to_string(),
            portals: portal_ids.iter().map(|&id| PortalData::new(id, true)).collect(),
            ..Cell::default()
        }
    }

    #[test]
    fn test_two_cells_sharing_portal() {
        let portals: Vec<_> = (0..8).map(|i| square_portal(i as f32)).collect();
        let mut cells = vec![cell("r0", &[7]), cell("r1", &[7])];
        resolve_portal_connections(&mut cells).unwrap();
        assert_eq!(cells[0].portals[0].connecting_cell, 1);
        assert_eq!(cells[1].portals[0].connecting_cell, 0);
        assert!(cells[0].portals[0].clockwise);
        assert!(!cells[1].portals[0].clockwise);

        let graph = build_building_graph(&portals, &cells, &[None, None]);
        assert_eq!(graph.graph_type, PathGraphType::Building);
        assert_eq!(graph.edges.len(), 4);

        let portal_node = graph
            .nodes
            .iter()
            .find(|n| n.key == 7 && n.node_type != PathNodeType::BuildingCell)
            .unwrap();
        assert_eq!(portal_node.node_type, PathNodeType::BuildingEntrance);
        assert_eq!(portal_node.position, Vec3::new(7.0, 1.0, 1.0));

        for c in graph.nodes_of_type(PathNodeType::BuildingCell).map(|n| n.index) {
            assert!(graph.has_edge(c, portal_node.index));
            assert!(graph.has_edge(portal_node.index, c));
        }
    }

    #[test]
    fn test_interior_portal_type() {
        let portals = vec![square_portal(0.0), square_portal(1.0)];
        let cells = vec![cell("r0", &[0]), cell("r1", &[0, 1]), cell("r2", &[1])];
        let graph = build_building_graph(&portals, &cells, &[]);
        assert_eq!(graph.nodes[0].node_type, PathNodeType::BuildingEntrance);
        assert_eq!(graph.nodes[1].node_type, PathNodeType::BuildingPortal);
        assert_eq!(graph.edges.len(), 8);
    }

    #[test]
    fn test_missing_partner_is_an_error() {
        let mut cells = vec![cell("r0", &[0]), cell("r1", &[1])];
        let err = resolve_portal_connections(&mut cells).unwrap_err();
        assert!(matches!(
            err,
            Error::AmbiguousConnectivity { portal: 0, cell: 0, partners: 0 }
        ));
    }

    #[test]
    fn test_three_way_portal_is_an_error() {
        let mut cells = vec![cell("r0", &[2]), cell("r1", &[2]), cell("r2", &[2])];
        let err = resolve_portal_connections(&mut cells).unwrap_err();
        assert!(matches!(err, Error::AmbiguousConnectivity { partners: 2, .. }));
    }

    #[test]
    fn test_cell_position_from_floor_waypoints() {
        let mut floor = PathGraph::new(PathGraphType::Cell);
        floor.add_node(PathNodeType::CellWaypoint, Vec3::new(2.0, 0.0, 0.0), 0.5, -1);
        floor.add_node(PathNodeType::CellWaypoint, Vec3::new(4.0, 0.0, 2.0), 0.5, -1);
        floor.add_node(PathNodeType::CellPortal, Vec3::new(100.0, 0.0, 0.0), 0.0, 0);

        let portals = vec![square_portal(0.0)];
        let cells = vec![cell("r0", &[0]), cell("r1", &[0])];
        let graph = build_building_graph(&portals, &cells, &[None, Some(&floor)]);
        let cells: Vec<Vec3> = graph
            .nodes_of_type(PathNodeType::BuildingCell)
            .map(|n| n.position)
            .collect();
        assert_eq!(cells, vec![Vec3::ZERO, Vec3::new(3.0, 0.0, 1.0)]);
    }
}
