//! CLI command for rebuilding a floor path graph

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{DISK, LINK, LOOKING_GLASS, print_done, print_step};
use crate::config::ToolConfig;
use crate::formats::FloorFile;
use crate::pathgraph::PathNodeType;

pub fn execute(path: &Path, output: Option<&Path>, portal_ids: &[i32], config: &ToolConfig) -> anyhow::Result<()> {
    let started = Instant::now();

    print_step(1, 3, LOOKING_GLASS, "Reading floor...");
    let mut floor = FloorFile::load(path)?;

    // Keep hand-placed waypoints, everything else is regenerated
    let waypoints: Vec<_> = floor
        .path_graph
        .as_ref()
        .map(|graph| {
            graph
                .nodes_of_type(PathNodeType::CellWaypoint)
                .map(|n| (n.position, n.radius))
                .collect()
        })
        .unwrap_or_default();

    let portal_count = floor
        .tris
        .iter()
        .flat_map(|t| t.portal_ids)
        .max()
        .map_or(0, |max| (max + 1).max(0) as usize);
    let ids: Vec<i32> = if portal_ids.is_empty() {
        (0..portal_count as i32).collect()
    } else {
        portal_ids.to_vec()
    };

    print_step(
        2,
        3,
        LINK,
        &format!("Connecting {} waypoints and {} portals...", waypoints.len(), portal_count),
    );
    let report = floor.build_path_graph(&waypoints, &ids, &config.floor);
    if report.unconnected_portals > 0 {
        println!("  {} portal nodes could not be connected", report.unconnected_portals);
    }

    let out = output.unwrap_or(path);
    print_step(3, 3, DISK, &format!("Writing {}...", out.display()));
    floor.write(out)?;

    print_done(started.elapsed());
    Ok(())
}
