//! CLI command for summarizing an asset

use std::path::Path;

use anyhow::Context;

use crate::formats::Asset;

fn summary(asset: &Asset) -> Vec<String> {
    match asset {
        Asset::Mesh(mesh) => {
            let mut lines = vec![format!(
                "{} shaders, {} vertices, {} triangles, {} hardpoints",
                mesh.spss.len(),
                mesh.vertex_count(),
                mesh.triangle_count(),
                mesh.appearance.hardpoints.len()
            )];
            lines.extend(
                mesh.spss
                    .iter()
                    .map(|sps| format!("  {} ({} verts, flags {:#x})", sps.shader, sps.verts.len(), sps.flags.bits())),
            );
            lines
        }
        Asset::SkinnedMesh(mesh) => vec![
            format!(
                "{} positions, {} bones, {} shaders, {} triangles",
                mesh.positions.len(),
                mesh.bone_names.len(),
                mesh.psdts.len(),
                mesh.triangle_count()
            ),
            format!(
                "{} blend shapes, {} occlusion zones, {} zone combinations",
                mesh.blends.len(),
                mesh.zones.len(),
                mesh.zone_combinations.len()
            ),
            format!("skeletons: {}", mesh.skeletons.join(", ")),
        ],
        Asset::Lod(lod) => lod
            .lods
            .iter()
            .map(|(id, level)| format!("  {id}: {} - {} {}", level.near, level.far, level.reference))
            .collect(),
        Asset::Floor(floor) => vec![format!(
            "{} vertices, {} triangles, {} path graph nodes",
            floor.verts.len(),
            floor.tris.len(),
            floor.path_graph.as_ref().map_or(0, |g| g.nodes.len())
        )],
        Asset::PortalContainer(pob) => {
            let mut lines = vec![format!(
                "{} portals, {} cells, crc {}",
                pob.portals.len(),
                pob.cells.len(),
                pob.crc.map_or_else(|| "none".to_string(), |crc| format!("{crc:#010x}"))
            )];
            lines.extend(
                pob.cells
                    .iter()
                    .map(|cell| format!("  {} ({} portals, {} lights)", cell.name, cell.portals.len(), cell.lights.len())),
            );
            lines
        }
        Asset::Apt(apt) => vec![format!("-> {}", apt.reference)],
        Asset::Skeleton(skeleton) => vec![format!("{} bones", skeleton.bones.len())],
    }
}

pub fn execute(path: &Path, json: Option<&Path>) -> anyhow::Result<()> {
    let asset = Asset::load(path).with_context(|| format!("Failed to read {}", path.display()))?;

    println!("{}: {:?}", path.display(), asset.kind());
    for line in summary(&asset) {
        println!("{line}");
    }

    if let Some(out) = json {
        std::fs::write(out, serde_json::to_string_pretty(&asset)?)?;
        println!("Wrote {}", out.display());
    }
    Ok(())
}
