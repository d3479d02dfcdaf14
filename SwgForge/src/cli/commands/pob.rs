//! CLI command for assembling a building path graph

use std::path::Path;
use std::time::Instant;

use anyhow::bail;

use crate::asset_root::AssetRoot;
use crate::cli::progress::{DISK, LINK, LOOKING_GLASS, print_done, print_step};
use crate::config::ToolConfig;
use crate::formats::PortalContainer;

pub fn execute(
    path: &Path,
    output: Option<&Path>,
    root: Option<&Path>,
    config: &ToolConfig,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let root = match root {
        Some(path) => AssetRoot::new(path),
        None => match config.asset_root() {
            Some(root) => root,
            None => bail!("No --root given and no asset_root configured"),
        },
    };

    print_step(1, 3, LOOKING_GLASS, "Reading portal container and floors...");
    let mut pob = PortalContainer::load(path)?;
    let floors = pob.load_floor_graphs(&root);
    let floor_refs: Vec<_> = floors.iter().map(Option::as_ref).collect();

    print_step(
        2,
        3,
        LINK,
        &format!("Linking {} cells through {} portals...", pob.cells.len(), pob.portals.len()),
    );
    pob.assemble_building_graph(&floor_refs)?;

    let out = output.unwrap_or(path);
    print_step(3, 3, DISK, &format!("Writing {}...", out.display()));
    pob.write(out, config.pob.use_imported_crc)?;

    print_done(started.elapsed());
    Ok(())
}
