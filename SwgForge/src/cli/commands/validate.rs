//! CLI command for checking that every asset under a directory decodes

use std::path::Path;
use std::time::Instant;

use anyhow::bail;

use crate::asset_root::AssetRoot;
use crate::cli::progress::{LOOKING_GLASS, print_done, print_step, simple_bar};
use crate::config::ToolConfig;
use crate::formats::{Asset, AssetKind};

pub fn execute(root: Option<&Path>, config: &ToolConfig, show_progress: bool) -> anyhow::Result<()> {
    let started = Instant::now();
    let root = match root {
        Some(path) => AssetRoot::new(path),
        None => match config.asset_root() {
            Some(root) => root,
            None => bail!("No directory given and no asset_root configured"),
        },
    };

    print_step(1, 2, LOOKING_GLASS, &format!("Scanning {}...", root.path().display()));
    let files = root.files_with_extension(AssetKind::EXTENSIONS);

    print_step(2, 2, LOOKING_GLASS, &format!("Reading {} files...", files.len()));
    let pb = show_progress.then(|| simple_bar(files.len() as u64, "Validating"));
    let mut failures = Vec::new();
    for file in &files {
        if let Err(e) = Asset::load(file) {
            tracing::debug!("{}: {e}", file.display());
            failures.push((file, e));
        }
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    for (file, e) in &failures {
        let name = root
            .relative_to_root(file)
            .unwrap_or_else(|| file.display().to_string());
        println!("  {name}: {e}");
    }
    println!("{} of {} files read cleanly", files.len() - failures.len(), files.len());
    print_done(started.elapsed());

    if !failures.is_empty() {
        bail!("{} files failed to read", failures.len());
    }
    Ok(())
}
