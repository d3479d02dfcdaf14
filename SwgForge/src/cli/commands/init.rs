use std::path::Path;

use anyhow::bail;

use crate::config::ToolConfig;

pub fn execute(output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    std::fs::write(output, ToolConfig::default().to_toml_string()?)?;
    println!("Wrote {}", output.display());
    Ok(())
}
