//! CLI command for printing the block tree of an IFF file

use std::path::Path;

use crate::iff::Iff;

pub fn execute(path: &Path, depth: Option<usize>) -> anyhow::Result<()> {
    let iff = Iff::open(path)?;
    for block in iff.walk() {
        if depth.is_some_and(|max| block.depth > max) {
            continue;
        }
        let indent = "  ".repeat(block.depth);
        if block.tag == "FORM" {
            println!("{indent}FORM {} ({} bytes)", block.name, block.length);
        } else {
            println!("{indent}{} ({} bytes)", block.tag, block.length);
        }
    }
    Ok(())
}
