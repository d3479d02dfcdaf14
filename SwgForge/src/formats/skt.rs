//! Skeleton bone names from `.skt` files (`FORM SLOD` / `FORM SKTM`)
//!
//! Only the `NAME` list is read; parent indices, bind poses and joint
//! orientations are skipped. A `SLOD` wrapper contributes its first
//! (highest detail) skeleton.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::common::check_version;
use crate::iff::Iff;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonNames {
    pub bones: Vec<String>,
}

impl SkeletonNames {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut iff = Iff::open(path.as_ref())?;
        Self::read(&mut iff)
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        match iff.current_name().as_str() {
            "SKTM" => read_sktm(iff),
            "SLOD" => {
                iff.enter_form("SLOD")?;
                iff.enter_form_unchecked()?;
                while iff.current_name() != "SKTM" {
                    if iff.at_end_of_form() {
                        return Err(Error::mismatch("SKTM", "end of SLOD"));
                    }
                    iff.skip_block()?;
                }
                read_sktm(iff)
            }
            other => Err(Error::mismatch("SKTM or SLOD", other)),
        }
    }

    pub fn contains(&self, bone: &str) -> bool {
        self.bones.iter().any(|b| b == bone)
    }
}

fn read_sktm(iff: &mut Iff) -> Result<SkeletonNames> {
    iff.enter_form("SKTM")?;
    let version = iff.current_name();
    check_version("SKTM", &version, &["0002"])?;
    iff.enter_form("0002")?;

    iff.enter_chunk("INFO")?;
    let count = iff.read_i32()?.max(0) as usize;
    iff.exit_chunk("INFO")?;

    iff.enter_chunk("NAME")?;
    let count = iff.checked_count(count, 1)?;
    let mut bones = Vec::with_capacity(count);
    for _ in 0..count {
        bones.push(iff.read_string()?);
    }
    iff.exit_chunk("NAME")?;

    tracing::debug!("Skeleton with {} bones", bones.len());
    Ok(SkeletonNames { bones })
}
