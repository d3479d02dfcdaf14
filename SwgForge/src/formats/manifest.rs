//! Write-only manifests that tie skinned meshes together
//!
//! `.sat` skeletal appearance templates (`FORM SMAT`) name the mesh LOD
//! lists and skeletons a creature uses; `.lmg` mesh LOD lists (`FORM MLOD`)
//! name one `.mgn` per detail level.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::iff::Iff;

/// Skeleton plus the attachment point it hangs from (empty for the root).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonBinding {
    pub skeleton: String,
    pub attachment: String,
}

/// `FORM SMAT / 0003`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonAttachment {
    /// `.lmg` references.
    pub meshes: Vec<String>,
    pub skeletons: Vec<SkeletonBinding>,
    pub has_occlusion: bool,
}

impl SkeletonAttachment {
    pub fn to_iff(&self) -> Result<Iff> {
        let mut iff = Iff::new(256);
        iff.insert_form("SMAT", true)?;
        iff.insert_form("0003", true)?;

        iff.insert_chunk("INFO", true)?;
        iff.insert_i32(self.meshes.len() as i32)?;
        iff.insert_i32(self.skeletons.len() as i32)?;
        iff.insert_bool8(self.has_occlusion)?;
        iff.exit_chunk("INFO")?;

        iff.insert_chunk("MSGN", true)?;
        for mesh in &self.meshes {
            iff.insert_string(mesh)?;
        }
        iff.exit_chunk("MSGN")?;

        iff.insert_chunk("SKTI", true)?;
        for binding in &self.skeletons {
            iff.insert_string(&binding.skeleton)?;
            iff.insert_string(&binding.attachment)?;
        }
        iff.exit_chunk("SKTI")?;

        iff.exit_form("0003")?;
        iff.exit_form("SMAT")?;
        Ok(iff)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_iff()?.write(path)
    }
}

/// `FORM MLOD / 0000`, highest detail first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshLodList {
    pub meshes: Vec<String>,
}

impl MeshLodList {
    pub fn to_iff(&self) -> Result<Iff> {
        let mut iff = Iff::new(128);
        iff.insert_form("MLOD", true)?;
        iff.insert_form("0000", true)?;

        iff.insert_chunk("INFO", true)?;
        iff.insert_i16(self.meshes.len() as i16)?;
        iff.exit_chunk("INFO")?;

        for mesh in &self.meshes {
            iff.insert_chunk("NAME", true)?;
            iff.insert_string(mesh)?;
            iff.exit_chunk("NAME")?;
        }

        iff.exit_form("0000")?;
        iff.exit_form("MLOD")?;
        Ok(iff)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_iff()?.write(path)
    }
}
