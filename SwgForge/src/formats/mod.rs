//! SWG file format handlers
//!
//! Every format is a tree of IFF forms and chunks (see [`crate::iff`]).
//! The outer form name identifies the format.

pub mod apt;
pub mod common;
pub mod flr;
pub mod lod;
pub mod manifest;
pub mod mgn;
pub mod msh;
pub mod pob;
pub mod skt;

use std::path::Path;

use serde::Serialize;

pub use apt::AptFile;
pub use flr::FloorFile;
pub use lod::LodFile;
pub use manifest::{MeshLodList, SkeletonAttachment};
pub use mgn::SkinnedMesh;
pub use msh::SwgMesh;
pub use pob::PortalContainer;
pub use skt::SkeletonNames;

use crate::error::{Error, Result};
use crate::iff::Iff;

/// Format identified by the outer form name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssetKind {
    Mesh,
    SkinnedMesh,
    Lod,
    Floor,
    PortalContainer,
    Apt,
    SkeletonAttachment,
    MeshLodList,
    Skeleton,
}

impl AssetKind {
    pub fn from_form(name: &str) -> Option<Self> {
        Some(match name {
            "MESH" => Self::Mesh,
            "SKMG" => Self::SkinnedMesh,
            "DTLA" => Self::Lod,
            "FLOR" => Self::Floor,
            "PRTO" => Self::PortalContainer,
            "APT " => Self::Apt,
            "SMAT" => Self::SkeletonAttachment,
            "MLOD" => Self::MeshLodList,
            "SKTM" | "SLOD" => Self::Skeleton,
            _ => return None,
        })
    }

    /// Kind of the block at the cursor of `iff`.
    pub fn detect(iff: &Iff) -> Option<Self> {
        Self::from_form(&iff.current_name())
    }

    /// File extensions this tool knows, lowercase.
    pub const EXTENSIONS: &'static [&'static str] =
        &["msh", "mgn", "lod", "flr", "pob", "apt", "sat", "lmg", "skt"];
}

/// A decoded file of any readable format.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data")]
pub enum Asset {
    Mesh(SwgMesh),
    SkinnedMesh(SkinnedMesh),
    Lod(LodFile),
    Floor(FloorFile),
    PortalContainer(PortalContainer),
    Apt(AptFile),
    Skeleton(SkeletonNames),
}

impl Asset {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut iff = Iff::open(path.as_ref())?;
        Self::read(&mut iff)
    }

    pub fn read(iff: &mut Iff) -> Result<Self> {
        let name = iff.current_name();
        let Some(kind) = AssetKind::from_form(&name) else {
            return Err(Error::mismatch("a known SWG form", name));
        };
        Ok(match kind {
            AssetKind::Mesh => Self::Mesh(SwgMesh::read(iff)?),
            AssetKind::SkinnedMesh => Self::SkinnedMesh(SkinnedMesh::read(iff)?),
            AssetKind::Lod => Self::Lod(LodFile::read(iff)?),
            AssetKind::Floor => Self::Floor(FloorFile::read(iff)?),
            AssetKind::PortalContainer => Self::PortalContainer(PortalContainer::read(iff)?),
            AssetKind::Apt => Self::Apt(AptFile::read(iff)?),
            AssetKind::Skeleton => Self::Skeleton(SkeletonNames::read(iff)?),
            AssetKind::SkeletonAttachment | AssetKind::MeshLodList => {
                tracing::warn!("{name} files are write-only");
                return Err(Error::mismatch("a readable SWG form", name));
            }
        })
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Mesh(_) => AssetKind::Mesh,
            Self::SkinnedMesh(_) => AssetKind::SkinnedMesh,
            Self::Lod(_) => AssetKind::Lod,
            Self::Floor(_) => AssetKind::Floor,
            Self::PortalContainer(_) => AssetKind::PortalContainer,
            Self::Apt(_) => AssetKind::Apt,
            Self::Skeleton(_) => AssetKind::Skeleton,
        }
    }
}
