//! # SwgForge
//!
//! A pure-Rust library for reading and writing Star Wars Galaxies asset files.
//!
//! ## Supported Formats
//!
//! - **IFF** - The nested FORM/chunk container every format is built on
//! - **MSH** - Static meshes with shader primitive sets, extents and hardpoints
//! - **MGN** - Skinned meshes with bone weights, blend shapes and occlusion zones
//! - **LOD** - Detail-level containers and their `.apt` redirects
//! - **FLR** - Walkable floors and their cell path graphs
//! - **POB** - Portal containers (buildings) with cells, portals and lights
//!
//! ## Quick Start
//!
//! ```no_run
//! use swgforge::prelude::*;
//!
//! let mesh = SwgMesh::load("appearance/mesh/thm_tato_hut.msh")?;
//! println!("{} shaders, {} triangles", mesh.spss.len(), mesh.triangle_count());
//!
//! let mut floor = FloorFile::load("appearance/collision/hut_r1.flr")?;
//! let report = floor.build_path_graph(&[], &[0], &FloorSettings::default());
//! println!("{} unconnected portals", report.unconnected_portals);
//! # Ok::<(), swgforge::Error>(())
//! ```
//!
//! Cross-file references resolve through an explicit [`AssetRoot`]:
//!
//! ```no_run
//! use swgforge::prelude::*;
//!
//! let root = AssetRoot::new("/srv/swg/extracted");
//! let apt = AptFile::load("appearance/thm_tato_hut.apt")?;
//! let lod = LodFile::load(apt.resolve(&root)?)?;
//! # Ok::<(), swgforge::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `swgforge` command-line binary

pub mod asset_root;
pub mod config;
pub mod converter;
pub mod error;
pub mod formats;
pub mod iff;
pub mod pathgraph;

pub use asset_root::AssetRoot;
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::asset_root::AssetRoot;
    pub use crate::config::{FloorSettings, MeshSettings, PobSettings, ToolConfig};
    pub use crate::error::{Error, Result};
    pub use crate::iff::Iff;

    pub use crate::formats::common::{
        BoxExtent, Extent, Hardpoint, IndexedTriangleList, Sphere, SwgVertex, Triangle,
        VertexFormat,
    };
    pub use crate::formats::flr::{EdgeType, FloorTriangle};
    pub use crate::formats::lod::LodBuilder;
    pub use crate::formats::mgn::{OcclusionZone, ZoneCombination, normalize_vertex_weights};
    pub use crate::formats::pob::{Cell, Light, PortalData};
    pub use crate::formats::{
        AptFile, Asset, AssetKind, FloorFile, LodFile, MeshLodList, PortalContainer,
        SkeletonAttachment, SkeletonNames, SkinnedMesh, SwgMesh,
    };

    pub use crate::pathgraph::{PathGraph, PathGraphEdge, PathGraphNode, PathGraphType, PathNodeType};

    pub use crate::converter;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
