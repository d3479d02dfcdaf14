//! Tool configuration (`swgforge.toml`)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asset_root::AssetRoot;
use crate::error::{Error, Result};

fn default_true() -> bool {
    true
}

fn default_prune_angle() -> f32 {
    20.0
}

fn default_containment_tolerance() -> f32 {
    0.1
}

fn default_portal_vertex_tolerance() -> f32 {
    0.01
}

/// The full tool configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Base directory that relative asset references resolve against.
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
    #[serde(default)]
    pub mesh: MeshSettings,
    #[serde(default)]
    pub pob: PobSettings,
    #[serde(default)]
    pub floor: FloorSettings,
}

/// Mesh import/export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshSettings {
    /// Store V as `1 - v`.
    #[serde(default = "default_true")]
    pub flip_uv_v: bool,
    #[serde(default = "default_true")]
    pub dedupe_vertices: bool,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            flip_uv_v: true,
            dedupe_vertices: true,
        }
    }
}

/// Portal container export options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PobSettings {
    #[serde(default)]
    pub use_imported_crc: bool,
}

/// Floor path graph options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorSettings {
    #[serde(default = "default_prune_angle")]
    pub prune_angle_degrees: f32,
    /// How far outside a triangle a node may sit and still count as on it.
    #[serde(default = "default_containment_tolerance")]
    pub containment_tolerance: f32,
    /// Distance within which a floor vertex lies on a portal.
    #[serde(default = "default_portal_vertex_tolerance")]
    pub portal_vertex_tolerance: f32,
}

impl Default for FloorSettings {
    fn default() -> Self {
        Self {
            prune_angle_degrees: default_prune_angle(),
            containment_tolerance: default_containment_tolerance(),
            portal_vertex_tolerance: default_portal_vertex_tolerance(),
        }
    }
}

impl ToolConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded config {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// The configured asset root, if any.
    pub fn asset_root(&self) -> Option<AssetRoot> {
        self.asset_root.as_ref().map(AssetRoot::new)
    }
}
