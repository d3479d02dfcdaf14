//! Conversion between host-tool geometry and on-disk records
//!
//! The host side is right-handed with triangles wound counter-clockwise.
//! Static meshes and floors store X negated with the winding reversed;
//! skinned meshes store `(-x, z, -y)`. Hardpoint and light transforms swap
//! their second and third rows.
//!
//! Opaque blobs (raw collision, skinned-mesh hardpoints) travel through the
//! host as base64 text.

pub mod floor;
pub mod mesh;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use glam::Vec3;

use crate::error::Result;

pub use floor::{HostFloor, HostPortal, floor_from_host};
pub use mesh::{HostMesh, mesh_from_host, mesh_to_host};

/// Static mesh and floor axis convention.
pub fn position_from_host(p: Vec3) -> Vec3 {
    Vec3::new(-p.x, p.y, p.z)
}

pub fn position_to_host(p: Vec3) -> Vec3 {
    Vec3::new(-p.x, p.y, p.z)
}

/// Skinned mesh axis convention.
pub fn skinned_position_from_host(p: Vec3) -> Vec3 {
    Vec3::new(-p.x, p.z, -p.y)
}

pub fn skinned_position_to_host(p: Vec3) -> Vec3 {
    Vec3::new(-p.x, -p.z, p.y)
}

fn swap_rows(transform: &[f32; 12]) -> [f32; 12] {
    let mut out = [0.0; 12];
    out[..4].copy_from_slice(&transform[..4]);
    out[4..8].copy_from_slice(&transform[8..]);
    out[8..].copy_from_slice(&transform[4..8]);
    out
}

/// Stored 3x4 transform to host row order.
pub fn hardpoint_to_host(transform: &[f32; 12]) -> [f32; 12] {
    swap_rows(transform)
}

/// Host 3x4 transform (rows 0, 1, 2) to stored row order (0, 2, 1).
pub fn hardpoint_from_host(transform: &[f32; 12]) -> [f32; 12] {
    swap_rows(transform)
}

pub fn encode_blob(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_blob(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text.trim())?)
}
