//! Shared types for the voxel-art conversion pipeline

use glam::{IVec3, Vec3};
use thiserror::Error;

/// RGBA color with 8 bits per channel
pub type Rgba = [u8; 4];

/// Conversion error types
#[derive(Debug, Error)]
pub enum VoxelArtError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Degenerate bounds: largest padded dimension is {0}")]
    DegenerateBounds(f32),

    #[error("No voxels generated")]
    EmptyVoxelization,

    #[error("Combined mesh has no geometry to export")]
    EmptyMesh,

    #[error("Load error: {0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for voxel-art operations that may fail
pub type Result<T> = std::result::Result<T, VoxelArtError>;

/// A single occupied grid cell with its resolved color
///
/// Records are keyed by `grid_key` and never mutated once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRecord {
    /// Integer cell coordinate: `floor((point - origin) / voxel_size)`
    pub grid_key: IVec3,
    /// World-space cell center derived from the grid definition
    pub center: Vec3,
    /// Resolved RGBA color
    pub color: Rgba,
}
