//! Mesh to voxel-art conversion for Crossworld
//!
//! This crate turns textured or vertex-colored triangle meshes into a blocky
//! voxel rendition: the surface is sampled on a uniform grid, every occupied
//! cell gets a color from the source appearance, and each cell is emitted as
//! an independent cube in a single vertex-colored glTF mesh.
//!
//! # Features
//!
//! - **Shared Grid**: All meshes of a conversion land on one aligned grid
//! - **Color Fallback Chain**: Texture, vertex colors, face colors, material
//!   color, then a neutral gray
//! - **Color Banding**: Optional per-channel quantization
//! - **Self-Contained Output**: glTF JSON with an embedded buffer, or GLB
//! - **OBJ Input**: Models, MTL colors and diffuse textures via `tobj`
//! - **glTF Input**: Scene hierarchies with PBR base colors and textures
//!
//! # Example
//!
//! ```no_run
//! use voxelart::{convert, load_meshes, ConvertConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let meshes = load_meshes("model.glb")?;
//!     let config = ConvertConfig::new(64).with_gap(0.05);
//!
//!     let report = convert(&meshes, &config, "model_voxel.gltf")?;
//!     println!(
//!         "{} voxels of size {:.4}",
//!         report.voxel_count, report.voxel_size
//!     );
//!
//!     Ok(())
//! }
//! ```

pub mod color;
pub mod config;
pub mod cube_mesh;
pub mod export;
pub mod geometry;
pub mod gltf_loader;
pub mod loader;
pub mod mesh;
pub mod pipeline;
pub mod types;
pub mod voxelize;

pub use color::{quantize, resolve_color, ColorResolver, DEFAULT_COLOR};
pub use config::ConvertConfig;
pub use cube_mesh::{build_mesh, CombinedMesh};
pub use export::{
    export, to_glb_bytes, to_gltf_json, write_glb, write_gltf, ExportFormat, GltfDocument,
};
pub use gltf_loader::{load_gltf, load_gltf_scene};
pub use loader::{load_meshes, load_obj};
pub use mesh::{flatten_scene, Material, Mesh, MeshAttributes, SceneNode};
pub use pipeline::{convert, convert_to_document, ConversionReport};
pub use types::{Result, Rgba, VoxelArtError, VoxelRecord};
pub use voxelize::{voxelize, VoxelGrid, Voxelization};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ConvertConfig;
    pub use crate::cube_mesh::CombinedMesh;
    pub use crate::export::ExportFormat;
    pub use crate::mesh::{Material, Mesh, SceneNode};
    pub use crate::pipeline::{convert, ConversionReport};
    pub use crate::types::{Result, Rgba, VoxelArtError, VoxelRecord};
}
