//! End-to-end conversion: meshes -> voxels -> cube mesh -> glTF

use crate::config::ConvertConfig;
use crate::cube_mesh::{build_mesh, CombinedMesh};
use crate::export::{self, ExportFormat, GltfDocument};
use crate::mesh::Mesh;
use crate::types::{Result, VoxelArtError};
use crate::voxelize::{voxelize, Voxelization};
use std::path::Path;
use tracing::info;

/// Summary of one conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionReport {
    /// Meshes passed in
    pub mesh_count: usize,
    /// Meshes skipped because they failed validation
    pub skipped_meshes: usize,
    pub voxel_count: usize,
    pub voxel_size: f32,
    pub vertex_count: usize,
    pub triangle_count: usize,
}

impl ConversionReport {
    fn new(mesh_count: usize, voxels: &Voxelization, mesh: &CombinedMesh) -> Self {
        Self {
            mesh_count,
            skipped_meshes: voxels.skipped_meshes,
            voxel_count: voxels.len(),
            voxel_size: voxels.voxel_size(),
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
        }
    }
}

/// Voxelize meshes and expand the voxels into cubes
pub fn build_voxel_mesh(
    meshes: &[Mesh],
    config: &ConvertConfig,
) -> Result<(Voxelization, CombinedMesh)> {
    let voxels = voxelize(meshes, config)?;
    let mesh = build_mesh(&voxels.voxels, voxels.voxel_size(), config.gap)
        .ok_or(VoxelArtError::EmptyVoxelization)?;
    Ok((voxels, mesh))
}

/// Convert meshes to an in-memory glTF document
pub fn convert_to_document(
    meshes: &[Mesh],
    config: &ConvertConfig,
) -> Result<(GltfDocument, ConversionReport)> {
    let (voxels, mesh) = build_voxel_mesh(meshes, config)?;
    let document = export::build_document(&mesh)?;
    Ok((document, ConversionReport::new(meshes.len(), &voxels, &mesh)))
}

/// Convert meshes and write the result to `output`
///
/// The format follows the output extension (`.glb` or glTF JSON). Nothing is
/// written when the conversion produces no voxels.
pub fn convert(
    meshes: &[Mesh],
    config: &ConvertConfig,
    output: impl AsRef<Path>,
) -> Result<ConversionReport> {
    let output = output.as_ref();
    convert_as(meshes, config, output, ExportFormat::from_path(output))
}

/// Convert meshes and write the result in an explicit format
pub fn convert_as(
    meshes: &[Mesh],
    config: &ConvertConfig,
    output: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<ConversionReport> {
    let output = output.as_ref();
    let (voxels, mesh) = build_voxel_mesh(meshes, config)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    export::export_as(&mesh, output, format)?;

    let report = ConversionReport::new(meshes.len(), &voxels, &mesh);
    info!(
        "Wrote {} ({} voxels, {} vertices, {} triangles)",
        output.display(),
        report.voxel_count,
        report.vertex_count,
        report.triangle_count
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn triangle() -> Mesh {
        Mesh::new(
            vec![
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_report_counts() {
        let config = ConvertConfig::new(4);
        let (doc, report) = convert_to_document(&[triangle()], &config).unwrap();

        assert_eq!(report.mesh_count, 1);
        assert_eq!(report.skipped_meshes, 0);
        assert!(report.voxel_count > 0);
        assert_eq!(report.vertex_count, report.voxel_count * 8);
        assert_eq!(report.triangle_count, report.voxel_count * 12);
        assert_eq!(doc.accessors[0].count, report.vertex_count);
    }

    #[test]
    fn test_invalid_config_fails_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.gltf");
        let config = ConvertConfig::new(0);

        assert!(matches!(
            convert(&[triangle()], &config, &out),
            Err(VoxelArtError::InvalidConfig(_))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_creates_missing_output_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/deeper/out.glb");

        convert(&[triangle()], &ConvertConfig::new(2), &out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[..4], b"glTF");
    }
}
