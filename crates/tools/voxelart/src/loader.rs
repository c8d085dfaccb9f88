//! Source mesh loading
//!
//! [`load_meshes`] picks a loader from the file extension: OBJ files go
//! through `tobj`, glTF and GLB scenes through [`crate::gltf_loader`].
//!
//! Each OBJ model becomes its own [`Mesh`] so that per-model materials and
//! textures stay attached to the right triangles. Faces are triangulated and
//! re-indexed into a single index buffer by `tobj`.

use crate::color::factor_to_rgba;
use crate::gltf_loader::load_gltf;
use crate::mesh::{Material, Mesh};
use crate::types::{Result, Rgba, VoxelArtError};
use glam::{Vec2, Vec3};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Load every mesh of an `.obj`, `.gltf` or `.glb` file
pub fn load_meshes(path: impl AsRef<Path>) -> Result<Vec<Mesh>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("obj") => load_obj(path),
        Some("gltf" | "glb") => load_gltf(path),
        _ => Err(VoxelArtError::Load(format!(
            "unsupported input format: {}",
            path.display()
        ))),
    }
}

/// Load all models of an OBJ file, with MTL colors and diffuse textures
///
/// A missing or broken MTL file or texture only produces a warning; the
/// affected meshes fall back to the next color source.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Vec<Mesh>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(VoxelArtError::Load(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    };
    let (models, materials) = tobj::load_obj(path, &options)?;

    let materials = match materials {
        Ok(materials) => materials,
        Err(e) => {
            warn!("Failed to load materials for {}: {}", path.display(), e);
            Vec::new()
        }
    };

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let materials = convert_materials(&materials, base_dir);

    let meshes: Vec<Mesh> = models
        .into_iter()
        .map(|model| {
            let material = model
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .cloned();
            convert_model(model, material)
        })
        .collect();

    info!(
        "Loaded {} meshes ({} materials) from {}",
        meshes.len(),
        materials.len(),
        path.display()
    );

    Ok(meshes)
}

fn convert_materials(materials: &[tobj::Material], base_dir: &Path) -> Vec<Material> {
    let mut textures: HashMap<String, Option<Arc<DynamicImage>>> = HashMap::new();

    materials
        .iter()
        .map(|mtl| {
            let mut material = Material::new().with_name(mtl.name.clone());
            if let Some(diffuse) = mtl.diffuse {
                material = material.with_diffuse(diffuse);
            }
            if let Some(file) = mtl.diffuse_texture.as_deref() {
                let texture = textures
                    .entry(file.to_string())
                    .or_insert_with(|| load_texture(&base_dir.join(file)))
                    .clone();
                if let Some(texture) = texture {
                    material = material.with_texture(texture);
                }
            }
            material
        })
        .collect()
}

fn load_texture(path: &Path) -> Option<Arc<DynamicImage>> {
    match image::open(path) {
        Ok(img) => {
            debug!(
                "Loaded texture {} ({}x{})",
                path.display(),
                img.width(),
                img.height()
            );
            Some(Arc::new(img))
        }
        Err(e) => {
            warn!("Failed to load texture {}: {}", path.display(), e);
            None
        }
    }
}

fn convert_model(model: tobj::Model, material: Option<Material>) -> Mesh {
    let src = model.mesh;
    let name = model.name;

    let vertices: Vec<Vec3> = src
        .positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]))
        .collect();
    let faces: Vec<[u32; 3]> = src
        .indices
        .chunks_exact(3)
        .map(|f| [f[0], f[1], f[2]])
        .collect();

    let mut mesh = Mesh::new(vertices, faces).with_name(name.clone());

    if !src.texcoords.is_empty() {
        mesh = mesh.with_uvs(
            src.texcoords
                .chunks_exact(2)
                .map(|t| Vec2::new(t[0], t[1]))
                .collect(),
        );
    }

    if !src.vertex_color.is_empty() {
        let colors: Option<Vec<Rgba>> = src
            .vertex_color
            .chunks_exact(3)
            .map(factor_to_rgba)
            .collect();
        match colors {
            Some(colors) => mesh = mesh.with_vertex_colors(colors),
            None => warn!("Ignoring non-finite vertex colors in {}", name),
        }
    }

    if let Some(material) = material {
        mesh = mesh.with_material(material);
    }

    debug!(
        "Model {}: {} vertices, {} faces",
        name,
        mesh.vertex_count(),
        mesh.face_count()
    );

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl red
f 1/1 2/2 3/3 4/4
o tri
v 0 0 1
v 1 0 1
v 0 1 1
f 5 6 7
";

    const QUAD_MTL: &str = "\
newmtl red
Kd 1.0 0.0 0.0
map_Kd missing.png
";

    #[test]
    fn test_missing_file_is_load_error() {
        let result = load_obj("/definitely/not/here.obj");
        assert!(matches!(result, Err(VoxelArtError::Load(_))));
    }

    #[test]
    fn test_models_become_separate_meshes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();
        fs::write(dir.path().join("quad.mtl"), QUAD_MTL).unwrap();

        let meshes = load_obj(dir.path().join("quad.obj")).unwrap();
        assert_eq!(meshes.len(), 2);

        let quad = &meshes[0];
        assert_eq!(quad.name.as_deref(), Some("quad"));
        assert_eq!(quad.face_count(), 2);
        assert!(quad.attributes().has_uv);
        // Texture is missing, diffuse color survives
        let material = quad.material.as_ref().unwrap();
        assert!(material.texture().is_none());
        assert_eq!(material.diffuse_factor, Some([1.0, 0.0, 0.0]));

        let tri = &meshes[1];
        assert_eq!(tri.face_count(), 1);
        assert!(!tri.attributes().has_uv);
    }

    #[test]
    fn test_load_meshes_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let obj = dir.path().join("QUAD.OBJ");
        fs::write(&obj, QUAD_OBJ).unwrap();
        assert_eq!(load_meshes(&obj).unwrap().len(), 2);

        let ply = dir.path().join("quad.ply");
        fs::write(&ply, "ply\n").unwrap();
        assert!(matches!(load_meshes(&ply), Err(VoxelArtError::Load(_))));

        assert!(matches!(
            load_meshes(dir.path().join("missing.glb")),
            Err(VoxelArtError::Load(_))
        ));
    }

    #[test]
    fn test_missing_mtl_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();

        let meshes = load_obj(dir.path().join("quad.obj")).unwrap();
        assert_eq!(meshes.len(), 2);
        assert!(meshes[0].material.is_none());
    }
}
