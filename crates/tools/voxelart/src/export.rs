//! glTF 2.0 export of the combined voxel mesh
//!
//! The document always has the same shape: one scene, one node, one mesh
//! with a single primitive, one untinted material and four accessors into a
//! single binary buffer laid out as
//!
//! | view | accessor | content                       | element |
//! |------|----------|-------------------------------|---------|
//! | 0    | POSITION | vertex positions              | f32 x 3 |
//! | 1    | NORMAL   | vertex normals                | f32 x 3 |
//! | 2    | COLOR_0  | vertex colors, byte / 255     | f32 x 4 |
//! | 3    | indices  | triangle corners              | u32     |
//!
//! `.gltf` output embeds the buffer as a base64 data URI; `.glb` output
//! carries it in the binary chunk. Neither writes a sidecar file.

use crate::cube_mesh::CombinedMesh;
use crate::types::{Result, VoxelArtError};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Generator name written into the asset block
pub const GENERATOR: &str = "voxelart";

// Component types
const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;

// Buffer view targets
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

// GLB constants
const GLB_MAGIC: u32 = 0x46546C67; // "glTF"
const GLB_VERSION: u32 = 2;
const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

// =============================================================================
// Document Model
// =============================================================================

/// Output container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// JSON document with an embedded base64 buffer
    #[default]
    Gltf,
    /// Binary container with JSON and BIN chunks
    Glb,
}

impl ExportFormat {
    /// Pick the format from a file extension (`.glb` or anything else)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("glb") => ExportFormat::Glb,
            _ => ExportFormat::Gltf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    pub generator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub mesh: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub name: String,
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    pub double_sided: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    pub indices: usize,
    pub material: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDef {
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub target: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// glTF 2.0 document describing one vertex-colored mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfDocument {
    pub asset: Asset,
    pub scene: usize,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub materials: Vec<Material>,
    pub meshes: Vec<MeshDef>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
}

impl GltfDocument {
    /// Decode the embedded data URI buffer, if present
    pub fn embedded_buffer(&self) -> Option<Vec<u8>> {
        let uri = self.buffers.first()?.uri.as_deref()?;
        let encoded = uri.strip_prefix(DATA_URI_PREFIX)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .ok()
    }
}

// =============================================================================
// Buffer Packing
// =============================================================================

/// Binary blob plus the byte range of each section
struct BinaryBlob {
    bytes: Vec<u8>,
    views: [(usize, usize); 4],
}

fn push_section(bytes: &mut Vec<u8>, data: impl Iterator<Item = [u8; 4]>) -> (usize, usize) {
    let offset = bytes.len();
    for word in data {
        bytes.extend_from_slice(&word);
    }
    (offset, bytes.len() - offset)
}

fn build_blob(mesh: &CombinedMesh) -> BinaryBlob {
    let vertex_count = mesh.vertex_count();
    let capacity = vertex_count * (12 + 12 + 16) + mesh.triangle_count() * 12;
    let mut bytes = Vec::with_capacity(capacity);

    let positions = push_section(
        &mut bytes,
        mesh.positions.iter().flatten().map(|v| v.to_le_bytes()),
    );
    let normals = push_section(
        &mut bytes,
        mesh.normals.iter().flatten().map(|v| v.to_le_bytes()),
    );
    let colors = push_section(
        &mut bytes,
        mesh.colors
            .iter()
            .flatten()
            .map(|&c| (c as f32 / 255.0).to_le_bytes()),
    );
    let indices = push_section(
        &mut bytes,
        mesh.indices.iter().flatten().map(|i| i.to_le_bytes()),
    );

    BinaryBlob {
        bytes,
        views: [positions, normals, colors, indices],
    }
}

fn check_mesh(mesh: &CombinedMesh) -> Result<()> {
    if mesh.is_empty() {
        return Err(VoxelArtError::EmptyMesh);
    }
    let vertex_count = mesh.vertex_count();
    if mesh.normals.len() != vertex_count || mesh.colors.len() != vertex_count {
        return Err(VoxelArtError::InvalidMesh(format!(
            "attribute count mismatch: {} positions, {} normals, {} colors",
            vertex_count,
            mesh.normals.len(),
            mesh.colors.len()
        )));
    }
    if let Some(index) = mesh
        .indices
        .iter()
        .flatten()
        .find(|&&i| i as usize >= vertex_count)
    {
        return Err(VoxelArtError::InvalidMesh(format!(
            "index {} out of range for {} vertices",
            index, vertex_count
        )));
    }
    Ok(())
}

fn document_for(mesh: &CombinedMesh, blob: &BinaryBlob, uri: Option<String>) -> GltfDocument {
    let vertex_count = mesh.vertex_count();
    let (min, max) = mesh
        .position_bounds()
        .unwrap_or(([0.0; 3], [0.0; 3]));

    let attributes = BTreeMap::from([
        ("POSITION".to_string(), 0),
        ("NORMAL".to_string(), 1),
        ("COLOR_0".to_string(), 2),
    ]);

    let accessor = |view: usize, component_type: u32, count: usize, kind: &str| Accessor {
        buffer_view: view,
        component_type,
        count,
        kind: kind.to_string(),
        min: None,
        max: None,
    };

    let buffer_views = blob
        .views
        .iter()
        .enumerate()
        .map(|(i, &(byte_offset, byte_length))| BufferView {
            buffer: 0,
            byte_offset,
            byte_length,
            target: if i == 3 {
                ELEMENT_ARRAY_BUFFER
            } else {
                ARRAY_BUFFER
            },
        })
        .collect();

    GltfDocument {
        asset: Asset {
            version: "2.0".to_string(),
            generator: GENERATOR.to_string(),
        },
        scene: 0,
        scenes: vec![Scene { nodes: vec![0] }],
        nodes: vec![Node {
            mesh: 0,
            name: "VoxelObject".to_string(),
        }],
        materials: vec![Material {
            name: "VertexColorMat".to_string(),
            pbr_metallic_roughness: PbrMetallicRoughness {
                base_color_factor: [1.0, 1.0, 1.0, 1.0],
                metallic_factor: 0.0,
                roughness_factor: 1.0,
            },
            double_sided: true,
        }],
        meshes: vec![MeshDef {
            primitives: vec![Primitive {
                attributes,
                indices: 3,
                material: 0,
            }],
        }],
        accessors: vec![
            Accessor {
                min: Some(min.to_vec()),
                max: Some(max.to_vec()),
                ..accessor(0, FLOAT, vertex_count, "VEC3")
            },
            accessor(1, FLOAT, mesh.normals.len(), "VEC3"),
            accessor(2, FLOAT, mesh.colors.len(), "VEC4"),
            accessor(3, UNSIGNED_INT, mesh.triangle_count() * 3, "SCALAR"),
        ],
        buffer_views,
        buffers: vec![Buffer {
            byte_length: blob.bytes.len(),
            uri,
        }],
    }
}

// =============================================================================
// Writers
// =============================================================================

/// Build the glTF document with the buffer embedded as a data URI
pub fn build_document(mesh: &CombinedMesh) -> Result<GltfDocument> {
    check_mesh(mesh)?;
    let blob = build_blob(mesh);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&blob.bytes);
    Ok(document_for(
        mesh,
        &blob,
        Some(format!("{}{}", DATA_URI_PREFIX, encoded)),
    ))
}

/// Serialize the mesh to a self-contained glTF JSON string
pub fn to_gltf_json(mesh: &CombinedMesh) -> Result<String> {
    let document = build_document(mesh)?;
    Ok(serde_json::to_string(&document)?)
}

/// Serialize the mesh to GLB bytes
pub fn to_glb_bytes(mesh: &CombinedMesh) -> Result<Vec<u8>> {
    check_mesh(mesh)?;
    let blob = build_blob(mesh);
    let document = document_for(mesh, &blob, None);
    let json = serde_json::to_vec(&document)?;

    let json_padded_len = (json.len() + 3) & !3;
    let bin_padded_len = (blob.bytes.len() + 3) & !3;
    let total_len = 12 + 8 + json_padded_len + 8 + bin_padded_len;

    let mut buf = Vec::with_capacity(total_len);

    // Header
    buf.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    buf.extend_from_slice(&GLB_VERSION.to_le_bytes());
    buf.extend_from_slice(&(total_len as u32).to_le_bytes());

    // JSON chunk, padded with spaces
    buf.extend_from_slice(&(json_padded_len as u32).to_le_bytes());
    buf.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
    buf.extend_from_slice(&json);
    buf.resize(buf.len() + json_padded_len - json.len(), b' ');

    // BIN chunk, padded with zeros
    buf.extend_from_slice(&(bin_padded_len as u32).to_le_bytes());
    buf.extend_from_slice(&GLB_CHUNK_BIN.to_le_bytes());
    buf.extend_from_slice(&blob.bytes);
    buf.resize(buf.len() + bin_padded_len - blob.bytes.len(), 0u8);

    Ok(buf)
}

/// Write a `.gltf` file with an embedded buffer
///
/// The document is fully serialized before the file is created.
pub fn write_gltf(mesh: &CombinedMesh, path: impl AsRef<Path>) -> Result<()> {
    let json = to_gltf_json(mesh)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Write a `.glb` file
pub fn write_glb(mesh: &CombinedMesh, path: impl AsRef<Path>) -> Result<()> {
    let bytes = to_glb_bytes(mesh)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Write the mesh, picking the format from the path extension
pub fn export(mesh: &CombinedMesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    export_as(mesh, path, ExportFormat::from_path(path))
}

/// Write the mesh in the requested format
pub fn export_as(mesh: &CombinedMesh, path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Gltf => write_gltf(mesh, path),
        ExportFormat::Glb => write_glb(mesh, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube_mesh::build_mesh;
    use crate::types::VoxelRecord;
    use glam::{IVec3, Vec3};

    fn two_voxel_mesh() -> CombinedMesh {
        let voxels = [
            VoxelRecord {
                grid_key: IVec3::ZERO,
                center: Vec3::splat(0.5),
                color: [255, 0, 0, 255],
            },
            VoxelRecord {
                grid_key: IVec3::X,
                center: Vec3::new(1.5, 0.5, 0.5),
                color: [0, 51, 255, 255],
            },
        ];
        build_mesh(&voxels, 1.0, 0.0).unwrap()
    }

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_document_structure() {
        let mesh = two_voxel_mesh();
        let doc = build_document(&mesh).unwrap();

        assert_eq!(doc.asset.version, "2.0");
        assert_eq!(doc.asset.generator, GENERATOR);
        assert_eq!(doc.scenes[0].nodes, vec![0]);
        assert_eq!(doc.nodes[0].mesh, 0);

        let prim = &doc.meshes[0].primitives[0];
        assert_eq!(prim.attributes["POSITION"], 0);
        assert_eq!(prim.attributes["NORMAL"], 1);
        assert_eq!(prim.attributes["COLOR_0"], 2);
        assert_eq!(prim.indices, 3);

        let pbr = &doc.materials[0].pbr_metallic_roughness;
        assert_eq!(pbr.base_color_factor, [1.0; 4]);
        assert_eq!(pbr.metallic_factor, 0.0);
        assert_eq!(pbr.roughness_factor, 1.0);

        assert_eq!(doc.accessors.len(), 4);
        assert_eq!(doc.accessors[0].count, 16);
        assert_eq!(doc.accessors[0].min, Some(vec![0.0, 0.0, 0.0]));
        assert_eq!(doc.accessors[0].max, Some(vec![2.0, 1.0, 1.0]));
        assert_eq!(doc.accessors[2].kind, "VEC4");
        assert_eq!(doc.accessors[3].component_type, UNSIGNED_INT);
        assert_eq!(doc.accessors[3].count, 72);
        assert!(doc.accessors[1].min.is_none());

        assert_eq!(doc.buffer_views[3].target, ELEMENT_ARRAY_BUFFER);
        assert!(doc.buffer_views[..3].iter().all(|v| v.target == ARRAY_BUFFER));
    }

    #[test]
    fn test_buffer_layout() {
        let mesh = two_voxel_mesh();
        let doc = build_document(&mesh).unwrap();
        let bytes = doc.embedded_buffer().unwrap();

        assert_eq!(doc.buffers[0].byte_length, bytes.len());

        let views = &doc.buffer_views;
        assert_eq!((views[0].byte_offset, views[0].byte_length), (0, 16 * 12));
        assert_eq!((views[1].byte_offset, views[1].byte_length), (192, 16 * 12));
        assert_eq!((views[2].byte_offset, views[2].byte_length), (384, 16 * 16));
        assert_eq!((views[3].byte_offset, views[3].byte_length), (640, 72 * 4));
        assert_eq!(bytes.len(), 640 + 288);

        // First position is corner (-,-,-) of the first cube
        assert_eq!(read_f32(&bytes, 0), 0.0);
        // Colors are normalized floats
        let second_cube_color = views[2].byte_offset + 8 * 16;
        assert_eq!(read_f32(&bytes, second_cube_color), 0.0);
        assert!((read_f32(&bytes, second_cube_color + 4) - 0.2).abs() < 1e-6);
        assert_eq!(read_f32(&bytes, second_cube_color + 8), 1.0);
        // Indices of the second cube are offset by 8
        assert_eq!(read_u32(&bytes, views[3].byte_offset + 36 * 4), 8);
    }

    #[test]
    fn test_json_field_names() {
        let json = to_gltf_json(&two_voxel_mesh()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["accessors"][0]["componentType"], FLOAT);
        assert_eq!(value["accessors"][0]["type"], "VEC3");
        assert_eq!(value["bufferViews"][0]["byteOffset"], 0);
        assert_eq!(value["materials"][0]["doubleSided"], true);
        assert_eq!(
            value["materials"][0]["pbrMetallicRoughness"]["roughnessFactor"],
            1.0
        );
        assert!(value["buffers"][0]["uri"]
            .as_str()
            .unwrap()
            .starts_with(DATA_URI_PREFIX));
        assert!(value["accessors"][1].get("min").is_none());
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        assert!(matches!(
            build_document(&CombinedMesh::default()),
            Err(VoxelArtError::EmptyMesh)
        ));
        assert!(matches!(
            to_glb_bytes(&CombinedMesh::default()),
            Err(VoxelArtError::EmptyMesh)
        ));
    }

    #[test]
    fn test_mismatched_attributes_are_rejected() {
        let mut mesh = two_voxel_mesh();
        mesh.normals.pop();
        assert!(matches!(
            build_document(&mesh),
            Err(VoxelArtError::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_glb_container() {
        let bytes = to_glb_bytes(&two_voxel_mesh()).unwrap();

        assert_eq!(read_u32(&bytes, 0), GLB_MAGIC);
        assert_eq!(read_u32(&bytes, 4), GLB_VERSION);
        assert_eq!(read_u32(&bytes, 8) as usize, bytes.len());
        assert_eq!(bytes.len() % 4, 0);

        let json_len = read_u32(&bytes, 12) as usize;
        assert_eq!(read_u32(&bytes, 16), GLB_CHUNK_JSON);
        let doc: GltfDocument = serde_json::from_slice(&bytes[20..20 + json_len]).unwrap();
        assert!(doc.buffers[0].uri.is_none());

        let bin_header = 20 + json_len;
        assert_eq!(read_u32(&bytes, bin_header + 4), GLB_CHUNK_BIN);
        assert_eq!(read_u32(&bytes, bin_header) as usize, doc.buffers[0].byte_length);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a/b.glb")), ExportFormat::Glb);
        assert_eq!(ExportFormat::from_path(Path::new("a/b.GLB")), ExportFormat::Glb);
        assert_eq!(ExportFormat::from_path(Path::new("a/b.gltf")), ExportFormat::Gltf);
        assert_eq!(ExportFormat::from_path(Path::new("a/b")), ExportFormat::Gltf);
    }
}
