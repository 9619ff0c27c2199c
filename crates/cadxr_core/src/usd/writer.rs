//! USDA stage writing.
//!
//! Serializes a `Scene` as an ASCII USD stage: the node hierarchy becomes
//! nested Xform/Mesh prims, the material table becomes a `Materials` scope
//! of UsdPreviewSurface materials, and mesh nodes gain `material:binding`
//! relationships.

use std::collections::HashSet;
use std::path::Path;

use cadxr_math::{Mat4, Vec3};

use crate::mesh::Mesh;
use crate::scene::{NodeId, Scene};

/// Write a scene to a USDA file.
pub fn write_usda<P: AsRef<Path>>(scene: &Scene, path: P) -> std::io::Result<()> {
    std::fs::write(path, write_usda_to_string(scene))
}

/// Serialize a scene as USDA text.
pub fn write_usda_to_string(scene: &Scene) -> String {
    let mut writer = UsdaWriter::new();
    let material_names = material_prim_names(scene);

    let default_prim = scene
        .roots()
        .first()
        .and_then(|&id| scene.node_by_id(id))
        .map(|node| sanitize_identifier(&node.key));
    writer.header(default_prim.as_deref());

    let mut used_names = HashSet::new();
    for &root in scene.roots() {
        write_node(&mut writer, scene, root, &material_names, &mut used_names);
    }

    if !material_names.is_empty() {
        write_materials_scope(&mut writer, scene, &material_names);
    }

    writer.finish()
}

/// Indentation-tracking USDA text builder.
struct UsdaWriter {
    out: String,
    indent: usize,
}

impl UsdaWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn header(&mut self, default_prim: Option<&str>) {
        self.line("#usda 1.0");
        self.line("(");
        if let Some(prim) = default_prim {
            self.line(&format!("    defaultPrim = \"{}\"", prim));
        }
        self.line("    metersPerUnit = 1");
        self.line("    upAxis = \"Z\"");
        self.line(")");
    }

    fn open(&mut self, def_line: &str) {
        self.blank();
        self.line(def_line);
        self.line("{");
        self.indent += 1;
    }

    fn close(&mut self) {
        self.indent -= 1;
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}

fn write_node(
    writer: &mut UsdaWriter,
    scene: &Scene,
    id: NodeId,
    material_names: &[String],
    used_names: &mut HashSet<String>,
) {
    let Some(node) = scene.node_by_id(id) else {
        return;
    };
    let name = unique_prim_name(&node.key, used_names);
    let transform = node.transform.to_matrix();

    match &node.mesh {
        Some(mesh) if node.children.is_empty() => {
            write_mesh_prim(
                writer,
                &name,
                mesh,
                &transform,
                node.material.map(|m| material_names[m].as_str()),
            );
        }
        Some(mesh) => {
            // A mesh node with children becomes an Xform wrapping a leaf
            // Mesh, so the geometry and the subtree both survive
            writer.open(&format!("def Xform \"{}\"", name));
            write_transform(writer, &transform);
            let geom_name = unique_prim_name(&format!("{}_geom", node.key), used_names);
            write_mesh_prim(
                writer,
                &geom_name,
                mesh,
                &Mat4::IDENTITY,
                node.material.map(|m| material_names[m].as_str()),
            );
            for &child in &node.children {
                write_node(writer, scene, child, material_names, used_names);
            }
            writer.close();
        }
        None => {
            writer.open(&format!("def Xform \"{}\"", name));
            write_transform(writer, &transform);
            for &child in &node.children {
                write_node(writer, scene, child, material_names, used_names);
            }
            writer.close();
        }
    }
}

fn write_mesh_prim(
    writer: &mut UsdaWriter,
    name: &str,
    mesh: &Mesh,
    transform: &Mat4,
    binding: Option<&str>,
) {
    if binding.is_some() {
        writer.blank();
        writer.line(&format!("def Mesh \"{}\" (", name));
        writer.line("    prepend apiSchemas = [\"MaterialBindingAPI\"]");
        writer.line(")");
        writer.line("{");
        writer.indent += 1;
    } else {
        writer.open(&format!("def Mesh \"{}\"", name));
    }

    write_transform(writer, transform);

    writer.line(&format!(
        "point3f[] points = [{}]",
        join_vec3s(&mesh.positions)
    ));

    let counts: Vec<String> = std::iter::repeat("3".to_string())
        .take(mesh.triangle_count())
        .collect();
    writer.line(&format!("int[] faceVertexCounts = [{}]", counts.join(", ")));

    let indices: Vec<String> = mesh.indices.iter().map(u32::to_string).collect();
    writer.line(&format!(
        "int[] faceVertexIndices = [{}]",
        indices.join(", ")
    ));

    if let Some(normals) = &mesh.normals {
        writer.line(&format!("normal3f[] normals = [{}]", join_vec3s(normals)));
    }
    if let Some(uvs) = &mesh.uvs {
        let pairs: Vec<String> = uvs
            .iter()
            .map(|uv| format!("({}, {})", fmt_f32(uv[0]), fmt_f32(uv[1])))
            .collect();
        writer.line(&format!(
            "texCoord2f[] primvars:st = [{}] (",
            pairs.join(", ")
        ));
        writer.line("    interpolation = \"vertex\"");
        writer.line(")");
    }

    if let Some(binding) = binding {
        writer.line(&format!("rel material:binding = </Materials/{}>", binding));
    }

    writer.close();
}

/// Write the local transform as a `matrix4d xformOp:transform`.
///
/// Column vectors become USD rows, matching the row-vector convention of
/// USD matrices.
fn write_transform(writer: &mut UsdaWriter, transform: &Mat4) {
    if *transform == Mat4::IDENTITY {
        return;
    }
    let cols = transform.to_cols_array_2d();
    let rows: Vec<String> = cols
        .iter()
        .map(|col| {
            format!(
                "({}, {}, {}, {})",
                fmt_f32(col[0]),
                fmt_f32(col[1]),
                fmt_f32(col[2]),
                fmt_f32(col[3])
            )
        })
        .collect();
    writer.line(&format!(
        "matrix4d xformOp:transform = ( {} )",
        rows.join(", ")
    ));
    writer.line("uniform token[] xformOpOrder = [\"xformOp:transform\"]");
}

fn write_materials_scope(writer: &mut UsdaWriter, scene: &Scene, material_names: &[String]) {
    writer.open("def Scope \"Materials\"");

    for (material, name) in scene.materials.iter().zip(material_names) {
        let surface = material.to_preview_surface();

        writer.open(&format!("def Material \"{}\"", name));
        writer.line(&format!(
            "token outputs:surface.connect = </Materials/{}/Shader.outputs:surface>",
            name
        ));

        writer.open("def Shader \"Shader\"");
        writer.line("uniform token info:id = \"UsdPreviewSurface\"");
        writer.line(&format!(
            "color3f inputs:diffuseColor = {}",
            fmt_vec3(surface.diffuse_color)
        ));
        if surface.emissive_color != Vec3::ZERO {
            writer.line(&format!(
                "color3f inputs:emissiveColor = {}",
                fmt_vec3(surface.emissive_color)
            ));
        }
        writer.line(&format!("float inputs:metallic = {}", fmt_f32(surface.metallic)));
        writer.line(&format!(
            "float inputs:roughness = {}",
            fmt_f32(surface.roughness)
        ));
        writer.line(&format!("float inputs:opacity = {}", fmt_f32(surface.opacity)));
        writer.line(&format!("float inputs:ior = {}", fmt_f32(surface.ior)));
        writer.line("token outputs:surface");
        writer.close();

        writer.close();
    }

    writer.close();
}

/// Prim names for the material table, sanitized and deduplicated.
fn material_prim_names(scene: &Scene) -> Vec<String> {
    let mut used = HashSet::new();
    scene
        .materials
        .iter()
        .enumerate()
        .map(|(id, material)| {
            let base = material
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(sanitize_identifier)
                .unwrap_or_else(|| format!("Material_{}", id));
            unique_prim_name(&base, &mut used)
        })
        .collect()
}

/// Turn an arbitrary key into a valid USD identifier.
fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Sanitize a name and suffix it until unique within the stage.
fn unique_prim_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_identifier(name);
    let mut candidate = base.clone();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn fmt_f32(v: f32) -> String {
    format!("{}", v)
}

fn fmt_vec3(v: Vec3) -> String {
    format!("({}, {}, {})", fmt_f32(v.x), fmt_f32(v.y), fmt_f32(v.z))
}

fn join_vec3s(values: &[Vec3]) -> String {
    values
        .iter()
        .map(|v| fmt_vec3(*v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::usd::loader::load_usda_from_string;
    use cadxr_math::Transform;
    use std::sync::Arc;

    fn triangle() -> Arc<Mesh> {
        Arc::new(Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
            None,
        ))
    }

    #[test]
    fn test_write_header_and_default_prim() {
        let mut scene = Scene::new("test");
        scene.add_layer("world", None).unwrap();

        let usda = write_usda_to_string(&scene);
        assert!(usda.starts_with("#usda 1.0"));
        assert!(usda.contains("defaultPrim = \"world\""));
        assert!(usda.contains("upAxis = \"Z\""));
        assert!(usda.contains("def Xform \"world\""));
    }

    #[test]
    fn test_write_mesh_arrays() {
        let mut scene = Scene::new("test");
        scene.add_mesh_node("tri", None, triangle(), None).unwrap();

        let usda = write_usda_to_string(&scene);
        assert!(usda.contains("def Mesh \"tri\""));
        assert!(usda.contains("point3f[] points = [(0, 0, 0), (1, 0, 0), (0, 1, 0)]"));
        assert!(usda.contains("int[] faceVertexCounts = [3]"));
        assert!(usda.contains("int[] faceVertexIndices = [0, 1, 2]"));
    }

    #[test]
    fn test_write_material_binding() {
        let mut scene = Scene::new("test");
        let orange = scene.add_material(Material::from_color("Orange Paint", [1.0, 0.4, 0.0, 1.0]));
        scene
            .add_mesh_node("tri", None, triangle(), Some(orange))
            .unwrap();

        let usda = write_usda_to_string(&scene);
        assert!(usda.contains("rel material:binding = </Materials/Orange_Paint>"));
        assert!(usda.contains("def Material \"Orange_Paint\""));
        assert!(usda.contains("uniform token info:id = \"UsdPreviewSurface\""));
        assert!(usda.contains("color3f inputs:diffuseColor = (1, 0.4, 0)"));
    }

    #[test]
    fn test_identity_transform_omitted() {
        let mut scene = Scene::new("test");
        scene.add_layer("world", None).unwrap();

        let usda = write_usda_to_string(&scene);
        assert!(!usda.contains("xformOp:transform"));
    }

    #[test]
    fn test_roundtrip_hierarchy_and_geometry() {
        let mut scene = Scene::new("test");
        let world = scene.add_layer("world", None).unwrap();
        scene.set_transform(
            world,
            Transform::from_translation(Vec3::new(1.0, 2.0, 3.0)),
        );
        let gray = scene.add_material(Material::from_color("gray", [0.5, 0.5, 0.5, 1.0]));
        scene
            .add_mesh_node("element", Some("world"), triangle(), Some(gray))
            .unwrap();

        let usda = write_usda_to_string(&scene);
        let loaded = load_usda_from_string(&usda, "test").unwrap();

        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.mesh_count(), 1);
        assert_eq!(loaded.material_count(), 1);

        let element = loaded.node_id("element").unwrap();
        assert_eq!(loaded.path(element), "/world/element");

        let origin = loaded
            .world_transform(element)
            .transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 3.0)).length() < 0.001);

        let material = loaded
            .material(loaded.node_by_id(element).unwrap().material.unwrap())
            .unwrap();
        let base = material
            .pbr_metallic_roughness
            .as_ref()
            .unwrap()
            .base_color_factor
            .unwrap();
        assert!((base[0] - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_roundtrip_mesh_node_with_children() {
        let mut scene = Scene::new("test");
        scene.add_mesh_node("parent", None, triangle(), None).unwrap();
        scene
            .add_mesh_node("child", Some("parent"), triangle(), None)
            .unwrap();

        let usda = write_usda_to_string(&scene);
        let loaded = load_usda_from_string(&usda, "test").unwrap();

        // Parent geometry moved into a leaf prim, subtree preserved
        assert_eq!(loaded.mesh_count(), 2);
        assert!(loaded.node("parent_geom").is_some());
        assert_eq!(
            loaded.path(loaded.node_id("child").unwrap()),
            "/parent/child"
        );
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("simple"), "simple");
        assert_eq!(sanitize_identifier("with space"), "with_space");
        assert_eq!(sanitize_identifier("3dmodel"), "_3dmodel");
        assert_eq!(sanitize_identifier(""), "_");
    }
}
