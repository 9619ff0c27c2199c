//! cadxr command line tool.
//!
//! Converts between the supported scene formats and prints scene
//! statistics. Formats are chosen by file extension: `.usda`, `.gltf`,
//! `.glb`, and `.obj` (input only).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use cadxr_core::gltf::{export_gltf, load_gltf};
use cadxr_core::usd::{load_usda, write_usda};
use cadxr_core::{Mesh, Scene};

#[derive(Parser)]
#[command(name = "cadxr", version, about = "Convert and inspect CAD/XR scene files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a scene file to another format
    Convert {
        /// Input file (.usda, .gltf, .glb, .obj)
        input: PathBuf,

        /// Output file (.usda, .gltf, .glb)
        output: PathBuf,

        /// Embed buffers and textures into .gltf output
        #[arg(long)]
        embed: bool,
    },

    /// Print scene statistics
    Info {
        /// Input file (.usda, .gltf, .glb, .obj)
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Usda,
    Gltf,
    Obj,
}

fn detect_format(path: &Path) -> Option<Format> {
    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "usd" | "usda" => Some(Format::Usda),
        "gltf" | "glb" => Some(Format::Gltf),
        "obj" => Some(Format::Obj),
        _ => None,
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            input,
            output,
            embed,
        } => convert(&input, &output, embed),
        Command::Info { input } => info(&input),
    }
}

fn convert(input: &Path, output: &Path, embed: bool) -> Result<()> {
    let scene = load_scene(input)?;

    match detect_format(output) {
        Some(Format::Usda) => write_usda(&scene, output)
            .with_context(|| format!("writing {}", output.display()))?,
        Some(Format::Gltf) => export_gltf(&scene, output, embed)
            .with_context(|| format!("writing {}", output.display()))?,
        Some(Format::Obj) => bail!("OBJ output is not supported"),
        None => bail!("unrecognized output format: {}", output.display()),
    }

    log::info!(
        "converted {} ({} nodes, {} triangles)",
        scene.name,
        scene.node_count(),
        scene.total_triangle_count()
    );
    println!(
        "{} -> {} ({} nodes, {} triangles)",
        input.display(),
        output.display(),
        scene.node_count(),
        scene.total_triangle_count()
    );
    Ok(())
}

fn info(input: &Path) -> Result<()> {
    let scene = load_scene(input)?;

    println!("scene:     {}", scene.name);
    println!("nodes:     {}", scene.node_count());
    println!("meshes:    {}", scene.mesh_count());
    println!("materials: {}", scene.material_count());
    println!("triangles: {}", scene.total_triangle_count());

    let bounds = scene.world_bounds();
    if bounds.is_empty() {
        println!("bounds:    (no geometry)");
    } else {
        println!(
            "bounds:    min ({:.3}, {:.3}, {:.3}) max ({:.3}, {:.3}, {:.3})",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
    }

    for id in scene.traverse() {
        if let Some(node) = scene.node_by_id(id) {
            let detail = match &node.mesh {
                Some(mesh) => format!(" [{} tris]", mesh.triangle_count()),
                None => String::new(),
            };
            println!("  {}{}", scene.path(id), detail);
        }
    }
    Ok(())
}

fn load_scene(input: &Path) -> Result<Scene> {
    match detect_format(input) {
        Some(Format::Usda) => {
            load_usda(input).with_context(|| format!("loading {}", input.display()))
        }
        Some(Format::Gltf) => {
            load_gltf(input).with_context(|| format!("loading {}", input.display()))
        }
        Some(Format::Obj) => {
            // A bare mesh becomes a single-node scene named after the file
            let name = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("mesh")
                .to_string();
            let mut mesh = Mesh::from_obj(input)
                .with_context(|| format!("loading {}", input.display()))?;
            mesh.ensure_normals();

            let mut scene = Scene::new(&name);
            scene.add_mesh_node(&name, None, Arc::new(mesh), None)?;
            Ok(scene)
        }
        None => bail!("unrecognized input format: {}", input.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("a.usda")), Some(Format::Usda));
        assert_eq!(detect_format(Path::new("a.USD")), Some(Format::Usda));
        assert_eq!(detect_format(Path::new("a.glb")), Some(Format::Gltf));
        assert_eq!(detect_format(Path::new("a.gltf")), Some(Format::Gltf));
        assert_eq!(detect_format(Path::new("a.obj")), Some(Format::Obj));
        assert_eq!(detect_format(Path::new("a.step")), None);
        assert_eq!(detect_format(Path::new("noext")), None);
    }

    #[test]
    fn test_convert_usda_to_glb() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.usda");
        let output = dir.path().join("out.glb");
        std::fs::write(
            &input,
            r#"
def Mesh "tri"
{
    point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
    int[] faceVertexCounts = [3]
    int[] faceVertexIndices = [0, 1, 2]
}
"#,
        )
        .unwrap();

        convert(&input, &output, true).unwrap();

        let loaded = load_gltf(&output).unwrap();
        assert_eq!(loaded.total_triangle_count(), 1);
    }

    #[test]
    fn test_convert_rejects_unknown_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.usda");
        std::fs::write(&input, "def Xform \"w\"\n{\n}\n").unwrap();

        assert!(convert(&input, &dir.path().join("out.step"), false).is_err());
    }
}
