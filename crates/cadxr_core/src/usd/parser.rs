//! USDA (ASCII) stage parser.
//!
//! Line-oriented parsing of the USDA patterns emitted by the writer and by
//! common DCC exports:
//!
//! - `def Xform|Scope|Mesh|Material|Shader "Name" { ... }`
//! - mesh arrays (`points`, `faceVertexCounts`, `faceVertexIndices`,
//!   `normals`, `primvars:st`)
//! - xformOps (`translate`, `rotateX/Y/Z`, `rotateXYZ`, `scale`,
//!   `transform`)
//! - `rel material:binding = </path>`
//! - UsdPreviewSurface shader inputs

use cadxr_math::{Mat4, Vec3};
use thiserror::Error;

use super::types::*;
use crate::material::PreviewSurface;

/// Errors that can occur during USDA parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("unclosed block starting at line {0}")]
    UnclosedBlock(usize),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// USDA stage parser over the file contents.
pub struct UsdaParser {
    lines: Vec<String>,
    pos: usize,
}

impl UsdaParser {
    /// Create a new parser from file contents.
    pub fn new(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
            pos: 0,
        }
    }

    /// Parse the stage and return the root prims.
    pub fn parse(&mut self) -> ParseResult<Vec<UsdPrim>> {
        self.skip_header()?;

        let mut prims = Vec::new();
        while let Some(line) = self.peek() {
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.advance();
                continue;
            }
            if trimmed.starts_with("def ") {
                prims.push(self.parse_def("")?);
            } else {
                // Stray line at root level, ignore it
                self.advance();
            }
        }
        Ok(prims)
    }

    fn peek(&self) -> Option<&str> {
        self.lines.get(self.pos).map(String::as_str)
    }

    fn advance(&mut self) -> Option<String> {
        let line = self.lines.get(self.pos).cloned();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    fn line_number(&self) -> usize {
        self.pos + 1
    }

    /// Skip `#usda` comments and the parenthesized stage metadata block.
    fn skip_header(&mut self) -> ParseResult<()> {
        while let Some(line) = self.peek() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.advance();
            } else if trimmed.starts_with('(') {
                self.consume_balanced('(', ')', 0)?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Consume lines until open/close characters balance out.
    ///
    /// `depth` is the number of already-seen opens (1 when the opening
    /// character sat on a line consumed by the caller).
    fn consume_balanced(&mut self, open: char, close: char, mut depth: isize) -> ParseResult<String> {
        let start_line = self.line_number();
        let mut consumed = String::new();
        loop {
            let line = self.advance().ok_or(ParseError::UnclosedBlock(start_line))?;
            depth += line.matches(open).count() as isize;
            depth -= line.matches(close).count() as isize;
            consumed.push_str(&line);
            consumed.push('\n');
            if depth <= 0 {
                return Ok(consumed);
            }
        }
    }

    /// Parse a `def Type "Name"` prim, consuming its whole block.
    fn parse_def(&mut self, parent_path: &str) -> ParseResult<UsdPrim> {
        let start_line = self.line_number();
        let line = self.advance().ok_or(ParseError::UnexpectedEof)?;
        let trimmed = line.trim();

        let rest = trimmed.strip_prefix("def ").ok_or_else(|| ParseError::Parse {
            line: start_line,
            message: format!("expected def, got: {}", trimmed),
        })?;

        let prim_type = rest.split_whitespace().next().unwrap_or("").to_string();
        let name = extract_quoted(rest).unwrap_or_default().to_string();
        let path = format!("{}/{}", parent_path, name);

        // Optional prim metadata in parentheses (apiSchemas etc.), either
        // inline on the def line or spanning following lines
        let opens_meta = rest.contains('(') && !rest.contains(')');
        if opens_meta {
            self.consume_balanced('(', ')', 1)?;
        } else if self.peek().map(|l| l.trim_start().starts_with('(')) == Some(true) {
            self.consume_balanced('(', ')', 0)?;
        }

        // Opening brace may sit on the def line or the next one
        if !trimmed.contains('{') {
            match self.advance() {
                Some(line) if line.trim() == "{" => {}
                _ => {
                    return Err(ParseError::Parse {
                        line: start_line,
                        message: "expected opening brace".to_string(),
                    })
                }
            }
        }

        match prim_type.as_str() {
            "Xform" | "Scope" => self.parse_xform_block(&path, &name, start_line),
            "Mesh" => self.parse_mesh_block(&path, &name, start_line),
            "Material" => self.parse_material_block(&path, &name, start_line),
            _ => {
                self.skip_block(start_line)?;
                Ok(UsdPrim::Unknown(prim_type))
            }
        }
    }

    /// Skip to the closing brace of the current block.
    fn skip_block(&mut self, start_line: usize) -> ParseResult<()> {
        let mut depth = 1isize;
        while depth > 0 {
            let line = self.advance().ok_or(ParseError::UnclosedBlock(start_line))?;
            depth += line.matches('{').count() as isize;
            depth -= line.matches('}').count() as isize;
        }
        Ok(())
    }

    fn parse_xform_block(&mut self, path: &str, name: &str, start_line: usize) -> ParseResult<UsdPrim> {
        let mut xform = UsdXform {
            path: path.to_string(),
            name: name.to_string(),
            transform: Mat4::IDENTITY,
            ..Default::default()
        };
        let mut ops = Vec::new();

        loop {
            let trimmed = match self.peek() {
                Some(line) => line.trim().to_string(),
                None => return Err(ParseError::UnclosedBlock(start_line)),
            };

            if trimmed == "}" {
                self.advance();
                break;
            }
            if trimmed.starts_with("def ") {
                let child = self.parse_def(path)?;
                xform.children.push(child);
                continue;
            }

            self.advance();
            if let Some(op) = self.parse_xform_op(&trimmed)? {
                ops.push(op);
            }
        }

        xform.transform = compose_xform_ops(&ops);
        Ok(UsdPrim::Xform(xform))
    }

    fn parse_mesh_block(&mut self, path: &str, name: &str, start_line: usize) -> ParseResult<UsdPrim> {
        let mut mesh = UsdMesh {
            path: path.to_string(),
            name: name.to_string(),
            transform: Mat4::IDENTITY,
            ..Default::default()
        };
        let mut ops = Vec::new();

        loop {
            let trimmed = match self.peek() {
                Some(line) => line.trim().to_string(),
                None => return Err(ParseError::UnclosedBlock(start_line)),
            };

            if trimmed == "}" {
                self.advance();
                break;
            }
            if trimmed.starts_with("def ") {
                // Nested prims under meshes (e.g. GeomSubset) are skipped
                self.parse_def(path)?;
                continue;
            }

            self.advance();

            if let Some(op) = self.parse_xform_op(&trimmed)? {
                ops.push(op);
            } else if is_attr(&trimmed, "points") {
                mesh.points = self.collect_vec3_array(&trimmed)?;
            } else if is_attr(&trimmed, "faceVertexCounts") {
                mesh.face_vertex_counts = self.collect_uint_array(&trimmed)?;
            } else if is_attr(&trimmed, "faceVertexIndices") {
                mesh.face_vertex_indices = self.collect_uint_array(&trimmed)?;
            } else if is_attr(&trimmed, "normals") {
                mesh.normals = Some(self.collect_vec3_array(&trimmed)?);
            } else if is_attr(&trimmed, "primvars:st") {
                mesh.uvs = Some(self.collect_vec2_array(&trimmed)?);
            } else if trimmed.starts_with("rel material:binding") {
                mesh.material_binding = extract_prim_path(&trimmed);
            }
        }

        mesh.transform = compose_xform_ops(&ops);
        Ok(UsdPrim::Mesh(mesh))
    }

    fn parse_material_block(&mut self, path: &str, name: &str, start_line: usize) -> ParseResult<UsdPrim> {
        let mut surface = PreviewSurface {
            name: name.to_string(),
            ..Default::default()
        };

        loop {
            let trimmed = match self.peek() {
                Some(line) => line.trim().to_string(),
                None => return Err(ParseError::UnclosedBlock(start_line)),
            };

            if trimmed == "}" {
                self.advance();
                break;
            }
            if trimmed.starts_with("def Shader") {
                self.parse_shader_block(&mut surface)?;
                continue;
            }
            if trimmed.starts_with("def ") {
                self.parse_def(path)?;
                continue;
            }
            self.advance();
        }

        Ok(UsdPrim::Material(UsdMaterial {
            path: path.to_string(),
            name: name.to_string(),
            surface,
        }))
    }

    /// Parse a `def Shader` block, reading UsdPreviewSurface inputs into
    /// the material's surface parameters.
    fn parse_shader_block(&mut self, surface: &mut PreviewSurface) -> ParseResult<()> {
        let start_line = self.line_number();
        let line = self.advance().ok_or(ParseError::UnexpectedEof)?;
        if !line.contains('{') {
            match self.advance() {
                Some(l) if l.trim() == "{" => {}
                _ => {
                    return Err(ParseError::Parse {
                        line: start_line,
                        message: "expected opening brace".to_string(),
                    })
                }
            }
        }

        loop {
            let trimmed = match self.advance() {
                Some(line) => line.trim().to_string(),
                None => return Err(ParseError::UnclosedBlock(start_line)),
            };
            if trimmed == "}" {
                break;
            }

            match shader_input_name(&trimmed) {
                Some("inputs:diffuseColor") => surface.diffuse_color = parse_vec3_value(&trimmed)?,
                Some("inputs:emissiveColor") => {
                    surface.emissive_color = parse_vec3_value(&trimmed)?
                }
                Some("inputs:metallic") => surface.metallic = parse_float_value(&trimmed)?,
                Some("inputs:roughness") => surface.roughness = parse_float_value(&trimmed)?,
                Some("inputs:opacity") => surface.opacity = parse_float_value(&trimmed)?,
                Some("inputs:ior") => surface.ior = parse_float_value(&trimmed)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Parse a single xformOp attribute line.
    fn parse_xform_op(&mut self, line: &str) -> ParseResult<Option<XformOp>> {
        if !line.contains("xformOp:") || line.contains("xformOpOrder") || !line.contains('=') {
            return Ok(None);
        }

        if line.contains("xformOp:transform") {
            let content = self.collect_value_text(line, '(', ')')?;
            let rows = extract_tuples(&content);
            if rows.len() != 4 || rows.iter().any(|r| r.len() != 4) {
                return Err(ParseError::InvalidNumber(content));
            }
            let mut cols = [[0.0f32; 4]; 4];
            for (i, row) in rows.iter().enumerate() {
                cols[i] = [row[0], row[1], row[2], row[3]];
            }
            return Ok(Some(XformOp::Transform(Mat4::from_cols_array_2d(&cols))));
        }
        if line.contains("xformOp:translate") {
            return Ok(Some(XformOp::Translate(parse_vec3_value(line)?)));
        }
        if line.contains("xformOp:rotateXYZ") {
            return Ok(Some(XformOp::RotateXyz(parse_vec3_value(line)?)));
        }
        if line.contains("xformOp:rotateX") {
            return Ok(Some(XformOp::RotateX(parse_float_value(line)?)));
        }
        if line.contains("xformOp:rotateY") {
            return Ok(Some(XformOp::RotateY(parse_float_value(line)?)));
        }
        if line.contains("xformOp:rotateZ") {
            return Ok(Some(XformOp::RotateZ(parse_float_value(line)?)));
        }
        if line.contains("xformOp:scale") {
            return Ok(Some(XformOp::Scale(parse_vec3_value(line)?)));
        }
        Ok(None)
    }

    /// Collect the text of an attribute value that may span multiple lines,
    /// delimited by `open`/`close` after the `=` sign.
    fn collect_value_text(&mut self, first_line: &str, open: char, close: char) -> ParseResult<String> {
        let after_eq = match first_line.find('=') {
            Some(pos) => &first_line[pos + 1..],
            None => first_line,
        };

        let start = match after_eq.find(open) {
            Some(pos) => pos,
            None => return Ok(String::new()),
        };
        let mut content = after_eq[start..].to_string();
        let mut depth = content.matches(open).count() as isize - content.matches(close).count() as isize;

        while depth > 0 {
            let line = self.advance().ok_or(ParseError::UnexpectedEof)?;
            depth += line.matches(open).count() as isize;
            depth -= line.matches(close).count() as isize;
            content.push(' ');
            content.push_str(&line);
        }

        // Drop anything after the matching close (trailing primvar metadata)
        if let Some(end) = find_balanced_end(&content, open, close) {
            content.truncate(end + 1);
        }
        Ok(content)
    }

    fn collect_vec3_array(&mut self, first_line: &str) -> ParseResult<Vec<Vec3>> {
        let content = self.collect_value_text(first_line, '[', ']')?;
        Ok(extract_tuples(&content)
            .into_iter()
            .filter(|t| t.len() == 3)
            .map(|t| Vec3::new(t[0], t[1], t[2]))
            .collect())
    }

    fn collect_vec2_array(&mut self, first_line: &str) -> ParseResult<Vec<[f32; 2]>> {
        let content = self.collect_value_text(first_line, '[', ']')?;
        Ok(extract_tuples(&content)
            .into_iter()
            .filter(|t| t.len() == 2)
            .map(|t| [t[0], t[1]])
            .collect())
    }

    fn collect_uint_array(&mut self, first_line: &str) -> ParseResult<Vec<u32>> {
        let content = self.collect_value_text(first_line, '[', ']')?;
        let inner = content.trim().trim_start_matches('[').trim_end_matches(']');
        inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<u32>().map_err(|_| ParseError::InvalidNumber(s.to_string())))
            .collect()
    }
}

/// The `inputs:*` attribute a shader line assigns a literal value to.
///
/// Returns the exact attribute token, so `inputs:opacity` never matches an
/// `inputs:opacityThreshold` line. Texture connections
/// (`inputs:x.connect = </path>`) carry no literal value and yield `None`.
fn shader_input_name(line: &str) -> Option<&str> {
    let lhs = line.split('=').next()?;
    let token = lhs.split_whitespace().last()?;
    if token.ends_with(".connect") || !token.starts_with("inputs:") {
        return None;
    }
    Some(token)
}

/// Whether a line declares the given attribute (type prefix ignored).
fn is_attr(line: &str, attr: &str) -> bool {
    line.split('=')
        .next()
        .map(|lhs| lhs.split_whitespace().any(|tok| tok == attr))
        .unwrap_or(false)
}

/// Extract the first double-quoted string from a line.
fn extract_quoted(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let end = start + line[start..].find('"')?;
    Some(&line[start..end])
}

/// Extract a `</prim/path>` target from a relationship line.
fn extract_prim_path(line: &str) -> Option<String> {
    let start = line.find('<')? + 1;
    let end = start + line[start..].find('>')?;
    Some(line[start..end].to_string())
}

/// Find the index of the close char balancing the first open char.
fn find_balanced_end(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0isize;
    for (i, c) in text.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Extract all `(a, b, ...)` tuples from text as float vectors.
///
/// Only innermost parenthesized groups are treated as tuples, so matrix
/// values `( (..), (..) )` yield the four rows.
fn extract_tuples(text: &str) -> Vec<Vec<f32>> {
    let mut tuples = Vec::new();
    let mut current: Option<String> = None;

    for c in text.chars() {
        match c {
            '(' => current = Some(String::new()),
            ')' => {
                if let Some(body) = current.take() {
                    let values: Vec<f32> = body
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .filter_map(|s| s.parse::<f32>().ok())
                        .collect();
                    if !values.is_empty() {
                        tuples.push(values);
                    }
                }
            }
            _ => {
                if let Some(body) = current.as_mut() {
                    body.push(c);
                }
            }
        }
    }
    tuples
}

/// Parse a `(x, y, z)` value after the `=` sign.
fn parse_vec3_value(line: &str) -> ParseResult<Vec3> {
    let after_eq = line.split('=').nth(1).unwrap_or(line);
    let tuples = extract_tuples(after_eq);
    match tuples.first() {
        Some(t) if t.len() == 3 => Ok(Vec3::new(t[0], t[1], t[2])),
        _ => Err(ParseError::InvalidNumber(line.to_string())),
    }
}

/// Parse a scalar float value after the `=` sign.
fn parse_float_value(line: &str) -> ParseResult<f32> {
    let after_eq = line.split('=').nth(1).unwrap_or("").trim();
    after_eq
        .parse::<f32>()
        .map_err(|_| ParseError::InvalidNumber(after_eq.to_string()))
}

/// Parse a USDA string and return the list of root prims.
pub fn parse_usda(content: &str) -> ParseResult<Vec<UsdPrim>> {
    UsdaParser::new(content).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_mesh() {
        let usda = r#"#usda 1.0
(
    upAxis = "Z"
)

def Mesh "Cube"
{
    point3f[] points = [(0, 0, 0), (1, 0, 0), (1, 1, 0), (0, 1, 0)]
    int[] faceVertexCounts = [4]
    int[] faceVertexIndices = [0, 1, 2, 3]
}
"#;

        let prims = parse_usda(usda).unwrap();
        assert_eq!(prims.len(), 1);

        let UsdPrim::Mesh(mesh) = &prims[0] else {
            panic!("expected Mesh prim");
        };
        assert_eq!(mesh.name, "Cube");
        assert_eq!(mesh.points.len(), 4);
        assert_eq!(mesh.face_vertex_counts, vec![4]);
        assert_eq!(mesh.face_vertex_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_multiline_array() {
        let usda = r#"
def Mesh "Tri"
{
    point3f[] points = [(0, 0, 0),
        (1, 0, 0),
        (0.5, 1, 0)]
    int[] faceVertexCounts = [3]
    int[] faceVertexIndices = [0, 1, 2]
}
"#;
        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Mesh(mesh) = &prims[0] else {
            panic!("expected Mesh prim");
        };
        assert_eq!(mesh.points.len(), 3);
        assert!((mesh.points[2].x - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_xform_with_ops() {
        let usda = r#"
def Xform "Model"
{
    double3 xformOp:translate = (1, 2, 3)
    double3 xformOp:scale = (2, 2, 2)
    uniform token[] xformOpOrder = ["xformOp:translate", "xformOp:scale"]
}
"#;

        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Xform(xform) = &prims[0] else {
            panic!("expected Xform prim");
        };
        assert_eq!(xform.name, "Model");
        let origin = xform.transform.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 3.0)).length() < 0.001);
    }

    #[test]
    fn test_parse_transform_matrix() {
        let usda = r#"
def Xform "Model"
{
    matrix4d xformOp:transform = ( (1, 0, 0, 0), (0, 1, 0, 0), (0, 0, 1, 0), (4, 5, 6, 1) )
    uniform token[] xformOpOrder = ["xformOp:transform"]
}
"#;
        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Xform(xform) = &prims[0] else {
            panic!("expected Xform prim");
        };
        let origin = xform.transform.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(4.0, 5.0, 6.0)).length() < 0.001);
    }

    #[test]
    fn test_parse_nested_hierarchy() {
        let usda = r#"
def Xform "world"
{
    def Xform "group"
    {
        def Mesh "element"
        {
            point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
            int[] faceVertexCounts = [3]
            int[] faceVertexIndices = [0, 1, 2]
        }
    }
}
"#;
        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Xform(world) = &prims[0] else {
            panic!("expected Xform prim");
        };
        let UsdPrim::Xform(group) = &world.children[0] else {
            panic!("expected nested Xform");
        };
        let UsdPrim::Mesh(mesh) = &group.children[0] else {
            panic!("expected nested Mesh");
        };
        assert_eq!(mesh.path, "/world/group/element");
    }

    #[test]
    fn test_parse_material_binding() {
        let usda = r#"
def Mesh "element" (
    prepend apiSchemas = ["MaterialBindingAPI"]
)
{
    point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
    int[] faceVertexCounts = [3]
    int[] faceVertexIndices = [0, 1, 2]
    rel material:binding = </Materials/Plaster>
}
"#;
        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Mesh(mesh) = &prims[0] else {
            panic!("expected Mesh prim");
        };
        assert_eq!(mesh.material_binding.as_deref(), Some("/Materials/Plaster"));
    }

    #[test]
    fn test_parse_preview_surface() {
        let usda = r#"
def Material "Plaster"
{
    token outputs:surface.connect = </Materials/Plaster/Shader.outputs:surface>

    def Shader "Shader"
    {
        uniform token info:id = "UsdPreviewSurface"
        color3f inputs:diffuseColor = (1, 0.4, 0)
        float inputs:metallic = 0
        float inputs:roughness = 0.5
        float inputs:opacity = 1
        token outputs:surface
    }
}
"#;
        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Material(material) = &prims[0] else {
            panic!("expected Material prim");
        };
        assert_eq!(material.name, "Plaster");
        assert!((material.surface.diffuse_color.y - 0.4).abs() < 0.001);
        assert!((material.surface.roughness - 0.5).abs() < 0.001);
        assert_eq!(material.surface.metallic, 0.0);
    }

    #[test]
    fn test_texture_connected_inputs_skipped() {
        let usda = r#"
def Material "Plaster"
{
    def Shader "Shader"
    {
        uniform token info:id = "UsdPreviewSurface"
        color3f inputs:diffuseColor.connect = </Materials/Plaster/Tex.outputs:rgb>
        float inputs:roughness = 0.3
        token outputs:surface
    }
}
"#;
        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Material(material) = &prims[0] else {
            panic!("expected Material prim");
        };
        // The connection is not a literal color; the default stays
        assert!((material.surface.diffuse_color.x - 0.5).abs() < 0.001);
        assert!((material.surface.roughness - 0.3).abs() < 0.001);
    }

    #[test]
    fn test_opacity_threshold_does_not_clobber_opacity() {
        let usda = r#"
def Material "Cutout"
{
    def Shader "Shader"
    {
        uniform token info:id = "UsdPreviewSurface"
        float inputs:opacityThreshold = 0.25
    }
}
"#;
        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Material(material) = &prims[0] else {
            panic!("expected Material prim");
        };
        assert_eq!(material.surface.opacity, 1.0);
    }

    #[test]
    fn test_parse_primvars_st_with_metadata() {
        let usda = r#"
def Mesh "quad"
{
    point3f[] points = [(0, 0, 0), (1, 0, 0), (1, 1, 0), (0, 1, 0)]
    int[] faceVertexCounts = [4]
    int[] faceVertexIndices = [0, 1, 2, 3]
    texCoord2f[] primvars:st = [(0, 0), (1, 0), (1, 1), (0, 1)] (
        interpolation = "vertex"
    )
}
"#;
        let prims = parse_usda(usda).unwrap();
        let UsdPrim::Mesh(mesh) = &prims[0] else {
            panic!("expected Mesh prim");
        };
        let uvs = mesh.uvs.as_ref().unwrap();
        assert_eq!(uvs.len(), 4);
        assert_eq!(uvs[2], [1.0, 1.0]);
    }

    #[test]
    fn test_unknown_prim_skipped() {
        let usda = r#"
def Camera "cam"
{
    float focalLength = 50
}

def Mesh "tri"
{
    point3f[] points = [(0, 0, 0), (1, 0, 0), (0.5, 1, 0)]
    int[] faceVertexCounts = [3]
    int[] faceVertexIndices = [0, 1, 2]
}
"#;
        let prims = parse_usda(usda).unwrap();
        assert_eq!(prims.len(), 2);
        assert!(matches!(&prims[0], UsdPrim::Unknown(t) if t == "Camera"));
        assert!(matches!(&prims[1], UsdPrim::Mesh(_)));
    }

    #[test]
    fn test_unclosed_block_is_error() {
        let usda = "def Xform \"world\"\n{\n    def Mesh \"m\"\n    {\n";
        assert!(parse_usda(usda).is_err());
    }
}
