use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Floats per interleaved vertex: position then normal.
pub const VERTEX_STRIDE: usize = 6;

/// Indexed triangle mesh with interleaved `position.xyz, normal.xyz` vertices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Unit cube centred on the origin with per-face normals.
    pub fn cube() -> Self {
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        ];
        let mut mesh = Mesh::default();
        for (normal, right, up) in FACES {
            let base = mesh.vertex_count() as u32;
            for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = (normal + right * sx + up * sy) * 0.5;
                mesh.push_vertex(position, normal);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let offset = index * VERTEX_STRIDE;
        Vec3::from_slice(&self.vertices[offset..offset + 3])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        let offset = index * VERTEX_STRIDE + 3;
        Vec3::from_slice(&self.vertices[offset..offset + 3])
    }

    /// Axis-aligned bounds of the vertex positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        (0..self.vertex_count())
            .map(|i| self.position(i))
            .fold(None, |acc, p| match acc {
                None => Some((p, p)),
                Some((min, max)) => Some((min.min(p), max.max(p))),
            })
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) {
        self.vertices.extend_from_slice(&position.to_array());
        self.vertices.extend_from_slice(&normal.to_array());
    }

    fn set_normal(&mut self, index: usize, normal: Vec3) {
        let offset = index * VERTEX_STRIDE + 3;
        self.vertices[offset..offset + 3].copy_from_slice(&normal.to_array());
    }
}

/// Parses an OBJ document, such as the teapot model, into a [`Mesh`].
///
/// Only `v`, `vn` and `f` records are read. Polygons are fan-triangulated,
/// negative (relative) indices are resolved, and smooth normals are
/// generated when the file supplies none for some vertices.
pub fn load_obj_from_str(data: &str) -> Result<Mesh> {
    let mut parser = ObjParser::default();
    for (line_no, line) in data.lines().enumerate() {
        parser
            .parse_line(line)
            .with_context(|| format!("line {}: {:?}", line_no + 1, line.trim()))?;
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    position: usize,
    normal: Option<usize>,
}

#[derive(Default)]
struct ObjParser {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    // Raw 1-based or negative indices, resolved as each face is read.
    triangles: Vec<[Corner; 3]>,
}

impl ObjParser {
    fn parse_line(&mut self, line: &str) -> Result<()> {
        let line = line.split('#').next().unwrap_or_default().trim();
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => self.positions.push(parse_vec3(parts)?),
            Some("vn") => self.normals.push(parse_vec3(parts)?),
            Some("f") => {
                let corners = parts
                    .map(|part| self.parse_corner(part))
                    .collect::<Result<Vec<_>>>()?;
                if corners.len() < 3 {
                    bail!("faces must reference at least 3 vertices");
                }
                for i in 1..corners.len() - 1 {
                    self.triangles.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => {}
        }
        Ok(())
    }

    // Face corners are `v`, `v/vt`, `v//vn` or `v/vt/vn`.
    fn parse_corner(&self, token: &str) -> Result<Corner> {
        let mut fields = token.split('/');
        let position = fields
            .next()
            .filter(|field| !field.is_empty())
            .ok_or_else(|| anyhow!("missing vertex index in {token:?}"))?
            .parse::<i64>()?;
        let position = resolve_index(position, self.positions.len())
            .ok_or_else(|| anyhow!("vertex index {position} out of range"))?;
        let _texcoord = fields.next();
        let normal = match fields.next().filter(|field| !field.is_empty()) {
            Some(field) => {
                let index = field.parse::<i64>()?;
                Some(
                    resolve_index(index, self.normals.len())
                        .ok_or_else(|| anyhow!("normal index {index} out of range"))?,
                )
            }
            None => None,
        };
        Ok(Corner { position, normal })
    }

    fn finish(self) -> Result<Mesh> {
        if self.positions.is_empty() {
            bail!("OBJ file does not define any vertices");
        }

        let mut mesh = Mesh::default();
        let mut lookup: HashMap<Corner, u32> = HashMap::new();
        let mut missing_normals = false;
        for corner in self.triangles.iter().flatten() {
            let index = *lookup.entry(*corner).or_insert_with(|| {
                let normal = match corner.normal {
                    Some(i) => self.normals[i],
                    None => {
                        missing_normals = true;
                        Vec3::ZERO
                    }
                };
                let next = mesh.vertex_count() as u32;
                mesh.push_vertex(self.positions[corner.position], normal);
                next
            });
            mesh.indices.push(index);
        }

        if missing_normals {
            compute_normals(&mut mesh);
        }
        Ok(mesh)
    }
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut component = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    match index {
        i if i > 0 => {
            let zero_based = (i - 1) as usize;
            (zero_based < len).then_some(zero_based)
        }
        i if i < 0 => len.checked_sub(i.unsigned_abs() as usize),
        _ => None,
    }
}

// Area-weighted vertex normals accumulated from the triangles.
fn compute_normals(mesh: &mut Mesh) {
    let mut accum = vec![Vec3::ZERO; mesh.vertex_count()];
    for triangle in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let face = (mesh.position(b) - mesh.position(a)).cross(mesh.position(c) - mesh.position(a));
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }
    for (i, normal) in accum.into_iter().enumerate() {
        if mesh.normal(i) == Vec3::ZERO {
            mesh.set_normal(i, normal.normalize_or_zero());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.normal(0), Vec3::Z);
    }

    #[test]
    fn fan_triangulates_quads_and_resolves_negative_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf -4 -3 -2 -1\n";
        let mesh = load_obj_from_str(obj).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn keeps_supplied_normals() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 1 0\nf 1//1 2//1 3//1\n";
        let mesh = load_obj_from_str(obj).unwrap();
        for i in 0..mesh.vertex_count() {
            assert_eq!(mesh.normal(i), Vec3::Y);
        }
    }

    #[test]
    fn reports_the_offending_line() {
        let obj = "v 0 0 0\nv 1 0 0\nf 1 2 7\n";
        let err = load_obj_from_str(obj).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));
        assert!(load_obj_from_str("# empty\n").is_err());
    }

    #[test]
    fn cube_has_unit_extent_and_outward_normals() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        let (min, max) = cube.bounds().unwrap();
        assert_eq!(min, Vec3::splat(-0.5));
        assert_eq!(max, Vec3::splat(0.5));
        for i in 0..cube.vertex_count() {
            assert!(cube.position(i).dot(cube.normal(i)) > 0.0);
        }
    }
}
