use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3};

use crate::obj::Mesh;
use crate::scene::{Shape, ShapeKind};

/// Camera state consumed by the renderer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Directional light consumed by the renderer.
#[derive(Clone, Debug)]
pub struct LightParams {
    /// Points from the surface towards the light; normalized.
    pub reverse_direction: Vec3,
    pub ambient: f32,
}

/// Meshes available for each shape kind. Kinds without a mesh are skipped
/// when drawing, which is the case for the teapot until its OBJ has loaded.
#[derive(Debug, Clone)]
pub struct MeshLibrary {
    meshes: HashMap<ShapeKind, Mesh>,
}

impl Default for MeshLibrary {
    fn default() -> Self {
        let mut meshes = HashMap::new();
        meshes.insert(ShapeKind::Cube, Mesh::cube());
        Self { meshes }
    }
}

impl MeshLibrary {
    pub fn insert(&mut self, kind: ShapeKind, mesh: Mesh) {
        self.meshes.insert(kind, mesh);
    }

    pub fn get(&self, kind: ShapeKind) -> Option<&Mesh> {
        self.meshes.get(&kind)
    }

    pub fn contains(&self, kind: ShapeKind) -> bool {
        self.meshes.contains_key(&kind)
    }
}

/// A lit triangle in canvas pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenTriangle {
    pub points: [Vec2; 3],
    /// Mean NDC depth; larger is further away.
    pub depth: f32,
    pub color: Vec3,
}

/// Projects every visible, front-facing triangle of `shapes` and returns
/// them sorted back to front.
pub fn build_draw_list(
    shapes: &[Shape],
    meshes: &MeshLibrary,
    camera: &CameraParams,
    light: &LightParams,
    viewport: (u32, u32),
) -> Vec<ScreenTriangle> {
    let size = Vec2::new(viewport.0 as f32, viewport.1 as f32);
    let mut triangles = Vec::new();

    for shape in shapes {
        let Some(mesh) = meshes.get(shape.kind) else {
            continue;
        };
        let model = shape.model_matrix();
        let mvp = camera.view_proj * model;
        let normal_matrix = model.inverse().transpose();

        for triangle in mesh.indices.chunks_exact(3) {
            let corners = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let clip = corners.map(|i| mvp * mesh.position(i).extend(1.0));
            if clip.iter().any(|c| c.w <= f32::EPSILON) {
                continue;
            }
            let ndc = clip.map(|c| c.truncate() / c.w);
            let [a, b, c] = ndc.map(Vec3::truncate);
            let winding = (b - a).perp_dot(c - a);
            if winding <= 0.0 {
                continue;
            }

            let normal = corners
                .iter()
                .map(|&i| normal_matrix.transform_vector3(mesh.normal(i)))
                .sum::<Vec3>()
                .normalize_or_zero();
            let diffuse = normal.dot(light.reverse_direction).max(0.0);
            let brightness = light.ambient + (1.0 - light.ambient) * diffuse;

            triangles.push(ScreenTriangle {
                points: ndc.map(|p| Vec2::new((p.x + 1.0) * 0.5, (1.0 - p.y) * 0.5) * size),
                depth: (ndc[0].z + ndc[1].z + ndc[2].z) / 3.0,
                color: shape.color * brightness,
            });
        }
    }

    triangles.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Camera;

    fn front_camera() -> CameraParams {
        let camera = Camera {
            translation: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            ..Camera::default()
        };
        CameraParams {
            view_proj: camera.view_projection(1.0),
            position: camera.translation,
        }
    }

    fn light() -> LightParams {
        LightParams {
            reverse_direction: Vec3::Z,
            ambient: 0.2,
        }
    }

    #[test]
    fn cube_facing_the_camera_is_drawn_lit() {
        let cube = Shape::new("Cube", ShapeKind::Cube);
        let list = build_draw_list(&[cube], &MeshLibrary::default(), &front_camera(), &light(), (100, 100));
        // Only the face towards the camera is front-facing from straight on.
        assert_eq!(list.len(), 2);
        for triangle in &list {
            assert!((triangle.color - Vec3::ONE).length() < 1e-4);
            for point in triangle.points {
                assert!(point.x > 0.0 && point.x < 100.0);
                assert!(point.y > 0.0 && point.y < 100.0);
            }
        }
    }

    #[test]
    fn shapes_without_a_mesh_are_skipped() {
        let teapot = Shape::new("Teapot", ShapeKind::Teapot);
        let meshes = MeshLibrary::default();
        assert!(!meshes.contains(ShapeKind::Teapot));
        assert!(build_draw_list(&[teapot], &meshes, &front_camera(), &light(), (10, 10)).is_empty());
    }

    #[test]
    fn draw_list_is_sorted_back_to_front() {
        let mut near = Shape::new("Near", ShapeKind::Cube);
        near.translation = Vec3::new(0.0, 0.0, 2.0);
        near.rotation = Vec3::new(20.0, 30.0, 0.0);
        let mut far = Shape::new("Far", ShapeKind::Cube);
        far.translation = Vec3::new(0.0, 0.0, -4.0);
        far.rotation = Vec3::new(20.0, 30.0, 0.0);
        let list = build_draw_list(&[near, far], &MeshLibrary::default(), &front_camera(), &light(), (64, 64));
        assert!(list.len() > 2);
        assert!(list.windows(2).all(|pair| pair[0].depth >= pair[1].depth));
    }
}
