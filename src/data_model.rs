use std::str::FromStr;
use std::sync::Arc;

use glam::Vec3;
use log::{debug, trace};
use parking_lot::RwLock;

use crate::animation::{Pose, PoseSink};
use crate::error::SceneError;
use crate::scene::{hex_to_rgb, Camera, Scene, Shape, ShapeKind};

/// Vector component addressed by a UI control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn set(self, vector: &mut Vec3, value: f32) {
        match self {
            Self::X => vector.x = value,
            Self::Y => vector.y = value,
            Self::Z => vector.z = value,
        }
    }
}

impl FromStr for Axis {
    type Err = SceneError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "x" | "X" | "0" => Ok(Self::X),
            "y" | "Y" | "1" => Ok(Self::Y),
            "z" | "Z" | "2" => Ok(Self::Z),
            other => Err(SceneError::UnknownAxis(other.to_string())),
        }
    }
}

/// A single change requested by the viewer's controls.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Translation(Axis, f32),
    Rotation(Axis, f32),
    Scale(Axis, f32),
    Color(String),
    CameraTranslation(Axis, f32),
    CameraRotation(Axis, f32),
    LookAtTarget(Axis, f32),
    ToggleLookAt(bool),
    FieldOfView(f32),
    LightDirection(Axis, f32),
    /// Appends a shape at the origin with scale 20.
    AddShape { kind: ShapeKind, color: String },
    DeleteShape(usize),
    SelectShape(usize),
}

#[derive(Debug, Clone)]
struct ViewState {
    shapes: Vec<Shape>,
    camera: Camera,
    light_direction: Vec3,
    selected: Option<usize>,
}

/// Thread-safe container mirroring the mutable state of the scene.
///
/// Clones share storage, so the renderer, the UI handlers and the pour
/// animation all observe the same shapes.
#[derive(Debug)]
pub struct DataModel {
    state: Arc<RwLock<ViewState>>,
}

impl Clone for DataModel {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for DataModel {
    fn default() -> Self {
        Self::from_shapes(Vec::new())
    }
}

impl DataModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scene(scene: &Scene) -> Self {
        let selected = (!scene.shapes.is_empty()).then_some(0);
        Self {
            state: Arc::new(RwLock::new(ViewState {
                shapes: scene.shapes.clone(),
                camera: scene.camera,
                light_direction: scene.light_direction,
                selected,
            })),
        }
    }

    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        let scene = Scene {
            shapes,
            ..Scene::default_scene()
        };
        Self::from_scene(&scene)
    }

    /// Replaces the stored shapes with a new snapshot.
    pub fn replace_shapes(&self, shapes: Vec<Shape>) {
        let mut state = self.state.write();
        state.selected = (!shapes.is_empty()).then_some(0);
        state.shapes = shapes;
    }

    /// Appends `shape`, selecting it when the store was empty, and returns
    /// its index.
    pub fn push_shape(&self, shape: Shape) -> usize {
        let mut state = self.state.write();
        state.shapes.push(shape);
        let index = state.shapes.len() - 1;
        state.selected.get_or_insert(index);
        index
    }

    /// Returns a snapshot of all stored shapes.
    pub fn all_shapes(&self) -> Vec<Shape> {
        self.state.read().shapes.clone()
    }

    pub fn camera(&self) -> Camera {
        self.state.read().camera
    }

    pub fn light_direction(&self) -> Vec3 {
        self.state.read().light_direction
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.read().selected
    }

    pub fn selected_shape(&self) -> Option<Shape> {
        let state = self.state.read();
        state.selected.and_then(|i| state.shapes.get(i).cloned())
    }

    /// Returns a clone of the requested shape.
    pub fn get(&self, name: &str) -> Option<Shape> {
        self.state
            .read()
            .shapes
            .iter()
            .find(|shape| shape.name == name)
            .cloned()
    }

    /// Applies a mutation to the requested shape.
    pub fn update<F, R>(&self, name: &str, updater: F) -> Option<R>
    where
        F: FnOnce(&mut Shape) -> R,
    {
        let mut state = self.state.write();
        let shape = state.shapes.iter_mut().find(|shape| shape.name == name)?;
        Some(updater(shape))
    }

    pub fn set_pose(&self, name: &str, pose: &Pose) -> bool {
        self.update(name, |shape| shape.set_pose(pose)).is_some()
    }

    pub fn set_color(&self, name: &str, color: Vec3) -> bool {
        self.update(name, |shape| shape.color = color).is_some()
    }

    /// Returns a sink writing poses into the shape called `name`.
    pub fn pose_target(&self, name: impl Into<String>) -> ShapeTarget {
        ShapeTarget {
            model: self.clone(),
            name: name.into(),
        }
    }

    /// Applies a control change. Shape edits target the selected shape and
    /// are ignored when nothing is selected.
    pub fn apply(&self, edit: Edit) -> Result<(), SceneError> {
        debug!("applying edit {edit:?}");
        let mut state = self.state.write();
        match edit {
            Edit::Translation(axis, value) => {
                if let Some(shape) = selected_mut(&mut state) {
                    axis.set(&mut shape.translation, value);
                }
            }
            Edit::Rotation(axis, value) => {
                if let Some(shape) = selected_mut(&mut state) {
                    axis.set(&mut shape.rotation, value);
                }
            }
            Edit::Scale(axis, value) => {
                if let Some(shape) = selected_mut(&mut state) {
                    axis.set(&mut shape.scale, value);
                }
            }
            Edit::Color(hex) => {
                let color = hex_to_rgb(&hex)?;
                if let Some(shape) = selected_mut(&mut state) {
                    shape.color = color;
                }
            }
            Edit::CameraTranslation(axis, value) => axis.set(&mut state.camera.translation, value),
            Edit::CameraRotation(axis, value) => axis.set(&mut state.camera.rotation, value),
            Edit::LookAtTarget(axis, value) => axis.set(&mut state.camera.target, value),
            Edit::ToggleLookAt(enabled) => state.camera.look_at = enabled,
            Edit::FieldOfView(degrees) => state.camera.fov = degrees,
            Edit::LightDirection(axis, value) => axis.set(&mut state.light_direction, value),
            Edit::AddShape { kind, color } => {
                let mut shape = Shape::new(format!("{kind} {}", state.shapes.len() + 1), kind);
                shape.color = hex_to_rgb(&color)?;
                shape.scale = Vec3::splat(20.0);
                state.shapes.push(shape);
            }
            Edit::DeleteShape(index) => {
                if index >= state.shapes.len() {
                    return Err(SceneError::NoSuchShape(index));
                }
                state.shapes.remove(index);
                state.selected = (!state.shapes.is_empty()).then_some(0);
            }
            Edit::SelectShape(index) => {
                if index >= state.shapes.len() {
                    return Err(SceneError::NoSuchShape(index));
                }
                state.selected = Some(index);
            }
        }
        Ok(())
    }
}

fn selected_mut(state: &mut ViewState) -> Option<&mut Shape> {
    let index = state.selected?;
    state.shapes.get_mut(index)
}

/// Pose sink bound to a named shape. Writes are dropped while the shape is
/// absent, e.g. before its mesh has finished loading.
#[derive(Debug, Clone)]
pub struct ShapeTarget {
    model: DataModel,
    name: String,
}

impl ShapeTarget {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PoseSink for ShapeTarget {
    fn write_pose(&mut self, pose: &Pose) {
        if !self.model.set_pose(&self.name, pose) {
            trace!("pose target {} not present; skipping", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_shape(name: &str) -> Shape {
        Shape::new(name, ShapeKind::Cube)
    }

    #[test]
    fn replace_and_get_shape() {
        let model = DataModel::from_shapes(vec![make_shape("Cube")]);
        assert!(model.get("Cube").is_some());
        model.replace_shapes(vec![make_shape("Sphere")]);
        assert!(model.get("Cube").is_none());
        assert!(model.get("Sphere").is_some());
    }

    #[test]
    fn pushed_shape_becomes_visible_to_pose_targets() {
        let model = DataModel::new();
        let mut target = model.pose_target("Teapot");
        target.write_pose(&Pose::new(Vec3::ONE, Vec3::ZERO));

        assert_eq!(model.push_shape(Shape::new("Teapot", ShapeKind::Teapot)), 0);
        assert_eq!(model.selected(), Some(0));
        target.write_pose(&Pose::new(Vec3::ONE, Vec3::Z));
        assert_eq!(model.get("Teapot").unwrap().rotation, Vec3::Z);

        model.push_shape(make_shape("Cube"));
        assert_eq!(model.selected(), Some(0));
    }

    #[test]
    fn update_returns_false_for_missing_shape() {
        let model = DataModel::new();
        assert!(!model.set_color("Unknown", Vec3::ONE));
        assert!(model.selected().is_none());
    }

    #[test]
    fn pose_target_writes_into_the_shared_shape() {
        let model = DataModel::from_scene(&Scene::default_scene());
        let mut target = model.pose_target("Teapot");
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 45.0));
        target.write_pose(&pose);
        assert_eq!(model.get("Teapot").unwrap().pose(), pose);
    }

    #[test]
    fn pose_target_ignores_absent_shapes() {
        let model = DataModel::new();
        let mut target = model.pose_target("Teapot");
        target.write_pose(&Pose::default());
        assert!(model.all_shapes().is_empty());

        model.replace_shapes(vec![Shape::new("Teapot", ShapeKind::Teapot)]);
        let pose = Pose::new(Vec3::Y, Vec3::Z);
        target.write_pose(&pose);
        assert_eq!(model.get("Teapot").unwrap().pose(), pose);
    }

    #[test]
    fn shape_edits_apply_to_the_selection() {
        let model = DataModel::from_scene(&Scene::default_scene());
        model.apply(Edit::SelectShape(1)).unwrap();
        model.apply(Edit::Translation(Axis::Y, 4.0)).unwrap();
        model.apply(Edit::Rotation(Axis::Z, 45.0)).unwrap();
        model.apply(Edit::Scale(Axis::X, 3.0)).unwrap();
        model.apply(Edit::Color("#00FF00".into())).unwrap();

        let shape = model.selected_shape().unwrap();
        assert_eq!(shape.name, "Blue Cube");
        assert_eq!(shape.translation, Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(shape.rotation.z, 45.0);
        assert_eq!(shape.scale, Vec3::new(3.0, 0.5, 0.5));
        assert_eq!(shape.color, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn camera_and_light_edits() {
        let model = DataModel::from_scene(&Scene::default_scene());
        model.apply(Edit::CameraTranslation(Axis::X, 5.0)).unwrap();
        model.apply(Edit::LookAtTarget(Axis::Z, -1.0)).unwrap();
        model.apply(Edit::ToggleLookAt(false)).unwrap();
        model.apply(Edit::FieldOfView(45.0)).unwrap();
        model.apply(Edit::LightDirection(Axis::Y, 0.0)).unwrap();

        let camera = model.camera();
        assert_eq!(camera.translation.x, 5.0);
        assert_eq!(camera.target.z, -1.0);
        assert!(!camera.look_at);
        assert_eq!(camera.fov, 45.0);
        assert_eq!(model.light_direction(), Vec3::new(-1.0, 0.0, 2.0));
    }

    #[test]
    fn add_and_delete_shapes() {
        let model = DataModel::from_scene(&Scene::default_scene());
        model
            .apply(Edit::AddShape {
                kind: ShapeKind::Cube,
                color: "#0000ff".into(),
            })
            .unwrap();
        let shapes = model.all_shapes();
        assert_eq!(shapes.len(), 4);
        assert_eq!(shapes[3].name, "CUBE 4");
        assert_eq!(shapes[3].scale, Vec3::splat(20.0));

        model.apply(Edit::SelectShape(3)).unwrap();
        model.apply(Edit::DeleteShape(3)).unwrap();
        assert_eq!(model.selected(), Some(0));
        assert!(matches!(
            model.apply(Edit::DeleteShape(9)),
            Err(SceneError::NoSuchShape(9))
        ));
    }

    #[test]
    fn deleting_the_last_shape_clears_the_selection() {
        let model = DataModel::from_shapes(vec![make_shape("Only")]);
        model.apply(Edit::DeleteShape(0)).unwrap();
        assert_eq!(model.selected(), None);
        model.apply(Edit::Translation(Axis::X, 1.0)).unwrap();
        assert!(model.all_shapes().is_empty());
    }

    #[test]
    fn invalid_colour_leaves_the_shape_untouched() {
        let model = DataModel::from_scene(&Scene::default_scene());
        assert!(model.apply(Edit::Color("red".into())).is_err());
        assert_eq!(model.selected_shape().unwrap().color, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn axis_names_parse() {
        assert_eq!("x".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("2".parse::<Axis>().unwrap(), Axis::Z);
        assert!("w".parse::<Axis>().is_err());
    }
}
