use std::fmt;
use std::str::FromStr;

use glam::{Mat4, Vec3};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::animation::{Pose, PourAnimation, PourKeyframes, PourTimeline};
use crate::error::SceneError;

/// Name of the shape the default pour animates.
pub const TEAPOT: &str = "Teapot";

/// Primitive drawn for a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    #[serde(rename = "CUBE")]
    Cube,
    #[serde(rename = "BOSTON_TEAPOT")]
    Teapot,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cube => "CUBE",
            Self::Teapot => "BOSTON_TEAPOT",
        }
    }
}

impl FromStr for ShapeKind {
    type Err = SceneError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CUBE" => Ok(Self::Cube),
            "BOSTON_TEAPOT" | "TEAPOT" => Ok(Self::Teapot),
            _ => Err(SceneError::UnknownShapeKind(value.to_string())),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placed primitive. Rotation is in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl Shape {
    pub fn new(name: impl Into<String>, kind: ShapeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            color: default_color(),
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
        }
    }

    /// Translate, then rotate about x, y and z, then scale.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_scale(self.scale)
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.translation, self.rotation)
    }

    pub fn set_pose(&mut self, pose: &Pose) {
        self.translation = pose.translation;
        self.rotation = pose.rotation;
    }
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

/// Viewer camera. Rotation is in degrees and only used when `look_at` is off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub target: Vec3,
    pub look_at: bool,
    /// Vertical field of view in degrees.
    pub fov: f32,
}

impl Camera {
    pub const NEAR: f32 = 1.0;
    pub const FAR: f32 = 2000.0;

    pub fn view_matrix(&self) -> Mat4 {
        if self.look_at {
            Mat4::look_at_rh(self.translation, self.target, Vec3::Y)
        } else {
            Mat4::from_rotation_z(self.rotation.z.to_radians())
                * Mat4::from_rotation_x(self.rotation.x.to_radians())
                * Mat4::from_rotation_y(self.rotation.y.to_radians())
                * Mat4::from_translation(self.translation)
        }
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), aspect.max(0.01), Self::NEAR, Self::FAR)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            translation: Vec3::new(-20.0, 35.0, -35.0),
            rotation: Vec3::ZERO,
            target: Vec3::new(-10.0, 0.0, 5.0),
            look_at: true,
            fov: 90.0,
        }
    }
}

/// Which shape the pour drives, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PourSetup {
    pub target: String,
    pub animation: PourAnimation,
}

impl Default for PourSetup {
    fn default() -> Self {
        Self {
            target: TEAPOT.to_string(),
            animation: PourAnimation::default(),
        }
    }
}

/// Shapes, camera, light and pour definition loaded at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub shapes: Vec<Shape>,
    pub camera: Camera,
    /// Direction light travels in; normalized when used.
    pub light_direction: Vec3,
    pub pour: PourSetup,
}

impl Default for Scene {
    fn default() -> Self {
        Self::default_scene()
    }
}

impl Scene {
    pub const DEFAULT_LIGHT_DIRECTION: Vec3 = Vec3::new(-1.0, -2.0, 2.0);

    /// Two half-size cubes and the red teapot the pour animates.
    pub fn default_scene() -> Self {
        let mut green = Shape::new("Green Cube", ShapeKind::Cube);
        green.color = Vec3::new(0.0, 1.0, 0.0);
        green.translation = Vec3::new(20.0, 0.0, 0.0);
        green.scale = Vec3::splat(0.5);

        let mut blue = Shape::new("Blue Cube", ShapeKind::Cube);
        blue.color = Vec3::new(0.0, 0.0, 1.0);
        blue.scale = Vec3::splat(0.5);

        let mut teapot = Shape::new(TEAPOT, ShapeKind::Teapot);
        teapot.color = Vec3::new(1.0, 0.0, 0.0);
        teapot.translation = Vec3::new(-20.0, 0.0, 5.0);
        teapot.rotation = Vec3::new(0.0, 0.0, 180.0);
        teapot.scale = Vec3::splat(10.0);

        Self {
            shapes: vec![green, blue, teapot],
            camera: Camera::default(),
            light_direction: Self::DEFAULT_LIGHT_DIRECTION,
            pour: PourSetup::default(),
        }
    }

    /// Parses a scene description.
    ///
    /// Missing `<camera>`, `<light>` or `<animation>` sections fall back to
    /// the defaults of [`Scene::default_scene`]; shapes are taken verbatim.
    pub fn from_xml(xml: &str) -> Result<Self, SceneError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();

        let shapes = root
            .children()
            .filter(|n| n.has_tag_name("shape"))
            .map(|node| parse_shape(&node))
            .collect::<Result<Vec<_>, _>>()?;

        let camera = match child(&root, "camera") {
            Some(node) => parse_camera(&node)?,
            None => Camera::default(),
        };

        let light_direction = match child(&root, "light") {
            Some(node) => parse_vec3(&node, "direction", Self::DEFAULT_LIGHT_DIRECTION)?,
            None => Self::DEFAULT_LIGHT_DIRECTION,
        };

        let pour = match child(&root, "animation") {
            Some(node) => parse_pour(&node)?,
            None => PourSetup::default(),
        };

        Ok(Self {
            shapes,
            camera,
            light_direction,
            pour,
        })
    }

    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|shape| shape.name == name)
    }
}

/// Parses `#RRGGBB` (the `#` is optional) into RGB components in `[0, 1]`.
pub fn hex_to_rgb(hex: &str) -> Result<Vec3, SceneError> {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SceneError::InvalidColor(hex.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map(|value| value as f32 / 255.0)
            .map_err(|_| SceneError::InvalidColor(hex.to_string()))
    };
    Ok(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Formats RGB components in `[0, 1]` as `#rrggbb`, clamping out-of-range values.
pub fn rgb_to_hex(color: Vec3) -> String {
    let to_byte = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        to_byte(color.x),
        to_byte(color.y),
        to_byte(color.z)
    )
}

fn parse_shape(node: &Node<'_, '_>) -> Result<Shape, SceneError> {
    let name = required_text(node, "name")?;
    let kind = required_text(node, "type")?.parse::<ShapeKind>()?;
    let mut shape = Shape::new(name, kind);
    if let Some(color) = optional_text(node, "color") {
        shape.color = hex_to_rgb(&color)?;
    }
    shape.translation = parse_vec3(node, "translation", shape.translation)?;
    shape.rotation = parse_vec3(node, "rotation", shape.rotation)?;
    shape.scale = parse_vec3(node, "scale", shape.scale)?;
    Ok(shape)
}

fn parse_camera(node: &Node<'_, '_>) -> Result<Camera, SceneError> {
    let defaults = Camera::default();
    Ok(Camera {
        translation: parse_vec3(node, "translation", defaults.translation)?,
        rotation: parse_vec3(node, "rotation", defaults.rotation)?,
        target: parse_vec3(node, "target", defaults.target)?,
        look_at: parse_bool(node, "look_at", defaults.look_at)?,
        fov: parse_f64(node, "fov", defaults.fov as f64)? as f32,
    })
}

fn parse_pour(node: &Node<'_, '_>) -> Result<PourSetup, SceneError> {
    let defaults = PourKeyframes::default();
    let target = optional_text(node, "target").unwrap_or_else(|| TEAPOT.to_string());
    let timeline = PourTimeline::new(
        parse_f64(node, "pour_duration", PourTimeline::DEFAULT_POUR_DURATION)?,
        parse_f64(node, "pause_duration", PourTimeline::DEFAULT_PAUSE_DURATION)?,
    )?;
    let start = match child(node, "start") {
        Some(pose) => parse_pose(&pose, defaults.start)?,
        None => defaults.start,
    };
    let end = match child(node, "end") {
        Some(pose) => parse_pose(&pose, defaults.end)?,
        None => defaults.end,
    };
    Ok(PourSetup {
        target,
        animation: PourAnimation::new(PourKeyframes { start, end }, timeline),
    })
}

fn parse_pose(node: &Node<'_, '_>, default: Pose) -> Result<Pose, SceneError> {
    Ok(Pose::new(
        parse_vec3(node, "translation", default.translation)?,
        parse_vec3(node, "rotation", default.rotation)?,
    ))
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &'static str) -> Result<String, SceneError> {
    optional_text(node, tag).ok_or(SceneError::MissingTag(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(node: &Node<'_, '_>, tag: &'static str, default: Vec3) -> Result<Vec3, SceneError> {
    let Some(value) = optional_text(node, tag) else {
        return Ok(default);
    };
    let numbers = value
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>();
    match numbers.as_deref() {
        Ok([x, y, z]) => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(SceneError::InvalidVector { tag, value }),
    }
}

fn parse_f64(node: &Node<'_, '_>, tag: &'static str, default: f64) -> Result<f64, SceneError> {
    match optional_text(node, tag) {
        Some(value) => value
            .parse::<f64>()
            .map_err(|_| SceneError::InvalidNumber { tag, value }),
        None => Ok(default),
    }
}

fn parse_bool(node: &Node<'_, '_>, tag: &'static str, default: bool) -> Result<bool, SceneError> {
    match optional_text(node, tag) {
        Some(value) => value
            .parse::<bool>()
            .map_err(|_| SceneError::InvalidBool { tag, value }),
        None => Ok(default),
    }
}
