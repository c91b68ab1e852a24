//! Scene viewer with a keyframed teapot "pour" animation.
//!
//! The crate models a small scene of cubes and a teapot, the edits its
//! controls can make, and the pour animation that tilts the teapot out and
//! back on a fixed timeline. Drawing is reduced to a projected draw list so
//! the whole crate stays testable headless; the wasm32 build paints that list
//! onto a canvas and drives the animation from `requestAnimationFrame`.

pub mod animation;
pub mod app;
pub mod data_model;
pub mod error;
pub mod obj;
pub mod render;
pub mod scene;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::{
    AnimationPlayer, AnimationState, FrameSample, FrameScheduler, ManualScheduler, Phase,
    PlaybackStatus, Pose, PoseSink, PourAnimation, PourKeyframes, PourTimeline,
};
pub use data_model::{Axis, DataModel, Edit, ShapeTarget};
pub use error::SceneError;
pub use obj::{load_obj_from_str, Mesh};
pub use render::{CameraParams, LightParams, MeshLibrary};
pub use scene::{Camera, PourSetup, Scene, Shape, ShapeKind};
