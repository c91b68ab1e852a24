use std::rc::Rc;

use glam::Vec3;

use crate::animation::{AnimationPlayer, FrameScheduler, Pose};
use crate::data_model::DataModel;
use crate::render::{CameraParams, LightParams};
use crate::scene::{Camera, Scene};

/// Share of the shape colour that stays visible on unlit faces.
pub const AMBIENT_INTENSITY: f32 = 0.5;

/// Creates the pour player for `scene`, writing into its target shape in `model`.
pub fn build_player<S: FrameScheduler + 'static>(
    scene: &Scene,
    model: &DataModel,
    scheduler: Rc<S>,
) -> AnimationPlayer<S> {
    let player = AnimationPlayer::new(scene.pour.animation, scheduler);
    player.set_target(Some(Box::new(model.pose_target(scene.pour.target.clone()))));
    player
}

pub fn camera_params(camera: &Camera, aspect: f32) -> CameraParams {
    CameraParams {
        view_proj: camera.view_projection(aspect),
        position: camera.translation,
    }
}

pub fn light_params(direction: Vec3) -> LightParams {
    LightParams {
        reverse_direction: direction.normalize_or_zero(),
        ambient: AMBIENT_INTENSITY,
    }
}

pub fn format_pose(pose: &Pose) -> String {
    format!(
        "pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2})",
        pose.translation.x,
        pose.translation.y,
        pose.translation.z,
        pose.rotation.x,
        pose.rotation.y,
        pose.rotation.z
    )
}

pub fn print_final_state(model: &DataModel) {
    println!("Final shape states:");
    for shape in model.all_shapes() {
        println!(" - {} {}", shape.name, format_pose(&shape.pose()));
    }
}
