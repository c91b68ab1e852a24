use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use teapot_pour::app::build_player;
use teapot_pour::{
    DataModel, FrameScheduler, ManualScheduler, Phase, PlaybackStatus, Scene, Shape, ShapeKind,
};

fn teapot_rotation(model: &DataModel) -> f32 {
    model.get("Teapot").expect("teapot present").rotation.z
}

#[test]
fn pause_and_resume_keep_the_pour_position() {
    let scene = Scene::default_scene();
    let model = DataModel::from_scene(&scene);
    let scheduler = Rc::new(ManualScheduler::new(100.0));
    let player = build_player(&scene, &model, Rc::clone(&scheduler));

    player.play().unwrap();
    scheduler.advance(250.0);
    assert_eq!(teapot_rotation(&model), 187.5);

    player.pause();
    scheduler.advance(5000.0);
    assert_eq!(player.status(), PlaybackStatus::Paused);
    assert_eq!(teapot_rotation(&model), 187.5);
    assert_eq!(scheduler.pending(), 0);

    player.resume().unwrap();
    scheduler.advance(250.0);
    assert_eq!(teapot_rotation(&model), 195.0);
}

#[test]
fn repeated_play_keeps_a_single_frame_loop() {
    let scene = Scene::default_scene();
    let model = DataModel::from_scene(&scene);
    let scheduler = Rc::new(ManualScheduler::new(0.0));
    let player = build_player(&scene, &model, Rc::clone(&scheduler));

    player.play().unwrap();
    player.play().unwrap();
    player.resume().unwrap();
    assert_eq!(scheduler.pending(), 1);

    for _ in 0..10 {
        assert_eq!(scheduler.advance(16.0), 1);
    }
    assert_eq!(scheduler.pending(), 1);
}

#[test]
fn stop_returns_the_teapot_to_its_start_pose() {
    let scene = Scene::default_scene();
    let model = DataModel::from_scene(&scene);
    let scheduler = Rc::new(ManualScheduler::new(0.0));
    let player = build_player(&scene, &model, Rc::clone(&scheduler));

    player.play().unwrap();
    scheduler.advance(1500.0);
    assert_eq!(teapot_rotation(&model), 210.0);

    player.stop();
    assert_eq!(player.status(), PlaybackStatus::Stopped);
    assert_eq!(teapot_rotation(&model), 180.0);
    assert_eq!(model.get("Teapot").unwrap().translation, Vec3::new(-20.0, 0.0, 5.0));

    // The stale request fires but does not move the clock or reschedule.
    scheduler.advance(16.0);
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(teapot_rotation(&model), 180.0);
}

#[test]
fn finish_lets_the_cycle_complete() {
    let scene = Scene::default_scene();
    let model = DataModel::from_scene(&scene);
    let scheduler = Rc::new(ManualScheduler::new(0.0));
    let player = build_player(&scene, &model, Rc::clone(&scheduler));
    let phases = Rc::new(RefCell::new(Vec::new()));
    {
        let phases = Rc::clone(&phases);
        player.on_frame(move |frame| phases.borrow_mut().push(frame.phase));
    }

    player.play().unwrap();
    scheduler.advance(500.0);
    player.request_completion();
    while scheduler.pending() > 0 {
        scheduler.advance(250.0);
    }

    assert_eq!(player.status(), PlaybackStatus::Completed);
    assert_eq!(player.state().passed_time(), 0.0);
    assert_eq!(teapot_rotation(&model), 180.0);
    assert!(scheduler.now() >= 4000.0 && scheduler.now() < 6000.0);
    let phases = phases.borrow();
    assert!(phases.contains(&Phase::HoldPoured));
    assert!(phases.contains(&Phase::PourBack));
}

#[test]
fn scrub_writes_the_pose_without_playing() {
    let scene = Scene::default_scene();
    let model = DataModel::from_scene(&scene);
    let scheduler = Rc::new(ManualScheduler::new(0.0));
    let player = build_player(&scene, &model, Rc::clone(&scheduler));

    let frame = player.scrub(3500.0);
    assert_eq!(frame.phase, Phase::PourBack);
    assert_eq!(teapot_rotation(&model), 195.0);
    assert_eq!(scheduler.pending(), 0);

    player.resume().unwrap();
    scheduler.advance(500.0);
    assert_eq!(player.state().passed_time(), 4000.0);
    assert_eq!(teapot_rotation(&model), 180.0);
}

#[test]
fn teapot_added_mid_playback_picks_up_the_animation() {
    let scene = Scene::default_scene();
    let model = DataModel::from_shapes(
        scene
            .shapes
            .iter()
            .filter(|shape| shape.kind != ShapeKind::Teapot)
            .cloned()
            .collect(),
    );
    let scheduler = Rc::new(ManualScheduler::new(0.0));
    let player = build_player(&scene, &model, Rc::clone(&scheduler));

    player.play().unwrap();
    scheduler.advance(500.0);
    assert!(model.get("Teapot").is_none());

    model.push_shape(Shape::new("Teapot", ShapeKind::Teapot));
    scheduler.advance(500.0);
    assert_eq!(teapot_rotation(&model), 210.0);
}
