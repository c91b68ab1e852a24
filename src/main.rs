use std::cell::Cell;
use std::env;
use std::fs;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use teapot_pour::app::{build_player, format_pose, print_final_state};
use teapot_pour::{load_obj_from_str, DataModel, FrameScheduler, ManualScheduler, Scene};

const USAGE: &str = "Usage: teapot-pour [scene.xml] [--frames N] [--frame-ms MS] \
[--finish-at MS] [--scrub MS] [--mesh teapot.obj]";

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;

    let scene = match &options.scene_path {
        Some(path) => {
            let xml =
                fs::read_to_string(path).with_context(|| format!("failed to read scene {path}"))?;
            Scene::from_xml(&xml).with_context(|| format!("failed to parse scene {path}"))?
        }
        None => Scene::default_scene(),
    };

    println!(
        "Loaded scene with {} shapes (pour target: {})",
        scene.shapes.len(),
        scene.pour.target
    );
    for shape in &scene.shapes {
        println!(" - {} ({})", shape.name, shape.kind);
    }

    if let Some(path) = &options.mesh_path {
        let data =
            fs::read_to_string(path).with_context(|| format!("failed to read mesh {path}"))?;
        let mesh = load_obj_from_str(&data).with_context(|| format!("failed to parse {path}"))?;
        println!(
            "Loaded mesh {path}: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
    }

    let timeline = scene.pour.animation.timeline;
    println!(
        "Pour cycle: {} ms (pour {} ms, pause {} ms)",
        timeline.animation_duration(),
        timeline.pour_duration(),
        timeline.pause_duration()
    );

    let model = DataModel::from_scene(&scene);
    if model.get(&scene.pour.target).is_none() {
        info!(
            "pour target {} is not in the scene; poses will not be applied",
            scene.pour.target
        );
    }

    let scheduler = Rc::new(ManualScheduler::new(0.0));
    let player = build_player(&scene, &model, Rc::clone(&scheduler));
    let frame_index = Rc::new(Cell::new(0usize));
    {
        let frame_index = Rc::clone(&frame_index);
        player.on_frame(move |frame| {
            let index = frame_index.get();
            frame_index.set(index + 1);
            println!(
                "frame {index} t={:.2} {:?} {}",
                frame.passed_time,
                frame.phase,
                format_pose(&frame.pose)
            );
        });
    }

    if let Some(time) = options.scrub {
        player.scrub(time);
    } else {
        player.play()?;
        let mut completion_requested = false;
        for _ in 0..options.frames {
            if let Some(finish_at) = options.finish_at {
                if !completion_requested && scheduler.now() >= finish_at {
                    info!("requesting completion at {} ms", scheduler.now());
                    player.request_completion();
                    completion_requested = true;
                }
            }
            scheduler.advance(options.frame_ms);
            if !player.frame_pending() {
                break;
            }
        }
    }

    println!("Playback status: {:?}", player.status());
    print_final_state(&model);
    Ok(())
}

#[derive(Debug, PartialEq)]
struct CliOptions {
    scene_path: Option<String>,
    frames: usize,
    frame_ms: f64,
    finish_at: Option<f64>,
    scrub: Option<f64>,
    mesh_path: Option<String>,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            scene_path: None,
            frames: 60,
            frame_ms: 1000.0 / 60.0,
            finish_at: None,
            scrub: None,
            mesh_path: None,
        }
    }
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--frames" => options.frames = parse_number(&value("--frames")?, "--frames")?,
                "--frame-ms" => {
                    options.frame_ms = parse_time(&value("--frame-ms")?, "--frame-ms")?;
                    if options.frame_ms <= 0.0 {
                        bail!("--frame-ms must be positive");
                    }
                }
                "--finish-at" => {
                    options.finish_at = Some(parse_time(&value("--finish-at")?, "--finish-at")?)
                }
                "--scrub" => options.scrub = Some(parse_time(&value("--scrub")?, "--scrub")?),
                "--mesh" => options.mesh_path = Some(value("--mesh")?),
                "--help" | "-h" => bail!("{USAGE}"),
                other if other.starts_with("--") => {
                    bail!("Unknown argument: {other}. {USAGE}");
                }
                path => {
                    if options.scene_path.is_some() {
                        bail!("Only one scene file may be given. {USAGE}");
                    }
                    options.scene_path = Some(path.to_string());
                }
            }
        }
        Ok(options)
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| anyhow!("{flag} expects a number, got {value:?}"))
}

// Timestamps and frame lengths in milliseconds; NaN and infinities are rejected.
fn parse_time(value: &str, flag: &str) -> Result<f64> {
    let time: f64 = parse_number(value, flag)?;
    if !time.is_finite() {
        bail!("{flag} expects a finite number of milliseconds, got {value:?}");
    }
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(parse(&[]).unwrap(), CliOptions::default());
    }

    #[test]
    fn parses_flags_and_scene_path() {
        let options = parse(&["scene.xml", "--frames", "10", "--frame-ms", "100", "--finish-at", "250"])
            .unwrap();
        assert_eq!(options.scene_path.as_deref(), Some("scene.xml"));
        assert_eq!(options.frames, 10);
        assert_eq!(options.frame_ms, 100.0);
        assert_eq!(options.finish_at, Some(250.0));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--frames"]).is_err());
        assert!(parse(&["--frames", "many"]).is_err());
        assert!(parse(&["--frame-ms", "0"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["a.xml", "b.xml"]).is_err());
    }

    #[test]
    fn rejects_non_finite_times() {
        assert!(parse(&["--frame-ms", "NaN"]).is_err());
        assert!(parse(&["--frame-ms", "inf"]).is_err());
        assert!(parse(&["--scrub", "inf"]).is_err());
        assert!(parse(&["--scrub", "NaN"]).is_err());
        assert!(parse(&["--finish-at", "-inf"]).is_err());
        assert_eq!(parse(&["--scrub", "3500"]).unwrap().scrub, Some(3500.0));
    }
}
