#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, HtmlCanvasElement, HtmlInputElement, Performance, Window};

use crate::animation::{AnimationPlayer, FrameCallback, FrameScheduler};
use crate::app::{build_player, camera_params, light_params};
use crate::render::Renderer;
use crate::scene::{rgb_to_hex, Shape, ShapeKind};
use crate::{load_obj_from_str, Axis, DataModel, Edit, Scene};

const BUTTON_IDS: [&str; 4] = ["play", "pause", "stop", "finish"];
const TIME_SLIDER_ID: &str = "time_slider";

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Frame scheduler backed by `requestAnimationFrame` and `performance.now()`.
struct RafScheduler {
    window: Window,
    performance: Performance,
}

impl RafScheduler {
    fn new(window: Window) -> Result<Self> {
        let performance = window
            .performance()
            .ok_or_else(|| anyhow!("performance timer not available"))?;
        Ok(Self {
            window,
            performance,
        })
    }
}

impl FrameScheduler for RafScheduler {
    fn now(&self) -> f64 {
        self.performance.now()
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<()> {
        let closure = Closure::once_into_js(move |timestamp: f64| callback(timestamp));
        self.window
            .request_animation_frame(closure.unchecked_ref::<js_sys::Function>())
            .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
        Ok(())
    }
}

type EventClosure = Closure<dyn FnMut(web_sys::Event)>;

struct ViewerState {
    renderer: Renderer,
    data_model: DataModel,
    /// Shapes waiting for their mesh before they join the scene.
    deferred: Vec<Shape>,
}

impl ViewerState {
    fn render_frame(&self) {
        let shapes = self.data_model.all_shapes();
        let camera = camera_params(&self.data_model.camera(), self.renderer.aspect());
        let light = light_params(self.data_model.light_direction());
        self.renderer.render(&shapes, &camera, &light);
    }
}

/// Canvas viewer with the pour animation wired to the page controls.
#[wasm_bindgen]
pub struct WasmViewer {
    state: Rc<RefCell<ViewerState>>,
    player: Rc<AnimationPlayer<RafScheduler>>,
    _listeners: Vec<EventClosure>,
}

#[wasm_bindgen]
impl WasmViewer {
    /// Builds the viewer on the canvas `canvas_id`. `scene_xml` replaces the
    /// default scene when given.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: String, scene_xml: Option<String>) -> Result<WasmViewer, JsValue> {
        Self::build(&canvas_id, scene_xml.as_deref()).map_err(to_js)
    }

    /// Parses the teapot OBJ and adds the shapes that were waiting for it.
    pub fn load_teapot(&self, obj_text: &str) -> Result<(), JsValue> {
        let mesh = load_obj_from_str(obj_text).map_err(to_js)?;
        info!(
            "Loaded teapot mesh: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        {
            let mut state = self.state.borrow_mut();
            state.renderer.meshes_mut().insert(ShapeKind::Teapot, mesh);
            for shape in std::mem::take(&mut state.deferred) {
                state.data_model.push_shape(shape);
            }
        }
        // The target may have just appeared; give it the current pose.
        self.player.refresh();
        Ok(())
    }

    /// Starts the frame loop that repaints the canvas.
    pub fn start(&self) -> Result<(), JsValue> {
        schedule_render_loop(Rc::clone(&self.state)).map_err(to_js)
    }

    /// Same as the `#play` button: continues a paused or scrubbed cycle,
    /// otherwise starts a new one.
    pub fn play(&self) -> Result<(), JsValue> {
        self.player.play_or_resume().map_err(to_js)
    }

    /// Starts a fresh cycle from time 0.
    pub fn restart(&self) -> Result<(), JsValue> {
        self.player.play().map_err(to_js)
    }

    pub fn pause(&self) {
        self.player.pause();
    }

    pub fn resume(&self) -> Result<(), JsValue> {
        self.player.resume().map_err(to_js)
    }

    pub fn stop(&self) {
        self.player.stop();
    }

    /// Lets the current cycle run to its reset hold, then stops.
    pub fn finish(&self) {
        self.player.request_completion();
    }

    pub fn scrub(&self, time: f64) {
        self.player.scrub(time);
    }

    /// Length of one pour cycle in milliseconds.
    pub fn animation_duration(&self) -> f64 {
        self.player.animation().timeline.animation_duration()
    }

    pub fn status(&self) -> String {
        format!("{:?}", self.player.status())
    }

    /// Applies a numeric control change. `field` is one of `translation`,
    /// `rotation`, `scale`, `camera_translation`, `camera_rotation`,
    /// `look_at_target` or `light_direction`.
    pub fn apply_edit(&self, field: &str, axis: &str, value: f32) -> Result<(), JsValue> {
        let axis: Axis = axis.parse().map_err(to_js)?;
        let edit = match field {
            "translation" => Edit::Translation(axis, value),
            "rotation" => Edit::Rotation(axis, value),
            "scale" => Edit::Scale(axis, value),
            "camera_translation" => Edit::CameraTranslation(axis, value),
            "camera_rotation" => Edit::CameraRotation(axis, value),
            "look_at_target" => Edit::LookAtTarget(axis, value),
            "light_direction" => Edit::LightDirection(axis, value),
            other => return Err(JsValue::from_str(&format!("unknown field: {other}"))),
        };
        self.apply(edit)
    }

    pub fn set_color(&self, hex: String) -> Result<(), JsValue> {
        self.apply(Edit::Color(hex))
    }

    pub fn set_field_of_view(&self, degrees: f32) -> Result<(), JsValue> {
        self.apply(Edit::FieldOfView(degrees))
    }

    pub fn toggle_look_at(&self, enabled: bool) -> Result<(), JsValue> {
        self.apply(Edit::ToggleLookAt(enabled))
    }

    pub fn select_shape(&self, index: usize) -> Result<(), JsValue> {
        self.apply(Edit::SelectShape(index))
    }

    pub fn add_shape(&self, kind: &str, color: String) -> Result<(), JsValue> {
        let kind: ShapeKind = kind.parse().map_err(to_js)?;
        self.apply(Edit::AddShape { kind, color })
    }

    pub fn delete_shape(&self, index: usize) -> Result<(), JsValue> {
        self.apply(Edit::DeleteShape(index))
    }

    /// Colour of the selected shape as `#rrggbb`, for the colour picker.
    pub fn selected_color(&self) -> Option<String> {
        let state = self.state.borrow();
        state
            .data_model
            .selected_shape()
            .map(|shape| rgb_to_hex(shape.color))
    }

    pub fn shape_names(&self) -> Vec<JsValue> {
        self.state
            .borrow()
            .data_model
            .all_shapes()
            .iter()
            .map(|shape| JsValue::from_str(&shape.name))
            .collect()
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.state.borrow_mut().renderer.resize((width, height));
    }
}

impl WasmViewer {
    fn build(canvas_id: &str, scene_xml: Option<&str>) -> Result<Self> {
        let scene = match scene_xml {
            Some(xml) => Scene::from_xml(xml).context("failed to parse scene XML")?,
            None => Scene::default_scene(),
        };
        info!("Loaded scene with {} shapes", scene.shapes.len());
        for shape in &scene.shapes {
            info!(" - {} ({})", shape.name, shape.kind);
        }

        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow!("document not available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| anyhow!("canvas element not found: {canvas_id}"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("element {canvas_id} is not a canvas"))?;
        let renderer = Renderer::new(canvas)?;

        let (deferred, ready): (Vec<Shape>, Vec<Shape>) = scene
            .shapes
            .iter()
            .cloned()
            .partition(|shape| !renderer.meshes().contains(shape.kind));
        let data_model = DataModel::from_scene(&Scene {
            shapes: ready,
            ..scene.clone()
        });

        let scheduler = Rc::new(RafScheduler::new(window)?);
        let player = Rc::new(build_player(&scene, &data_model, scheduler));

        let state = Rc::new(RefCell::new(ViewerState {
            renderer,
            data_model,
            deferred,
        }));
        let listeners = attach_controls(&document, &player)?;

        Ok(Self {
            state,
            player,
            _listeners: listeners,
        })
    }

    fn apply(&self, edit: Edit) -> Result<(), JsValue> {
        self.state.borrow().data_model.apply(edit).map_err(to_js)
    }
}

fn attach_controls(
    document: &Document,
    player: &Rc<AnimationPlayer<RafScheduler>>,
) -> Result<Vec<EventClosure>> {
    let mut listeners = Vec::new();

    for id in BUTTON_IDS {
        let Some(button) = document.get_element_by_id(id) else {
            warn!("control #{id} not found; skipping");
            continue;
        };
        let player = Rc::clone(player);
        let closure = EventClosure::new(move |_event: web_sys::Event| {
            let result = match id {
                "play" => player.play_or_resume(),
                "pause" => {
                    player.pause();
                    Ok(())
                }
                "stop" => {
                    player.stop();
                    Ok(())
                }
                _ => {
                    player.request_completion();
                    Ok(())
                }
            };
            if let Err(err) = result {
                log::error!("#{id} failed: {err:?}");
            }
        });
        button
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("failed to listen on #{id}: {err:?}"))?;
        listeners.push(closure);
    }

    let slider = match document.get_element_by_id(TIME_SLIDER_ID) {
        Some(element) => element
            .dyn_into::<HtmlInputElement>()
            .map_err(|_| anyhow!("#{TIME_SLIDER_ID} is not an input element"))?,
        None => {
            warn!("control #{TIME_SLIDER_ID} not found; skipping");
            return Ok(listeners);
        }
    };
    let duration = player.animation().timeline.animation_duration();
    slider.set_min("0");
    slider.set_max(&duration.to_string());
    slider.set_value("0");

    {
        let slider = slider.clone();
        player.on_frame(move |frame| slider.set_value(&format!("{:.0}", frame.passed_time)));
    }

    let scrub_player = Rc::clone(player);
    let input = slider.clone();
    let closure = EventClosure::new(move |_event: web_sys::Event| {
        match input.value().parse::<f64>() {
            Ok(time) => {
                scrub_player.scrub(time);
            }
            Err(err) => warn!("ignoring slider value {:?}: {err}", input.value()),
        }
    });
    slider
        .add_event_listener_with_callback("input", closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("failed to listen on #{TIME_SLIDER_ID}: {err:?}"))?;
    listeners.push(closure);

    Ok(listeners)
}

fn schedule_render_loop(state: Rc<RefCell<ViewerState>>) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let next = Rc::clone(&state);
    let closure = Closure::once_into_js(move |_timestamp: f64| {
        next.borrow().render_frame();
        if let Err(err) = schedule_render_loop(next) {
            web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
        }
    });
    window
        .request_animation_frame(closure.unchecked_ref::<js_sys::Function>())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    Ok(())
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}
