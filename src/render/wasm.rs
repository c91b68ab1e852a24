use anyhow::{anyhow, Result};
use glam::Vec3;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::scene::Shape;

use super::common::{build_draw_list, CameraParams, LightParams, MeshLibrary, ScreenTriangle};

/// Flat-shaded renderer backed by a 2D canvas for WebAssembly builds.
pub struct Renderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    meshes: MeshLibrary,
    size: (u32, u32),
}

impl Renderer {
    /// Creates a renderer that draws into the provided HTML canvas element.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("failed to query canvas context: {err:?}"))?
            .ok_or_else(|| anyhow!("canvas does not support 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("failed to cast canvas context"))?;

        let size = (canvas.width().max(1), canvas.height().max(1));
        Ok(Self {
            canvas,
            context,
            meshes: MeshLibrary::default(),
            size,
        })
    }

    pub fn meshes_mut(&mut self) -> &mut MeshLibrary {
        &mut self.meshes
    }

    pub fn meshes(&self) -> &MeshLibrary {
        &self.meshes
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn aspect(&self) -> f32 {
        self.size.0 as f32 / self.size.1 as f32
    }

    /// Updates the canvas dimensions to match the browser layout.
    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 == 0 || new_size.1 == 0 {
            return;
        }
        self.size = new_size;
        self.canvas.set_width(new_size.0);
        self.canvas.set_height(new_size.1);
    }

    /// Draws the current scene snapshot with the painter's algorithm.
    pub fn render(&self, shapes: &[Shape], camera: &CameraParams, light: &LightParams) {
        self.clear_background();
        for triangle in build_draw_list(shapes, &self.meshes, camera, light, self.size) {
            self.fill_triangle(&triangle);
        }
    }

    fn fill_triangle(&self, triangle: &ScreenTriangle) {
        let [a, b, c] = triangle.points;
        let color = triangle.color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
        let style = format!("rgb({}, {}, {})", color.x as u8, color.y as u8, color.z as u8);
        self.context.set_fill_style(&style.as_str().into());
        self.context.begin_path();
        self.context.move_to(a.x as f64, a.y as f64);
        self.context.line_to(b.x as f64, b.y as f64);
        self.context.line_to(c.x as f64, c.y as f64);
        self.context.close_path();
        self.context.fill();
    }

    fn clear_background(&self) {
        self.context.set_fill_style(&"#06060a".into());
        self.context
            .fill_rect(0.0, 0.0, self.size.0 as f64, self.size.1 as f64);
    }
}
