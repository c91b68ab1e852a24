mod common;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use common::{build_draw_list, CameraParams, LightParams, MeshLibrary, ScreenTriangle};
#[cfg(target_arch = "wasm32")]
pub use wasm::Renderer;
