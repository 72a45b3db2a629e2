//! Portfolio UI Layer
//!
//! Provides:
//! - wgpu surface and frame submission
//! - An egui canvas implementing the engine's `Renderer`
//! - winit input translation
//! - Theming

pub mod canvas;
pub mod input;
pub mod renderer;
pub mod theme;

pub use canvas::{color32, EguiCanvas, TextureCache, TEXTURE_CACHE_CAPACITY};
pub use input::{key_name, InputTranslator};
pub use renderer::{clear_color, GpuContext};
pub use theme::Theme;
