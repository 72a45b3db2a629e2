//! Portfolio presentation engine
//!
//! This crate contains:
//! - Image catalog and the directory loader that fills it
//! - Settings and their on-disk store
//! - Grid and fit-to-viewport layout
//! - Fade and slide transitions
//! - The view state machine and the `Renderer` it draws through
//! - PDF export
//! - Error types

pub mod catalog;
pub mod command;
pub mod error;
pub mod export;
pub mod image_loader;
pub mod layout;
pub mod resource;
pub mod session;
pub mod settings;
pub mod transition;
pub mod view;

pub use catalog::{Catalog, ImageHandle, ImageRecord};
pub use command::{Command, InputEvent, KeyBindings};
pub use error::AppError;
pub use export::{export, paginate, CancelToken, DocumentSink, ExportJob, ExportReport, PageSpec, PdfSink};
pub use image_loader::{is_supported_image, load_directory, LoadOptions, LoadReport, SkippedFile};
pub use layout::{fit_rect, fit_rect_within, grid_geometry, hit_test, GridPager, LayoutCache, Rect};
pub use resource::{CacheStats, ScaleCache, ScaleKey};
pub use session::Session;
pub use settings::{GridLayout, Rgb, Settings, SettingsStore, SharedSettings, ThemeName, TransitionStyle};
pub use transition::{Fade, FadeDirection, Slide, Transition, MAX_OPACITY};
pub use view::{Flow, FontSpec, Mode, Renderer, TextAlign, TransitionPhase, ViewState, ViewStateMachine};
