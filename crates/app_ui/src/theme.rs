//! Application theming

use app_core::ThemeName;
use egui::{Color32, Visuals};

/// Colors for egui widgets and the status overlay
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: ThemeName,
    pub surface: Color32,
    pub text: Color32,
    pub accent: Color32,
    pub error: Color32,
    pub success: Color32,
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            name: ThemeName::Dark,
            surface: Color32::from_rgba_unmultiplied(48, 48, 48, 220),
            text: Color32::from_rgb(240, 240, 240),
            accent: Color32::from_rgb(100, 149, 237), // Cornflower blue
            error: Color32::from_rgb(220, 80, 80),
            success: Color32::from_rgb(80, 200, 120),
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            name: ThemeName::Light,
            surface: Color32::from_rgba_unmultiplied(250, 250, 250, 220),
            text: Color32::from_rgb(32, 32, 32),
            accent: Color32::from_rgb(59, 130, 246),
            error: Color32::from_rgb(220, 38, 38),
            success: Color32::from_rgb(34, 197, 94),
        }
    }

    pub fn for_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
        }
    }

    /// Apply theme to egui
    pub fn apply(&self, ctx: &egui::Context) {
        let mut visuals = match self.name {
            ThemeName::Dark => Visuals::dark(),
            ThemeName::Light => Visuals::light(),
        };

        visuals.window_fill = self.surface;
        visuals.panel_fill = self.surface;
        visuals.override_text_color = Some(self.text);
        visuals.selection.stroke.color = self.accent;
        visuals.hyperlink_color = self.accent;

        ctx.set_visuals(visuals);
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
