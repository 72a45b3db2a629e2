//! Translate winit window events into engine input events

use app_core::InputEvent;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{Key, ModifiersState, NamedKey};

/// Turns raw window events into [`InputEvent`]s in viewport points
pub struct InputTranslator {
    modifiers: ModifiersState,
    /// Last cursor position, in logical points
    cursor: Option<(f32, f32)>,
    scale_factor: f64,
}

impl InputTranslator {
    pub fn new(scale_factor: f64) -> Self {
        Self {
            modifiers: ModifiersState::empty(),
            cursor: None,
            scale_factor: if scale_factor > 0.0 { scale_factor } else { 1.0 },
        }
    }

    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CloseRequested => Some(InputEvent::Quit),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
                None
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.set_scale_factor(*scale_factor);
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(*position);
                None
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                None
            }
            WindowEvent::MouseInput { state, button, .. } => self.mouse_button(*button, *state),
            WindowEvent::KeyboardInput { event, .. } => self.key(&event.logical_key, event.state, event.repeat),
            _ => None,
        }
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        if scale_factor > 0.0 {
            self.scale_factor = scale_factor;
        }
    }

    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        let logical = position.to_logical::<f64>(self.scale_factor);
        self.cursor = Some((logical.x as f32, logical.y as f32));
    }

    /// Primary-button presses become clicks at the last cursor position
    pub fn mouse_button(&self, button: MouseButton, state: ElementState) -> Option<InputEvent> {
        if button != MouseButton::Left || state != ElementState::Pressed {
            return None;
        }
        let (x, y) = self.cursor?;
        Some(InputEvent::MouseClick { x, y })
    }

    /// Key presses (not releases, not auto-repeat) become named keys
    pub fn key(&self, key: &Key, state: ElementState, repeat: bool) -> Option<InputEvent> {
        if state != ElementState::Pressed || repeat {
            return None;
        }
        let name = key_name(key)?;
        let full = self.with_modifiers(&name);
        tracing::debug!("Key pressed: {}", full);
        Some(InputEvent::Key(full))
    }

    /// Prefix modifier names; Shift is already reflected in the character
    fn with_modifiers(&self, key: &str) -> String {
        let mut parts = Vec::new();
        if self.modifiers.control_key() {
            parts.push("Ctrl");
        }
        if self.modifiers.alt_key() {
            parts.push("Alt");
        }
        if self.modifiers.super_key() {
            parts.push("Super");
        }
        parts.push(key);
        parts.join("+")
    }
}

/// Key names as used in key bindings
pub fn key_name(key: &Key) -> Option<String> {
    let name = match key {
        Key::Named(named) => match named {
            NamedKey::Space => "Space".to_string(),
            NamedKey::Enter => "Return".to_string(),
            NamedKey::Tab => "Tab".to_string(),
            NamedKey::Escape => "Escape".to_string(),
            NamedKey::Backspace => "Backspace".to_string(),
            NamedKey::Delete => "Delete".to_string(),
            NamedKey::Home => "Home".to_string(),
            NamedKey::End => "End".to_string(),
            NamedKey::PageUp => "PageUp".to_string(),
            NamedKey::PageDown => "PageDown".to_string(),
            NamedKey::ArrowUp => "Up".to_string(),
            NamedKey::ArrowDown => "Down".to_string(),
            NamedKey::ArrowLeft => "Left".to_string(),
            NamedKey::ArrowRight => "Right".to_string(),
            // Modifier presses on their own are not commands.
            NamedKey::Control | NamedKey::Shift | NamedKey::Alt | NamedKey::Super => return None,
            _ => format!("{:?}", named),
        },
        Key::Character(c) => c.to_string(),
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(&Key::Named(NamedKey::ArrowRight)).as_deref(), Some("Right"));
        assert_eq!(key_name(&Key::Named(NamedKey::PageDown)).as_deref(), Some("PageDown"));
        assert_eq!(key_name(&Key::Named(NamedKey::F5)).as_deref(), Some("F5"));
        assert_eq!(key_name(&Key::Character("g".into())).as_deref(), Some("g"));
        assert_eq!(key_name(&Key::Named(NamedKey::Shift)), None);
    }

    #[test]
    fn test_only_fresh_presses_count() {
        let input = InputTranslator::new(1.0);
        let esc = Key::Named(NamedKey::Escape);
        assert_eq!(input.key(&esc, ElementState::Pressed, false), Some(InputEvent::Key("Escape".into())));
        assert_eq!(input.key(&esc, ElementState::Released, false), None);
        assert_eq!(input.key(&esc, ElementState::Pressed, true), None);
    }

    #[test]
    fn test_click_uses_logical_cursor() {
        let mut input = InputTranslator::new(2.0);
        assert_eq!(input.mouse_button(MouseButton::Left, ElementState::Pressed), None);

        input.cursor_moved(PhysicalPosition::new(200.0, 100.0));
        assert_eq!(
            input.mouse_button(MouseButton::Left, ElementState::Pressed),
            Some(InputEvent::MouseClick { x: 100.0, y: 50.0 })
        );
        assert_eq!(input.mouse_button(MouseButton::Right, ElementState::Pressed), None);
        assert_eq!(input.mouse_button(MouseButton::Left, ElementState::Released), None);
    }
}
