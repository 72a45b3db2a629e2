//! Input events and the commands they map to

use std::collections::HashMap;

/// Raw input delivered by the host window, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Window closed or process asked to stop
    Quit,
    /// Key press, named the way key bindings name it ("Left", "Escape", "g")
    Key(String),
    /// Primary button click in viewport coordinates
    MouseClick { x: f32, y: f32 },
}

/// Action understood by the view state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Next,
    Previous,
    ToggleGrid,
    NextPage,
    PreviousPage,
    Export,
    Cancel,
    Quit,
}

impl Command {
    pub const VIEW_NEXT: &'static str = "view.next";
    pub const VIEW_PREV: &'static str = "view.prev";
    pub const VIEW_TOGGLE_GRID: &'static str = "view.toggle_grid";
    pub const GRID_NEXT_PAGE: &'static str = "grid.next_page";
    pub const GRID_PREV_PAGE: &'static str = "grid.prev_page";
    pub const APP_EXPORT: &'static str = "app.export";
    pub const APP_CANCEL: &'static str = "app.cancel";
    pub const APP_QUIT: &'static str = "app.quit";

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            Self::VIEW_NEXT => Some(Command::Next),
            Self::VIEW_PREV => Some(Command::Previous),
            Self::VIEW_TOGGLE_GRID => Some(Command::ToggleGrid),
            Self::GRID_NEXT_PAGE => Some(Command::NextPage),
            Self::GRID_PREV_PAGE => Some(Command::PreviousPage),
            Self::APP_EXPORT => Some(Command::Export),
            Self::APP_CANCEL => Some(Command::Cancel),
            Self::APP_QUIT => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Key name -> command lookup built from the settings record
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<String, Command>,
}

impl KeyBindings {
    /// Invert the settings map: command -> keys becomes key -> command.
    ///
    /// Commands missing from `bindings` keep their default keys, and a key
    /// bound by the user wins over the same key in the defaults.
    pub fn new(bindings: &HashMap<String, Vec<String>>) -> Self {
        let mut key_to_command = HashMap::new();

        for (id, keys) in default_keybindings() {
            if bindings.contains_key(&id) {
                continue;
            }
            if let Some(command) = Command::from_id(&id) {
                for key in keys {
                    key_to_command.insert(key.to_lowercase(), command);
                }
            }
        }

        for (id, keys) in bindings {
            let Some(command) = Command::from_id(id) else {
                tracing::warn!("Ignoring binding for unknown command {:?}", id);
                continue;
            };
            for key in keys {
                key_to_command.insert(key.to_lowercase(), command);
            }
        }

        Self {
            bindings: key_to_command,
        }
    }

    pub fn resolve(&self, key: &str) -> Option<Command> {
        self.bindings.get(&key.to_lowercase()).copied()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new(&default_keybindings())
    }
}

pub(crate) fn default_keybindings() -> HashMap<String, Vec<String>> {
    let mut kb = HashMap::new();

    kb.insert(Command::VIEW_NEXT.into(), vec!["Right".into(), "Space".into(), "n".into()]);
    kb.insert(Command::VIEW_PREV.into(), vec!["Left".into(), "Backspace".into(), "p".into()]);
    kb.insert(Command::VIEW_TOGGLE_GRID.into(), vec!["g".into(), "Tab".into()]);
    kb.insert(Command::GRID_NEXT_PAGE.into(), vec!["PageDown".into()]);
    kb.insert(Command::GRID_PREV_PAGE.into(), vec!["PageUp".into()]);
    kb.insert(Command::APP_EXPORT.into(), vec!["e".into()]);
    kb.insert(Command::APP_CANCEL.into(), vec!["Escape".into()]);
    kb.insert(Command::APP_QUIT.into(), vec!["q".into()]);

    kb
}
