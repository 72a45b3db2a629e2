//! Presentation settings and their on-disk store

use crate::AppError;
use directories::ProjectDirs;
use parking_lot::RwLock;
use serde::de::{Deserialize, Deserializer};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Presentation settings, loaded once per session
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-frame alpha (fade) or pixel (slide) increment
    pub transition_speed: u32,
    pub grid_layout: GridLayout,
    pub background_color: Rgb,
    pub theme: ThemeName,

    pub transition_style: TransitionStyle,
    /// Gap between grid cells and around the grid, in pixels
    pub grid_margin: u32,
    pub frame_delay_ms: u64,
    pub show_welcome: bool,
    pub keybindings: HashMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transition_speed: 20,
            grid_layout: GridLayout { columns: 3, rows: 2 },
            background_color: Rgb([0, 0, 0]),
            theme: ThemeName::Dark,
            transition_style: TransitionStyle::Fade,
            grid_margin: 10,
            frame_delay_ms: 30,
            show_welcome: true,
            keybindings: crate::command::default_keybindings(),
        }
    }
}

impl Settings {
    /// Check the ranges the rest of the engine relies on
    pub fn validate(&self) -> Result<(), AppError> {
        if self.transition_speed == 0 {
            return Err(AppError::ConfigRead("transition_speed must be positive".into()));
        }
        if self.grid_layout.columns == 0 || self.grid_layout.rows == 0 {
            return Err(AppError::ConfigRead(format!(
                "grid_layout must be at least 1x1, got {}x{}",
                self.grid_layout.columns, self.grid_layout.rows
            )));
        }
        Ok(())
    }
}

/// Grid dimensions, persisted as `[columns, rows]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
}

impl GridLayout {
    pub fn cells(&self) -> usize {
        self.columns as usize * self.rows as usize
    }
}

impl Serialize for GridLayout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.columns, self.rows].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GridLayout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [columns, rows] = <[u32; 2]>::deserialize(deserializer)?;
        Ok(Self { columns, rows })
    }
}

/// RGB color, persisted as `[r, g, b]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }
}

/// Closed set of themes. Unknown names deserialize to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Dark => "dark",
            ThemeName::Light => "light",
        }
    }

    /// Parse a theme name, falling back to the default theme
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "light" => ThemeName::Light,
            "dark" => ThemeName::Dark,
            other => {
                tracing::warn!("Unknown theme {:?}, using {}", other, ThemeName::default());
                ThemeName::default()
            }
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ThemeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ThemeName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_name(&raw))
    }
}

/// How a slideshow image arrives on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
pub enum TransitionStyle {
    #[default]
    #[serde(rename = "fade")]
    Fade,
    #[serde(rename = "slide")]
    Slide,
}

/// Reads and writes the persisted settings record
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform configuration directory
    pub fn at_default_location() -> Self {
        Self::new(Self::default_path())
    }

    /// Get the settings file path
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("com", "Portfolio", "Portfolio")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("./settings.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings. Any failure degrades to the defaults.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(Some(settings)) => {
                tracing::info!("Settings loaded from {:?}", self.path);
                settings
            }
            Ok(None) => {
                tracing::info!("No settings at {:?}, using defaults", self.path);
                Settings::default()
            }
            Err(e) => {
                tracing::warn!("{}; using default settings", e);
                Settings::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Settings>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AppError::ConfigRead(format!("{:?}: {}", self.path, e)))?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| AppError::ConfigRead(format!("{:?}: {}", self.path, e)))?;
        settings.validate()?;
        Ok(Some(settings))
    }

    /// Persist settings, replacing the whole file
    pub fn save(&self, settings: &Settings) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(settings)
            .map_err(|e| AppError::ConfigRead(e.to_string()))?;
        std::fs::write(&self.path, content)?;

        tracing::info!("Settings saved to {:?}", self.path);
        Ok(())
    }
}

/// Settings shared between the frame loop and background work.
///
/// Single writer; readers take a copy so they never observe a half-applied
/// update.
#[derive(Debug, Default)]
pub struct SharedSettings {
    inner: RwLock<Settings>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    /// Replace the record if it validates
    pub fn replace(&self, settings: Settings) -> Result<(), AppError> {
        settings.validate()?;
        *self.inner.write() = settings;
        Ok(())
    }
}
