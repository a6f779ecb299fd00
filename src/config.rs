// Palette, brush sizes and window bounds, loaded from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::Rgb;

/// Used when a hand-built config has no usable palette entry.
const FALLBACK_COLOR: Rgb = Rgb::new(0xef, 0x44, 0x44);
/// Used when a hand-built config has no usable brush size.
const FALLBACK_BRUSH: f32 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub name: String,
    pub color: Rgb,
}

impl PaletteEntry {
    fn new(name: &str, color: Rgb) -> Self {
        Self { name: name.to_owned(), color }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Larger images open scaled down to fit these bounds.
    pub max_width: usize,
    pub max_height: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { max_width: 1280, max_height: 800 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub palette: Vec<PaletteEntry>,
    pub brush_sizes: Vec<f32>,
    /// Index into `palette`.
    pub default_color: usize,
    /// Index into `brush_sizes`.
    pub default_brush: usize,
    pub window: WindowConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            palette: vec![
                PaletteEntry::new("Red", Rgb::new(0xef, 0x44, 0x44)),
                PaletteEntry::new("Blue", Rgb::new(0x3b, 0x82, 0xf6)),
                PaletteEntry::new("Green", Rgb::new(0x22, 0xc5, 0x5e)),
                PaletteEntry::new("Yellow", Rgb::new(0xfa, 0xcc, 0x15)),
                PaletteEntry::new("White", Rgb::new(0xff, 0xff, 0xff)),
            ],
            brush_sizes: vec![4.0, 12.0, 24.0],
            default_color: 0,
            default_brush: 1,
            window: WindowConfig::default(),
        }
    }
}

impl Config {
    /// Parse and validate. `origin` only labels errors.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, Error> {
        let config: Config = toml::from_str(text).map_err(|source| Error::ConfigParse {
            path: origin.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. Every failure is reported.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Explicit path: errors are fatal. Otherwise the per-user file is tried
    /// and any problem with it falls back to the defaults with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let Some(path) = default_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                log::warn!("ignoring {}: {e}; using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.palette.is_empty() {
            return Err(Error::ConfigInvalid("palette is empty".into()));
        }
        if self.brush_sizes.is_empty() {
            return Err(Error::ConfigInvalid("brush_sizes is empty".into()));
        }
        if let Some(bad) = self.brush_sizes.iter().find(|w| !is_valid_width(**w)) {
            return Err(Error::ConfigInvalid(format!("brush size {bad} must be a positive number")));
        }
        if self.default_color >= self.palette.len() {
            return Err(Error::ConfigInvalid(format!(
                "default_color {} out of range (palette has {})",
                self.default_color,
                self.palette.len()
            )));
        }
        if self.default_brush >= self.brush_sizes.len() {
            return Err(Error::ConfigInvalid(format!(
                "default_brush {} out of range ({} brush sizes)",
                self.default_brush,
                self.brush_sizes.len()
            )));
        }
        if self.window.max_width == 0 || self.window.max_height == 0 {
            return Err(Error::ConfigInvalid("window bounds must be non-zero".into()));
        }
        Ok(())
    }

    /// Palette entry at `default_color`, else the first entry. Never panics,
    /// even for a config that skipped `validate`.
    pub fn default_color(&self) -> Rgb {
        self.palette
            .get(self.default_color)
            .or_else(|| self.palette.first())
            .map_or(FALLBACK_COLOR, |entry| entry.color)
    }

    /// Same lookup rule as `default_color`; invalid widths are skipped too.
    pub fn default_brush_width(&self) -> f32 {
        self.brush_sizes
            .get(self.default_brush)
            .into_iter()
            .chain(self.brush_sizes.first())
            .copied()
            .find(|&w| is_valid_width(w))
            .unwrap_or(FALLBACK_BRUSH)
    }
}

/// Brush widths must be finite and strictly positive.
pub fn is_valid_width(width: f32) -> bool {
    width.is_finite() && width > 0.0
}

/// `<config dir>/sketch-overlay/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sketch-overlay").join("config.toml"))
}
