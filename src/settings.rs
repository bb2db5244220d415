use std::path::{Path, PathBuf};

use image::Rgba;

use crate::components::history::DEFAULT_MAX_HISTORY;
use crate::components::tools::{ToolProperties, clamp_tool_size};
use crate::ops::fill::Connectivity;

const SETTINGS_FILE: &str = "minipaint_settings.cfg";

/// Error type for explicit settings loading / saving
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse { line: usize, message: String },
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "I/O error: {}", e),
            SettingsError::Parse { line, message } => write!(f, "line {}: {}", line, message),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

/// Editor defaults: canvas created at start-up, history capacity and the
/// initial tool configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Fill colour of a new canvas and of `clear()`.
    pub background: Rgba<u8>,
    pub max_undo_steps: usize,
    pub brush_size: u32,
    pub stroke_size: u32,
    pub fill_connectivity: Connectivity,
    pub brush_color: Rgba<u8>,
    /// Factor applied per zoom-in / zoom-out step and per wheel notch.
    pub zoom_step: f32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            background: Rgba([255, 255, 255, 255]),
            max_undo_steps: DEFAULT_MAX_HISTORY,
            brush_size: 3,
            stroke_size: 3,
            fill_connectivity: Connectivity::Four,
            brush_color: Rgba([0, 0, 0, 255]),
            zoom_step: 1.1,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/minipaint/minipaint_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\MiniPaint\minipaint_settings.cfg
    /// On macOS:   ~/Library/Application Support/MiniPaint/minipaint_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").ok()?;
            return Some(PathBuf::from(appdata).join("MiniPaint").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("MiniPaint")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = match std::env::var("XDG_CONFIG_HOME") {
                Ok(xdg) => PathBuf::from(xdg),
                Err(_) => PathBuf::from(std::env::var("HOME").ok()?).join(".config"),
            };
            Some(config_dir.join("minipaint").join(SETTINGS_FILE))
        }
    }

    /// Serialize a colour as "r,g,b,a"
    fn color_to_str(c: Rgba<u8>) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse a colour from "r,g,b,a" (alpha optional, defaults to opaque)
    fn str_to_color(s: &str) -> Option<Rgba<u8>> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let r = parts[0].trim().parse::<u8>().ok()?;
        let g = parts[1].trim().parse::<u8>().ok()?;
        let b = parts[2].trim().parse::<u8>().ok()?;
        let a = match parts.get(3) {
            Some(a) => a.trim().parse::<u8>().ok()?,
            None => 255,
        };
        Some(Rgba([r, g, b, a]))
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "canvas_width={}\n\
             canvas_height={}\n\
             background={}\n\
             max_undo_steps={}\n\
             brush_size={}\n\
             stroke_size={}\n\
             fill_connectivity={}\n\
             brush_color={}\n\
             zoom_step={}\n",
            self.canvas_width,
            self.canvas_height,
            Self::color_to_str(self.background),
            self.max_undo_steps,
            self.brush_size,
            self.stroke_size,
            self.fill_connectivity.count(),
            Self::color_to_str(self.brush_color),
            self.zoom_step,
        )
    }

    /// Strict parse: a malformed value for a known key is an error.
    /// Unknown keys, blank lines and `#` comments are skipped.
    pub fn from_config_str(content: &str) -> Result<Self, SettingsError> {
        let mut s = Self::default();
        for (idx, line) in content.lines().enumerate() {
            if let Err(message) = s.apply_line(line) {
                return Err(SettingsError::Parse { line: idx + 1, message });
            }
        }
        Ok(s.sanitized())
    }

    /// Lenient parse: malformed values keep their defaults.
    pub fn from_config_str_lenient(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let _ = s.apply_line(line);
        }
        s.sanitized()
    }

    fn apply_line(&mut self, line: &str) -> Result<(), String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        let Some((key, val)) = line.split_once('=') else {
            return Err(format!("expected key=value, got '{}'", line));
        };
        let key = key.trim();
        let val = val.trim();
        let bad = |what: &str| format!("invalid {} '{}' for {}", what, val, key);
        match key {
            "canvas_width" => self.canvas_width = val.parse().map_err(|_| bad("integer"))?,
            "canvas_height" => self.canvas_height = val.parse().map_err(|_| bad("integer"))?,
            "background" => self.background = Self::str_to_color(val).ok_or_else(|| bad("colour"))?,
            "max_undo_steps" => self.max_undo_steps = val.parse().map_err(|_| bad("integer"))?,
            "brush_size" => self.brush_size = val.parse().map_err(|_| bad("integer"))?,
            "stroke_size" => self.stroke_size = val.parse().map_err(|_| bad("integer"))?,
            "fill_connectivity" => {
                let n: u8 = val.parse().map_err(|_| bad("connectivity"))?;
                self.fill_connectivity = Connectivity::from_count(n).ok_or_else(|| bad("connectivity"))?;
            }
            "brush_color" => self.brush_color = Self::str_to_color(val).ok_or_else(|| bad("colour"))?,
            "zoom_step" => {
                let step: f32 = val.parse().map_err(|_| bad("number"))?;
                if !step.is_finite() || step <= 1.0 {
                    return Err(bad("zoom step"));
                }
                self.zoom_step = step;
            }
            _ => {}
        }
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        self.canvas_width = self.canvas_width.max(1);
        self.canvas_height = self.canvas_height.max(1);
        self.max_undo_steps = self.max_undo_steps.max(1);
        self.brush_size = clamp_tool_size(self.brush_size);
        self.stroke_size = clamp_tool_size(self.stroke_size);
        self
    }

    /// Load from the platform settings file (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::from_config_str_lenient(&content)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_config_str(&content)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())?;
        Ok(())
    }

    pub fn tool_properties(&self) -> ToolProperties {
        ToolProperties {
            brush_color: self.brush_color,
            brush_size: self.brush_size,
            stroke_size: self.stroke_size,
            fill_connectivity: self.fill_connectivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_string_round_trips() {
        let s = EditorSettings {
            canvas_width: 64,
            background: Rgba([1, 2, 3, 4]),
            fill_connectivity: Connectivity::Eight,
            zoom_step: 1.25,
            ..Default::default()
        };
        assert_eq!(EditorSettings::from_config_str(&s.to_config_string()).unwrap(), s);
    }

    #[test]
    fn values_are_clamped() {
        let s = EditorSettings::from_config_str("brush_size=400\nstroke_size=0\nmax_undo_steps=0\ncanvas_width=0").unwrap();
        assert_eq!(s.brush_size, 50);
        assert_eq!(s.stroke_size, 1);
        assert_eq!(s.max_undo_steps, 1);
        assert_eq!(s.canvas_width, 1);
    }

    #[test]
    fn strict_parse_reports_line() {
        let err = EditorSettings::from_config_str("# header\nbrush_size=3\nfill_connectivity=6\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse { line: 3, .. }));
    }

    #[test]
    fn lenient_parse_keeps_defaults() {
        let s = EditorSettings::from_config_str_lenient("brush_color=red\nunknown=1\nstroke_size=7");
        assert_eq!(s.brush_color, Rgba([0, 0, 0, 255]));
        assert_eq!(s.stroke_size, 7);
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let s = EditorSettings {
            brush_size: 12,
            ..Default::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(EditorSettings::load_from(&path).unwrap(), s);
        assert!(matches!(
            EditorSettings::load_from(&dir.path().join("missing.cfg")),
            Err(SettingsError::Io(_))
        ));
    }
}
