// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Core configuration.
//!
//! Read once at `init` from `retro_pixel.toml` in the frontend's system
//! directory. Every key is optional; a missing file means defaults.
//!
//! ```toml
//! [av]
//! base_width = 640
//! base_height = 480
//!
//! [render]
//! context = "open_gl_core"
//! version_major = 3
//! version_minor = 3
//! flags = "DEPTH | STENCIL | BOTTOM_LEFT_ORIGIN"
//!
//! [log]
//! level = "debug"
//! file = "log/retro_pixel.log"
//! ```

use crate::error::CoreError;
use crate::retro::{
    AvInfo, GameGeometry, HwContextType, HwRenderFlags, HwRenderRequest, PixelFormat,
};
use crate::LIBRARY_NAME;
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "retro_pixel.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub av: AvConfig,
    pub render: RenderConfig,
    pub window: WindowConfig,
    pub script: ScriptConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AvConfig {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    /// 0 lets the frontend derive it from the base size
    pub aspect_ratio: f32,
    pub fps: f64,
    pub sample_rate: f64,
}

impl Default for AvConfig {
    fn default() -> Self {
        Self {
            base_width: 800,
            base_height: 600,
            max_width: 1920,
            max_height: 1080,
            aspect_ratio: 0.0,
            fps: 60.0,
            sample_rate: 48000.0,
        }
    }
}

impl AvConfig {
    pub fn av_info(&self) -> AvInfo {
        AvInfo {
            geometry: self.geometry(self.base_width, self.base_height),
            fps: self.fps,
            sample_rate: self.sample_rate,
        }
    }

    /// Geometry for an output of `w`x`h` pixels, clamped to the max size
    pub fn geometry(&self, w: u32, h: u32) -> GameGeometry {
        GameGeometry {
            base_width: w.clamp(1, self.max_width.max(1)),
            base_height: h.clamp(1, self.max_height.max(1)),
            max_width: self.max_width,
            max_height: self.max_height,
            aspect_ratio: self.aspect_ratio,
        }
    }

    pub fn frame_time(&self) -> f64 {
        if self.fps > 0.0 {
            1.0 / self.fps
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub pixel_format: PixelFormat,
    pub context: HwContextType,
    pub version_major: u32,
    pub version_minor: u32,
    pub flags: HwRenderFlags,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Xrgb8888,
            context: HwContextType::OpenGlCore,
            version_major: 4,
            version_minor: 5,
            flags: HwRenderFlags::DEPTH
                | HwRenderFlags::STENCIL
                | HwRenderFlags::BOTTOM_LEFT_ORIGIN
                | HwRenderFlags::DEBUG_CONTEXT,
        }
    }
}

impl RenderConfig {
    pub fn hw_request(&self) -> HwRenderRequest {
        HwRenderRequest {
            context: self.context,
            version_major: self.version_major,
            version_minor: self.version_minor,
            flags: self.flags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Pixels per logical unit reported as the native display scale
    pub display_scale: f64,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            display_scale: 1.0,
            title: LIBRARY_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Appended to the script-visible `arg` table after the game path
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// Optional log file, relative paths resolve against the system dir
    pub file: Option<PathBuf>,
    /// Forward records to the frontend log interface when it has one
    pub host: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file: None,
            host: true,
        }
    }
}

impl CoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut cfg = Self::from_toml_str(&text).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let (Some(dir), Some(file)) = (path.parent(), cfg.log.file.as_ref()) {
            if file.is_relative() {
                cfg.log.file = Some(dir.join(file));
            }
        }
        Ok(cfg)
    }

    /// Look for the config file in `dir`. `Ok(None)` when there is none.
    pub fn discover(dir: Option<&Path>) -> Result<Option<Self>, CoreError> {
        let Some(dir) = dir else {
            return Ok(None);
        };
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }
}
