// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Host frontend seam.
//!
//! `abi` mirrors libretro.h. The rest of the crate never touches raw
//! pointers: it talks to the host through the [`Environment`] trait and the
//! [`FrameSink`](crate::render::frame::FrameSink) trait, which `host`
//! implements over the raw callbacks and tests implement with doubles.

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub mod abi;
pub mod host;

use abi::{
    retro_game_geometry, retro_hw_get_current_framebuffer_t, retro_hw_get_proc_address_t,
    retro_log_printf_t, retro_system_av_info, retro_system_timing,
};

/// Framebuffer pixel formats understood by libretro
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Xrgb1555 = 0,
    Xrgb8888 = 1,
    Rgb565 = 2,
}

/// Graphics API families a core can request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromPrimitive, ToPrimitive,
)]
#[serde(rename_all = "snake_case")]
pub enum HwContextType {
    None = 0,
    OpenGl = 1,
    OpenGles2 = 2,
    OpenGlCore = 3,
    OpenGles3 = 4,
    OpenGlesVersion = 5,
    Vulkan = 6,
}

bitflags! {
    /// Boolean switches of `retro_hw_render_callback`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct HwRenderFlags: u32 {
        const DEPTH = 1 << 0;
        const STENCIL = 1 << 1;
        const BOTTOM_LEFT_ORIGIN = 1 << 2;
        const CACHE_CONTEXT = 1 << 3;
        const DEBUG_CONTEXT = 1 << 4;
    }
}

/// What the core asks of the host when requesting hardware rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwRenderRequest {
    pub context: HwContextType,
    pub version_major: u32,
    pub version_minor: u32,
    pub flags: HwRenderFlags,
}

/// Host-side accessor returning the FBO the core must render into
#[derive(Clone, Copy)]
pub struct FramebufferAccessor(retro_hw_get_current_framebuffer_t);

impl FramebufferAccessor {
    pub fn new(f: retro_hw_get_current_framebuffer_t) -> Self {
        Self(f)
    }

    /// Current framebuffer object name; only meaningful while the
    /// host context is alive.
    pub fn current(&self) -> usize {
        unsafe { (self.0)() }
    }
}

impl fmt::Debug for FramebufferAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FramebufferAccessor({:p})", self.0 as *const ())
    }
}

/// Returned by the host when it accepts a hardware render request
#[derive(Debug, Clone, Copy)]
pub struct HwRenderGrant {
    pub framebuffer: Option<FramebufferAccessor>,
    pub proc_address: Option<ProcAddressLoader>,
}

/// Host GL symbol loader
#[derive(Clone, Copy)]
pub struct ProcAddressLoader(retro_hw_get_proc_address_t);

impl ProcAddressLoader {
    pub fn new(f: retro_hw_get_proc_address_t) -> Self {
        Self(f)
    }

    pub fn raw(&self) -> retro_hw_get_proc_address_t {
        self.0
    }
}

impl fmt::Debug for ProcAddressLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcAddressLoader({:p})", self.0 as *const ())
    }
}

/// Base and maximum output size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameGeometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub aspect_ratio: f32,
}

impl GameGeometry {
    pub fn to_raw(&self) -> retro_game_geometry {
        retro_game_geometry {
            base_width: self.base_width,
            base_height: self.base_height,
            max_width: self.max_width,
            max_height: self.max_height,
            aspect_ratio: self.aspect_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvInfo {
    pub geometry: GameGeometry,
    pub fps: f64,
    pub sample_rate: f64,
}

impl AvInfo {
    pub fn to_raw(&self) -> retro_system_av_info {
        retro_system_av_info {
            geometry: self.geometry.to_raw(),
            timing: retro_system_timing {
                fps: self.fps,
                sample_rate: self.sample_rate,
            },
        }
    }
}

/// Static identity reported by `retro_get_system_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemInfo {
    pub library_name: &'static str,
    pub library_version: &'static str,
    pub valid_extensions: &'static str,
    pub need_fullpath: bool,
    pub block_extract: bool,
}

/// Environment calls the core makes into the host.
///
/// Every method is a request the host may refuse; refusals are answered
/// with `false`/`None` and never as errors.
pub trait Environment {
    fn set_pixel_format(&mut self, format: PixelFormat) -> bool;

    fn set_hw_render(&mut self, request: &HwRenderRequest) -> Option<HwRenderGrant>;

    fn set_geometry(&mut self, _geometry: &GameGeometry) -> bool {
        false
    }

    fn system_directory(&mut self) -> Option<PathBuf> {
        None
    }

    fn log_interface(&mut self) -> Option<retro_log_printf_t> {
        None
    }

    /// Ask the frontend to end the session
    fn shutdown(&mut self) -> bool {
        false
    }
}
