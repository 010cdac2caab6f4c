// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! GL state restore through glow.
//!
//! The host hands out its symbol loader during negotiation; a glow context
//! is built from it every time the host (re)creates its GL context, and
//! dropped again when the context goes away.

use crate::render::graphics::{GlState, StateRestorer};
use crate::retro::{HwContextType, ProcAddressLoader};
use glow::HasContext;
use log::{info, trace};
use std::{
    ffi::{c_void, CString},
    num::NonZeroU32,
    ptr,
};

/// Contexts glow can drive
pub fn is_gl_context(context: HwContextType) -> bool {
    !matches!(context, HwContextType::None | HwContextType::Vulkan)
}

/// Framebuffer name as glow wants it, 0 being the default framebuffer
pub fn native_framebuffer(fbo: Option<usize>) -> Option<glow::NativeFramebuffer> {
    fbo.and_then(|f| u32::try_from(f).ok())
        .and_then(NonZeroU32::new)
        .map(glow::NativeFramebuffer)
}

pub struct GlRestorer {
    gl: glow::Context,
}

impl GlRestorer {
    /// Load GL entry points through the host.
    ///
    /// # Safety
    /// The host GL context must be current, which holds inside the
    /// context reset callback and during `retro_run`.
    pub unsafe fn load(loader: ProcAddressLoader) -> Self {
        let get = loader.raw();
        let gl = glow::Context::from_loader_function(|s| {
            let Ok(name) = CString::new(s) else {
                return ptr::null();
            };
            match get(name.as_ptr()) {
                Some(f) => f as *const c_void,
                None => ptr::null(),
            }
        });
        info!("gl restorer loaded: {:?}", gl.version());
        Self { gl }
    }
}

impl StateRestorer for GlRestorer {
    fn restore(&mut self, state: &GlState) {
        trace!("restore_state {:?}", state);
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, native_framebuffer(state.framebuffer));
            self.gl.viewport(
                0,
                0,
                state.viewport.pixel_width,
                state.viewport.pixel_height,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_framebuffer() {
        assert_eq!(native_framebuffer(None), None);
        assert_eq!(native_framebuffer(Some(0)), None);
        assert_eq!(
            native_framebuffer(Some(7)),
            Some(glow::NativeFramebuffer(NonZeroU32::new(7).unwrap()))
        );
    }

    #[test]
    fn test_gl_contexts() {
        assert!(is_gl_context(HwContextType::OpenGlCore));
        assert!(is_gl_context(HwContextType::OpenGles3));
        assert!(!is_gl_context(HwContextType::Vulkan));
        assert!(!is_gl_context(HwContextType::None));
    }
}
