// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Safe wrappers around the callbacks a libretro frontend hands the core.

use super::abi::*;
use super::{
    Environment, FramebufferAccessor, GameGeometry, HwRenderFlags, HwRenderGrant,
    HwRenderRequest, PixelFormat, ProcAddressLoader,
};
use crate::render::frame::{Frame, FrameSink};
use log::debug;
use std::ffi::{c_char, c_uint, c_void, CStr};
use std::path::PathBuf;
use std::ptr;

/// Context lifetime callbacks the core installs with `SET_HW_RENDER`
#[derive(Clone, Copy)]
pub struct ContextCallbacks {
    pub reset: retro_hw_context_reset_t,
    pub destroy: retro_hw_context_reset_t,
}

/// [`Environment`] over the frontend's `retro_environment_t`
pub struct HostEnvironment {
    cb: retro_environment_t,
    context: ContextCallbacks,
}

impl HostEnvironment {
    pub fn new(cb: retro_environment_t, context: ContextCallbacks) -> Self {
        Self { cb, context }
    }

    fn call(&self, cmd: c_uint, data: *mut c_void) -> bool {
        unsafe { (self.cb)(cmd, data) }
    }
}

pub(crate) fn hw_render_callback(
    request: &HwRenderRequest,
    context: ContextCallbacks,
) -> retro_hw_render_callback {
    let flags = request.flags;
    retro_hw_render_callback {
        context_type: request.context as c_uint,
        context_reset: Some(context.reset),
        get_current_framebuffer: None,
        get_proc_address: None,
        depth: flags.contains(HwRenderFlags::DEPTH),
        stencil: flags.contains(HwRenderFlags::STENCIL),
        bottom_left_origin: flags.contains(HwRenderFlags::BOTTOM_LEFT_ORIGIN),
        version_major: request.version_major,
        version_minor: request.version_minor,
        cache_context: flags.contains(HwRenderFlags::CACHE_CONTEXT),
        context_destroy: Some(context.destroy),
        debug_context: flags.contains(HwRenderFlags::DEBUG_CONTEXT),
    }
}

impl Environment for HostEnvironment {
    fn set_pixel_format(&mut self, format: PixelFormat) -> bool {
        let mut pf = format as c_uint;
        self.call(
            RETRO_ENVIRONMENT_SET_PIXEL_FORMAT,
            &mut pf as *mut c_uint as *mut c_void,
        )
    }

    fn set_hw_render(&mut self, request: &HwRenderRequest) -> Option<HwRenderGrant> {
        let mut hw = hw_render_callback(request, self.context);
        let ok = self.call(
            RETRO_ENVIRONMENT_SET_HW_RENDER,
            &mut hw as *mut retro_hw_render_callback as *mut c_void,
        );
        debug!("SET_HW_RENDER:{}", ok);
        if !ok {
            return None;
        }
        Some(HwRenderGrant {
            framebuffer: hw.get_current_framebuffer.map(FramebufferAccessor::new),
            proc_address: hw.get_proc_address.map(ProcAddressLoader::new),
        })
    }

    fn set_geometry(&mut self, geometry: &GameGeometry) -> bool {
        let mut raw = geometry.to_raw();
        self.call(
            RETRO_ENVIRONMENT_SET_GEOMETRY,
            &mut raw as *mut retro_game_geometry as *mut c_void,
        )
    }

    fn system_directory(&mut self) -> Option<PathBuf> {
        let mut dir: *const c_char = ptr::null();
        let ok = self.call(
            RETRO_ENVIRONMENT_GET_SYSTEM_DIRECTORY,
            &mut dir as *mut *const c_char as *mut c_void,
        );
        if !ok || dir.is_null() {
            return None;
        }
        let s = unsafe { CStr::from_ptr(dir) };
        Some(PathBuf::from(s.to_string_lossy().into_owned()))
    }

    fn log_interface(&mut self) -> Option<retro_log_printf_t> {
        let mut cb = retro_log_callback { log: None };
        if self.call(
            RETRO_ENVIRONMENT_GET_LOG_INTERFACE,
            &mut cb as *mut retro_log_callback as *mut c_void,
        ) {
            cb.log
        } else {
            None
        }
    }

    fn shutdown(&mut self) -> bool {
        self.call(RETRO_ENVIRONMENT_SHUTDOWN, ptr::null_mut())
    }
}

/// [`FrameSink`] over `retro_video_refresh_t`
pub struct HostVideo {
    cb: retro_video_refresh_t,
}

impl HostVideo {
    pub fn new(cb: retro_video_refresh_t) -> Self {
        Self { cb }
    }
}

impl FrameSink for HostVideo {
    fn submit(&self, frame: Frame) {
        let (data, w, h) = match frame {
            Frame::Hardware { width, height } => (RETRO_HW_FRAME_BUFFER_VALID, width, height),
            Frame::Duplicate { width, height } => (ptr::null(), width, height),
        };
        unsafe { (self.cb)(data, w, h, 0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retro::HwContextType;
    use num_traits::FromPrimitive;
    use std::cell::RefCell;

    thread_local! {
        static SEEN: RefCell<Vec<(c_uint, Option<HwContextType>)>> = RefCell::new(vec![]);
        static FRAMES: RefCell<Vec<(bool, c_uint, c_uint)>> = RefCell::new(vec![]);
    }

    unsafe extern "C" fn noop() {}

    unsafe extern "C" fn fbo() -> usize {
        3
    }

    unsafe extern "C" fn accept_all(cmd: c_uint, data: *mut c_void) -> bool {
        let mut ctx = None;
        if cmd == RETRO_ENVIRONMENT_SET_HW_RENDER {
            let hw = &mut *(data as *mut retro_hw_render_callback);
            ctx = HwContextType::from_u32(hw.context_type);
            hw.get_current_framebuffer = Some(fbo);
        }
        SEEN.with(|s| s.borrow_mut().push((cmd, ctx)));
        cmd != RETRO_ENVIRONMENT_SHUTDOWN
    }

    unsafe extern "C" fn video(data: *const c_void, w: c_uint, h: c_uint, _pitch: usize) {
        FRAMES.with(|f| f.borrow_mut().push((data == RETRO_HW_FRAME_BUFFER_VALID, w, h)));
    }

    fn callbacks() -> ContextCallbacks {
        ContextCallbacks {
            reset: noop,
            destroy: noop,
        }
    }

    #[test]
    fn test_hw_render_passes_request_and_returns_accessor() {
        let mut env = HostEnvironment::new(accept_all, callbacks());
        let req = HwRenderRequest {
            context: HwContextType::OpenGlCore,
            version_major: 4,
            version_minor: 5,
            flags: HwRenderFlags::DEPTH | HwRenderFlags::STENCIL,
        };
        let grant = env.set_hw_render(&req).expect("accepted");
        assert_eq!(grant.framebuffer.map(|f| f.current()), Some(3));
        assert!(grant.proc_address.is_none());
        SEEN.with(|s| {
            assert!(s
                .borrow()
                .contains(&(RETRO_ENVIRONMENT_SET_HW_RENDER, Some(HwContextType::OpenGlCore))));
        });
    }

    #[test]
    fn test_flags_map_to_struct_fields() {
        let req = HwRenderRequest {
            context: HwContextType::OpenGl,
            version_major: 3,
            version_minor: 3,
            flags: HwRenderFlags::BOTTOM_LEFT_ORIGIN | HwRenderFlags::DEBUG_CONTEXT,
        };
        let hw = hw_render_callback(&req, callbacks());
        assert!(hw.bottom_left_origin && hw.debug_context);
        assert!(!hw.depth && !hw.stencil && !hw.cache_context);
        assert!(hw.context_reset.is_some() && hw.context_destroy.is_some());
    }

    #[test]
    fn test_video_frames() {
        let v = HostVideo::new(video);
        v.submit(Frame::Hardware {
            width: 320,
            height: 200,
        });
        v.submit(Frame::Duplicate {
            width: 320,
            height: 200,
        });
        FRAMES.with(|f| {
            assert_eq!(*f.borrow(), vec![(true, 320, 200), (false, 320, 200)]);
        });
    }

    #[test]
    fn test_shutdown_refused() {
        let mut env = HostEnvironment::new(accept_all, callbacks());
        assert!(!env.shutdown());
    }
}
