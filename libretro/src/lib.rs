// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! libretro entry points.
//!
//! The frontend calls everything here from one thread, so the core lives
//! in a thread-local for the lifetime of the loaded library. Context
//! callbacks may arrive while a `retro_*` call is in progress; they go to
//! the graphics registry instead of the core, which defers them to the
//! next frame when it is busy.

// We have a lot of c-types in here, stop warning about their names!
#![allow(non_camel_case_types)]

use log::error;
use retro_pixel::game::GameSource;
use retro_pixel::lifecycle::{system_info, RetroCore};
use retro_pixel::render::graphics::{deliver_context_event, ContextEvent};
use retro_pixel::retro::abi::*;
use retro_pixel::retro::host::{ContextCallbacks, HostEnvironment, HostVideo};
use std::cell::{Cell, RefCell};
use std::ffi::{c_char, c_uint, c_void, CStr, CString};
use std::path::PathBuf;
use std::ptr;
use std::rc::Rc;
use std::sync::OnceLock;

thread_local! {
    static CORE: RefCell<RetroCore> = RefCell::new(RetroCore::new());
    static AUDIO_SAMPLE: Cell<Option<retro_audio_sample_t>> = const { Cell::new(None) };
    static AUDIO_BATCH: Cell<Option<retro_audio_sample_batch_t>> = const { Cell::new(None) };
    static INPUT_POLL: Cell<Option<retro_input_poll_t>> = const { Cell::new(None) };
    static INPUT_STATE: Cell<Option<retro_input_state_t>> = const { Cell::new(None) };
}

struct InfoStrings {
    name: CString,
    version: CString,
    extensions: CString,
}

static INFO_STRINGS: OnceLock<InfoStrings> = OnceLock::new();

fn info_strings() -> &'static InfoStrings {
    INFO_STRINGS.get_or_init(|| {
        let info = system_info();
        let c = |s: &str| CString::new(s).unwrap_or_default();
        InfoStrings {
            name: c(info.library_name),
            version: c(info.library_version),
            extensions: c(info.valid_extensions),
        }
    })
}

/// Run `f` on the core unless a call is already in progress
fn with_core<R>(op: &str, f: impl FnOnce(&mut RetroCore) -> R) -> Option<R> {
    CORE.with(|c| match c.try_borrow_mut() {
        Ok(mut core) => Some(f(&mut core)),
        Err(_) => {
            error!("{} called re-entrantly, ignored", op);
            None
        }
    })
}

extern "C" fn context_reset() {
    deliver_context_event(ContextEvent::Reset);
}

extern "C" fn context_destroy() {
    deliver_context_event(ContextEvent::Destroy);
}

#[no_mangle]
pub extern "C" fn retro_api_version() -> c_uint {
    RETRO_API_VERSION
}

#[no_mangle]
pub extern "C" fn retro_set_environment(cb: Option<retro_environment_t>) {
    let Some(cb) = cb else {
        return;
    };
    let callbacks = ContextCallbacks {
        reset: context_reset,
        destroy: context_destroy,
    };
    with_core("retro_set_environment", |core| {
        core.set_environment(Box::new(HostEnvironment::new(cb, callbacks)))
    });
}

#[no_mangle]
pub extern "C" fn retro_set_video_refresh(cb: Option<retro_video_refresh_t>) {
    if let Some(cb) = cb {
        with_core("retro_set_video_refresh", |core| {
            core.set_video_refresh(Rc::new(HostVideo::new(cb)))
        });
    }
}

#[no_mangle]
pub extern "C" fn retro_set_audio_sample(cb: Option<retro_audio_sample_t>) {
    AUDIO_SAMPLE.with(|a| a.set(cb));
}

#[no_mangle]
pub extern "C" fn retro_set_audio_sample_batch(cb: Option<retro_audio_sample_batch_t>) {
    AUDIO_BATCH.with(|a| a.set(cb));
}

#[no_mangle]
pub extern "C" fn retro_set_input_poll(cb: Option<retro_input_poll_t>) {
    INPUT_POLL.with(|i| i.set(cb));
}

#[no_mangle]
pub extern "C" fn retro_set_input_state(cb: Option<retro_input_state_t>) {
    INPUT_STATE.with(|i| i.set(cb));
}

#[no_mangle]
pub extern "C" fn retro_set_controller_port_device(_port: c_uint, _device: c_uint) {}

#[no_mangle]
pub extern "C" fn retro_get_system_info(info: *mut retro_system_info) {
    if info.is_null() {
        return;
    }
    let s = info_strings();
    let i = system_info();
    unsafe {
        *info = retro_system_info {
            library_name: s.name.as_ptr(),
            library_version: s.version.as_ptr(),
            valid_extensions: s.extensions.as_ptr(),
            need_fullpath: i.need_fullpath,
            block_extract: i.block_extract,
        };
    }
}

#[no_mangle]
pub extern "C" fn retro_get_system_av_info(info: *mut retro_system_av_info) {
    if info.is_null() {
        return;
    }
    if let Some(av) = with_core("retro_get_system_av_info", |core| core.av_info()) {
        unsafe {
            *info = av.to_raw();
        }
    }
}

#[no_mangle]
pub extern "C" fn retro_init() {
    if let Some(Err(e)) = with_core("retro_init", |core| core.init()) {
        error!("retro_init failed: {}", e);
        std::process::abort();
    }
}

#[no_mangle]
pub extern "C" fn retro_deinit() {
    with_core("retro_deinit", |core| core.deinit());
}

fn game_source(game: &retro_game_info) -> GameSource {
    let mut source = GameSource::default();
    if !game.path.is_null() {
        let p = unsafe { CStr::from_ptr(game.path) };
        source.path = Some(PathBuf::from(p.to_string_lossy().into_owned()));
    }
    if !game.data.is_null() && game.size > 0 {
        let d = unsafe { std::slice::from_raw_parts(game.data as *const u8, game.size) };
        source.data = Some(d.to_vec());
    }
    source
}

#[no_mangle]
pub extern "C" fn retro_load_game(game: *const retro_game_info) -> bool {
    if game.is_null() {
        error!("retro_load_game without content");
        return false;
    }
    let source = game_source(unsafe { &*game });
    match with_core("retro_load_game", |core| core.load_game(source)) {
        Some(Ok(())) => true,
        Some(Err(e)) => {
            error!("retro_load_game failed: {}", e);
            false
        }
        None => false,
    }
}

#[no_mangle]
pub extern "C" fn retro_load_game_special(
    _game_type: c_uint,
    _info: *const retro_game_info,
    _num_info: usize,
) -> bool {
    false
}

#[no_mangle]
pub extern "C" fn retro_unload_game() {
    with_core("retro_unload_game", |core| core.unload_game());
}

#[no_mangle]
pub extern "C" fn retro_run() {
    if let Some(poll) = INPUT_POLL.with(|i| i.get()) {
        unsafe { poll() };
    }
    with_core("retro_run", |core| core.run_frame());
}

#[no_mangle]
pub extern "C" fn retro_reset() {
    if let Some(Err(e)) = with_core("retro_reset", |core| core.reset()) {
        error!("retro_reset failed: {}", e);
    }
}

#[no_mangle]
pub extern "C" fn retro_get_region() -> c_uint {
    RETRO_REGION_NTSC
}

#[no_mangle]
pub extern "C" fn retro_serialize_size() -> usize {
    0
}

#[no_mangle]
pub extern "C" fn retro_serialize(_data: *mut c_void, _size: usize) -> bool {
    false
}

#[no_mangle]
pub extern "C" fn retro_unserialize(_data: *const c_void, _size: usize) -> bool {
    false
}

#[no_mangle]
pub extern "C" fn retro_cheat_reset() {}

#[no_mangle]
pub extern "C" fn retro_cheat_set(_index: c_uint, _enabled: bool, _code: *const c_char) {}

#[no_mangle]
pub extern "C" fn retro_get_memory_data(_id: c_uint) -> *mut c_void {
    ptr::null_mut()
}

#[no_mangle]
pub extern "C" fn retro_get_memory_size(_id: c_uint) -> usize {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::MaybeUninit;

    #[test]
    fn test_system_info() {
        let mut info = MaybeUninit::<retro_system_info>::uninit();
        retro_get_system_info(info.as_mut_ptr());
        let info = unsafe { info.assume_init() };
        let name = unsafe { CStr::from_ptr(info.library_name) };
        let ext = unsafe { CStr::from_ptr(info.valid_extensions) };
        assert_eq!(name.to_str().unwrap(), retro_pixel::LIBRARY_NAME);
        assert_eq!(ext.to_str().unwrap(), "lua");
        assert!(!info.need_fullpath);
        assert_eq!(retro_api_version(), 1);
    }

    #[test]
    fn test_av_info_defaults() {
        let mut av = retro_system_av_info::default();
        retro_get_system_av_info(&mut av);
        assert_eq!(av.geometry.base_width, 800);
        assert_eq!(av.geometry.max_height, 1080);
        assert_eq!(av.timing.fps, 60.0);
    }

    #[test]
    fn test_run_and_deinit_before_init_are_harmless() {
        retro_run();
        retro_deinit();
        retro_run();
        assert!(!retro_load_game(ptr::null()));
        assert_eq!(retro_serialize_size(), 0);
        assert!(retro_get_memory_data(0).is_null());
    }

    #[test]
    fn test_game_source_from_buffer_and_path() {
        let path = CString::new("/games/demo.lua").unwrap();
        let data = b"return 1";
        let info = retro_game_info {
            path: path.as_ptr(),
            data: data.as_ptr() as *const c_void,
            size: data.len(),
            meta: ptr::null(),
        };
        let s = game_source(&info);
        assert_eq!(s.path, Some(PathBuf::from("/games/demo.lua")));
        assert_eq!(s.data.as_deref(), Some(&data[..]));
    }
}
