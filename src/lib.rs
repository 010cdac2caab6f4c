// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! RetroPixel runs Lua games inside a libretro frontend.
//!
//! The frontend owns the process, the main loop, the OS window and the GL
//! context. This crate is the part that lives on the other side of the
//! libretro ABI: it negotiates a hardware render context, boots a Lua
//! engine, and then advances the game by exactly one cooperative step per
//! `retro_run`.
//!
//! Since no real window exists, games see a virtual window that keeps
//! logical size, pixel size and DPI scale consistent and answers fixed
//! values for everything an OS would normally decide (focus, displays,
//! message boxes).
//!
//! The `extern "C"` surface is in the `retro_pixel_libretro` crate; this
//! crate is plain Rust and can be driven by any [`retro::Environment`]
//! implementation, which is how the tests run it.

/// Name reported to the frontend
pub const LIBRARY_NAME: &str = "RetroPixel";
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Content the frontend may offer to this core
pub const VALID_EXTENSIONS: &str = "lua";
/// `arg[-2]` as seen by scripts
pub const RUNTIME_NAME: &str = "retro_pixel";

/// retro_pixel.toml: av, render, window, script and log sections
pub mod config;

/// CoreError, WindowError
pub mod error;

/// game content passed by path or buffer
pub mod game;

/// lifecycle controller driven by the host ABI
pub mod lifecycle;

/// log
pub mod log;

/// Render module, the core side of rendering.
/// negotiate: hardware context and pixel format handshake.
/// graphics: canvas state, viewport, context validity, presentation.
/// frame: frames handed to the host.
pub mod render;

/// libretro ABI types and the Environment seam
pub mod retro;

/// Lua engine, per-frame task and the `pixel` namespace
pub mod script;

/// virtual window and coordinate transform
pub mod window;
