// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! The `pixel` runtime namespace seen by scripts.
//!
//! `require("pixel")` returns one table with the window, graphics, timer,
//! image and log sub-tables. Every function closes over the shared
//! [`Runtime`] handles; nothing here holds a borrow across calls back
//! into Lua.
//!
//! Lua display indices are 1-based and converted here.

use crate::error::WindowError;
use crate::render::graphics::Graphics;
use crate::script::engine::{script_log, ScriptEngine};
use crate::window::{FullscreenType, VirtualWindow, WindowSettings};
use crate::LIBRARY_NAME;
use image::{ColorType, DynamicImage, RgbImage, RgbaImage};
use log::warn;
use mlua::{AnyUserData, Lua, Table, UserData, UserDataMethods, Value, Variadic};
use std::{cell::RefCell, rc::Rc};

const BOOT_SCRIPT: &str = include_str!("boot.lua");

pub const PIXEL_MODULE: &str = "pixel";
pub const BOOT_MODULE: &str = "pixel.boot";

/// Fixed-step clock; the host paces frames, so every step is one frame
#[derive(Debug, Clone)]
pub struct FrameTimer {
    frame_time: f64,
    delta: f64,
    time: f64,
}

impl FrameTimer {
    pub fn new(frame_time: f64) -> Self {
        Self {
            frame_time,
            delta: 0.0,
            time: 0.0,
        }
    }

    pub fn step(&mut self) -> f64 {
        self.delta = self.frame_time;
        self.time += self.delta;
        self.delta
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn fps(&self) -> i64 {
        if self.frame_time > 0.0 {
            (1.0 / self.frame_time).round() as i64
        } else {
            0
        }
    }
}

/// Window size and title used when the game does not pick its own
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDefaults {
    pub width: i32,
    pub height: i32,
    pub title: String,
}

/// Handles shared between the core and the script bindings
#[derive(Clone)]
pub struct Runtime {
    pub window: Rc<RefCell<VirtualWindow>>,
    pub graphics: Rc<RefCell<Graphics>>,
    pub timer: Rc<RefCell<FrameTimer>>,
    pub defaults: WindowDefaults,
}

/// Script-side image: the only thing scripts can hand to `setIcon`
pub struct ImageData(pub DynamicImage);

fn color_name(c: ColorType) -> &'static str {
    match c {
        ColorType::Rgba8 => "rgba8",
        ColorType::Rgb8 => "rgb8",
        ColorType::L8 => "r8",
        ColorType::La8 => "rg8",
        ColorType::Rgba16 => "rgba16",
        _ => "unknown",
    }
}

impl UserData for ImageData {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_method("getDimensions", |_, this, ()| {
            Ok((this.0.width(), this.0.height()))
        });
        methods.add_method("getFormat", |_, this, ()| Ok(color_name(this.0.color())));
    }
}

/// Register `pixel` and `pixel.boot` in `package.preload`
pub fn install(engine: &ScriptEngine, rt: &Runtime) -> mlua::Result<()> {
    let rt = rt.clone();
    let loader = engine
        .lua()
        .create_function(move |lua, _: Variadic<Value>| build_pixel(lua, &rt))?;
    engine.preload(PIXEL_MODULE, loader)?;
    engine.preload_source(BOOT_MODULE, BOOT_SCRIPT.as_bytes(), "=boot.lua")
}

fn build_pixel<'lua>(lua: &'lua Lua, rt: &Runtime) -> mlua::Result<Table<'lua>> {
    let pixel = lua.create_table()?;
    pixel.set("window", build_window(lua, rt)?)?;
    pixel.set("graphics", build_graphics(lua, rt)?)?;
    pixel.set("timer", build_timer(lua, rt)?)?;
    pixel.set("image", build_image(lua)?)?;
    pixel.set("log", build_log(lua)?)?;

    let defaults = lua.create_table()?;
    defaults.set("width", rt.defaults.width)?;
    defaults.set("height", rt.defaults.height)?;
    defaults.set("title", rt.defaults.title.as_str())?;
    pixel.set("_defaults", defaults)?;

    pixel.set(
        "getVersion",
        lua.create_function(|_, ()| Ok(version()))?,
    )?;
    // games address the runtime as a global, like `arg`
    lua.globals().set(PIXEL_MODULE, pixel.clone())?;
    Ok(pixel)
}

fn version() -> (u32, u32, u32, &'static str) {
    (
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
        LIBRARY_NAME,
    )
}

/// Settings from a Lua flags table; missing keys keep their defaults
pub fn settings_from_table(t: Option<Table>) -> mlua::Result<WindowSettings> {
    let mut s = WindowSettings::default();
    let Some(t) = t else {
        return Ok(s);
    };
    if let Some(v) = t.get::<_, Option<bool>>("fullscreen")? {
        s.fullscreen = v;
    }
    if let Some(name) = t.get::<_, Option<String>>("fullscreentype")? {
        match FullscreenType::from_name(&name) {
            Some(ft) => s.fstype = ft,
            None => warn!("unknown fullscreen type {:?}, using desktop", name),
        }
    }
    if let Some(v) = t.get::<_, Option<bool>>("usedpiscale")? {
        s.usedpiscale = v;
    }
    if let Some(v) = t.get::<_, Option<i32>>("vsync")? {
        s.vsync = v;
    }
    if let Some(v) = t.get::<_, Option<bool>>("resizable")? {
        s.resizable = v;
    }
    if let Some(v) = t.get::<_, Option<bool>>("borderless")? {
        s.borderless = v;
    }
    if let Some(v) = t.get::<_, Option<bool>>("alwaysontop")? {
        s.always_on_top = v;
    }
    Ok(s)
}

pub fn settings_to_table<'lua>(lua: &'lua Lua, s: &WindowSettings) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;
    t.set("fullscreen", s.fullscreen)?;
    t.set("fullscreentype", s.fstype.name())?;
    t.set("usedpiscale", s.usedpiscale)?;
    t.set("vsync", s.vsync)?;
    t.set("resizable", s.resizable)?;
    t.set("borderless", s.borderless)?;
    t.set("alwaysontop", s.always_on_top)?;
    Ok(t)
}

fn build_window<'lua>(lua: &'lua Lua, rt: &Runtime) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;

    let w = rt.window.clone();
    t.set(
        "setMode",
        lua.create_function(move |_, (width, height, flags): (i32, i32, Option<Table>)| {
            let settings = settings_from_table(flags)?;
            Ok(w.borrow_mut().set_window(width, height, Some(settings))?)
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "getMode",
        lua.create_function(move |lua, ()| {
            let (width, height, settings) = w.borrow_mut().get_window();
            Ok((width, height, settings_to_table(lua, &settings)?))
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "close",
        lua.create_function(move |_, ()| Ok(w.borrow_mut().close(true)?))?,
    )?;

    let w = rt.window.clone();
    t.set(
        "isOpen",
        lua.create_function(move |_, ()| Ok(w.borrow().is_open()))?,
    )?;

    let w = rt.window.clone();
    t.set(
        "setFullscreen",
        lua.create_function(move |_, (flag, fstype): (bool, Option<String>)| {
            let mut w = w.borrow_mut();
            let ft = match fstype.as_deref().map(FullscreenType::from_name) {
                Some(Some(ft)) => ft,
                Some(None) => return Ok(false),
                None => w.settings().fstype,
            };
            Ok(w.set_fullscreen_with(flag, ft)?)
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "getFullscreen",
        lua.create_function(move |_, ()| {
            let w = w.borrow();
            Ok((w.settings().fullscreen, w.settings().fstype.name()))
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "getWidth",
        lua.create_function(move |_, ()| Ok(w.borrow().width()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getHeight",
        lua.create_function(move |_, ()| Ok(w.borrow().height()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getDimensions",
        lua.create_function(move |_, ()| {
            let w = w.borrow();
            Ok((w.width(), w.height()))
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getPixelWidth",
        lua.create_function(move |_, ()| Ok(w.borrow().pixel_width()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getPixelHeight",
        lua.create_function(move |_, ()| Ok(w.borrow().pixel_height()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getPixelDimensions",
        lua.create_function(move |_, ()| {
            let w = w.borrow();
            Ok((w.pixel_width(), w.pixel_height()))
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "getDPIScale",
        lua.create_function(move |_, ()| Ok(w.borrow().dpi_scale()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getNativeDPIScale",
        lua.create_function(move |_, ()| Ok(w.borrow().native_dpi_scale()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "toPixels",
        lua.create_function(move |_, (x, y): (f64, Option<f64>)| {
            let w = w.borrow();
            Ok((w.to_pixels(x), y.map(|y| w.to_pixels(y))))
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "fromPixels",
        lua.create_function(move |_, (x, y): (f64, Option<f64>)| {
            let w = w.borrow();
            Ok((w.from_pixels(x), y.map(|y| w.from_pixels(y))))
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "setTitle",
        lua.create_function(move |_, title: String| {
            w.borrow_mut().set_title(&title);
            Ok(())
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getTitle",
        lua.create_function(move |_, ()| Ok(w.borrow().title().to_string()))?,
    )?;

    let w = rt.window.clone();
    t.set(
        "setIcon",
        lua.create_function(move |_, ud: AnyUserData| {
            let img = ud.borrow::<ImageData>()?;
            Ok(w.borrow_mut().set_icon(&img.0)?)
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "hasFocus",
        lua.create_function(move |_, ()| Ok(w.borrow().has_focus()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "hasMouseFocus",
        lua.create_function(move |_, ()| Ok(w.borrow().has_mouse_focus()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "isVisible",
        lua.create_function(move |_, ()| Ok(w.borrow().is_visible()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "isMinimized",
        lua.create_function(move |_, ()| Ok(w.borrow().is_minimized()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "isMaximized",
        lua.create_function(move |_, ()| Ok(w.borrow().is_maximized()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "minimize",
        lua.create_function(move |_, ()| {
            w.borrow_mut().minimize();
            Ok(())
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "maximize",
        lua.create_function(move |_, ()| {
            w.borrow_mut().maximize();
            Ok(())
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "restore",
        lua.create_function(move |_, ()| {
            w.borrow_mut().restore();
            Ok(())
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "setMouseGrab",
        lua.create_function(move |_, grab: bool| {
            w.borrow_mut().set_mouse_grab(grab);
            Ok(())
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "isMouseGrabbed",
        lua.create_function(move |_, ()| Ok(w.borrow().is_mouse_grabbed()))?,
    )?;

    let w = rt.window.clone();
    t.set(
        "getDisplayCount",
        lua.create_function(move |_, ()| Ok(w.borrow().display_count()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getDisplayName",
        lua.create_function(move |_, index: Option<i32>| {
            Ok(w.borrow().display_name(index.unwrap_or(1) - 1))
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getDisplayOrientation",
        lua.create_function(move |_, index: Option<i32>| {
            let o = w.borrow().display_orientation(index.unwrap_or(1) - 1);
            Ok(format!("{:?}", o).to_lowercase())
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getFullscreenModes",
        lua.create_function(move |lua, index: Option<i32>| {
            let modes = lua.create_table()?;
            for (i, (mw, mh)) in w
                .borrow()
                .fullscreen_sizes(index.unwrap_or(1) - 1)
                .into_iter()
                .enumerate()
            {
                let m = lua.create_table()?;
                m.set("width", mw)?;
                m.set("height", mh)?;
                modes.raw_set(i + 1, m)?;
            }
            Ok(modes)
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getDesktopDimensions",
        lua.create_function(move |_, index: Option<i32>| {
            Ok(w.borrow().desktop_dimensions(index.unwrap_or(1) - 1))
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "getPosition",
        lua.create_function(move |_, ()| {
            let (x, y, d) = w.borrow().position();
            Ok((x, y, d + 1))
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "setPosition",
        lua.create_function(move |_, (x, y, d): (i32, i32, Option<i32>)| {
            w.borrow_mut().set_position(x, y, d.unwrap_or(1) - 1);
            Ok(())
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "getSafeArea",
        lua.create_function(move |_, ()| {
            let a = w.borrow().safe_area();
            Ok((a.x, a.y, a.width, a.height))
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "getVSync",
        lua.create_function(move |_, ()| Ok(w.borrow().vsync()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "setVSync",
        lua.create_function(move |_, v: i32| {
            w.borrow_mut().set_vsync(v);
            Ok(())
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "isDisplaySleepEnabled",
        lua.create_function(move |_, ()| Ok(w.borrow().is_display_sleep_enabled()))?,
    )?;
    let w = rt.window.clone();
    t.set(
        "setDisplaySleepEnabled",
        lua.create_function(move |_, enable: bool| {
            w.borrow_mut().set_display_sleep_enabled(enable);
            Ok(())
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "showMessageBox",
        lua.create_function(move |_, (title, message): (String, String)| {
            Ok(w.borrow().show_message_box(&title, &message))
        })?,
    )?;
    let w = rt.window.clone();
    t.set(
        "requestAttention",
        lua.create_function(move |_, continuous: Option<bool>| {
            w.borrow().request_attention(continuous.unwrap_or(false));
            Ok(())
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "getName",
        lua.create_function(move |_, ()| Ok(w.borrow().name()))?,
    )?;

    Ok(t)
}

fn build_graphics<'lua>(lua: &'lua Lua, rt: &Runtime) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;

    // any non-nil target binds a canvas, nil returns to the screen
    let g = rt.graphics.clone();
    t.set(
        "setCanvas",
        lua.create_function(move |_, target: Value| {
            g.borrow_mut().set_canvas_active(!matches!(target, Value::Nil));
            Ok(())
        })?,
    )?;
    let g = rt.graphics.clone();
    t.set(
        "isCanvasActive",
        lua.create_function(move |_, ()| Ok(g.borrow().is_canvas_active()))?,
    )?;
    let g = rt.graphics.clone();
    t.set(
        "isActive",
        lua.create_function(move |_, ()| Ok(g.borrow().is_active()))?,
    )?;
    let g = rt.graphics.clone();
    t.set(
        "getDimensions",
        lua.create_function(move |_, ()| {
            let vp = g.borrow().viewport();
            Ok((vp.width, vp.height))
        })?,
    )?;
    let g = rt.graphics.clone();
    t.set(
        "getPixelDimensions",
        lua.create_function(move |_, ()| {
            let vp = g.borrow().viewport();
            Ok((vp.pixel_width, vp.pixel_height))
        })?,
    )?;

    let w = rt.window.clone();
    t.set(
        "present",
        lua.create_function(move |_, ()| Ok(w.borrow_mut().swap_buffers()))?,
    )?;
    Ok(t)
}

fn build_timer<'lua>(lua: &'lua Lua, rt: &Runtime) -> mlua::Result<Table<'lua>> {
    let t = lua.create_table()?;
    let tm = rt.timer.clone();
    t.set(
        "step",
        lua.create_function(move |_, ()| Ok(tm.borrow_mut().step()))?,
    )?;
    let tm = rt.timer.clone();
    t.set(
        "getDelta",
        lua.create_function(move |_, ()| Ok(tm.borrow().delta()))?,
    )?;
    let tm = rt.timer.clone();
    t.set(
        "getTime",
        lua.create_function(move |_, ()| Ok(tm.borrow().time()))?,
    )?;
    let tm = rt.timer.clone();
    t.set(
        "getFPS",
        lua.create_function(move |_, ()| Ok(tm.borrow().fps()))?,
    )?;
    Ok(t)
}

fn build_image(lua: &Lua) -> mlua::Result<Table> {
    let t = lua.create_table()?;
    t.set(
        "newImageData",
        lua.create_function(|lua, (w, h, format): (u32, u32, Option<String>)| {
            let img = match format.as_deref().unwrap_or("rgba8") {
                "rgba8" => DynamicImage::ImageRgba8(RgbaImage::new(w, h)),
                "rgb8" => DynamicImage::ImageRgb8(RgbImage::new(w, h)),
                other => {
                    return Err(mlua::Error::external(WindowError::FormatError(format!(
                        "unsupported image format {:?}",
                        other
                    ))))
                }
            };
            lua.create_userdata(ImageData(img))
        })?,
    )?;
    Ok(t)
}

fn build_log(lua: &Lua) -> mlua::Result<Table> {
    let t = lua.create_table()?;
    for level in ["debug", "info", "warn", "error"] {
        t.set(
            level,
            lua.create_function(move |_, values: Variadic<Value>| {
                script_log(level, &values);
                Ok(())
            })?,
        )?;
    }
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;
    use crate::render::graphics::ContextState;

    fn runtime() -> Runtime {
        let graphics = Rc::new(RefCell::new(Graphics::new()));
        let mut window = VirtualWindow::new(&WindowConfig::default(), (800, 600));
        window.set_graphics(&graphics);
        Runtime {
            window: Rc::new(RefCell::new(window)),
            graphics,
            timer: Rc::new(RefCell::new(FrameTimer::new(1.0 / 60.0))),
            defaults: WindowDefaults {
                width: 800,
                height: 600,
                title: LIBRARY_NAME.to_string(),
            },
        }
    }

    fn engine(rt: &Runtime) -> ScriptEngine {
        let e = ScriptEngine::new().unwrap();
        e.setup().unwrap();
        install(&e, rt).unwrap();
        e
    }

    #[test]
    fn test_window_mode_round_trip() {
        let rt = runtime();
        let e = engine(&rt);
        let ok: bool = e
            .lua()
            .load(
                r#"
local pixel = require("pixel")
assert(pixel.window.setMode(320, 200, { vsync = 0, resizable = true, fullscreentype = "exclusive" }))
local w, h, f = pixel.window.getMode()
assert(w == 320 and h == 200)
assert(f.vsync == 0 and f.resizable and f.fullscreentype == "exclusive")
assert(f.usedpiscale == true and f.fullscreen == false)
assert(pixel.window.getDisplayName(1) == "libretro")
assert(pixel.window.getDisplayName(2) == nil)
assert(#pixel.window.getFullscreenModes() == 1)
local _, _, d = pixel.window.getPosition()
assert(d == 1)
return pixel.window.isOpen()
"#,
            )
            .eval()
            .unwrap();
        assert!(ok);
        assert_eq!(rt.window.borrow().pixel_width(), 320);
    }

    #[test]
    fn test_canvas_precondition_is_catchable() {
        let rt = runtime();
        let e = engine(&rt);
        let msg: String = e
            .lua()
            .load(
                r#"
local pixel = require("pixel")
pixel.window.setMode(100, 100)
pixel.graphics.setCanvas(true)
local ok, err = pcall(pixel.window.setMode, 200, 200)
assert(not ok)
assert(pixel.window.getWidth() == 100)
pixel.graphics.setCanvas(nil)
return tostring(err)
"#,
            )
            .eval()
            .unwrap();
        assert!(msg.contains("canvas is active"));
    }

    #[test]
    fn test_set_icon_formats() {
        let rt = runtime();
        let e = engine(&rt);
        e.lua()
            .load(
                r#"
local pixel = require("pixel")
local ok = pcall(pixel.window.setIcon, pixel.image.newImageData(8, 8, "rgb8"))
assert(not ok)
assert(pixel.window.setIcon(pixel.image.newImageData(8, 8)) == false)
"#,
            )
            .exec()
            .unwrap();
        assert!(rt.window.borrow().icon().is_some());
    }

    #[test]
    fn test_graphics_and_timer() {
        let rt = runtime();
        let e = engine(&rt);
        e.lua()
            .load(
                r#"
local pixel = require("pixel")
assert(not pixel.graphics.isActive())
pixel.window.setMode(64, 32)
assert(pixel.graphics.present() == false)
local dt = pixel.timer.step()
assert(math.abs(dt - 1 / 60) < 1e-9)
assert(pixel.timer.getFPS() == 60)
"#,
            )
            .exec()
            .unwrap();
        rt.graphics.borrow_mut().context_reset();
        assert_eq!(
            rt.graphics.borrow().context_state(),
            ContextState::Ready { generation: 1 }
        );
        let presented: bool = e
            .lua()
            .load("return require('pixel').graphics.present()")
            .eval()
            .unwrap();
        assert!(presented);
    }

    #[test]
    fn test_settings_from_table_defaults() {
        let lua = Lua::new();
        assert_eq!(settings_from_table(None).unwrap(), WindowSettings::default());
        let t: Table = lua
            .load("return { fullscreentype = 'bogus', borderless = true }")
            .eval()
            .unwrap();
        let s = settings_from_table(Some(t)).unwrap();
        assert_eq!(s.fstype, FullscreenType::Desktop);
        assert!(s.borderless);
    }
}
