// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Virtual window.
//!
//! The frontend owns the real surface, so this window only keeps the
//! numbers the rest of the runtime asks about: logical size, pixel size,
//! DPI scale, title and the settings snapshot. Queries with nothing behind
//! them answer fixed values: always focused and visible, never minimized
//! or maximized, exactly one display.
//!
//! The only errors raised are the canvas-active precondition and the icon
//! format check; everything else is absorbed as `false` or a default.

use crate::config::WindowConfig;
use crate::error::WindowError;
use crate::render::graphics::{graphics_instance, Graphics};
use image::{ColorType, DynamicImage};
use log::debug;
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

pub mod settings;
pub mod transform;

pub use settings::{FullscreenType, WindowSettings};
pub use transform::CoordinateTransform;

pub const WINDOW_MODULE_NAME: &str = "pixel.window.libretro";
pub const DISPLAY_NAME: &str = "libretro";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOrientation {
    Unknown,
    Landscape,
    LandscapeFlipped,
    Portrait,
    PortraitFlipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeArea {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

pub struct VirtualWindow {
    open: bool,
    /// set by the first successful `set_window`, never cleared
    created: bool,
    window_width: i32,
    window_height: i32,
    pixel_width: i32,
    pixel_height: i32,
    title: String,
    settings: WindowSettings,
    display_scale: f64,
    default_size: (i32, i32),
    graphics: Weak<RefCell<Graphics>>,
    pending_resize: Option<(i32, i32)>,
    geometry_changed: bool,
    icon: Option<DynamicImage>,
}

impl VirtualWindow {
    /// `default_size` is used when a script asks for a 0 width or height
    pub fn new(config: &WindowConfig, default_size: (i32, i32)) -> Self {
        let display_scale = if config.display_scale > 0.0 {
            config.display_scale
        } else {
            1.0
        };
        Self {
            open: false,
            created: false,
            window_width: 0,
            window_height: 0,
            pixel_width: 0,
            pixel_height: 0,
            title: config.title.clone(),
            settings: WindowSettings::default(),
            display_scale,
            default_size,
            graphics: Weak::new(),
            pending_resize: None,
            geometry_changed: false,
            icon: None,
        }
    }

    pub fn set_graphics(&mut self, graphics: &Rc<RefCell<Graphics>>) {
        self.graphics = Rc::downgrade(graphics);
    }

    /// Attached graphics subsystem; looked up in the registry when the
    /// back-reference is empty or dead.
    fn graphics(&mut self) -> Option<Rc<RefCell<Graphics>>> {
        if let Some(g) = self.graphics.upgrade() {
            return Some(g);
        }
        let g = graphics_instance()?;
        self.graphics = Rc::downgrade(&g);
        Some(g)
    }

    fn canvas_active(&mut self) -> bool {
        self.graphics()
            .map(|g| g.borrow().is_canvas_active())
            .unwrap_or(false)
    }

    fn check_canvas(&mut self, op: &str) -> Result<(), WindowError> {
        if self.canvas_active() {
            return Err(WindowError::PreconditionViolation(format!(
                "{} cannot be called while a canvas is active",
                op
            )));
        }
        Ok(())
    }

    fn update_pixel_size(&mut self) {
        self.pixel_width = (self.window_width as f64 * self.display_scale).round() as i32;
        self.pixel_height = (self.window_height as f64 * self.display_scale).round() as i32;
    }

    pub fn set_window(
        &mut self,
        width: i32,
        height: i32,
        settings: Option<WindowSettings>,
    ) -> Result<bool, WindowError> {
        self.check_canvas("set_window")?;
        if width < 0 || height < 0 {
            return Ok(false);
        }
        let width = if width == 0 { self.default_size.0 } else { width };
        let height = if height == 0 { self.default_size.1 } else { height };

        self.settings = settings.unwrap_or_default();
        self.window_width = width.max(1);
        self.window_height = height.max(1);
        self.update_pixel_size();
        self.open = true;
        self.created = true;
        self.geometry_changed = true;

        let t = self.transform();
        let (pw, ph) = (self.pixel_width, self.pixel_height);
        if let Some(g) = self.graphics() {
            let (sw, sh) = t.from_pixels(pw as f64, ph as f64);
            g.borrow_mut().set_mode(sw as i32, sh as i32, pw, ph);
        }
        debug!(
            "set_window {}x{} ({}x{} px) {:?}",
            self.window_width, self.window_height, pw, ph, self.settings
        );
        Ok(true)
    }

    /// Current size and settings; a pending host-side resize is applied
    /// first so the answer is never stale.
    pub fn get_window(&mut self) -> (i32, i32, WindowSettings) {
        if let Some((w, h)) = self.pending_resize.take() {
            self.on_size_changed(w, h);
        }
        (self.window_width, self.window_height, self.settings.clone())
    }

    /// Record a size change made outside the script's control; applied on
    /// the next `get_window`. The libretro ABI has no resize notification,
    /// so nothing in the FFI crate feeds this yet.
    pub fn observe_external_resize(&mut self, width: i32, height: i32) {
        self.pending_resize = Some((width, height));
    }

    pub fn close(&mut self, allow_exceptions: bool) -> Result<(), WindowError> {
        if let Some(g) = self.graphics() {
            if allow_exceptions && g.borrow().is_canvas_active() {
                return Err(WindowError::PreconditionViolation(
                    "close cannot be called while a canvas is active".to_string(),
                ));
            }
            g.borrow_mut().unset_mode();
        }
        self.open = false;
        Ok(())
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) -> Result<bool, WindowError> {
        let fstype = self.settings.fstype;
        self.set_fullscreen_with(fullscreen, fstype)
    }

    pub fn set_fullscreen_with(
        &mut self,
        fullscreen: bool,
        fstype: FullscreenType,
    ) -> Result<bool, WindowError> {
        if !self.created {
            return Ok(false);
        }
        self.check_canvas("set_fullscreen")?;
        self.settings.fullscreen = fullscreen;
        self.settings.fstype = fstype;
        Ok(true)
    }

    pub fn on_size_changed(&mut self, width: i32, height: i32) -> bool {
        if !self.created {
            return false;
        }
        self.window_width = width.max(1);
        self.window_height = height.max(1);
        self.update_pixel_size();
        self.geometry_changed = true;

        let t = self.transform();
        let (pw, ph) = (self.pixel_width, self.pixel_height);
        if let Some(g) = self.graphics() {
            let (sw, sh) = t.from_pixels(pw as f64, ph as f64);
            g.borrow_mut().set_viewport_size(sw as i32, sh as i32, pw, ph);
        }
        true
    }

    /// Pixel size to report to the host if it changed since last asked
    pub fn take_geometry_change(&mut self) -> Option<(u32, u32)> {
        if !std::mem::take(&mut self.geometry_changed) {
            return None;
        }
        Some((self.pixel_width.max(0) as u32, self.pixel_height.max(0) as u32))
    }

    pub fn transform(&self) -> CoordinateTransform {
        CoordinateTransform {
            window_width: self.window_width,
            window_height: self.window_height,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
            dpi_scale: self.dpi_scale(),
        }
    }

    pub fn dpi_scale(&self) -> f64 {
        if self.settings.usedpiscale {
            self.native_dpi_scale()
        } else {
            1.0
        }
    }

    pub fn native_dpi_scale(&self) -> f64 {
        if self.window_height > 0 {
            self.pixel_height as f64 / self.window_height as f64
        } else {
            self.display_scale
        }
    }

    pub fn to_pixels(&self, x: f64) -> f64 {
        x * self.dpi_scale()
    }

    pub fn from_pixels(&self, x: f64) -> f64 {
        x / self.dpi_scale()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn width(&self) -> i32 {
        self.window_width
    }

    pub fn height(&self) -> i32 {
        self.window_height
    }

    pub fn pixel_width(&self) -> i32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> i32 {
        self.pixel_height
    }

    pub fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn has_focus(&self) -> bool {
        true
    }

    pub fn has_mouse_focus(&self) -> bool {
        false
    }

    pub fn is_visible(&self) -> bool {
        true
    }

    pub fn set_mouse_grab(&mut self, _grab: bool) {}

    pub fn is_mouse_grabbed(&self) -> bool {
        false
    }

    pub fn minimize(&mut self) {}

    pub fn maximize(&mut self) {}

    pub fn restore(&mut self) {}

    pub fn is_minimized(&self) -> bool {
        false
    }

    pub fn is_maximized(&self) -> bool {
        false
    }

    pub fn display_count(&self) -> i32 {
        1
    }

    pub fn display_name(&self, index: i32) -> Option<&'static str> {
        (index == 0).then_some(DISPLAY_NAME)
    }

    pub fn display_orientation(&self, _index: i32) -> DisplayOrientation {
        DisplayOrientation::Unknown
    }

    /// The only "mode" is the current size
    pub fn fullscreen_sizes(&self, _index: i32) -> Vec<(i32, i32)> {
        vec![(self.window_width, self.window_height)]
    }

    pub fn desktop_dimensions(&self, index: i32) -> (i32, i32) {
        if index >= 0 && index < self.display_count() {
            (self.window_width, self.window_height)
        } else {
            (0, 0)
        }
    }

    /// (x, y, display index)
    pub fn position(&self) -> (i32, i32, i32) {
        (0, 0, 0)
    }

    pub fn set_position(&mut self, _x: i32, _y: i32, _display: i32) {}

    pub fn safe_area(&self) -> SafeArea {
        let (w, h) = self
            .transform()
            .from_pixels(self.pixel_width as f64, self.pixel_height as f64);
        SafeArea {
            x: 0,
            y: 0,
            width: w as i32,
            height: h as i32,
        }
    }

    pub fn vsync(&self) -> i32 {
        self.settings.vsync
    }

    pub fn set_vsync(&mut self, vsync: i32) {
        self.settings.vsync = vsync;
    }

    pub fn is_display_sleep_enabled(&self) -> bool {
        false
    }

    pub fn set_display_sleep_enabled(&mut self, _enable: bool) {}

    /// Nothing to show a message box on
    pub fn show_message_box(&self, _title: &str, _message: &str) -> bool {
        false
    }

    pub fn request_attention(&self, _continuous: bool) {}

    /// Accepts 8-bit RGBA images only. The icon is kept but cannot be
    /// applied, so a valid image still answers `false`.
    pub fn set_icon(&mut self, image: &DynamicImage) -> Result<bool, WindowError> {
        if image.color() != ColorType::Rgba8 {
            return Err(WindowError::FormatError(
                "set_icon only accepts 32-bit RGBA images".to_string(),
            ));
        }
        self.icon = Some(image.clone());
        Ok(false)
    }

    pub fn icon(&self) -> Option<&DynamicImage> {
        self.icon.as_ref()
    }

    pub fn name(&self) -> &'static str {
        WINDOW_MODULE_NAME
    }

    /// Hand the finished frame to the graphics subsystem
    pub fn swap_buffers(&mut self) -> bool {
        match self.graphics() {
            Some(g) => g.borrow_mut().present(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{RgbImage, RgbaImage};

    fn window_with_graphics() -> (VirtualWindow, Rc<RefCell<Graphics>>) {
        let g = Rc::new(RefCell::new(Graphics::new()));
        let mut w = VirtualWindow::new(&WindowConfig::default(), (800, 600));
        w.set_graphics(&g);
        (w, g)
    }

    #[test]
    fn test_size_change_before_open_is_ignored() {
        let (mut w, _g) = window_with_graphics();
        assert!(!w.on_size_changed(320, 240));
        assert_eq!((w.width(), w.height()), (0, 0));
        assert_eq!((w.pixel_width(), w.pixel_height()), (0, 0));
        assert!(!w.set_fullscreen(true).unwrap());
    }

    #[test]
    fn test_set_then_get_returns_same_settings() {
        let (mut w, g) = window_with_graphics();
        let s = WindowSettings {
            fullscreen: true,
            fstype: FullscreenType::Exclusive,
            usedpiscale: false,
            vsync: 0,
            resizable: true,
            borderless: true,
            always_on_top: true,
        };
        assert!(w.set_window(640, 480, Some(s.clone())).unwrap());
        assert_eq!(w.get_window(), (640, 480, s));
        assert!(w.is_open());
        assert!(g.borrow().is_mode_set());
        assert_eq!(g.borrow().viewport().pixel_width, 640);
    }

    #[test]
    fn test_canvas_active_blocks_resize_and_close() {
        let (mut w, g) = window_with_graphics();
        w.set_window(100, 100, None).unwrap();
        g.borrow_mut().set_canvas_active(true);
        assert!(matches!(
            w.set_window(200, 200, None),
            Err(WindowError::PreconditionViolation(_))
        ));
        assert!(w.close(true).is_err());
        assert!(w.is_open());
        assert!(w.set_fullscreen(true).is_err());
        assert_eq!(w.width(), 100);

        // forced teardown skips the check
        w.close(false).unwrap();
        assert!(!w.is_open());
        assert!(!g.borrow().is_canvas_active());
    }

    #[test]
    fn test_closed_window_keeps_last_size() {
        let (mut w, _g) = window_with_graphics();
        w.set_window(300, 200, None).unwrap();
        w.close(true).unwrap();
        assert!(!w.is_open());
        assert_eq!((w.pixel_width(), w.pixel_height()), (300, 200));
        // a window that existed still follows host resizes
        assert!(w.on_size_changed(150, 100));
    }

    #[test]
    fn test_zero_size_uses_default_and_negative_fails() {
        let (mut w, _g) = window_with_graphics();
        assert!(!w.set_window(-1, 10, None).unwrap());
        assert!(!w.is_open());
        assert!(w.set_window(0, 0, None).unwrap());
        assert_eq!((w.width(), w.height()), (800, 600));
    }

    #[test]
    fn test_hidpi_sizes_and_viewport() {
        let cfg = WindowConfig {
            display_scale: 2.0,
            ..WindowConfig::default()
        };
        let g = Rc::new(RefCell::new(Graphics::new()));
        let mut w = VirtualWindow::new(&cfg, (800, 600));
        w.set_graphics(&g);
        w.set_window(400, 300, None).unwrap();
        assert_eq!((w.pixel_width(), w.pixel_height()), (800, 600));
        assert_eq!(w.dpi_scale(), 2.0);
        assert_eq!(w.to_pixels(10.0), 20.0);

        assert!(w.on_size_changed(200, 100));
        let vp = g.borrow().viewport();
        assert_eq!((vp.width, vp.height, vp.pixel_width, vp.pixel_height), (200, 100, 400, 200));

        w.set_window(
            400,
            300,
            Some(WindowSettings {
                usedpiscale: false,
                ..WindowSettings::default()
            }),
        )
        .unwrap();
        assert_eq!(w.dpi_scale(), 1.0);
        assert_eq!(w.native_dpi_scale(), 2.0);
        assert_eq!(
            w.safe_area(),
            SafeArea {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn test_external_resize_reconciled_on_get() {
        let (mut w, _g) = window_with_graphics();
        w.set_window(640, 480, None).unwrap();
        w.take_geometry_change();
        w.observe_external_resize(320, 240);
        assert_eq!(w.width(), 640);
        let (ww, wh, _) = w.get_window();
        assert_eq!((ww, wh), (320, 240));
        assert_eq!(w.take_geometry_change(), Some((320, 240)));
        assert_eq!(w.take_geometry_change(), None);
    }

    #[test]
    fn test_icon_format() {
        let (mut w, _g) = window_with_graphics();
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(16, 16));
        assert!(matches!(w.set_icon(&rgb), Err(WindowError::FormatError(_))));
        assert!(w.icon().is_none());
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(16, 16));
        assert_eq!(w.set_icon(&rgba), Ok(false));
        assert!(w.icon().is_some());
    }

    #[test]
    fn test_fixed_answers() {
        let (mut w, _g) = window_with_graphics();
        w.set_window(640, 480, None).unwrap();
        assert!(w.has_focus() && w.is_visible());
        assert!(!w.is_minimized() && !w.is_maximized());
        assert_eq!(w.display_count(), 1);
        assert_eq!(w.display_name(0), Some(DISPLAY_NAME));
        assert_eq!(w.display_name(1), None);
        assert_eq!(w.desktop_dimensions(0), (640, 480));
        assert_eq!(w.desktop_dimensions(3), (0, 0));
        assert_eq!(w.fullscreen_sizes(0), vec![(640, 480)]);
        assert_eq!(w.position(), (0, 0, 0));
        assert!(!w.show_message_box("t", "m"));
    }

    #[test]
    fn test_weak_graphics_reference_falls_back_to_registry() {
        let mut w = VirtualWindow::new(&WindowConfig::default(), (800, 600));
        {
            let first = Rc::new(RefCell::new(Graphics::new()));
            w.set_graphics(&first);
        }
        let g = Rc::new(RefCell::new(Graphics::new()));
        crate::render::graphics::register_graphics(&g);
        w.set_window(10, 10, None).unwrap();
        assert!(g.borrow().is_mode_set());
    }
}
