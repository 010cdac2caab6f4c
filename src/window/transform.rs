// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Coordinate transform between the three spaces the window reports:
//!
//! - window (logical) units, what the application addresses,
//! - pixel units, the backing surface,
//! - DPI-scaled units, pixel units divided by the DPI scale.
//!
//! Everything here is pure arithmetic on a snapshot of the window sizes.
//! Callers guarantee `width, height >= 1` for the logical size while the
//! window is open, so no division is guarded.

/// Multiply both axes by `s`
pub fn logical_to_pixel(w: f64, h: f64, s: f64) -> (f64, f64) {
    (w * s, h * s)
}

/// Divide both axes by `s`
pub fn pixel_to_logical(w: f64, h: f64, s: f64) -> (f64, f64) {
    (w / s, h / s)
}

/// Sizes and scale the conversions are computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    pub window_width: i32,
    pub window_height: i32,
    pub pixel_width: i32,
    pub pixel_height: i32,
    /// Scale applied by `to_pixels`/`from_pixels`; 1.0 unless DPI
    /// scaling is enabled
    pub dpi_scale: f64,
}

impl CoordinateTransform {
    pub fn window_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * (self.pixel_width as f64 / self.window_width as f64),
            y * (self.pixel_height as f64 / self.window_height as f64),
        )
    }

    pub fn pixel_to_window(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * (self.window_width as f64 / self.pixel_width as f64),
            y * (self.window_height as f64 / self.pixel_height as f64),
        )
    }

    pub fn to_pixels(&self, x: f64, y: f64) -> (f64, f64) {
        logical_to_pixel(x, y, self.dpi_scale)
    }

    pub fn from_pixels(&self, x: f64, y: f64) -> (f64, f64) {
        pixel_to_logical(x, y, self.dpi_scale)
    }

    /// Window units to DPI-scaled units
    pub fn window_to_dpi(&self, x: f64, y: f64) -> (f64, f64) {
        let (px, py) = self.window_to_pixel(x, y);
        self.from_pixels(px, py)
    }

    /// DPI-scaled units back to window units
    pub fn dpi_to_window(&self, x: f64, y: f64) -> (f64, f64) {
        let (px, py) = self.to_pixels(x, y);
        self.pixel_to_window(px, py)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(1.0)
    }

    proptest! {
        #[test]
        fn prop_pixel_logical_round_trip(
            w in 1.0f64..10_000.0,
            h in 1.0f64..10_000.0,
            s in 0.1f64..8.0,
        ) {
            let (pw, ph) = logical_to_pixel(w, h, s);
            let (lw, lh) = pixel_to_logical(pw, ph, s);
            prop_assert!(close(lw, w) && close(lh, h));
        }

        #[test]
        fn prop_dpi_round_trip(
            ww in 1i32..4000,
            wh in 1i32..4000,
            scale in 1i32..4,
            dpi in prop_oneof![Just(1.0f64), Just(1.5), Just(2.0)],
            x in -5000.0f64..5000.0,
            y in -5000.0f64..5000.0,
        ) {
            let t = CoordinateTransform {
                window_width: ww,
                window_height: wh,
                pixel_width: ww * scale,
                pixel_height: wh * scale,
                dpi_scale: dpi,
            };
            let (dx, dy) = t.window_to_dpi(x, y);
            let (rx, ry) = t.dpi_to_window(dx, dy);
            prop_assert!((rx - x).abs() < 1e-6 && (ry - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hidpi_surface() {
        let t = CoordinateTransform {
            window_width: 400,
            window_height: 300,
            pixel_width: 800,
            pixel_height: 600,
            dpi_scale: 2.0,
        };
        assert_eq!(t.window_to_pixel(10.0, 20.0), (20.0, 40.0));
        assert_eq!(t.pixel_to_window(20.0, 40.0), (10.0, 20.0));
        // a full pixel surface is the logical size in DPI units
        assert_eq!(t.from_pixels(800.0, 600.0), (400.0, 300.0));
        assert_eq!(t.window_to_dpi(400.0, 300.0), (400.0, 300.0));
    }
}
