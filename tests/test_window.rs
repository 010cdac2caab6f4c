use proptest::prelude::*;
use retro_pixel::config::WindowConfig;
use retro_pixel::error::WindowError;
use retro_pixel::render::graphics::Graphics;
use retro_pixel::window::{VirtualWindow, WindowSettings};
use std::cell::RefCell;
use std::rc::Rc;

fn window(scale: f64) -> (VirtualWindow, Rc<RefCell<Graphics>>) {
    let cfg = WindowConfig {
        display_scale: scale,
        ..WindowConfig::default()
    };
    let g = Rc::new(RefCell::new(Graphics::new()));
    let mut w = VirtualWindow::new(&cfg, (800, 600));
    w.set_graphics(&g);
    (w, g)
}

proptest! {
    #[test]
    fn prop_open_window_keeps_sizes_positive(
        w in 1i32..5000,
        h in 1i32..5000,
        rw in -100i32..5000,
        rh in -100i32..5000,
        scale in prop_oneof![Just(1.0f64), Just(1.5), Just(2.0), Just(3.0)],
    ) {
        let (mut win, g) = window(scale);
        prop_assert!(win.set_window(w, h, None).unwrap());
        prop_assert!(win.on_size_changed(rw, rh));
        prop_assert!(win.width() >= 1 && win.height() >= 1);
        prop_assert!(win.pixel_width() >= 1 && win.pixel_height() >= 1);
        prop_assert_eq!(win.pixel_width(), (win.width() as f64 * scale).round() as i32);
        let vp = g.borrow().viewport();
        prop_assert_eq!((vp.pixel_width, vp.pixel_height), (win.pixel_width(), win.pixel_height()));
    }

    #[test]
    fn prop_window_dpi_round_trip(
        w in 1i32..4000,
        h in 1i32..4000,
        x in -4000.0f64..4000.0,
        y in -4000.0f64..4000.0,
    ) {
        let (mut win, _g) = window(2.0);
        win.set_window(w, h, None).unwrap();
        let t = win.transform();
        let (dx, dy) = t.window_to_dpi(x, y);
        let (rx, ry) = t.dpi_to_window(dx, dy);
        prop_assert!((rx - x).abs() < 1e-6 && (ry - y).abs() < 1e-6);
    }
}

#[test]
fn test_precondition_leaves_state_untouched() {
    let (mut win, g) = window(1.0);
    let s = WindowSettings {
        vsync: 0,
        ..WindowSettings::default()
    };
    win.set_window(640, 480, Some(s.clone())).unwrap();
    g.borrow_mut().set_canvas_active(true);

    let before = (win.is_open(), win.width(), win.height(), win.settings().clone());
    assert!(matches!(
        win.set_window(320, 240, None),
        Err(WindowError::PreconditionViolation(_))
    ));
    assert!(matches!(
        win.close(true),
        Err(WindowError::PreconditionViolation(_))
    ));
    let after = (win.is_open(), win.width(), win.height(), win.settings().clone());
    assert_eq!(before, after);
    assert_eq!(win.get_window(), (640, 480, s));
}

#[test]
fn test_closed_window_answers_last_known_size() {
    let (mut win, g) = window(2.0);
    win.set_window(300, 200, None).unwrap();
    win.close(true).unwrap();
    assert!(!win.is_open());
    assert!(!g.borrow().is_mode_set());
    assert_eq!((win.width(), win.height()), (300, 200));
    assert_eq!((win.pixel_width(), win.pixel_height()), (600, 400));
}
