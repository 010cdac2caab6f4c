// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Graphics subsystem seam.
//!
//! The renderer proper lives on the script side; what the core needs to
//! know about it is collected here: whether a canvas is bound, the
//! viewport the window last pushed, whether the host GL context is alive,
//! which host framebuffer to target and where finished frames go.
//!
//! The GL context is shared with the frontend, so the expected state is
//! re-applied at the top of every frame through a [`StateRestorer`]. A
//! restorer only lives as long as the host context; it is rebuilt from the
//! attached [`RestorerFactory`] on every context reset.

use crate::render::frame::{Frame, FrameSink};
use crate::retro::FramebufferAccessor;
use log::{debug, info, trace, warn};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

thread_local! {
    static GRAPHICS_INSTANCE: RefCell<Weak<RefCell<Graphics>>> = RefCell::new(Weak::new());
    static PENDING_CONTEXT_EVENTS: RefCell<Vec<ContextEvent>> = const { RefCell::new(Vec::new()) };
}

/// Make `g` the instance found by [`graphics_instance`]
pub fn register_graphics(g: &Rc<RefCell<Graphics>>) {
    GRAPHICS_INSTANCE.with(|gi| *gi.borrow_mut() = Rc::downgrade(g));
}

/// Registered graphics subsystem, if it is still alive
pub fn graphics_instance() -> Option<Rc<RefCell<Graphics>>> {
    GRAPHICS_INSTANCE.with(|gi| gi.borrow().upgrade())
}

/// Host context callbacks, as seen by the graphics subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextEvent {
    Reset,
    Destroy,
}

/// Hand a host context event to the registered instance. If the instance
/// is busy (the host called back from inside a frame) the event is queued
/// and applied at the next [`Graphics::begin_frame`].
pub fn deliver_context_event(event: ContextEvent) {
    let Some(g) = graphics_instance() else {
        warn!("context {:?} before init", event);
        return;
    };
    match g.try_borrow_mut() {
        Ok(mut g) => g.apply_context_event(event),
        Err(_) => {
            debug!("context {:?} while graphics is busy, deferred", event);
            PENDING_CONTEXT_EVENTS.with(|p| p.borrow_mut().push(event));
        }
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
    pub pixel_width: i32,
    pub pixel_height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No usable host context: never created, or destroyed by the host
    Lost,
    /// Context (re)created; handles from older generations are stale
    Ready { generation: u32 },
}

/// GL state the core expects at the start of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlState {
    pub framebuffer: Option<usize>,
    pub viewport: Viewport,
}

/// Re-applies [`GlState`] after the host has used the shared context
pub trait StateRestorer {
    fn restore(&mut self, state: &GlState);
}

/// Builds a restorer for a freshly created host context
pub type RestorerFactory = Rc<dyn Fn() -> Box<dyn StateRestorer>>;

pub struct Graphics {
    canvas_active: bool,
    mode_set: bool,
    viewport: Viewport,
    context: ContextState,
    generation: u32,
    framebuffer: Option<FramebufferAccessor>,
    sink: Option<Rc<dyn FrameSink>>,
    restorer_factory: Option<RestorerFactory>,
    restorer: Option<Box<dyn StateRestorer>>,
    presented: bool,
}

impl Default for Graphics {
    fn default() -> Self {
        Self::new()
    }
}

impl Graphics {
    pub fn new() -> Self {
        Self {
            canvas_active: false,
            mode_set: false,
            viewport: Viewport::default(),
            context: ContextState::Lost,
            generation: 0,
            framebuffer: None,
            sink: None,
            restorer_factory: None,
            restorer: None,
            presented: false,
        }
    }

    pub fn set_mode(&mut self, width: i32, height: i32, pixel_width: i32, pixel_height: i32) {
        self.mode_set = true;
        self.set_viewport_size(width, height, pixel_width, pixel_height);
    }

    pub fn unset_mode(&mut self) {
        self.mode_set = false;
        self.canvas_active = false;
    }

    pub fn is_mode_set(&self) -> bool {
        self.mode_set
    }

    pub fn set_viewport_size(
        &mut self,
        width: i32,
        height: i32,
        pixel_width: i32,
        pixel_height: i32,
    ) {
        self.viewport = Viewport {
            width,
            height,
            pixel_width,
            pixel_height,
        };
        debug!("viewport {}x{} ({}x{} px)", width, height, pixel_width, pixel_height);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_canvas_active(&mut self, active: bool) {
        self.canvas_active = active;
    }

    pub fn is_canvas_active(&self) -> bool {
        self.canvas_active
    }

    /// Host (re)created its context
    pub fn context_reset(&mut self) {
        self.generation += 1;
        self.context = ContextState::Ready {
            generation: self.generation,
        };
        self.restorer = self.restorer_factory.as_ref().map(|f| f());
        info!("graphics context ready, generation {}", self.generation);
    }

    /// Host is tearing its context down: every GL object is invalid now,
    /// including the canvas the script may have bound.
    pub fn context_destroy(&mut self) {
        self.context = ContextState::Lost;
        self.canvas_active = false;
        self.restorer = None;
        info!("graphics context lost");
    }

    pub fn apply_context_event(&mut self, event: ContextEvent) {
        match event {
            ContextEvent::Reset => self.context_reset(),
            ContextEvent::Destroy => self.context_destroy(),
        }
    }

    fn apply_pending_context_events(&mut self) {
        let pending = PENDING_CONTEXT_EVENTS.with(|p| std::mem::take(&mut *p.borrow_mut()));
        for event in pending {
            self.apply_context_event(event);
        }
    }

    pub fn context_state(&self) -> ContextState {
        self.context
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Drawing is possible: a mode is set and the host context is alive
    pub fn is_active(&self) -> bool {
        self.mode_set && matches!(self.context, ContextState::Ready { .. })
    }

    pub fn attach_framebuffer(&mut self, framebuffer: Option<FramebufferAccessor>) {
        self.framebuffer = framebuffer;
    }

    pub fn current_framebuffer(&self) -> Option<usize> {
        match self.context {
            ContextState::Ready { .. } => self.framebuffer.map(|f| f.current()),
            ContextState::Lost => None,
        }
    }

    pub fn set_frame_sink(&mut self, sink: Rc<dyn FrameSink>) {
        self.sink = Some(sink);
    }

    /// Attach what builds the restorer for each host context. Takes effect
    /// at once when a context is already live.
    pub fn set_restorer_factory(&mut self, factory: Option<RestorerFactory>) {
        self.restorer = match (&factory, self.context) {
            (Some(f), ContextState::Ready { .. }) => Some(f()),
            _ => None,
        };
        self.restorer_factory = factory;
    }

    pub fn has_state_restorer(&self) -> bool {
        self.restorer.is_some()
    }

    /// Re-establish expected GL state; skipped while the context is lost
    pub fn restore_state(&mut self) {
        if !matches!(self.context, ContextState::Ready { .. }) {
            return;
        }
        let state = GlState {
            framebuffer: self.current_framebuffer(),
            viewport: self.viewport,
        };
        match self.restorer.as_mut() {
            Some(r) => r.restore(&state),
            None => trace!("restore_state {:?}", state),
        }
    }

    /// Start a host tick; context events deferred since the last one
    /// are applied first.
    pub fn begin_frame(&mut self) {
        self.apply_pending_context_events();
        self.presented = false;
    }

    /// Hand the current frame to the host. Returns false when nothing
    /// could be drawn this frame.
    pub fn present(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        let frame = Frame::Hardware {
            width: self.viewport.pixel_width.max(0) as u32,
            height: self.viewport.pixel_height.max(0) as u32,
        };
        if let Some(sink) = &self.sink {
            sink.submit(frame);
        }
        self.presented = true;
        true
    }

    /// Close the host tick; a tick without a present repeats the last
    /// frame so frontend pacing keeps going.
    pub fn end_frame(&mut self) {
        if self.presented {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.submit(Frame::Duplicate {
                width: self.viewport.pixel_width.max(0) as u32,
                height: self.viewport.pixel_height.max(0) as u32,
            });
        }
    }

    /// Drop everything tied to the unloaded game
    pub fn release_game_resources(&mut self) {
        self.canvas_active = false;
        self.mode_set = false;
        self.framebuffer = None;
        self.restorer_factory = None;
        self.restorer = None;
    }
}
