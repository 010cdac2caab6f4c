// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Lifecycle controller, the only thing the host ABI talks to.
//!
//! ```text
//! Uninitialized -> Initialized -> GameLoaded -> Running(1) -> Running(2) ...
//!                       ^                                       |
//!                       +------------- Unloaded <---------------+
//!                                         |
//!                                    Deinitialized
//! ```
//!
//! Everything runs on the host's thread. `run_frame` resumes the boot task
//! exactly once; the task yields after each frame the game draws.

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::game::{GameSource, LoadedGame};
use crate::log::init_log;
use crate::render::{
    frame::FrameSink,
    gl::{is_gl_context, GlRestorer},
    graphics::{register_graphics, Graphics, RestorerFactory, StateRestorer},
    negotiate::{NegotiationResult, RenderNegotiator},
};
use crate::retro::{AvInfo, Environment, SystemInfo};
use crate::script::{
    bindings::{self, BOOT_MODULE, PIXEL_MODULE},
    FrameTimer, Runtime, ScriptEngine, ScriptTask, StepOutcome, WindowDefaults,
};
use crate::window::VirtualWindow;
use crate::{LIBRARY_NAME, LIBRARY_VERSION, RUNTIME_NAME, VALID_EXTENSIONS};
use log::{debug, error, info, warn};
use mlua::{Function, Table};
use std::{cell::RefCell, rc::Rc};

/// Module name the game content is preloaded under
pub const MAIN_MODULE: &str = "main";
/// `arg[-1]`, the script that drives the game
pub const BOOT_SCRIPT_NAME: &str = "embedded boot.lua";

/// Ordered by declaration; `Running` phases order by frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecyclePhase {
    Uninitialized,
    Initialized,
    GameLoaded,
    Running { frame: u64 },
    Unloaded,
    Deinitialized,
}

impl LifecyclePhase {
    fn has_game(&self) -> bool {
        matches!(self, Self::GameLoaded | Self::Running { .. })
    }
}

pub fn system_info() -> SystemInfo {
    SystemInfo {
        library_name: LIBRARY_NAME,
        library_version: LIBRARY_VERSION,
        valid_extensions: VALID_EXTENSIONS,
        need_fullpath: false,
        block_extract: false,
    }
}

pub struct RetroCore {
    phase: LifecyclePhase,
    config: CoreConfig,
    env: Option<Box<dyn Environment>>,
    engine: Option<ScriptEngine>,
    task: Option<ScriptTask>,
    negotiation: Option<NegotiationResult>,
    game: Option<LoadedGame>,
    graphics: Rc<RefCell<Graphics>>,
    window: Rc<RefCell<VirtualWindow>>,
    timer: Rc<RefCell<FrameTimer>>,
    restorer_factory: Option<RestorerFactory>,
    frame: u64,
    shutdown_requested: bool,
}

impl Default for RetroCore {
    fn default() -> Self {
        Self::new()
    }
}

impl RetroCore {
    pub fn new() -> Self {
        let config = CoreConfig::default();
        let graphics = Rc::new(RefCell::new(Graphics::new()));
        let window = Self::make_window(&config, &graphics);
        Self {
            phase: LifecyclePhase::Uninitialized,
            timer: Rc::new(RefCell::new(FrameTimer::new(config.av.frame_time()))),
            config,
            env: None,
            engine: None,
            task: None,
            negotiation: None,
            game: None,
            graphics,
            window,
            restorer_factory: None,
            frame: 0,
            shutdown_requested: false,
        }
    }

    fn make_window(
        config: &CoreConfig,
        graphics: &Rc<RefCell<Graphics>>,
    ) -> Rc<RefCell<VirtualWindow>> {
        let mut w = VirtualWindow::new(
            &config.window,
            (config.av.base_width as i32, config.av.base_height as i32),
        );
        w.set_graphics(graphics);
        Rc::new(RefCell::new(w))
    }

    pub fn set_environment(&mut self, env: Box<dyn Environment>) {
        self.env = Some(env);
    }

    /// Register where frames go; done once, before any frame runs
    pub fn set_video_refresh(&mut self, sink: Rc<dyn FrameSink>) {
        self.graphics.borrow_mut().set_frame_sink(sink);
    }

    /// Use `factory` instead of the glow restorer built from the host's
    /// symbol loader. Applies from the next game load.
    pub fn set_restorer_factory(&mut self, factory: RestorerFactory) {
        self.restorer_factory = Some(factory);
    }

    pub fn av_info(&self) -> AvInfo {
        self.config.av.av_info()
    }

    /// Load config and logging, create the engine and run its setup.
    ///
    /// Only a failure to build the engine is an error; the host treats it
    /// as fatal.
    pub fn init(&mut self) -> Result<(), CoreError> {
        if self.engine.is_some() {
            return Err(CoreError::AlreadyInitialized);
        }

        let sys_dir = self.env.as_mut().and_then(|e| e.system_directory());
        let (config, config_error) = match CoreConfig::discover(sys_dir.as_deref()) {
            Ok(c) => (c.unwrap_or_default(), None),
            Err(e) => (CoreConfig::default(), Some(e)),
        };
        let host_log = if config.log.host {
            self.env.as_mut().and_then(|e| e.log_interface())
        } else {
            None
        };
        init_log(&config.log, host_log);
        if let Some(e) = config_error {
            warn!("{}, using defaults", e);
        }
        info!("{} {} init...", LIBRARY_NAME, LIBRARY_VERSION);

        self.window = Self::make_window(&config, &self.graphics);
        *self.timer.borrow_mut() = FrameTimer::new(config.av.frame_time());
        register_graphics(&self.graphics);
        self.config = config;

        self.engine = Some(Self::fresh_engine()?);
        self.phase = LifecyclePhase::Initialized;
        Ok(())
    }

    fn fresh_engine() -> Result<ScriptEngine, CoreError> {
        let engine = ScriptEngine::new()?;
        engine.setup()?;
        Ok(engine)
    }

    /// Negotiate the render context, then boot the game up to the point
    /// where its task is ready to run.
    pub fn load_game(&mut self, source: GameSource) -> Result<(), CoreError> {
        if !matches!(
            self.phase,
            LifecyclePhase::Initialized | LifecyclePhase::Unloaded
        ) || self.engine.is_none()
        {
            return Err(CoreError::InvalidPhase {
                op: "load_game",
                phase: self.phase,
            });
        }

        let game = source.read()?;
        info!("load game {}", game.name());

        // nothing of a previous game survives into this one
        if self.phase == LifecyclePhase::Unloaded {
            self.engine = Some(Self::fresh_engine()?);
            self.window = Self::make_window(&self.config, &self.graphics);
        }
        *self.timer.borrow_mut() = FrameTimer::new(self.config.av.frame_time());

        let negotiator = RenderNegotiator::new(&self.config.render);
        let negotiation = match self.env.as_mut() {
            Some(env) => negotiator.negotiate(env.as_mut()),
            None => {
                warn!("no environment set, running without a render target");
                NegotiationResult::rejected(
                    self.config.render.pixel_format,
                    self.config.render.hw_request(),
                )
            }
        };
        self.attach_render_target(&negotiation);

        let task = match self.start_session(&game) {
            Ok(t) => t,
            Err(e) => {
                self.graphics.borrow_mut().release_game_resources();
                return Err(e);
            }
        };

        self.negotiation = Some(negotiation);
        self.task = Some(task);
        self.game = Some(game);
        self.frame = 0;
        self.shutdown_requested = false;
        self.phase = LifecyclePhase::GameLoaded;
        Ok(())
    }

    fn attach_render_target(&self, negotiation: &NegotiationResult) {
        let factory = self.restorer_factory_for(negotiation);
        let mut g = self.graphics.borrow_mut();
        g.attach_framebuffer(negotiation.framebuffer);
        g.set_restorer_factory(factory);
    }

    fn restorer_factory_for(&self, negotiation: &NegotiationResult) -> Option<RestorerFactory> {
        if let Some(f) = &self.restorer_factory {
            return Some(f.clone());
        }
        if !negotiation.accepted || !is_gl_context(negotiation.request.context) {
            return None;
        }
        let Some(loader) = negotiation.proc_address else {
            warn!("hw render accepted without get_proc_address, GL state is not restored");
            return None;
        };
        // invoked with the host context current: on context reset, or at
        // load while the context is already live
        Some(Rc::new(move || {
            Box::new(unsafe { GlRestorer::load(loader) }) as Box<dyn StateRestorer>
        }))
    }

    fn runtime(&self) -> Runtime {
        Runtime {
            window: self.window.clone(),
            graphics: self.graphics.clone(),
            timer: self.timer.clone(),
            defaults: WindowDefaults {
                width: self.config.av.base_width as i32,
                height: self.config.av.base_height as i32,
                title: self.config.window.title.clone(),
            },
        }
    }

    fn script_args(&self, game: &LoadedGame) -> Vec<(i64, String)> {
        let mut args = vec![
            (-2, RUNTIME_NAME.to_string()),
            (-1, BOOT_SCRIPT_NAME.to_string()),
            (1, game.name()),
        ];
        for (i, a) in self.config.script.extra_args.iter().enumerate() {
            args.push((i as i64 + 2, a.clone()));
        }
        args
    }

    /// Expose the runtime, require it, and wrap the boot routine in a
    /// task. Nothing of the game runs yet.
    fn start_session(&self, game: &LoadedGame) -> Result<ScriptTask, CoreError> {
        let engine = self.engine.as_ref().ok_or(CoreError::InvalidPhase {
            op: "load_game",
            phase: self.phase,
        })?;
        for m in [PIXEL_MODULE, BOOT_MODULE, MAIN_MODULE] {
            engine.forget_module(m)?;
        }
        bindings::install(engine, &self.runtime())?;
        if let Some(dir) = game.dir() {
            engine.add_search_dir(dir)?;
        }
        engine.preload_source(MAIN_MODULE, &game.data, &game.chunk_name())?;
        engine.set_args(&self.script_args(game))?;

        let pixel: Table = engine.require(PIXEL_MODULE)?;
        pixel.set("_exe", true)?;
        let boot: Function = engine.require(BOOT_MODULE)?;
        Ok(engine.create_task(boot)?)
    }

    /// One host tick: restore shared GL state, resume the task once and
    /// deliver the frame. A no-op without an engine or a loaded game.
    pub fn run_frame(&mut self) {
        let (Some(engine), Some(task)) = (self.engine.as_ref(), self.task.as_mut()) else {
            return;
        };
        {
            let mut g = self.graphics.borrow_mut();
            g.begin_frame();
            g.restore_state();
        }
        let outcome = if task.is_finished() {
            None
        } else {
            Some(engine.resume(task))
        };
        self.graphics.borrow_mut().end_frame();
        self.frame += 1;
        self.phase = LifecyclePhase::Running { frame: self.frame };

        match outcome {
            Some(StepOutcome::Completed(value)) => {
                info!("game finished: {}", value.as_deref().unwrap_or("nil"));
                self.request_shutdown();
            }
            Some(StepOutcome::Failed(msg)) => {
                error!("game error: {}", msg);
                self.request_shutdown();
            }
            _ => {}
        }
        self.forward_geometry();
    }

    fn request_shutdown(&mut self) {
        if self.shutdown_requested {
            return;
        }
        self.shutdown_requested = true;
        if let Some(env) = self.env.as_mut() {
            if !env.shutdown() {
                debug!("host refused shutdown");
            }
        }
    }

    fn forward_geometry(&mut self) {
        let Some((w, h)) = self.window.borrow_mut().take_geometry_change() else {
            return;
        };
        let geometry = self.config.av.geometry(w, h);
        if let Some(env) = self.env.as_mut() {
            if !env.set_geometry(&geometry) {
                debug!("host refused geometry {}x{}", w, h);
            }
        }
    }

    fn release_task(&mut self) {
        if let Some(mut task) = self.task.take() {
            if let Some(engine) = self.engine.as_ref() {
                task.release(engine.lua());
            }
        }
    }

    fn close_window(&mut self) {
        if let Err(e) = self.window.borrow_mut().close(false) {
            warn!("close window: {}", e);
        }
    }

    /// Release the task and everything tied to the game. The engine stays,
    /// so another game can be loaded.
    pub fn unload_game(&mut self) {
        if !self.phase.has_game() {
            debug!("unload_game in phase {:?}, nothing to do", self.phase);
            return;
        }
        self.release_task();
        self.close_window();
        self.graphics.borrow_mut().release_game_resources();
        self.negotiation = None;
        self.game = None;
        self.phase = LifecyclePhase::Unloaded;
        info!("game unloaded");
    }

    /// Boot the current game again in a fresh engine. The render context
    /// negotiated at load time is kept.
    pub fn reset(&mut self) -> Result<(), CoreError> {
        let Some(game) = self.game.clone() else {
            debug!("reset without a game, nothing to do");
            return Ok(());
        };
        self.release_task();
        self.close_window();
        self.graphics.borrow_mut().release_game_resources();
        if let Some(n) = self.negotiation {
            self.attach_render_target(&n);
        }
        self.engine = None;
        self.engine = Some(Self::fresh_engine()?);
        *self.timer.borrow_mut() = FrameTimer::new(self.config.av.frame_time());

        let task = self.start_session(&game)?;
        self.task = Some(task);
        self.frame = 0;
        self.shutdown_requested = false;
        self.phase = LifecyclePhase::GameLoaded;
        info!("game reset");
        Ok(())
    }

    /// Destroy the engine and drop every reference. Safe in any phase.
    pub fn deinit(&mut self) {
        self.release_task();
        if self.game.is_some() {
            self.close_window();
            self.graphics.borrow_mut().release_game_resources();
        }
        self.engine = None;
        self.negotiation = None;
        self.game = None;
        self.phase = LifecyclePhase::Deinitialized;
        info!("{} deinit", LIBRARY_NAME);
    }

    /// Host recreated its GL context
    pub fn context_reset(&mut self) {
        self.graphics.borrow_mut().context_reset();
    }

    /// Host is destroying its GL context
    pub fn context_destroy(&mut self) {
        self.graphics.borrow_mut().context_destroy();
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn negotiation(&self) -> Option<&NegotiationResult> {
        self.negotiation.as_ref()
    }

    pub fn engine(&self) -> Option<&ScriptEngine> {
        self.engine.as_ref()
    }

    pub fn window(&self) -> &Rc<RefCell<VirtualWindow>> {
        &self.window
    }

    pub fn graphics(&self) -> &Rc<RefCell<Graphics>> {
        &self.graphics
    }

    /// Resumes performed by the current task
    pub fn task_steps(&self) -> Option<u64> {
        self.task.as_ref().map(|t| t.steps())
    }

    pub fn is_session_over(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(false)
    }
}
