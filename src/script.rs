// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Script side of the core: the Lua engine, the cooperative boot task it
//! drives one step per frame, and the `pixel` namespace games see.

pub mod bindings;
pub mod engine;
pub mod task;

pub use bindings::{FrameTimer, Runtime, WindowDefaults};
pub use engine::ScriptEngine;
pub use task::{ScriptTask, StepOutcome};
