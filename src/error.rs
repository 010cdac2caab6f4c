// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Error types of the core.
//!
//! `CoreError` is what the lifecycle operations return to the host-facing
//! layer. `WindowError` is raised by the virtual window and travels into
//! Lua as an external error, so scripts can `pcall` around it.

use crate::lifecycle::LifecyclePhase;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The Lua state could not be created
    #[error("failed to create script engine: {0}")]
    EngineInit(#[source] mlua::Error),

    #[error("script error: {0}")]
    Script(#[from] mlua::Error),

    #[error("failed to read game content {path:?}: {source}")]
    Content {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no game content supplied")]
    NoContent,

    #[error("{op} is not allowed in phase {phase:?}")]
    InvalidPhase {
        op: &'static str,
        phase: LifecyclePhase,
    },

    #[error("script engine already initialized")]
    AlreadyInitialized,

    #[error("invalid config {path:?}: {message}")]
    Config { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("{0}")]
    PreconditionViolation(String),

    #[error("{0}")]
    FormatError(String),
}

impl From<WindowError> for mlua::Error {
    fn from(e: WindowError) -> Self {
        mlua::Error::external(e)
    }
}
