// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Render side of the core.
//! frame: video frames and the sink they are submitted to.
//! gl: glow-backed restore of the shared GL state.
//! graphics: canvas flag, viewport, host context state, state restore.
//! negotiate: one-shot hardware context handshake with the host.

pub mod frame;
pub mod gl;
pub mod graphics;
pub mod negotiate;
