// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Video frames handed to the host.

/// One host tick worth of video output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The game rendered into the host framebuffer
    Hardware { width: u32, height: u32 },
    /// Nothing new was drawn, the host repeats the previous frame
    Duplicate { width: u32, height: u32 },
}

/// Receiver of presented frames, registered once by the lifecycle
/// controller.
pub trait FrameSink {
    fn submit(&self, frame: Frame);
}
