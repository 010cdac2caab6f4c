// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Hardware rendering context negotiation.
//!
//! Runs once per game load, before the first frame: ask for a pixel
//! format, then for a hardware context. A refusal at either step is
//! recorded and logged and the core carries on degraded; nothing here
//! fails the load.

use crate::config::RenderConfig;
use crate::retro::{
    Environment, FramebufferAccessor, HwRenderRequest, PixelFormat, ProcAddressLoader,
};
use log::{info, warn};

/// Outcome of one negotiation, read-only once built
#[derive(Debug, Clone, Copy)]
pub struct NegotiationResult {
    pub pixel_format: PixelFormat,
    pub pixel_format_accepted: bool,
    pub request: HwRenderRequest,
    pub accepted: bool,
    pub framebuffer: Option<FramebufferAccessor>,
    pub proc_address: Option<ProcAddressLoader>,
}

impl NegotiationResult {
    /// Result used when there is no host to talk to at all
    pub fn rejected(pixel_format: PixelFormat, request: HwRenderRequest) -> Self {
        Self {
            pixel_format,
            pixel_format_accepted: false,
            request,
            accepted: false,
            framebuffer: None,
            proc_address: None,
        }
    }

    /// Hardware rendering accepted and a render target is addressable
    pub fn has_render_target(&self) -> bool {
        self.accepted && self.framebuffer.is_some()
    }
}

pub struct RenderNegotiator {
    pixel_format: PixelFormat,
    request: HwRenderRequest,
}

impl RenderNegotiator {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            pixel_format: config.pixel_format,
            request: config.hw_request(),
        }
    }

    pub fn negotiate(&self, env: &mut dyn Environment) -> NegotiationResult {
        let pixel_format_accepted = env.set_pixel_format(self.pixel_format);
        if !pixel_format_accepted {
            warn!("failed to set pixel format {:?}", self.pixel_format);
        }

        let grant = env.set_hw_render(&self.request);
        let mut result = NegotiationResult::rejected(self.pixel_format, self.request);
        result.pixel_format_accepted = pixel_format_accepted;
        match grant {
            Some(g) => {
                info!(
                    "hw render accepted: {:?} {}.{}",
                    self.request.context, self.request.version_major, self.request.version_minor
                );
                result.accepted = true;
                result.framebuffer = g.framebuffer;
                result.proc_address = g.proc_address;
                if g.framebuffer.is_none() {
                    warn!("host accepted hw render without a framebuffer accessor");
                }
            }
            None => {
                warn!(
                    "hw render {:?} {}.{} rejected, running without a render target",
                    self.request.context, self.request.version_major, self.request.version_minor
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::retro::{HwContextType, HwRenderFlags, HwRenderGrant};

    unsafe extern "C" fn fbo() -> usize {
        1
    }

    struct Host {
        pixel_format: bool,
        hw: bool,
        seen: Vec<HwRenderRequest>,
    }

    impl Environment for Host {
        fn set_pixel_format(&mut self, _format: PixelFormat) -> bool {
            self.pixel_format
        }

        fn set_hw_render(&mut self, request: &HwRenderRequest) -> Option<HwRenderGrant> {
            self.seen.push(*request);
            self.hw.then(|| HwRenderGrant {
                framebuffer: Some(FramebufferAccessor::new(fbo)),
                proc_address: None,
            })
        }
    }

    #[test]
    fn test_accepted() {
        let mut host = Host {
            pixel_format: true,
            hw: true,
            seen: vec![],
        };
        let r = RenderNegotiator::new(&RenderConfig::default()).negotiate(&mut host);
        assert!(r.accepted && r.pixel_format_accepted && r.has_render_target());
        assert_eq!(r.framebuffer.map(|f| f.current()), Some(1));
        assert_eq!(
            host.seen,
            vec![HwRenderRequest {
                context: HwContextType::OpenGlCore,
                version_major: 4,
                version_minor: 5,
                flags: HwRenderFlags::DEPTH
                    | HwRenderFlags::STENCIL
                    | HwRenderFlags::BOTTOM_LEFT_ORIGIN
                    | HwRenderFlags::DEBUG_CONTEXT,
            }]
        );
    }

    #[test]
    fn test_rejections_are_not_fatal() {
        let mut host = Host {
            pixel_format: false,
            hw: false,
            seen: vec![],
        };
        let r = RenderNegotiator::new(&RenderConfig::default()).negotiate(&mut host);
        assert!(!r.pixel_format_accepted);
        assert!(!r.accepted);
        assert!(r.framebuffer.is_none());
        // hw render is still requested after the pixel format was refused
        assert_eq!(host.seen.len(), 1);
    }
}
