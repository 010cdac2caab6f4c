// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Window settings snapshot, replaced wholesale by `set_window`.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FullscreenType {
    #[default]
    Desktop,
    Exclusive,
}

impl FullscreenType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "desktop" => Some(Self::Desktop),
            "exclusive" => Some(Self::Exclusive),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Exclusive => "exclusive",
        }
    }
}

/// Resizable, borderless and always-on-top are kept so scripts read back
/// what they set; there is no OS window to apply them to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSettings {
    pub fullscreen: bool,
    pub fstype: FullscreenType,
    pub usedpiscale: bool,
    pub vsync: i32,
    pub resizable: bool,
    pub borderless: bool,
    pub always_on_top: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            fullscreen: false,
            fstype: FullscreenType::Desktop,
            usedpiscale: true,
            vsync: 1,
            resizable: false,
            borderless: false,
            always_on_top: false,
        }
    }
}
