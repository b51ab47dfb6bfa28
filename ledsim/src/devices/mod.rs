pub mod headless;
pub mod terminal;

use enum_dispatch::enum_dispatch;
use thiserror::Error;

use crate::pixel_buffer::{PixelBuffer, ScaleMode};

use self::{headless::HeadlessSurface, terminal::TerminalSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Quit,
    Resized { width: usize, height: usize },
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Where rendered frames end up.
#[enum_dispatch]
pub trait DisplaySurface {
    /// Input gathered since the last call. Must not block.
    fn poll_events(&mut self) -> Result<Vec<SurfaceEvent>, DisplayError>;
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), DisplayError>;
}

#[enum_dispatch(DisplaySurface)]
pub enum DisplaySurfaceType {
    Terminal(TerminalSurface),
    Headless(HeadlessSurface),
}

/// Target size and filter every surface scales frames with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
    pub scale_mode: ScaleMode,
}

impl Viewport {
    pub fn new(width: usize, height: usize, scale_mode: ScaleMode) -> Self {
        Viewport {
            width,
            height,
            scale_mode,
        }
    }

    pub fn fit(&self, frame: &PixelBuffer) -> PixelBuffer {
        frame.scale(self.height, self.width, self.scale_mode)
    }
}
