use log::debug;

use crate::pixel_buffer::PixelBuffer;

use super::{DisplayError, DisplaySurface, SurfaceEvent, Viewport};

/// Keeps the last scaled frame in memory instead of drawing it.
pub struct HeadlessSurface {
    viewport: Viewport,
    frame_limit: Option<u64>,
    frames_presented: u64,
    last_frame: Option<PixelBuffer>,
}

impl HeadlessSurface {
    pub fn new(viewport: Viewport, frame_limit: Option<u64>) -> Self {
        HeadlessSurface {
            viewport,
            frame_limit,
            frames_presented: 0,
            last_frame: None,
        }
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn last_frame(&self) -> Option<&PixelBuffer> {
        self.last_frame.as_ref()
    }
}

impl DisplaySurface for HeadlessSurface {
    fn poll_events(&mut self) -> Result<Vec<SurfaceEvent>, DisplayError> {
        match self.frame_limit {
            Some(limit) if self.frames_presented >= limit => {
                debug!("Presented {} frames, quitting", self.frames_presented);
                Ok(vec![SurfaceEvent::Quit])
            }
            _ => Ok(vec![]),
        }
    }

    fn present(&mut self, frame: &PixelBuffer) -> Result<(), DisplayError> {
        self.last_frame = Some(self.viewport.fit(frame));
        self.frames_presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_buffer::ScaleMode;

    #[test]
    fn scales_and_keeps_last_frame() {
        let mut surface = HeadlessSurface::new(Viewport::new(4, 2, ScaleMode::Nearest), None);
        let mut frame = PixelBuffer::new(1, 2);
        frame.set(0, 1, 0xFFFFFF);

        surface.present(&frame).unwrap();
        let shown = surface.last_frame().unwrap();
        assert_eq!(shown.height(), 2);
        assert_eq!(shown.width(), 4);
        assert_eq!(shown.get(1, 3), Some(0xFFFFFF));
        assert_eq!(shown.get(1, 1), Some(0));
    }

    #[test]
    fn quits_after_frame_limit() {
        let mut surface = HeadlessSurface::new(Viewport::new(1, 1, ScaleMode::Nearest), Some(2));
        let frame = PixelBuffer::new(1, 1);

        assert!(surface.poll_events().unwrap().is_empty());
        surface.present(&frame).unwrap();
        assert!(surface.poll_events().unwrap().is_empty());
        surface.present(&frame).unwrap();
        assert_eq!(surface.poll_events().unwrap(), vec![SurfaceEvent::Quit]);
        assert_eq!(surface.frames_presented(), 2);
    }
}
