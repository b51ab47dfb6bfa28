use crate::{led::Color, strip::LedStrip};

/// Color of every LED on the strip plus the color currently selected by the
/// user.
///
/// `colors` is handed out by reference and must never be swapped for a new
/// strip; effects keep handles to it across ticks.
pub struct SimulationState {
    colors: LedStrip,
    current_color: Color,
}

impl SimulationState {
    pub fn new(length: usize) -> SimulationState {
        SimulationState {
            colors: LedStrip::new(length),
            current_color: Color::default(),
        }
    }

    pub fn colors(&self) -> &LedStrip {
        &self.colors
    }

    pub fn current_color(&self) -> Color {
        self.current_color
    }

    /// Selects a new color and paints the whole strip with it once.
    pub fn set_current_color(&mut self, color: Color) {
        self.current_color = color;
        self.colors.set_all(color);
    }
}
