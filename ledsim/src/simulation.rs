use log::trace;

use crate::{
    effect::host::EffectHost, pixel_buffer::PixelBuffer, state::SimulationState,
    strip::LedStrip, world::layout::Layout,
};

/// One simulation step: runs the effect, then draws every LED at its anchor.
pub fn tick(layout: &Layout, host: &mut EffectHost, state: &SimulationState) -> PixelBuffer {
    host.run_tick(state);
    rasterize(layout, state.colors())
}

/// Black canvas with each LED's packed color at the first character of its
/// index token.
pub fn rasterize(layout: &Layout, strip: &LedStrip) -> PixelBuffer {
    let mut buffer = PixelBuffer::new(layout.height(), layout.width());
    let colors = strip.snapshot();

    for (index, position) in layout.iter() {
        if let Some(color) = colors.get(index) {
            buffer.set(position.row, position.column, color.to_rgb());
        }
    }

    trace!(
        "Rasterized {} LEDs onto {}x{}",
        colors.len(),
        buffer.height(),
        buffer.width()
    );

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{effect::factory::ScriptCompiler, led::Color};

    #[test]
    fn only_anchors_are_lit() {
        let layout = Layout::parse("0  1\n 2").unwrap();
        let strip = LedStrip::new(3);
        strip.set(1, Color::new(0x12, 0x34, 0x56));

        let buffer = rasterize(&layout, &strip);
        assert_eq!(buffer.height(), 2);
        assert_eq!(buffer.width(), 4);
        assert_eq!(buffer.get(0, 3), Some(0x123456));
        assert_eq!(buffer.get(0, 0), Some(0));
        assert_eq!(buffer.pixels().iter().filter(|p| **p != 0).count(), 1);
    }

    #[test]
    fn tick_runs_effect_before_drawing() {
        let layout = Layout::parse("0 1").unwrap();
        let state = SimulationState::new(layout.led_count());
        let mut host = EffectHost::new(Box::new(ScriptCompiler::default()));

        let buffer = tick(&layout, &mut host, &state);
        assert_eq!(buffer.pixels(), &[0xFFFFFFu32, 0, 0xFFFFFF]);
    }
}
