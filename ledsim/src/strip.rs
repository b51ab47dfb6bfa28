use std::{ops::Range, sync::Arc};

use parking_lot::RwLock;

use crate::led::Color;

/// Handle to the colors of every LED on the strip.
///
/// Clones share the same slots, so an effect holding a handle observes every
/// later write. The length is fixed when the strip is created.
#[derive(Clone, Debug)]
pub struct LedStrip {
    colors: Arc<RwLock<Vec<Color>>>,
}

/// A window `[start, end)` onto a [`LedStrip`]. Writes go straight to the
/// backing slots.
#[derive(Clone, Debug)]
pub struct StripView {
    strip: LedStrip,
    start: usize,
    end: usize,
}

/// Handle to a single slot of a [`LedStrip`].
#[derive(Clone, Debug)]
pub struct Led {
    strip: LedStrip,
    index: usize,
}

impl LedStrip {
    pub fn new(length: usize) -> LedStrip {
        LedStrip {
            colors: Arc::new(RwLock::new(vec![Color::default(); length])),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.read().get(index).copied()
    }

    /// Returns `false` when `index` is past the end of the strip.
    pub fn set(&self, index: usize, color: Color) -> bool {
        match self.colors.write().get_mut(index) {
            Some(slot) => {
                slot.from_color(&color);
                true
            }
            None => false,
        }
    }

    pub fn led(&self, index: usize) -> Option<Led> {
        if index >= self.len() {
            return None;
        }

        Some(Led {
            strip: self.clone(),
            index,
        })
    }

    pub fn set_all(&self, color: Color) {
        self.all().set(color);
    }

    pub fn snapshot(&self) -> Vec<Color> {
        self.colors.read().clone()
    }

    pub fn all(&self) -> StripView {
        StripView {
            strip: self.clone(),
            start: 0,
            end: self.len(),
        }
    }

    /// View over `[start, end)`, clamped to the strip.
    pub fn range(&self, start: usize, end: usize) -> StripView {
        self.all().range(start, end)
    }

    /// Whether both handles point at the same slots.
    pub fn same_strip(&self, other: &LedStrip) -> bool {
        Arc::ptr_eq(&self.colors, &other.colors)
    }

    fn update(&self, range: Range<usize>, mut f: impl FnMut(&mut Color)) {
        let mut colors = self.colors.write();
        if let Some(slots) = colors.get_mut(range) {
            for slot in slots {
                f(slot);
            }
        }
    }
}

impl StripView {
    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn strip(&self) -> &LedStrip {
        &self.strip
    }

    /// Absolute slot range covered by this view.
    pub fn bounds(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn all(&self) -> StripView {
        self.clone()
    }

    /// Sub-view relative to this one, clamped to its bounds.
    pub fn range(&self, start: usize, end: usize) -> StripView {
        let end = end.min(self.size());
        let start = start.min(end);

        StripView {
            strip: self.strip.clone(),
            start: self.start + start,
            end: self.start + end,
        }
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        if index >= self.size() {
            return None;
        }
        self.strip.get(self.start + index)
    }

    pub fn led(&self, index: usize) -> Option<Led> {
        if index >= self.size() {
            return None;
        }
        self.strip.led(self.start + index)
    }

    pub fn set_led(&self, index: usize, color: Color) -> bool {
        index < self.size() && self.strip.set(self.start + index, color)
    }

    pub fn colors(&self) -> Vec<Color> {
        self.strip
            .colors
            .read()
            .get(self.bounds())
            .map(|slots| slots.to_vec())
            .unwrap_or_default()
    }

    pub fn set(&self, color: Color) {
        self.strip.update(self.bounds(), |c| c.from_color(&color));
    }

    pub fn set_red(&self, value: i64) {
        self.strip.update(self.bounds(), |c| c.set_r(value));
    }

    pub fn set_green(&self, value: i64) {
        self.strip.update(self.bounds(), |c| c.set_g(value));
    }

    pub fn set_blue(&self, value: i64) {
        self.strip.update(self.bounds(), |c| c.set_b(value));
    }

    pub fn fade_to_black(&self, amount: u8) {
        self.strip
            .update(self.bounds(), |c| *c = c.fade_to_black(amount));
    }

    pub fn fade_to_white(&self, amount: u8) {
        self.strip
            .update(self.bounds(), |c| *c = c.fade_to_white(amount));
    }

    pub fn iter(&self) -> impl Iterator<Item = Led> + '_ {
        self.bounds().map(move |index| Led {
            strip: self.strip.clone(),
            index,
        })
    }
}

impl IntoIterator for StripView {
    type Item = Led;
    type IntoIter = std::vec::IntoIter<Led>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().collect::<Vec<_>>().into_iter()
    }
}

impl Led {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn color(&self) -> Color {
        self.strip.get(self.index).unwrap_or_default()
    }

    pub fn set(&self, color: Color) {
        self.strip.set(self.index, color);
    }

    pub fn set_r(&self, value: i64) {
        self.strip.update(self.index..self.index + 1, |c| c.set_r(value));
    }

    pub fn set_g(&self, value: i64) {
        self.strip.update(self.index..self.index + 1, |c| c.set_g(value));
    }

    pub fn set_b(&self, value: i64) {
        self.strip.update(self.index..self.index + 1, |c| c.set_b(value));
    }
}
