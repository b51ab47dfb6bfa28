use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::led::Color;

/// Row-major grid of packed `0xRRGGBB` pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    height: usize,
    width: usize,
    pixels: Vec<u32>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    #[default]
    Nearest,
    Linear,
}

impl PixelBuffer {
    /// All black.
    pub fn new(height: usize, width: usize) -> PixelBuffer {
        PixelBuffer {
            height,
            width,
            pixels: vec![0; height * width],
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: usize, column: usize) -> Option<u32> {
        if row >= self.height || column >= self.width {
            return None;
        }
        self.pixels.get(row * self.width + column).copied()
    }

    pub fn set(&mut self, row: usize, column: usize, packed: u32) -> bool {
        if row >= self.height || column >= self.width {
            return false;
        }
        self.pixels[row * self.width + column] = packed & 0xFF_FFFF;
        true
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        // chunks() panics on a zero size
        self.pixels.chunks(self.width.max(1)).take(self.height)
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Resamples to `height × width`. Linear filtering blends the four
    /// nearest source pixels per channel.
    pub fn scale(&self, height: usize, width: usize, mode: ScaleMode) -> PixelBuffer {
        let mut scaled = PixelBuffer::new(height, width);
        if self.height == 0 || self.width == 0 {
            return scaled;
        }

        for row in 0..height {
            for column in 0..width {
                let packed = match mode {
                    ScaleMode::Nearest => {
                        let src_row = row * self.height / height;
                        let src_column = column * self.width / width;
                        self.pixels[src_row * self.width + src_column]
                    }
                    ScaleMode::Linear => self.sample_linear(row, column, height, width),
                };
                scaled.pixels[row * width + column] = packed;
            }
        }

        scaled
    }

    fn sample_linear(&self, row: usize, column: usize, height: usize, width: usize) -> u32 {
        // Pixel centres line up between source and destination.
        let source = |dst: usize, dst_len: usize, src_len: usize| {
            let pos = ((dst as f64 + 0.5) * src_len as f64 / dst_len as f64 - 0.5)
                .clamp(0.0, (src_len - 1) as f64);
            let low = pos.floor() as usize;
            let high = (low + 1).min(src_len - 1);
            (low, high, pos - low as f64)
        };

        let (y0, y1, fy) = source(row, height, self.height);
        let (x0, x1, fx) = source(column, width, self.width);

        let at = |y: usize, x: usize| Color::from_rgb(self.pixels[y * self.width + x]);
        let (tl, tr, bl, br) = (at(y0, x0), at(y0, x1), at(y1, x0), at(y1, x1));

        let mix = |a: u8, b: u8, c: u8, d: u8| {
            let top = f64::from(a) * (1.0 - fx) + f64::from(b) * fx;
            let bottom = f64::from(c) * (1.0 - fx) + f64::from(d) * fx;
            (top * (1.0 - fy) + bottom * fy).round() as u8
        };

        Color::new(
            mix(tl.r, tr.r, bl.r, br.r),
            mix(tl.g, tr.g, bl.g, br.g),
            mix(tl.b, tr.b, bl.b, br.b),
        )
        .to_rgb()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_black_and_bounds_writes() {
        let mut buffer = PixelBuffer::new(2, 3);
        assert!(buffer.pixels().iter().all(|p| *p == 0));
        assert!(buffer.set(1, 2, 0xFFFFFF));
        assert!(!buffer.set(2, 0, 0xFFFFFF));
        assert_eq!(buffer.get(1, 2), Some(0xFFFFFF));
        assert_eq!(buffer.get(0, 3), None);
        assert_eq!(buffer.rows().count(), 2);
    }

    #[test]
    fn nearest_scaling_repeats_pixels() {
        let mut buffer = PixelBuffer::new(1, 2);
        buffer.set(0, 0, 0x112233);
        buffer.set(0, 1, 0xAABBCC);

        let scaled = buffer.scale(2, 4, ScaleMode::Nearest);
        for row in scaled.rows() {
            assert_eq!(row, &[0x112233u32, 0x112233, 0xAABBCC, 0xAABBCC]);
        }
    }

    #[test]
    fn linear_scaling_blends_neighbours() {
        let mut buffer = PixelBuffer::new(1, 2);
        buffer.set(0, 0, 0x000000);
        buffer.set(0, 1, 0xC8C8C8);

        let scaled = buffer.scale(1, 4, ScaleMode::Linear);
        let row: Vec<u32> = scaled.pixels().to_vec();
        assert_eq!(row[0], 0x000000);
        assert_eq!(row[3], 0xC8C8C8);
        assert!(Color::from_rgb(row[1]).r < Color::from_rgb(row[2]).r);
    }

    #[test]
    fn scaling_empty_buffer_is_black() {
        let scaled = PixelBuffer::new(0, 0).scale(3, 3, ScaleMode::Linear);
        assert_eq!(scaled.pixels(), &[0u32; 9]);
    }

    #[test]
    fn scale_mode_parses_lowercase() {
        assert_eq!("linear".parse::<ScaleMode>().unwrap(), ScaleMode::Linear);
        assert_eq!(ScaleMode::Nearest.to_string(), "nearest");
    }
}
