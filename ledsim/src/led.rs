use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An 8-bit RGB color. Channel writes wrap into `0..=255` the same way the
/// firmware's `uint8_t` fields do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColorError {
    #[error("expected an integer amount in 0..=255, got {0:?}")]
    NonIntegerAmount(f64),
    #[error("amount {0} is outside 0..=255")]
    AmountOutOfRange(i64),
    #[error("cannot parse color {0:?}, expected #rrggbb")]
    Parse(String),
}

pub fn wrap_channel(value: i64) -> u8 {
    (value & 0xFF) as u8
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b }
    }

    /// Builds a color from unchecked channel values, wrapping each one.
    pub fn wrapping(r: i64, g: i64, b: i64) -> Color {
        Color {
            r: wrap_channel(r),
            g: wrap_channel(g),
            b: wrap_channel(b),
        }
    }

    /// Packs into `0xRRGGBB`.
    pub fn to_rgb(&self) -> u32 {
        u32::from(self.r) << 16 | u32::from(self.g) << 8 | u32::from(self.b)
    }

    /// Unpacks `0xRRGGBB`; anything above the low 24 bits is ignored.
    pub fn from_rgb(value: u32) -> Color {
        Color {
            r: (value >> 16 & 0xFF) as u8,
            g: (value >> 8 & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }

    pub fn set_r(&mut self, value: i64) {
        self.r = wrap_channel(value);
    }

    pub fn set_g(&mut self, value: i64) {
        self.g = wrap_channel(value);
    }

    pub fn set_b(&mut self, value: i64) {
        self.b = wrap_channel(value);
    }

    pub fn from_color(&mut self, other: &Color) {
        self.r = other.r;
        self.g = other.g;
        self.b = other.b;
    }

    /// Linear blend towards `target`; `amount` 0 keeps `self`, 255 gives `target`.
    /// Each channel is truncated toward zero.
    pub fn gradient(&self, target: &Color, amount: u8) -> Color {
        let amount = f64::from(amount) / 255.0;
        let blend = |from: u8, to: u8| {
            let from = f64::from(from);
            (amount * (f64::from(to) - from) + from) as i64
        };

        Color::wrapping(
            blend(self.r, target.r),
            blend(self.g, target.g),
            blend(self.b, target.b),
        )
    }

    pub fn checked_gradient(&self, target: &Color, amount: i64) -> Result<Color, ColorError> {
        Ok(self.gradient(target, checked_amount(amount)?))
    }

    pub fn fade_to_black(&self, amount: u8) -> Color {
        self.gradient(&Color::BLACK, amount)
    }

    pub fn fade_to_white(&self, amount: u8) -> Color {
        self.gradient(&Color::WHITE, amount)
    }
}

/// Validates a blend amount coming from untyped input.
pub fn checked_amount(amount: i64) -> Result<u8, ColorError> {
    u8::try_from(amount).map_err(|_| ColorError::AmountOutOfRange(amount))
}

/// Floats are never coerced into blend amounts.
pub fn reject_float_amount(amount: f64) -> ColorError {
    ColorError::NonIntegerAmount(amount)
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::Parse(s.to_string()));
        }

        u32::from_str_radix(hex, 16)
            .map(Color::from_rgb)
            .map_err(|_| ColorError::Parse(s.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> String {
        color.to_string()
    }
}
