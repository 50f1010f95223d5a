//! Color values and their textual forms

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// An opaque sRGB color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Copyable form: `#RRGGBB`, uppercase, every channel zero-padded.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Fill used by compact chips, built from the raw channel values.
    pub fn to_css_rgb(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    /// Parse a 6-digit hex color. The leading `#` is optional and digits may
    /// use either case.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Other(format!("not a hex color: {:?}", s)));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| Error::Other(format!("bad hex channel in {:?}: {}", s, e)))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Squared euclidean distance in RGB space.
    pub fn distance_sq(&self, other: &Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 3]> for Color {
    fn from(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}
