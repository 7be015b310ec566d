// Background color module
// Parses user color input into an opaque canvas fill

use crate::error::{Error, Result};
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User-chosen background color (8-bit RGBA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl BackgroundColor {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA` (the `#` is optional) or a basic color name
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if let Some(named) = Self::named(s) {
            return Ok(named);
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        let unavailable = || Error::BackgroundColorUnavailable(input.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(unavailable());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| unavailable());
        match hex.len() {
            3 => {
                let nibble = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| unavailable())
                };
                Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
            }
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(unavailable()),
        }
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Self::rgb(0, 0, 0),
            "white" => Self::rgb(255, 255, 255),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            _ => return None,
        };
        Some(color)
    }

    /// Opaque fill pixel; translucent colors are flattened over black
    pub fn to_opaque_rgba(self) -> Rgba<u8> {
        let a = self.a as u32;
        let flatten = |c: u8| ((c as u32 * a + 127) / 255) as u8;
        Rgba([flatten(self.r), flatten(self.g), flatten(self.b), 255])
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl FromStr for BackgroundColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(BackgroundColor::parse("#1e90ff").unwrap(), BackgroundColor::rgb(0x1e, 0x90, 0xff));
        assert_eq!(BackgroundColor::parse("1E90FF").unwrap(), BackgroundColor::rgb(0x1e, 0x90, 0xff));
        assert_eq!(BackgroundColor::parse("#fff").unwrap(), BackgroundColor::rgb(255, 255, 255));
        let c = BackgroundColor::parse("#10203080").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0x10, 0x20, 0x30, 0x80));
    }

    #[test]
    fn parses_names() {
        assert_eq!(BackgroundColor::parse("White").unwrap(), BackgroundColor::rgb(255, 255, 255));
        assert_eq!(BackgroundColor::parse(" grey ").unwrap(), BackgroundColor::rgb(128, 128, 128));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "#", "#12", "#12345", "#gggggg", "mauve-ish", "#ééé"] {
            assert!(
                matches!(BackgroundColor::parse(bad), Err(Error::BackgroundColorUnavailable(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn translucent_color_flattens_over_black() {
        let c = BackgroundColor { r: 255, g: 100, b: 0, a: 0 };
        assert_eq!(c.to_opaque_rgba(), Rgba([0, 0, 0, 255]));
        let c = BackgroundColor { r: 200, g: 100, b: 50, a: 255 };
        assert_eq!(c.to_opaque_rgba(), Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn display_round_trips() {
        let c = BackgroundColor::parse("#0a0b0c").unwrap();
        assert_eq!(c.to_string(), "#0a0b0c");
        assert_eq!(c.to_string().parse::<BackgroundColor>().unwrap(), c);
    }
}
