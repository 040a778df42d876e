//! Color and font values.

use std::fmt;

use crate::style::value::PropertyError;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

/// Named colors accepted in markup.
const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::rgb(0.0, 0.0, 0.0)),
    ("darkGray", Color::rgb(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)),
    ("lightGray", Color::rgb(2.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0)),
    ("white", Color::rgb(1.0, 1.0, 1.0)),
    ("gray", Color::rgb(0.5, 0.5, 0.5)),
    ("red", Color::rgb(1.0, 0.0, 0.0)),
    ("green", Color::rgb(0.0, 1.0, 0.0)),
    ("blue", Color::rgb(0.0, 0.0, 1.0)),
    ("cyan", Color::rgb(0.0, 1.0, 1.0)),
    ("yellow", Color::rgb(1.0, 1.0, 0.0)),
    ("magenta", Color::rgb(1.0, 0.0, 1.0)),
    ("orange", Color::rgb(1.0, 0.5, 0.0)),
    ("purple", Color::rgb(0.5, 0.0, 0.5)),
    ("brown", Color::rgb(0.6, 0.4, 0.2)),
    ("clear", Color::rgba(0.0, 0.0, 0.0, 0.0)),
];

impl Color {
    /// An opaque color.
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue, alpha: 1.0 }
    }

    /// A color with explicit alpha.
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self { red, green, blue, alpha }
    }

    /// Build from 8-bit channels.
    pub fn from_rgba8(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self::rgba(
            f64::from(red) / 255.0,
            f64::from(green) / 255.0,
            f64::from(blue) / 255.0,
            f64::from(alpha) / 255.0,
        )
    }

    /// Look up a named color.
    pub fn named(name: &str) -> Option<Color> {
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, color)| *color)
    }

    /// Parse a hex color: `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` required).
    pub fn from_hex(text: &str) -> Option<Color> {
        let hex = text.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let nibble = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17)
                };
                Some(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255))
            }
            6 => Some(Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Color::from_rgba8(
                channel(0)?,
                channel(2)?,
                channel(4)?,
                channel(6)?,
            )),
            _ => None,
        }
    }

    /// Parse either a named or a hex color.
    pub fn parse(text: &str) -> Result<Color, PropertyError> {
        let text = text.trim();
        Color::named(text)
            .or_else(|| Color::from_hex(text))
            .ok_or_else(|| PropertyError::InvalidValue {
                property: "color".into(),
                message: format!("expected a color name or #RRGGBB[AA], got: {text}"),
            })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        write!(
            f,
            "#{:02X}{:02X}{:02X}{:02X}",
            byte(self.red),
            byte(self.green),
            byte(self.blue),
            byte(self.alpha)
        )
    }
}

// ---------------------------------------------------------------------------
// Font
// ---------------------------------------------------------------------------

/// System font weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontWeight {
    UltraLight,
    Thin,
    Light,
    #[default]
    Regular,
    Medium,
    Semibold,
    Bold,
    Heavy,
    Black,
}

impl FontWeight {
    const ALL: [FontWeight; 9] = [
        FontWeight::UltraLight,
        FontWeight::Thin,
        FontWeight::Light,
        FontWeight::Regular,
        FontWeight::Medium,
        FontWeight::Semibold,
        FontWeight::Bold,
        FontWeight::Heavy,
        FontWeight::Black,
    ];

    /// Markup keyword for this weight.
    pub fn keyword(self) -> &'static str {
        match self {
            FontWeight::UltraLight => "ultraLight",
            FontWeight::Thin => "thin",
            FontWeight::Light => "light",
            FontWeight::Regular => "regular",
            FontWeight::Medium => "medium",
            FontWeight::Semibold => "semibold",
            FontWeight::Bold => "bold",
            FontWeight::Heavy => "heavy",
            FontWeight::Black => "black",
        }
    }

    /// Look up a weight by keyword.
    pub fn from_keyword(keyword: &str) -> Option<FontWeight> {
        FontWeight::ALL.into_iter().find(|w| w.keyword() == keyword)
    }
}

/// A font specification.
///
/// Markup forms: `17` (regular system font), `:bold@17` (weighted system
/// font), `Avenir-Book@17` (named font).
#[derive(Debug, Clone, PartialEq)]
pub enum Font {
    System { weight: FontWeight, size: f64 },
    Named { name: String, size: f64 },
}

impl Font {
    /// Parse a font description.
    pub fn parse(text: &str) -> Result<Font, PropertyError> {
        let text = text.trim();
        let invalid = |message: String| PropertyError::InvalidValue {
            property: "font".into(),
            message,
        };
        let parse_size = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|size| *size > 0.0)
                .ok_or_else(|| invalid(format!("invalid font size: {raw}")))
        };

        match text.split_once('@') {
            None => Ok(Font::System {
                weight: FontWeight::Regular,
                size: parse_size(text)?,
            }),
            Some((face, size)) => {
                let size = parse_size(size)?;
                if let Some(weight) = face.strip_prefix(':') {
                    let weight = FontWeight::from_keyword(weight)
                        .ok_or_else(|| invalid(format!("unknown font weight: {weight}")))?;
                    Ok(Font::System { weight, size })
                } else if face.is_empty() {
                    Ok(Font::System {
                        weight: FontWeight::Regular,
                        size,
                    })
                } else {
                    Ok(Font::Named {
                        name: face.to_string(),
                        size,
                    })
                }
            }
        }
    }

    /// Point size.
    pub fn size(&self) -> f64 {
        match self {
            Font::System { size, .. } | Font::Named { size, .. } => *size,
        }
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Font::System { weight, size } => write!(f, ":{}@{size}", weight.keyword()),
            Font::Named { name, size } => write!(f, "{name}@{size}"),
        }
    }
}
