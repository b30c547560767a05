//! Typed views over string settings: integers, booleans, fonts, colours.
//!
//! Every decoder has its own fallback for malformed input so a damaged rc
//! file degrades to defaults instead of failing startup.

use compact_str::{CompactString, format_compact};
use std::fmt;

/// Sentinel returned by integer reads for absent or malformed values.
pub const INVALID_INT: i32 = -1;

const TRUE_TOKENS: [&str; 5] = ["true", "on", "yes", "1", "T"];

pub fn decode_int(value: Option<&str>) -> i32 {
    value
        .and_then(|v| v.trim().parse::<i32>().ok())
        .unwrap_or(INVALID_INT)
}

pub fn decode_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| TRUE_TOKENS.contains(&v))
}

pub fn encode_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Font description as stored under `[Fonts]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub family: CompactString,
    pub point_size: i32,
    pub pixel_size: i32,
    pub style_hint: u32,
    pub weight: u32,
    pub italic: bool,
    pub underline: bool,
    pub strike_out: bool,
    pub fixed_pitch: bool,
    pub raw_mode: bool,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: CompactString::const_new("Sans"),
            point_size: 10,
            pixel_size: -1,
            style_hint: 0,
            weight: 50,
            italic: false,
            underline: false,
            strike_out: false,
            fixed_pitch: false,
            raw_mode: false,
        }
    }
}

impl Font {
    const ITALIC: u32 = 0x01;
    const UNDERLINE: u32 = 0x02;
    const STRIKE_OUT: u32 = 0x04;
    const FIXED_PITCH: u32 = 0x08;
    const RAW_MODE: u32 = 0x20;

    /// Decodes either storage format, falling back to [`Font::default`].
    ///
    /// More than five commas selects the current ten-field format
    /// `family,points,pixels,hint,weight,italic,underline,strike,fixed,raw`;
    /// otherwise the legacy `family,points,hint,charset,weight,bits` layout is
    /// expected.
    pub fn decode(value: &str) -> Font {
        let commas = value.matches(',').count();
        let parsed = if commas > 5 {
            Self::from_config_string(value)
        } else {
            Self::from_legacy(value)
        };
        parsed.unwrap_or_default()
    }

    pub fn from_config_string(value: &str) -> Option<Font> {
        let fields: Vec<&str> = value.split(',').collect();
        if fields.len() != 10 || fields[0].is_empty() {
            return None;
        }

        let flag = |s: &str| -> Option<bool> {
            match s.trim() {
                "0" => Some(false),
                "1" => Some(true),
                _ => None,
            }
        };

        Some(Font {
            family: CompactString::from(fields[0]),
            point_size: fields[1].trim().parse().ok()?,
            pixel_size: fields[2].trim().parse().ok()?,
            style_hint: fields[3].trim().parse().ok()?,
            weight: fields[4].trim().parse().ok()?,
            italic: flag(fields[5])?,
            underline: flag(fields[6])?,
            strike_out: flag(fields[7])?,
            fixed_pitch: flag(fields[8])?,
            raw_mode: flag(fields[9])?,
        })
    }

    fn from_legacy(value: &str) -> Option<Font> {
        let mut parts = value.splitn(6, ',');
        let family = parts.next()?;
        let points = parts.next()?;
        let hint = parts.next()?;
        let _charset = parts.next()?;
        let weight = parts.next()?;
        let bits = parts.next()?;

        // Legacy numeric fields decode leniently, like the old writer did.
        let bits: u32 = bits.trim().parse().unwrap_or(0);
        Some(Font {
            family: CompactString::from(family),
            point_size: points.trim().parse().unwrap_or(0),
            pixel_size: -1,
            style_hint: hint.trim().parse().unwrap_or(0),
            weight: weight.trim().parse().unwrap_or(0),
            italic: bits & Self::ITALIC != 0,
            underline: bits & Self::UNDERLINE != 0,
            strike_out: bits & Self::STRIKE_OUT != 0,
            fixed_pitch: bits & Self::FIXED_PITCH != 0,
            raw_mode: bits & Self::RAW_MODE != 0,
        })
    }

    pub fn to_config_string(&self) -> CompactString {
        let b = |f: bool| u8::from(f);
        format_compact!(
            "{},{},{},{},{},{},{},{},{},{}",
            self.family,
            self.point_size,
            self.pixel_size,
            self.style_hint,
            self.weight,
            b(self.italic),
            b(self.underline),
            b(self.strike_out),
            b(self.fixed_pitch),
            b(self.raw_mode),
        )
    }
}

/// Colour as stored under `[Colors]`: `r,g,b`, or empty when invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Invalid,
    Rgb(u8, u8, u8),
}

impl Color {
    pub fn is_valid(&self) -> bool {
        matches!(self, Color::Rgb(..))
    }

    pub fn decode(value: &str) -> Color {
        if value.is_empty() {
            return Color::Invalid;
        }
        let mut parts = value.splitn(3, ',');
        let (Some(r), Some(g), Some(b)) = (parts.next(), parts.next(), parts.next()) else {
            return Color::Invalid;
        };

        // Unparseable components read as zero; out-of-range ones invalidate.
        let component = |s: &str| -> Option<u8> {
            let n: i64 = s.trim().parse().unwrap_or(0);
            u8::try_from(n).ok()
        };
        match (component(r), component(g), component(b)) {
            (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
            _ => Color::Invalid,
        }
    }

    pub fn to_config_string(&self) -> CompactString {
        match self {
            Color::Invalid => CompactString::default(),
            Color::Rgb(r, g, b) => format_compact!("{r},{g},{b}"),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_config_string())
    }
}
