//! Heatmap color ramp - load value to interpolated cell color
//!
//! Global invariants enforced:
//! - Breakpoints are unique by load and kept sorted ascending
//! - Interpolation is piecewise-linear per RGB channel
//! - An empty ramp never produces a color

use crate::error::{LoadgridError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Luminance above which dark text is used
const TEXT_LUMINANCE_THRESHOLD: f64 = 0.5;

/// An sRGB color decoded from `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parse `#RRGGBB` (hex digits in either case)
    pub fn from_hex(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| {
                LoadgridError::format(format!("\"{}\" is not a #RRGGBB color", trimmed))
            })?;
        let packed = u32::from_str_radix(digits, 16)
            .map_err(|_| LoadgridError::format(format!("\"{}\" is not hexadecimal", digits)))?;
        Ok(Rgb::new(
            ((packed >> 16) & 0xff) as u8,
            ((packed >> 8) & 0xff) as u8,
            (packed & 0xff) as u8,
        ))
    }

    /// Lowercase `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Perceived luminance in [0, 1]
    pub fn luminance(self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    fn lerp(self, other: Rgb, ratio: f64) -> Rgb {
        let channel = |a: u8, b: u8| -> u8 {
            (a as f64 * (1.0 - ratio) + b as f64 * ratio)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = LoadgridError;

    fn from_str(s: &str) -> Result<Self> {
        Rgb::from_hex(s)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Foreground color chosen for contrast against a cell background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    Black,
    White,
}

impl TextColor {
    pub fn rgb(self) -> Rgb {
        match self {
            TextColor::Black => Rgb::BLACK,
            TextColor::White => Rgb::WHITE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextColor::Black => "black",
            TextColor::White => "white",
        }
    }
}

/// Black text on light backgrounds, white text on dark ones
pub fn text_color_for(background: Rgb) -> TextColor {
    if background.luminance() > TEXT_LUMINANCE_THRESHOLD {
        TextColor::Black
    } else {
        TextColor::White
    }
}

/// One (load, color) anchor of the ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorBreakpoint {
    pub load: i64,
    pub color: Rgb,
}

/// Color mapping entry as served by the planning API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorMappingEntry {
    pub id_map: i64,
    pub color_hex: String,
}

impl TryFrom<&ColorMappingEntry> for ColorBreakpoint {
    type Error = LoadgridError;

    fn try_from(entry: &ColorMappingEntry) -> Result<Self> {
        Ok(ColorBreakpoint {
            load: entry.id_map,
            color: Rgb::from_hex(&entry.color_hex)?,
        })
    }
}

/// Background and foreground for one rendered cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellStyle {
    pub background: Rgb,
    pub foreground: TextColor,
}

/// Sorted set of breakpoints plus the optional upper saturation cap
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorRamp {
    breakpoints: Vec<ColorBreakpoint>,
    saturation_cap: Option<i64>,
}

impl ColorRamp {
    /// Build a ramp, sorting by load
    ///
    /// Negative or duplicate load keys are rejected. An empty set is accepted
    /// here and rejected when a color is requested.
    pub fn new(mut breakpoints: Vec<ColorBreakpoint>) -> Result<Self> {
        if let Some(bp) = breakpoints.iter().find(|bp| bp.load < 0) {
            return Err(LoadgridError::configuration(format!(
                "breakpoint load must be non-negative (got {})",
                bp.load
            )));
        }
        breakpoints.sort_by_key(|bp| bp.load);
        if let Some(pair) = breakpoints.windows(2).find(|w| w[0].load == w[1].load) {
            return Err(LoadgridError::configuration(format!(
                "duplicate breakpoint for load {}",
                pair[0].load
            )));
        }
        Ok(ColorRamp {
            breakpoints,
            saturation_cap: None,
        })
    }

    /// Build a ramp from the API color mapping list
    pub fn from_mapping(entries: &[ColorMappingEntry]) -> Result<Self> {
        let breakpoints = entries
            .iter()
            .map(ColorBreakpoint::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(breakpoints)
    }

    /// Loads at or above `cap` saturate to the last color
    pub fn with_saturation_cap(mut self, cap: Option<i64>) -> Self {
        self.saturation_cap = cap;
        self
    }

    pub fn saturation_cap(&self) -> Option<i64> {
        self.saturation_cap
    }

    pub fn breakpoints(&self) -> &[ColorBreakpoint] {
        &self.breakpoints
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Interpolated background color for `load`
    pub fn color_for(&self, load: i64) -> Result<Rgb> {
        let (first, last) = match (self.breakpoints.first(), self.breakpoints.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(LoadgridError::configuration(
                    "color ramp has no breakpoints",
                ))
            }
        };

        if load <= first.load {
            return Ok(first.color);
        }
        if load >= last.load {
            return Ok(last.color);
        }
        if matches!(self.saturation_cap, Some(cap) if load >= cap) {
            return Ok(last.color);
        }

        for pair in self.breakpoints.windows(2) {
            let (low, high) = (pair[0], pair[1]);
            if load >= low.load && load < high.load {
                let ratio = (load - low.load) as f64 / (high.load - low.load) as f64;
                return Ok(low.color.lerp(high.color, ratio));
            }
        }

        // Unreachable for sorted unique keys with first < load < last
        Ok(last.color)
    }

    /// Background plus contrasting text color for `load`
    pub fn cell_style(&self, load: i64) -> Result<CellStyle> {
        let background = self.color_for(load)?;
        Ok(CellStyle {
            background,
            foreground: text_color_for(background),
        })
    }

    /// White through green and yellow to red over a 0..=30 day month
    pub fn builtin() -> Self {
        let bp = |load: i64, r: u8, g: u8, b: u8| ColorBreakpoint {
            load,
            color: Rgb::new(r, g, b),
        };
        ColorRamp {
            breakpoints: vec![
                bp(0, 0xff, 0xff, 0xff),
                bp(10, 0xc6, 0xef, 0xce),
                bp(20, 0xff, 0xeb, 0x9c),
                bp(30, 0xff, 0xc7, 0xce),
            ],
            saturation_cap: None,
        }
    }
}
