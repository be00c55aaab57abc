//! Parameter types for card rendering.
//!
//! These describe *what* a card looks like, not how it is drawn. They are
//! built from the `[cards]` config table and handed to a backend, and every
//! field feeds the global card fingerprint.
//!
//! ## Types
//!
//! - [`CardFormat`]: Output encoding (JPEG, PNG, WebP, AVIF) and its file extension.
//! - [`Quality`]: Lossy encoding quality (1–100, default 88). Clamped on construction.
//! - [`Rgb`]: An opaque color parsed from `#rrggbb`.
//! - [`CardParams`]: Canvas geometry, font size ladder, colors, format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoded image format for cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl CardFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CardFormat::Jpeg => "jpg",
            CardFormat::Png => "png",
            CardFormat::Webp => "webp",
            CardFormat::Avif => "avif",
        }
    }

    /// Human label used in download links ("Download JPG").
    pub fn label(self) -> &'static str {
        match self {
            CardFormat::Jpeg => "JPG",
            CardFormat::Png => "PNG",
            CardFormat::Webp => "WebP",
            CardFormat::Avif => "AVIF",
        }
    }
}

/// Quality setting for lossy encoding (1-100).
///
/// PNG and WebP (lossless in the `image` crate) ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(88)
    }
}

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Full description of a card canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CardParams {
    pub format: CardFormat,
    pub quality: Quality,
    pub width: u32,
    pub height: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    /// Largest candidate font size, in pixels per em.
    pub font_max: u32,
    /// Smallest candidate; also the fallback when nothing fits.
    pub font_min: u32,
    pub font_step: u32,
    /// Line advance as a multiple of the font size.
    pub line_height: f32,
    pub background: Rgb,
    pub foreground: Rgb,
}

impl Default for CardParams {
    fn default() -> Self {
        Self {
            format: CardFormat::Jpeg,
            quality: Quality::default(),
            width: 1200,
            height: 628,
            padding_x: 150,
            padding_y: 120,
            font_max: 72,
            font_min: 36,
            font_step: 2,
            line_height: 1.32,
            background: Rgb([0xf7, 0xf4, 0xec]),
            foreground: Rgb([0x26, 0x21, 0x1a]),
        }
    }
}

impl CardParams {
    /// Width available for text after horizontal padding.
    pub fn available_width(&self) -> f32 {
        self.width.saturating_sub(self.padding_x.saturating_mul(2)) as f32
    }

    /// Height available for text after vertical padding.
    pub fn available_height(&self) -> f32 {
        self.height.saturating_sub(self.padding_y.saturating_mul(2)) as f32
    }

    /// Candidate font sizes, largest first, stepping down to no lower than
    /// `font_min`.
    pub fn candidate_sizes(&self) -> impl Iterator<Item = u32> {
        (self.font_min..=self.font_max)
            .rev()
            .step_by(self.font_step.max(1) as usize)
    }
}
