//! Font loading and the per-size face cache.
//!
//! A [`FaceCache`] owns one parsed font and hands out [`SizedFace`]s, one per
//! pixel size, built on first use and shared read-only afterwards. The cache
//! belongs to a renderer instance; two renderers never share faces.
//!
//! DejaVu Sans ships inside the binary (`static/fonts/`, Bitstream Vera
//! license) and is used unless `[cards] font` names another face.

use super::backend::CardError;
use ab_glyph::{Font, FontArc, FontVec, GlyphId, PxScale, PxScaleFont, ScaleFont};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// The bundled face.
pub const DEFAULT_FONT: &[u8] = include_bytes!("../../static/fonts/DejaVuSans.ttf");

/// A font bound to one pixel size.
pub struct SizedFace {
    scaled: PxScaleFont<FontArc>,
}

impl SizedFace {
    fn new(font: FontArc, size: u32) -> Self {
        // Sizes are ems, as in a typesetter; ab_glyph scales by ascent-descent height.
        let scale = font
            .pt_to_px_scale(size as f32)
            .unwrap_or(PxScale::from(size as f32));
        Self {
            scaled: font.into_scaled(scale),
        }
    }

    pub fn scale(&self) -> PxScale {
        self.scaled.scale()
    }

    pub fn font(&self) -> &FontArc {
        self.scaled.font()
    }

    pub fn ascent(&self) -> f32 {
        self.scaled.ascent()
    }

    /// Negative, below the baseline.
    pub fn descent(&self) -> f32 {
        self.scaled.descent()
    }

    /// Horizontal advance of `text`, kerning included.
    pub fn measure(&self, text: &str) -> f32 {
        self.positions(text)
            .last()
            .map(|&(id, x)| x + self.scaled.h_advance(id))
            .unwrap_or(0.0)
    }

    /// Glyph ids and their x offsets from the start of `text`.
    pub fn positions(&self, text: &str) -> Vec<(GlyphId, f32)> {
        let mut out = Vec::with_capacity(text.len());
        let mut caret = 0.0;
        let mut previous: Option<GlyphId> = None;
        for c in text.chars() {
            let id = self.scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += self.scaled.h_advance(prev) + self.scaled.kern(prev, id);
            }
            out.push((id, caret));
            previous = Some(id);
        }
        out
    }
}

/// Lock-guarded size → face map over a single font.
pub struct FaceCache {
    font: FontArc,
    faces: Mutex<HashMap<u32, Arc<SizedFace>>>,
}

impl FaceCache {
    /// Parse TTF/OTF bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CardError> {
        let font = FontVec::try_from_vec(bytes).map_err(|_| CardError::InvalidFont)?;
        Ok(Self::new(FontArc::new(font)))
    }

    /// The bundled face, borrowed from the binary.
    pub fn bundled() -> Result<Self, CardError> {
        let font = FontArc::try_from_slice(DEFAULT_FONT).map_err(|_| CardError::InvalidFont)?;
        Ok(Self::new(font))
    }

    pub fn new(font: FontArc) -> Self {
        Self {
            font,
            faces: Mutex::new(HashMap::new()),
        }
    }

    /// Face for `size`, created on first request.
    pub fn face(&self, size: u32) -> Arc<SizedFace> {
        let mut faces = self.faces.lock().unwrap_or_else(PoisonError::into_inner);
        faces
            .entry(size)
            .or_insert_with(|| Arc::new(SizedFace::new(self.font.clone(), size)))
            .clone()
    }

    /// Number of sizes built so far.
    pub fn len(&self) -> usize {
        self.faces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
