//! Raster card renderer: text fitting, glyph drawing, encoding.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Font parse | `ab_glyph::FontArc::try_from_slice` (bundled) or `FontVec::try_from_vec` (`[cards] font`) |
//! | Measure | `ScaleFont::h_advance` + `kern` per glyph pair |
//! | Rasterize | `ab_glyph::OutlinedGlyph::draw` coverage, alpha-blended onto an `RgbImage` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (configured quality) |
//! | Encode → PNG / WebP | `PngEncoder`, `WebPEncoder::new_lossless` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//!
//! Every measurement goes through the face at the candidate size, so a line
//! of `W`s wraps sooner than a line of `i`s of the same length.

use super::backend::{CardBackend, CardError};
use super::font::{DEFAULT_FONT, FaceCache, SizedFace};
use super::layout::{Layout, display_text, fit_text, line_centers};
use super::params::{CardFormat, CardParams, Rgb};
use crate::fingerprint::{card_render_hash, hash_bytes};
use ab_glyph::{Font, point};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::path::Path;

/// Production backend drawing cards with `image` and `ab_glyph`.
pub struct RasterBackend {
    params: CardParams,
    faces: FaceCache,
    fingerprint: String,
}

impl RasterBackend {
    /// Build a renderer from card params and TTF/OTF bytes. `None` uses the
    /// bundled face.
    pub fn new(params: CardParams, font: Option<Vec<u8>>) -> Result<Self, CardError> {
        let font_hash = hash_bytes(font.as_deref().unwrap_or(DEFAULT_FONT));
        let fingerprint = card_render_hash(&font_hash, &params);
        let faces = match font {
            Some(bytes) => FaceCache::from_bytes(bytes)?,
            None => FaceCache::bundled()?,
        };
        Ok(Self {
            params,
            faces,
            fingerprint,
        })
    }

    /// Like [`new`](Self::new), reading the font from disk.
    pub fn from_font_file(params: CardParams, font: Option<&Path>) -> Result<Self, CardError> {
        let bytes = font.map(std::fs::read).transpose()?;
        Self::new(params, bytes)
    }

    pub fn params(&self) -> &CardParams {
        &self.params
    }

    /// Choose font size and line breaks for `text`.
    pub fn layout(&self, text: &str) -> Layout {
        fit_text(&display_text(text), &self.params, |size, s| {
            self.faces.face(size).measure(s)
        })
    }

    fn draw(&self, layout: &Layout) -> RgbImage {
        let p = &self.params;
        let mut canvas = RgbImage::from_pixel(p.width, p.height, image::Rgb(p.background.0));
        let centers = line_centers(layout.lines.len(), layout.size, p.line_height, p.height);
        let face = self.faces.face(layout.size);
        for (line, center) in layout.lines.iter().zip(centers) {
            draw_line(&mut canvas, &face, line, center, p.foreground);
        }
        canvas
    }
}

impl CardBackend for RasterBackend {
    fn format(&self) -> CardFormat {
        self.params.format
    }

    fn render_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn render(&self, text: &str) -> Result<Vec<u8>, CardError> {
        let layout = self.layout(text);
        if !layout.fits {
            tracing::debug!(size = layout.size, lines = layout.lines.len(), "card text overflows");
        }
        encode(&self.draw(&layout), &self.params)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.params.width, self.params.height)
    }
}

/// Draw one line of glyphs, horizontally centered, vertically centered on `center_y`.
fn draw_line(canvas: &mut RgbImage, face: &SizedFace, line: &str, center_y: f32, color: Rgb) {
    let x0 = (canvas.width() as f32 - face.measure(line)) / 2.0;
    let baseline = center_y + (face.ascent() + face.descent()) / 2.0;

    for (id, dx) in face.positions(line) {
        let glyph = id.with_scale_and_position(face.scale(), point(x0 + dx, baseline));
        let Some(outlined) = face.font().outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i64 + gx as i64;
            let y = bounds.min.y as i64 + gy as i64;
            blend(canvas, x, y, color, coverage);
        });
    }
}

/// Alpha-blend `color` over the pixel at (x, y). Out-of-canvas writes are dropped.
fn blend(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for (channel, target) in pixel.0.iter_mut().zip(color.0) {
        let mixed = *channel as f32 * (1.0 - alpha) + target as f32 * alpha;
        *channel = mixed.round() as u8;
    }
}

fn encode(canvas: &RgbImage, params: &CardParams) -> Result<Vec<u8>, CardError> {
    let mut buf = Vec::new();
    let (w, h) = canvas.dimensions();
    let quality = params.quality.value() as u8;
    let raw = canvas.as_raw();

    match params.format {
        CardFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, quality).write_image(
            raw,
            w,
            h,
            ExtendedColorType::Rgb8,
        )?,
        CardFormat::Png => PngEncoder::new(&mut buf).write_image(raw, w, h, ExtendedColorType::Rgb8)?,
        CardFormat::Webp => {
            WebPEncoder::new_lossless(&mut buf).write_image(raw, w, h, ExtendedColorType::Rgb8)?
        }
        CardFormat::Avif => AvifEncoder::new_with_speed_quality(&mut buf, 6, quality)
            .write_image(raw, w, h, ExtendedColorType::Rgb8)?,
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: [u8; 3] = [0xf7, 0xf4, 0xec];

    fn png_params() -> CardParams {
        CardParams {
            format: CardFormat::Png,
            ..CardParams::default()
        }
    }

    fn png_backend() -> RasterBackend {
        RasterBackend::new(png_params(), None).unwrap()
    }

    fn inked(bytes: &[u8]) -> usize {
        let img = image::load_from_memory(bytes).unwrap().to_rgb8();
        img.pixels().filter(|p| p.0 != BACKGROUND).count()
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn renders_fixed_size_jpeg() {
        let backend = RasterBackend::new(CardParams::default(), None).unwrap();
        let bytes = backend.render("Writing is thinking.").unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (1200, 628));
    }

    #[test]
    fn png_keeps_background_and_draws_glyphs() {
        let bytes = png_backend().render("Hello there").unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, BACKGROUND);
        assert!(img.pixels().any(|p| p.0 == [0x26, 0x21, 0x1a]));
    }

    #[test]
    fn longer_text_puts_more_ink_down() {
        let backend = png_backend();
        let short = inked(&backend.render("Yes.").unwrap());
        let long = inked(&backend.render("Yes, and then some more words.").unwrap());
        assert!(short > 0);
        assert!(long > short);
    }

    #[test]
    fn every_format_encodes() {
        for format in [CardFormat::Jpeg, CardFormat::Png, CardFormat::Webp] {
            let params = CardParams {
                format,
                width: 300,
                height: 160,
                padding_x: 20,
                padding_y: 20,
                font_max: 30,
                font_min: 12,
                ..CardParams::default()
            };
            let backend = RasterBackend::new(params, None).unwrap();
            let img = image::load_from_memory(&backend.render("Small card.").unwrap()).unwrap();
            assert_eq!((img.width(), img.height()), (300, 160), "{format:?}");
        }
    }

    // =========================================================================
    // Fitting with glyph metrics
    // =========================================================================

    #[test]
    fn short_text_uses_max_size() {
        let layout = png_backend().layout("Less is more.");
        assert_eq!(layout.size, 72);
        assert_eq!(layout.lines.len(), 1);
        assert!(layout.fits);
    }

    #[test]
    fn overflowing_text_still_renders_at_min_size() {
        let backend = png_backend();
        let text = "an extremely long passage ".repeat(300);
        let layout = backend.layout(&text);
        assert_eq!(layout.size, 36);
        assert!(!layout.fits);

        let img = image::load_from_memory(&backend.render(&text).unwrap()).unwrap();
        assert_eq!((img.width(), img.height()), (1200, 628));
    }

    #[test]
    fn wide_glyphs_fit_at_a_smaller_size() {
        let backend = png_backend();
        let narrow = backend.layout(&"i ".repeat(80));
        let wide = backend.layout(&"W ".repeat(80));
        assert!(
            narrow.size > wide.size,
            "narrow {} vs wide {}",
            narrow.size,
            wide.size
        );
    }

    #[test]
    fn wrapped_lines_stay_inside_the_text_box() {
        let backend = png_backend();
        let layout = backend.layout(&"Quotations measured with real advances. ".repeat(4));
        assert!(layout.fits);
        let face = backend.faces.face(layout.size);
        let max = backend.params().available_width();
        for line in layout.lines.iter().filter(|l| l.contains(' ')) {
            assert!(face.measure(line) <= max, "{line:?} is too wide");
        }
    }

    // =========================================================================
    // Fingerprint and font handling
    // =========================================================================

    #[test]
    fn fingerprint_tracks_params() {
        let jpeg = RasterBackend::new(CardParams::default(), None).unwrap();
        let png = png_backend();
        let again = RasterBackend::new(CardParams::default(), None).unwrap();
        assert_ne!(jpeg.render_fingerprint(), png.render_fingerprint());
        assert_eq!(jpeg.render_fingerprint(), again.render_fingerprint());
        assert_eq!(png.extension(), "png");
    }

    #[test]
    fn fingerprint_hashes_font_bytes() {
        let bundled = png_backend();
        let explicit = RasterBackend::new(png_params(), Some(DEFAULT_FONT.to_vec())).unwrap();
        assert_eq!(bundled.render_fingerprint(), explicit.render_fingerprint());
        assert_eq!(
            bundled.render_fingerprint(),
            card_render_hash(&hash_bytes(DEFAULT_FONT), &png_params())
        );
    }

    #[test]
    fn invalid_font_is_an_error() {
        let result = RasterBackend::new(CardParams::default(), Some(b"nope".to_vec()));
        assert!(matches!(result, Err(CardError::InvalidFont)));
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let result = RasterBackend::from_font_file(
            CardParams::default(),
            Some(Path::new("/nonexistent/font.ttf")),
        );
        assert!(matches!(result, Err(CardError::Io(_))));
    }

    #[test]
    fn face_caches_are_per_renderer() {
        let a = png_backend();
        let b = png_backend();
        a.layout("Warm the cache.");
        assert!(!a.faces.is_empty());
        assert!(b.faces.is_empty());
    }
}
