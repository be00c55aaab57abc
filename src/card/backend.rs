//! Card rendering backend trait and shared types.
//!
//! The [`CardBackend`] trait is the seam between the build orchestrator and
//! the pixel work. The production implementation is
//! [`RasterBackend`](super::renderer::RasterBackend); tests use a recording
//! mock so orchestrator logic can be checked without encoding images.

use super::params::CardFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Font data could not be parsed")]
    InvalidFont,
    #[error("Encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Trait for card renderers.
///
/// Implementations must be `Sync`: the orchestrator renders cards from a
/// rayon pool through a shared reference.
pub trait CardBackend: Sync {
    /// Output format, which decides the card file extension.
    fn format(&self) -> CardFormat;

    /// Fingerprint of everything that affects output pixels besides the
    /// quote itself: algorithm version, font, geometry, colors, encoding.
    fn render_fingerprint(&self) -> &str;

    /// Render one quote's text into encoded image bytes.
    fn render(&self, text: &str) -> Result<Vec<u8>, CardError>;

    /// Canvas `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    fn extension(&self) -> &'static str {
        self.format().extension()
    }

    /// `ext:WxH`, the part of the card every page template depends on.
    fn signature(&self) -> String {
        let (width, height) = self.dimensions();
        format!("{}:{width}x{height}", self.extension())
    }
}
