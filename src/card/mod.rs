//! Quote card rendering in pure Rust, no system font stack.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Fit** | font size ladder + greedy word wrap ([`layout`]) |
//! | **Measure / draw** | `ab_glyph` advances, kerning, outlines |
//! | **Encode** | `image` crate JPEG / PNG / WebP / AVIF encoders |
//!
//! The module is split into:
//! - **Layout**: Pure fitting and wrapping functions (unit testable)
//! - **Parameters**: Canvas geometry, colors, format
//! - **Font**: Per-renderer face cache
//! - **Backend**: [`CardBackend`] trait + [`RasterBackend`]

pub mod backend;
mod font;
pub mod layout;
mod params;
pub mod renderer;

pub use backend::{CardBackend, CardError};
pub use layout::Layout;
pub use params::{CardFormat, CardParams, Quality, Rgb};
pub use renderer::RasterBackend;
