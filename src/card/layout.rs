//! Pure layout functions for the text fitter.
//!
//! All functions here are pure and testable without fonts or pixels. Width
//! measurement is passed in as a closure so the same fitting loop runs
//! against real glyph metrics in production and a fixed model in tests.

use super::params::CardParams;
use crate::metadata::normalize_whitespace;

/// The chosen font size and wrapped lines for one card.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub size: u32,
    pub lines: Vec<String>,
    /// `false` when even the minimum size overflows the text box.
    pub fits: bool,
}

/// Text as drawn on the card: whitespace collapsed, wrapped in curly quotes.
pub fn display_text(text: &str) -> String {
    format!("\u{201c}{}\u{201d}", normalize_whitespace(text))
}

/// Greedy word wrap. Breaks only on whitespace; a single word wider than
/// `max_width` gets a line of its own and overflows.
///
/// Always returns at least one line.
pub fn wrap_words(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{line} {word}");
        if measure(&candidate) <= max_width {
            line = candidate;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        }
    }

    lines.push(line);
    lines
}

/// Total height of a wrapped block.
pub fn block_height(line_count: usize, size: u32, line_height: f32) -> f32 {
    line_count as f32 * size as f32 * line_height
}

/// Pick the largest candidate size whose wrapped block fits the text box.
///
/// `measure(size, text)` returns the rendered width of `text` at `size`.
/// When nothing fits, the minimum size is used and [`Layout::fits`] is false.
pub fn fit_text(text: &str, params: &CardParams, measure: impl Fn(u32, &str) -> f32) -> Layout {
    let max_width = params.available_width();
    let max_height = params.available_height();

    for size in params.candidate_sizes() {
        let lines = wrap_words(text, max_width, |s| measure(size, s));
        if block_height(lines.len(), size, params.line_height) <= max_height {
            return Layout {
                size,
                lines,
                fits: true,
            };
        }
    }

    let size = params.font_min;
    Layout {
        size,
        lines: wrap_words(text, max_width, |s| measure(size, s)),
        fits: false,
    }
}

/// Vertical center of each line, with the whole block centered on the canvas.
pub fn line_centers(line_count: usize, size: u32, line_height: f32, canvas_height: u32) -> Vec<f32> {
    let advance = size as f32 * line_height;
    let first = canvas_height as f32 / 2.0 - (line_count.saturating_sub(1)) as f32 * advance / 2.0;
    (0..line_count).map(|i| first + i as f32 * advance).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is 10px wide regardless of size.
    fn fixed(_size: u32, text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    /// Half an em per character, so width scales with size.
    fn half_em(size: u32, text: &str) -> f32 {
        text.chars().count() as f32 * size as f32 * 0.5
    }

    // =========================================================================
    // display_text
    // =========================================================================

    #[test]
    fn display_text_quotes_and_collapses() {
        assert_eq!(display_text("  Less\n  is   more. "), "\u{201c}Less is more.\u{201d}");
    }

    // =========================================================================
    // wrap_words
    // =========================================================================

    #[test]
    fn wrap_fits_on_one_line() {
        let lines = wrap_words("a b c", 100.0, |s| fixed(0, s));
        assert_eq!(lines, vec!["a b c"]);
    }

    #[test]
    fn wrap_breaks_on_whitespace() {
        // "aaa bbb" = 70px, limit 50 → two lines
        let lines = wrap_words("aaa bbb ccc", 50.0, |s| fixed(0, s));
        assert_eq!(lines, vec!["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn wrap_never_splits_words() {
        let lines = wrap_words("short incomprehensibilities end", 50.0, |s| fixed(0, s));
        assert_eq!(lines, vec!["short", "incomprehensibilities", "end"]);
    }

    #[test]
    fn wrap_empty_yields_one_empty_line() {
        assert_eq!(wrap_words("   ", 50.0, |s| fixed(0, s)), vec![""]);
    }

    // =========================================================================
    // fit_text
    // =========================================================================

    #[test]
    fn short_text_uses_max_size() {
        let params = CardParams::default();
        let layout = fit_text(&display_text("Hi."), &params, half_em);
        assert_eq!(layout.size, params.font_max);
        assert_eq!(layout.lines.len(), 1);
        assert!(layout.fits);
    }

    #[test]
    fn medium_text_steps_down() {
        let params = CardParams::default();
        // ~300 chars: too many lines at 72px, fits somewhere below
        let text = display_text(&"word ".repeat(60));
        let layout = fit_text(&text, &params, half_em);
        assert!(layout.fits);
        assert!(layout.size < params.font_max);
        assert!(layout.size >= params.font_min);
        assert!(
            block_height(layout.lines.len(), layout.size, params.line_height)
                <= params.available_height()
        );
    }

    #[test]
    fn picks_largest_fitting_size() {
        let params = CardParams::default();
        let text = display_text(&"word ".repeat(60));
        let layout = fit_text(&text, &params, half_em);
        let bigger = layout.size + params.font_step;
        let lines = wrap_words(&text, params.available_width(), |s| half_em(bigger, s));
        assert!(block_height(lines.len(), bigger, params.line_height) > params.available_height());
    }

    #[test]
    fn overflowing_text_falls_back_to_min() {
        let params = CardParams::default();
        let text = display_text(&"overflowing ".repeat(400));
        let layout = fit_text(&text, &params, half_em);
        assert_eq!(layout.size, params.font_min);
        assert!(!layout.fits);
        assert!(layout.lines.len() > 1);
    }

    // =========================================================================
    // line_centers
    // =========================================================================

    #[test]
    fn single_line_is_centered() {
        assert_eq!(line_centers(1, 72, 1.32, 628), vec![314.0]);
    }

    #[test]
    fn block_is_symmetric_around_center() {
        let centers = line_centers(3, 50, 1.0, 600);
        assert_eq!(centers, vec![250.0, 300.0, 350.0]);
    }
}
