//! CLI output formatting for the check and build commands.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Each quote leads with
//! its positional index and id, with the source file and group shown as
//! indented context lines. Build progress names the artifact first and the
//! path it was written to second.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Quotes
//! 001 on-writing "Writing is thinking." (Jane Doe)
//!     Source: 2024/on-writing.md
//!     Group: example.com/essays-writing
//!
//! Warnings
//!     misc.md: could not parse created_at "soon", treating as unset
//!
//! Errors
//!     broken.md: missing required field "url"
//!
//! 1 quote, 1 warning, 1 error
//! ```
//!
//! ## Build
//!
//! ```text
//! Card on-writing
//! Wrapper on-writing → q/on-writing/index.html
//! Source example.com/essays-writing (2 quotes) → sources/example.com/essays-writing/index.html
//! Removed old-quote
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::build::{BuildEvent, BuildStats};
use crate::content::{Issue, LoadResult};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head.trim_end())
    }
}

/// `1 quote`, `2 quotes`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn issue_lines(title: &str, issues: &[Issue]) -> Vec<String> {
    if issues.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), title.to_string()];
    lines.extend(issues.iter().map(|issue| format!("{}{}", indent(1), issue)));
    lines
}

// ============================================================================
// Check / load report
// ============================================================================

/// Format the loader's findings: valid quotes, then warnings and errors.
pub fn format_load_report(result: &LoadResult) -> Vec<String> {
    let mut lines = vec!["Quotes".to_string()];
    for (i, quote) in result.quotes.iter().enumerate() {
        lines.push(format!(
            "{} {} \"{}\" ({})",
            format_index(i + 1),
            quote.id,
            truncate(&quote.text, 60),
            quote.attribution
        ));
        lines.push(format!("{}Source: {}", indent(1), quote.location));
        lines.push(format!("{}Group: {}", indent(1), quote.group_key()));
    }

    lines.extend(issue_lines("Warnings", &result.warnings));
    lines.extend(issue_lines("Errors", &result.errors));

    lines.push(String::new());
    lines.push(format!(
        "{}, {}, {}",
        plural(result.quotes.len(), "quote"),
        plural(result.warnings.len(), "warning"),
        plural(result.errors.len(), "error")
    ));
    lines
}

/// Print the load report to stdout.
pub fn print_load_report(result: &LoadResult) {
    for line in format_load_report(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Build progress
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    let line = match event {
        BuildEvent::Cleaned => "Cleaned output directory".to_string(),
        BuildEvent::QuoteRemoved { id } => format!("Removed {id}"),
        BuildEvent::CardRendered { id } => format!("Card {id}"),
        BuildEvent::WrapperRendered { id } => {
            format!("Wrapper {id} \u{2192} q/{id}/index.html")
        }
        BuildEvent::SourcePageRendered {
            domain,
            slug,
            quotes,
        } => format!(
            "Source {domain}/{slug} ({}) \u{2192} sources/{domain}/{slug}/index.html",
            plural(*quotes, "quote")
        ),
        BuildEvent::SourcePageRemoved { domain, slug } => {
            format!("Removed source {domain}/{slug}")
        }
    };
    vec![line]
}

/// Format the end-of-build summary.
pub fn format_build_stats(stats: &BuildStats) -> Vec<String> {
    vec![format!("Build: {stats}")]
}

/// Print the end-of-build summary to stdout.
pub fn print_build_stats(stats: &BuildStats) {
    for line in format_build_stats(stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::quote;

    fn issue(location: &str, message: &str) -> Issue {
        Issue {
            location: location.into(),
            message: message.into(),
        }
    }

    // =========================================================================
    // Load report
    // =========================================================================

    #[test]
    fn load_report_lists_quotes_with_context() {
        let result = LoadResult {
            quotes: vec![quote("a")],
            ..LoadResult::default()
        };
        let lines = format_load_report(&result);
        assert_eq!(lines[0], "Quotes");
        assert_eq!(
            lines[1],
            "001 a \"Quote a says something worth keeping.\" (Jane Doe)"
        );
        assert_eq!(lines[2], "    Source: a.md");
        assert_eq!(lines[3], "    Group: example.com/essays-writing");
        assert_eq!(lines.last().unwrap(), "1 quote, 0 warnings, 0 errors");
    }

    #[test]
    fn load_report_sections_for_issues() {
        let result = LoadResult {
            quotes: vec![],
            warnings: vec![issue("", "multiple quotes reference the same url (u): a, b")],
            errors: vec![issue("b.md", "missing required field \"url\"")],
        };
        let lines = format_load_report(&result);
        assert_eq!(
            lines,
            vec![
                "Quotes",
                "",
                "Warnings",
                "    multiple quotes reference the same url (u): a, b",
                "",
                "Errors",
                "    b.md: missing required field \"url\"",
                "",
                "0 quotes, 1 warning, 1 error",
            ]
        );
    }

    #[test]
    fn long_quote_text_is_truncated() {
        let mut q = quote("a");
        q.text = "word ".repeat(30);
        let result = LoadResult {
            quotes: vec![q],
            ..LoadResult::default()
        };
        let lines = format_load_report(&result);
        assert!(lines[1].contains("word..."));
        assert!(lines[1].len() < 100);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("ééé", 2), "éé...");
        assert_eq!(truncate("short", 10), "short");
    }

    // =========================================================================
    // Build events
    // =========================================================================

    #[test]
    fn build_event_lines() {
        assert_eq!(
            format_build_event(&BuildEvent::CardRendered { id: "a".into() }),
            vec!["Card a"]
        );
        assert_eq!(
            format_build_event(&BuildEvent::WrapperRendered { id: "a".into() }),
            vec!["Wrapper a \u{2192} q/a/index.html"]
        );
        assert_eq!(
            format_build_event(&BuildEvent::SourcePageRendered {
                domain: "example.com".into(),
                slug: "post".into(),
                quotes: 1,
            }),
            vec!["Source example.com/post (1 quote) \u{2192} sources/example.com/post/index.html"]
        );
        assert_eq!(
            format_build_event(&BuildEvent::SourcePageRemoved {
                domain: "example.com".into(),
                slug: "post".into(),
            }),
            vec!["Removed source example.com/post"]
        );
    }

    #[test]
    fn build_stats_line() {
        let stats = BuildStats {
            quotes: 1,
            ..BuildStats::default()
        };
        assert_eq!(
            format_build_stats(&stats),
            vec!["Build: 1 quote, everything up to date"]
        );
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }
}
