//! Shared test utilities for the quote-cards test suite.
//!
//! Provides record builders for pure-function tests and content-directory
//! writers for loader and orchestrator tests.
//!
//! # Usage
//!
//! ```text
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_quote(tmp.path(), "a", "Writing is thinking.", "https://example.com/post");
//! let loaded = content::load(tmp.path()).unwrap();
//! assert_eq!(ids(&loaded.quotes), vec!["a"]);
//! ```

use crate::content::Quote;
use chrono::{TimeZone, Utc};
use std::fs;
use std::path::Path;

// =========================================================================
// Record builders
// =========================================================================

/// A fully populated quote on `example.com/essays/writing`.
pub fn quote(id: &str) -> Quote {
    Quote {
        id: id.to_string(),
        text: format!("Quote {id} says something worth keeping."),
        attribution: "Jane Doe".to_string(),
        url: "https://example.com/essays/writing/".to_string(),
        source_url: "https://example.com/essays/writing".to_string(),
        title: Some("On Writing".to_string()),
        source_domain: "example.com".to_string(),
        article_slug: "essays-writing".to_string(),
        created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
        tags: vec!["writing".to_string()],
        body_html: None,
        location: format!("{id}.md"),
    }
}

/// A quote with `created_at` set to midnight UTC on the given day of May 2024.
pub fn quote_on(id: &str, day: u32) -> Quote {
    Quote {
        created_at: Some(Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap()),
        ..quote(id)
    }
}

/// A quote in the group `domain/slug`.
pub fn quote_in(id: &str, domain: &str, slug: &str) -> Quote {
    Quote {
        source_domain: domain.to_string(),
        article_slug: slug.to_string(),
        url: format!("https://{domain}/{slug}"),
        source_url: format!("https://{domain}/{slug}"),
        ..quote(id)
    }
}

/// Ids of a record list, in order.
pub fn ids(quotes: &[Quote]) -> Vec<&str> {
    quotes.iter().map(|q| q.id.as_str()).collect()
}

// =========================================================================
// Content directory writers
// =========================================================================

/// Write `<dir>/<rel>` with the given front matter and body, creating parents.
pub fn write_quote_file(dir: &Path, rel: &str, front_matter: &str, body: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, format!("---\n{front_matter}\n---\n{body}")).unwrap();
}

/// Write `<dir>/<id>.md` with the required fields only.
pub fn write_quote(dir: &Path, id: &str, text: &str, url: &str) {
    write_quote_file(
        dir,
        &format!("{id}.md"),
        &format!("id: {id}\nquote: \"{text}\"\nname: Jane Doe\nurl: {url}"),
        "",
    );
}

// =========================================================================
// Output tree inspection
// =========================================================================

/// Sorted file paths under `dir`, relative and `/`-separated. Empty when
/// `dir` does not exist.
pub fn list_files(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}
