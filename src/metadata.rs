//! Field resolution for quote records.
//!
//! Several record fields have more than one possible source: the source domain
//! can be set explicitly in front matter or inferred from the URL host, the
//! article slug comes from the URL path or falls back to a reserved name. This
//! module holds the small, pure helpers that pick between those sources.
//!
//! ## Resolution priority
//!
//! Each field is resolved independently. The first non-empty value wins:
//!
//! - **Domain**: front matter `source_domain` → URL host → `unknown-source`
//! - **Slug**: slugified URL path → `index`
//!
//! ## Slugs
//!
//! Slugs become directory names under `sources/<domain>/`, so they are
//! restricted to lowercase ASCII alphanumerics and single dashes. Long slugs
//! are cut short and end in a hash of the full slug, so two long paths that
//! differ only near the end still get different directories.

/// Reserved slug for a URL with an empty path (`https://example.com/`).
pub const INDEX_SLUG: &str = "index";

/// Domain used when neither front matter nor the URL yields one.
pub const UNKNOWN_DOMAIN: &str = "unknown-source";

/// Resolve a metadata field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value.
///
/// ```text
/// domain: resolve(&[front_matter_domain, url_host])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Maximum length of a generated slug.
const MAX_SLUG_LEN: usize = 80;

/// Hex digits of the full-slug hash kept on a shortened slug.
const SLUG_HASH_LEN: usize = 8;

/// Turn a URL path (or any string) into a slug.
///
/// - Lowercases ASCII letters
/// - Replaces every run of non-alphanumeric characters with a single dash
/// - Strips leading and trailing dashes
/// - Over `MAX_SLUG_LEN`: keeps a prefix (cut at a dash where possible) and
///   appends `-` plus the first `SLUG_HASH_LEN` hex digits of the full
///   slug's SHA-256
///
/// Returns an empty string when nothing survives; callers fall back to
/// [`INDEX_SLUG`].
pub fn slugify(input: &str) -> String {
    let mut collapsed = String::with_capacity(input.len());
    let mut prev_dash = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            collapsed.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            collapsed.push('-');
            prev_dash = true;
        }
    }

    let trimmed = collapsed.trim_matches('-');

    if trimmed.len() <= MAX_SLUG_LEN {
        return trimmed.to_string();
    }

    let digest = crate::fingerprint::hash_bytes(trimmed.as_bytes());
    let head = &trimmed[..MAX_SLUG_LEN - SLUG_HASH_LEN - 1];
    let head = match head.rfind('-') {
        Some(pos) if pos > 0 => &head[..pos],
        _ => head,
    };
    format!("{head}-{}", &digest[..SLUG_HASH_LEN])
}

/// Collapse all internal whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
