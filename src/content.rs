//! Quote discovery, parsing, and validation.
//!
//! Stage 1 of the build. Walks the content directory for Markdown files, each
//! holding one quote as YAML front matter plus an optional Markdown body of
//! commentary, and produces the validated record list the orchestrator works
//! from.
//!
//! ## File Format
//!
//! ```text
//! quotes/
//! ├── 2024/
//! │   ├── on-writing.md
//! │   └── tools.md
//! └── misc.md
//!
//! ---
//! id: on-writing
//! quote: "Writing is thinking."
//! name: Jane Doe
//! url: https://example.com/essays/writing/
//! article_title: On Writing
//! created_at: 2024-05-01
//! tags: [writing, craft]
//! ---
//! Optional **markdown** commentary.
//! ```
//!
//! ## Severity
//!
//! Problems are data, not `Err`. The loader returns every valid record plus two
//! lists:
//!
//! - **errors**: missing required field, duplicate id, malformed URL, broken
//!   front matter. A record with any error is excluded from the output and the
//!   build refuses to run.
//! - **warnings**: undeterminable domain or slug, unparsable `created_at`,
//!   several records pointing at the same URL. Logged, never fatal.
//!
//! Only filesystem failures surface as [`ContentError`].

use crate::metadata::{self, INDEX_SLUG, UNKNOWN_DOMAIN};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pulldown_cmark::{Options, Parser, html as md_html};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Content directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("Failed to walk content directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A validated quote record.
///
/// Immutable for the duration of a build. `id` is unique across the whole
/// record set; the loader rejects duplicates rather than merging them.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub id: String,
    /// The quoted passage, as written.
    pub text: String,
    pub attribution: String,
    /// URL as authored (trimmed). Used for outbound links.
    pub url: String,
    /// Scheme + host + path, no query or fragment, no trailing slash.
    /// Two quotes with equal normalized URLs share a source group.
    pub source_url: String,
    pub title: Option<String>,
    pub source_domain: String,
    pub article_slug: String,
    pub created_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// Commentary body rendered to HTML.
    pub body_html: Option<String>,
    /// Path of the source file relative to the content root.
    pub location: String,
}

impl Quote {
    /// `domain/slug` key of the source group this quote belongs to.
    pub fn group_key(&self) -> String {
        group_key(&self.source_domain, &self.article_slug)
    }

    /// Tags sorted for hashing. Tag order carries no meaning.
    pub fn sorted_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// `created_at` as RFC 3339 (seconds precision), or empty when unset.
    pub fn created_at_iso(&self) -> String {
        self.created_at
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default()
    }

    /// Sort key for source pages: seconds since epoch, unset = 0 (oldest).
    pub fn created_at_secs(&self) -> i64 {
        self.created_at.map(|t| t.timestamp()).unwrap_or(0)
    }
}

/// Build a group key from its two parts.
pub fn group_key(domain: &str, slug: &str) -> String {
    format!("{domain}/{slug}")
}

/// A validation finding tied to a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Relative file path, or empty for findings spanning several files.
    pub location: String,
    pub message: String,
}

impl Issue {
    fn at(location: &str, message: impl Into<String>) -> Self {
        Self {
            location: location.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// Everything the loader found.
#[derive(Debug, Default)]
pub struct LoadResult {
    pub quotes: Vec<Quote>,
    pub warnings: Vec<Issue>,
    pub errors: Vec<Issue>,
}

impl LoadResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Raw YAML front matter. Every field is optional here; requiredness is
/// checked afterwards so all problems in a file are reported together.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    #[serde(deserialize_with = "scalar_string")]
    id: Option<String>,
    #[serde(alias = "text", deserialize_with = "scalar_string")]
    quote: Option<String>,
    #[serde(alias = "attribution", deserialize_with = "scalar_string")]
    name: Option<String>,
    #[serde(alias = "source_url", deserialize_with = "scalar_string")]
    url: Option<String>,
    #[serde(alias = "title", deserialize_with = "scalar_string")]
    article_title: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    source_domain: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    created_at: Option<String>,
    tags: Vec<String>,
}

/// Accept any YAML scalar as a string (`id: 42` is a valid id).
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_yaml::Value;
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Load every quote under `dir`.
pub fn load(dir: &Path) -> Result<LoadResult, ContentError> {
    if !dir.is_dir() {
        return Err(ContentError::MissingDirectory(dir.to_path_buf()));
    }

    let mut result = LoadResult::default();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut urls: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (location, path) in discover(dir)? {
        let raw = std::fs::read_to_string(&path).map_err(|source| ContentError::Read {
            path: path.clone(),
            source,
        })?;

        let (fm, body) = match parse_front_matter(&raw) {
            Ok(parsed) => parsed,
            Err(message) => {
                result.errors.push(Issue::at(&location, message));
                continue;
            }
        };

        let errors_before = result.errors.len();
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let id = field(&fm.id);
        match &id {
            None => result
                .errors
                .push(Issue::at(&location, "missing required field \"id\"")),
            Some(id) if !is_path_safe(id) => result.errors.push(Issue::at(
                &location,
                format!("id \"{id}\" cannot be used as a file name"),
            )),
            Some(id) if !seen_ids.insert(id.clone()) => result
                .errors
                .push(Issue::at(&location, format!("duplicate id \"{id}\""))),
            Some(_) => {}
        }

        let text = field(&fm.quote);
        if text.is_none() {
            result
                .errors
                .push(Issue::at(&location, "missing required field \"quote\""));
        }
        let attribution = field(&fm.name);
        if attribution.is_none() {
            result
                .errors
                .push(Issue::at(&location, "missing required field \"name\""));
        }
        let url = field(&fm.url);
        let source_url = match &url {
            None => {
                result
                    .errors
                    .push(Issue::at(&location, "missing required field \"url\""));
                None
            }
            Some(raw_url) => {
                let normalized = normalize_url(raw_url);
                if normalized.is_none() {
                    result
                        .errors
                        .push(Issue::at(&location, format!("invalid url \"{raw_url}\"")));
                }
                normalized
            }
        };

        let (host, path_slug) = source_url
            .as_deref()
            .map(infer_domain_and_slug)
            .unwrap_or_default();
        let source_domain = metadata::resolve(&[fm.source_domain.as_deref(), Some(&host)]);
        if let Some(domain) = source_domain.as_deref().filter(|d| !is_path_safe(d)) {
            result.errors.push(Issue::at(
                &location,
                format!("source_domain \"{domain}\" cannot be used as a directory name"),
            ));
        }
        if source_domain.is_none() {
            result
                .warnings
                .push(Issue::at(&location, "could not determine source domain"));
        }
        if source_url.is_none() {
            result
                .warnings
                .push(Issue::at(&location, "could not determine article slug"));
        }

        let created_at = match field(&fm.created_at) {
            Some(value) => {
                let parsed = parse_created_at(&value);
                if parsed.is_none() {
                    result.warnings.push(Issue::at(
                        &location,
                        format!("could not parse created_at \"{value}\", treating as unset"),
                    ));
                }
                parsed
            }
            None => None,
        };

        if let Some(normalized) = &source_url {
            let key = id.clone().unwrap_or_else(|| location.clone());
            urls.entry(normalized.clone()).or_default().push(key);
        }

        if result.errors.len() > errors_before {
            continue;
        }
        // All four are present when no error was recorded for this file.
        let (Some(id), Some(text), Some(attribution), Some(url), Some(source_url)) =
            (id, text, attribution, url, source_url)
        else {
            continue;
        };

        let body_html = (!body.trim().is_empty()).then(|| render_markdown(body));

        result.quotes.push(Quote {
            id,
            text,
            attribution,
            url,
            source_url,
            title: field(&fm.article_title),
            source_domain: source_domain.unwrap_or_else(|| UNKNOWN_DOMAIN.to_string()),
            article_slug: if path_slug.is_empty() {
                INDEX_SLUG.to_string()
            } else {
                path_slug
            },
            created_at,
            tags: fm
                .tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            body_html,
            location,
        });
    }

    for (url, mut ids) in urls {
        if ids.len() > 1 {
            ids.sort();
            result.warnings.push(Issue::at(
                "",
                format!(
                    "multiple quotes reference the same url ({url}): {}",
                    ids.join(", ")
                ),
            ));
        }
    }

    Ok(result)
}

/// Ids and domains become path components of the output tree.
fn is_path_safe(value: &str) -> bool {
    value != "." && value != ".." && !value.contains(['/', '\\'])
}

/// Collect `(relative_location, absolute_path)` for every Markdown file,
/// sorted by location. Hidden files and directories are skipped.
fn discover(dir: &Path) -> Result<Vec<(String, PathBuf)>, ContentError> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(dir).into_iter().filter_entry(|e| {
        e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
    });
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_markdown = entry
            .path()
            .extension()
            .map(|e| e.eq_ignore_ascii_case("md"))
            .unwrap_or(false);
        if !is_markdown {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let location = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((location, entry.into_path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Split a file into parsed front matter and the Markdown body that follows.
fn parse_front_matter(raw: &str) -> Result<(FrontMatter, &str), String> {
    let trimmed = raw.trim();
    let (rest, newline_len) = if let Some(rest) = trimmed.strip_prefix("---\r\n") {
        (rest, 2)
    } else if let Some(rest) = trimmed.strip_prefix("---\n") {
        (rest, 1)
    } else {
        return Err("missing YAML front matter".to_string());
    };

    let (yaml, body) = if let Some(after) = rest.strip_prefix("---") {
        ("", after)
    } else {
        let marker = if newline_len == 2 { "\r\n---" } else { "\n---" };
        let idx = rest
            .find(marker)
            .ok_or_else(|| "unterminated YAML front matter".to_string())?;
        (&rest[..idx], &rest[idx + marker.len()..])
    };

    let fm = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(yaml).map_err(|e| format!("invalid front matter: {e}"))?
    };
    Ok((fm, body.trim()))
}

/// Normalize a source URL to `scheme://host[:port]/path`.
///
/// Query and fragment are dropped, as is a trailing slash. Returns `None`
/// for anything without both a scheme and a host.
pub fn normalize_url(input: &str) -> Option<String> {
    let parsed = Url::parse(input.trim()).ok()?;
    let host = parsed.host_str().filter(|h| !h.is_empty())?;
    let mut normalized = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        normalized.push_str(&format!(":{port}"));
    }
    normalized.push_str(parsed.path());
    Some(normalized.trim_end_matches('/').to_string())
}

/// Host and path slug of a normalized URL. Empty path yields an empty slug;
/// the caller substitutes [`INDEX_SLUG`].
fn infer_domain_and_slug(normalized: &str) -> (String, String) {
    match Url::parse(normalized) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or_default().to_string(),
            metadata::slugify(parsed.path().trim_matches('/')),
        ),
        Err(_) => (String::new(), String::new()),
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn render_markdown(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);
    let mut html = String::new();
    md_html::push_html(&mut html, Parser::new_ext(body, options));
    html
}
