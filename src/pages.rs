//! HTML page assembly for wrapper and source pages.
//!
//! Turns quotes into template payloads and fills the embedded shells from
//! [`template`](crate::template). Everything here is pure: the orchestrator
//! decides *whether* a page is written, this module decides *what* it says.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── cards/<id>.jpg                     # linked from both page kinds
//! ├── q/<id>/index.html                  # wrapper page (one per quote)
//! └── sources/<domain>/<slug>/index.html # source page (one per group)
//! ```
//!
//! ## Links
//!
//! Every emitted link goes through [`public_path`], which prefixes the
//! configured base path. `og:image` additionally goes through
//! [`absolute_url`] since scrapers need a full URL, and carries `?v=<token>`
//! when a cache-bust token is set.

use crate::card::{CardBackend, CardFormat};
use crate::config::BuildConfig;
use crate::content::Quote;
use crate::metadata;
use crate::template::{self, Payload, escape};
use maud::{PreEscaped, html};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Stand-in domain for page text when a quote has none.
const FALLBACK_DOMAIN: &str = "original-source";

/// What the pages need to know about the card image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardInfo {
    pub format: CardFormat,
    pub width: u32,
    pub height: u32,
}

impl CardInfo {
    pub fn of(backend: &dyn CardBackend) -> Self {
        let (width, height) = backend.dimensions();
        Self {
            format: backend.format(),
            width,
            height,
        }
    }

    /// Site-relative path of a quote's card, e.g. `/cards/a.jpg`.
    pub fn path(&self, id: &str) -> String {
        format!("/cards/{id}.{}", self.format.extension())
    }
}

/// Prefix `relative` with the base path, ensuring a single leading slash.
pub fn public_path(config: &BuildConfig, relative: &str) -> String {
    if relative.starts_with('/') {
        format!("{}{relative}", config.base_path)
    } else {
        format!("{}/{relative}", config.base_path)
    }
}

/// [`public_path`] with the site origin in front, when one is configured.
pub fn absolute_url(config: &BuildConfig, relative: &str) -> String {
    let path = public_path(config, relative);
    if config.site_origin.is_empty() {
        path
    } else {
        format!("{}{path}", config.site_origin)
    }
}

/// Site-relative path of a quote's wrapper page.
pub fn wrapper_path(id: &str) -> String {
    format!("/q/{id}/")
}

// ============================================================================
// Wrapper pages
// ============================================================================

/// One-line summary used for `<meta name="description">` and `og:description`.
///
/// | title | author | result |
/// |---|---|---|
/// | yes | yes | `From {title} by {author}` |
/// | yes | no | `From {title} on {domain}` |
/// | no | yes | `{author} on {domain}` |
/// | no | no | `Collected from {domain}` |
pub fn description(quote: &Quote) -> String {
    let domain = display_domain(quote);
    let author = metadata::resolve(&[Some(quote.attribution.as_str())]);
    let title = metadata::resolve(&[quote.title.as_deref()]);
    match (title, author) {
        (Some(title), Some(author)) => format!("From {title} by {author}"),
        (Some(title), None) => format!("From {title} on {domain}"),
        (None, Some(author)) => format!("{author} on {domain}"),
        (None, None) => format!("Collected from {domain}"),
    }
}

fn display_domain(quote: &Quote) -> &str {
    if quote.source_domain.is_empty() {
        FALLBACK_DOMAIN
    } else {
        &quote.source_domain
    }
}

/// Template values for `q/<id>/index.html`. All values are escaped.
pub fn wrapper_payload(quote: &Quote, config: &BuildConfig, card: CardInfo) -> Payload {
    let title = metadata::resolve(&[quote.title.as_deref()]);
    let page_title = title.clone().unwrap_or_else(|| display_domain(quote).to_string());
    let description = escape(&description(quote));

    let card_path = card.path(&quote.id);
    let version_suffix = match config.card_version.as_deref() {
        Some(token) if !token.is_empty() => {
            let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
            format!("?v={encoded}")
        }
        _ => String::new(),
    };
    let og_image = escape(&absolute_url(config, &format!("{card_path}{version_suffix}")));
    let source_url = escape(&quote.url);

    let mut payload = Payload::new();
    payload.insert("page_title", escape(&page_title));
    payload.insert("og_title", escape(&page_title));
    payload.insert("meta_description", description.clone());
    payload.insert("og_description", description);
    payload.insert("og_image", og_image);
    payload.insert("canonical_url", source_url.clone());
    payload.insert("source_url", source_url);
    payload.insert("quote_text", escape(&quote.text));
    payload.insert(
        "quote_author",
        metadata::resolve(&[Some(quote.attribution.as_str())])
            .map(|a| escape(&a))
            .unwrap_or_default(),
    );
    payload.insert(
        "article_title",
        title.map(|t| escape(&t)).unwrap_or_default(),
    );
    payload.insert("card_url", escape(&public_path(config, &card_path)));
    payload.insert("card_width", card.width.to_string());
    payload.insert("card_height", card.height.to_string());
    payload
}

/// Full HTML of a quote's wrapper page.
pub fn wrapper_page(quote: &Quote, config: &BuildConfig, card: CardInfo) -> String {
    template::apply(template::WRAPPER_TEMPLATE, &wrapper_payload(quote, config, card))
}

// ============================================================================
// Source pages
// ============================================================================

/// Quotes sharing a `domain/slug` key, rendered as one source page.
#[derive(Debug, Clone)]
pub struct SourceGroup<'a> {
    pub domain: String,
    pub slug: String,
    /// First member's normalized URL.
    pub source_url: String,
    /// First non-empty member title.
    pub title: Option<String>,
    /// Newest first; undated quotes last, ties in input order.
    pub quotes: Vec<&'a Quote>,
}

/// Bucket quotes by group key and sort each group newest first.
pub fn group_quotes(quotes: &[Quote]) -> BTreeMap<String, SourceGroup<'_>> {
    let mut groups: BTreeMap<String, SourceGroup<'_>> = BTreeMap::new();
    for quote in quotes {
        let group = groups
            .entry(quote.group_key())
            .or_insert_with(|| SourceGroup {
                domain: quote.source_domain.clone(),
                slug: quote.article_slug.clone(),
                source_url: String::new(),
                title: None,
                quotes: Vec::new(),
            });
        if group.source_url.is_empty() {
            group.source_url =
                metadata::resolve(&[Some(quote.source_url.as_str()), Some(quote.url.as_str())])
                    .unwrap_or_default();
        }
        if group.title.is_none() {
            group.title = metadata::resolve(&[quote.title.as_deref()]);
        }
        group.quotes.push(quote);
    }
    for group in groups.values_mut() {
        group.quotes.sort_by_key(|q| Reverse(q.created_at_secs()));
    }
    groups
}

/// One `<article>` on a source page.
pub fn group_item(quote: &Quote, config: &BuildConfig, card: CardInfo) -> String {
    let body = quote
        .body_html
        .as_deref()
        .filter(|body| !body.trim().is_empty());
    html! {
        article {
            blockquote { "\u{201c}" (quote.text) "\u{201d}" }
            cite { (quote.attribution) }
            @if let Some(body) = body {
                div.body { (PreEscaped(body)) }
            }
            div.meta {
                span { a href=(public_path(config, &wrapper_path(&quote.id))) { "Quote page" } }
                span {
                    a href=(public_path(config, &card.path(&quote.id))) {
                        "Download " (card.format.label())
                    }
                }
            }
        }
    }
    .into_string()
}

/// Template values for `sources/<domain>/<slug>/index.html`.
pub fn source_payload(group: &SourceGroup<'_>, config: &BuildConfig, card: CardInfo) -> Payload {
    let page_title = match &group.title {
        Some(title) => format!("{title} \u{2014} {}", group.domain),
        None => format!("Quotes from {}", group.domain),
    };
    let items: Vec<String> = group
        .quotes
        .iter()
        .map(|q| group_item(q, config, card))
        .collect();

    let mut payload = Payload::new();
    payload.insert("page_title", escape(&page_title));
    payload.insert("source_domain", escape(&group.domain));
    payload.insert("source_url", escape(&group.source_url));
    payload.insert("quote_items", items.join("\n\n"));
    payload
}

/// Full HTML of a source page.
pub fn source_page(group: &SourceGroup<'_>, config: &BuildConfig, card: CardInfo) -> String {
    template::apply(template::SOURCE_TEMPLATE, &source_payload(group, config, card))
}
