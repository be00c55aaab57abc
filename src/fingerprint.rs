//! Content fingerprints for incremental builds.
//!
//! Every artifact the build writes is keyed by a SHA-256 over exactly the
//! inputs its render reads, in a fixed order. If the fingerprint stored in the
//! manifest matches the freshly computed one (and the file is still on disk)
//! the artifact is skipped.
//!
//! ## Per-record fingerprints
//!
//! | Artifact | Inputs |
//! |---|---|
//! | Card image | card render version, text, attribution, sorted tags |
//! | Wrapper page | wrapper render version, base path, site origin, cache-bust token, text, attribution, title, URL, domain |
//! | Group item | source render version, base path, id, text, attribution, body HTML, URL, title, domain, slug, created-at, sorted tags |
//!
//! The card deliberately ignores title and URL: the image never shows them,
//! so editing an article title re-renders pages but not the raster.
//!
//! ## Global fingerprints
//!
//! [`card_render_hash`] covers the algorithm version, the font bytes, and all
//! card geometry, so any of those changing re-renders every card.
//! [`template_hash`] does the same for the page templates.
//!
//! ## Encoding
//!
//! Each hash starts with a tag (`b"card\0"`) so two artifact classes fed the
//! same strings never collide. Strings are length-prefixed, which keeps
//! `("ab", "c")` and `("a", "bc")` apart.

use crate::card::CardParams;
use crate::config::BuildConfig;
use crate::content::Quote;
use sha2::{Digest, Sha256};

/// Version of the card raster algorithm. Bump on any change that alters
/// pixels for the same inputs.
pub const CARD_RENDER_VERSION: &str = "20240505";

/// Version of the wrapper page payload logic.
pub const WRAPPER_RENDER_VERSION: &str = "20240505";

/// Version of the source page payload and fragment logic.
pub const SOURCE_RENDER_VERSION: &str = "20240505";

/// Thin wrapper that feeds length-prefixed fields into a hasher.
struct Fields(Sha256);

impl Fields {
    fn new(tag: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tag);
        Self(hasher)
    }

    fn str(mut self, value: &str) -> Self {
        self.0.update((value.len() as u64).to_le_bytes());
        self.0.update(value.as_bytes());
        self
    }

    fn opt(self, value: Option<&str>) -> Self {
        self.str(value.unwrap_or_default())
    }

    fn u32(mut self, value: u32) -> Self {
        self.0.update(value.to_le_bytes());
        self
    }

    fn f32(mut self, value: f32) -> Self {
        self.0.update(value.to_le_bytes());
        self
    }

    fn tags(self, quote: &Quote) -> Self {
        self.str(&quote.sorted_tags().join("|"))
    }

    fn finish(self) -> String {
        format!("{:x}", self.0.finalize())
    }
}

/// SHA-256 of raw bytes, as hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn card_hash(quote: &Quote) -> String {
    Fields::new(b"card\0")
        .str(CARD_RENDER_VERSION)
        .str(&quote.text)
        .str(&quote.attribution)
        .tags(quote)
        .finish()
}

pub fn wrapper_hash(quote: &Quote, config: &BuildConfig) -> String {
    Fields::new(b"wrapper\0")
        .str(WRAPPER_RENDER_VERSION)
        .str(&config.base_path)
        .str(&config.site_origin)
        .opt(config.card_version.as_deref())
        .str(&quote.text)
        .str(&quote.attribution)
        .opt(quote.title.as_deref())
        .str(&quote.url)
        .str(&quote.source_domain)
        .finish()
}

pub fn group_item_hash(quote: &Quote, config: &BuildConfig) -> String {
    Fields::new(b"group-item\0")
        .str(SOURCE_RENDER_VERSION)
        .str(&config.base_path)
        .str(&quote.id)
        .str(&quote.text)
        .str(&quote.attribution)
        .opt(quote.body_html.as_deref())
        .str(&quote.url)
        .opt(quote.title.as_deref())
        .str(&quote.source_domain)
        .str(&quote.article_slug)
        .str(&quote.created_at_iso())
        .tags(quote)
        .finish()
}

/// Global card fingerprint: algorithm version, font bytes hash, and every
/// parameter that changes the output pixels or encoding.
pub fn card_render_hash(font_hash: &str, params: &CardParams) -> String {
    Fields::new(b"card-render\0")
        .str(CARD_RENDER_VERSION)
        .str(font_hash)
        .str(params.format.extension())
        .u32(params.quality.value())
        .u32(params.width)
        .u32(params.height)
        .u32(params.padding_x)
        .u32(params.padding_y)
        .u32(params.font_max)
        .u32(params.font_min)
        .u32(params.font_step)
        .f32(params.line_height)
        .str(&params.background.to_hex())
        .str(&params.foreground.to_hex())
        .finish()
}

/// Template fingerprint. `card_signature` carries the card extension and
/// dimensions, which both page templates embed in their image references.
pub fn template_hash(version: &str, template: &str, card_signature: &str) -> String {
    Fields::new(b"template\0")
        .str(version)
        .str(template)
        .str(card_signature)
        .finish()
}
