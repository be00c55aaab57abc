//! # Quote Cards
//!
//! An incremental static builder for shareable quotes. Each quote is a
//! Markdown file with YAML front matter; the build turns it into a social
//! card image, a wrapper page that embeds the card, and an entry on a
//! per-article source page that collects every quote from the same URL.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Load   quotes/  →  Vec<Quote> + warnings/errors   (validation only)
//! 2. Build  quotes   →  dist/ + .build-manifest.json   (incremental render)
//! ```
//!
//! The load stage never touches the output directory, so `check` can run it
//! alone. The build stage consults the manifest left by the previous run and
//! re-renders only the artifacts whose inputs changed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`content`] | Stage 1: discovers quote files, parses front matter, validates, infers source groups |
//! | [`build`] | Stage 2: removals, parallel card and page rendering, manifest persist |
//! | [`plan`] | Pure dirty-set computation behind the build stage |
//! | [`manifest`] | The persisted record of what the last build produced |
//! | [`fingerprint`] | SHA-256 fingerprints over each artifact's exact inputs |
//! | [`card`] | Text-fitting card renderer (`image` + `ab_glyph`) behind the [`card::CardBackend`] trait |
//! | [`pages`] | Wrapper and source page payloads, Maud fragments, link helpers |
//! | [`template`] | Two-pass `{{#section}}` / `{{token}}` substitution and the embedded page shells |
//! | [`config`] | `quote-cards.toml` loading, validation, merging, per-run [`config::BuildConfig`] |
//! | [`metadata`] | Field fallback resolution, slugs, whitespace normalization |
//! | [`output`] | CLI output formatting for check reports and build progress |
//!
//! # Design Decisions
//!
//! ## Fingerprints Over Timestamps
//!
//! Staleness is decided by hashing each artifact's declared inputs, not by
//! comparing mtimes. A fresh checkout in CI has every mtime reset, and a
//! template change has no per-quote mtime at all. Hashes make both cases
//! exact: the card for a quote whose title changed is not re-rendered, because
//! the card never shows the title.
//!
//! ## Manifest Lives in the Output
//!
//! `.build-manifest.json` sits inside `dist/`. Caching or deploying the output
//! directory carries the incremental state with it, and deleting the output
//! directory is always a correct way to force a full rebuild.
//!
//! ## Renderer Behind a Trait
//!
//! The orchestrator talks to [`card::CardBackend`], never to pixels. Tests use
//! a recording mock so dirty-set behavior can be checked without encoding a
//! single image, and the production [`card::RasterBackend`] owns its font
//! cache instead of sharing a global one.

pub mod build;
pub mod card;
pub mod config;
pub mod content;
pub mod fingerprint;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod pages;
pub mod plan;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
