//! Incremental build orchestrator.
//!
//! Stage 2 of the pipeline. Takes the validated quotes from
//! [`content::load`](crate::content::load) and brings the output directory in
//! line with them, touching only what changed since the last successful run.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── .build-manifest.json
//! ├── cards/
//! │   └── <id>.jpg
//! ├── q/
//! │   └── <id>/index.html
//! └── sources/
//!     └── <domain>/<slug>/index.html
//! ```
//!
//! ## Order of Operations
//!
//! 1. Load the previous manifest. In force mode, wipe the three output trees
//!    and the manifest and start from an empty one.
//! 2. With no quotes at all, wipe everything and stop: there is nothing to track.
//! 3. Compute dirty sets ([`plan::compute`]).
//! 4. Delete cards and wrappers of removed quotes, and cards written under a
//!    previous image format.
//! 5. Render dirty cards and wrappers in parallel. Every quote writes its own
//!    paths, so workers never contend.
//! 6. Barrier. Render or delete dirty source pages, which need the complete,
//!    sorted member list of each group.
//! 7. Persist the next manifest. Any earlier error returns before this point,
//!    so the previous manifest stays in place and the next run retries.

use crate::card::{CardBackend, CardError};
use crate::config::BuildConfig;
use crate::content::Quote;
use crate::fingerprint::{
    CARD_RENDER_VERSION, SOURCE_RENDER_VERSION, WRAPPER_RENDER_VERSION, template_hash,
};
use crate::manifest::{Globals, Manifest, ManifestError};
use crate::pages::{self, CardInfo};
use crate::plan::{self, Artifact, GroupLocation};
use crate::template::{SOURCE_TEMPLATE, WRAPPER_TEMPLATE};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

pub const CARDS_DIR: &str = "cards";
pub const WRAPPERS_DIR: &str = "q";
pub const SOURCES_DIR: &str = "sources";
const PAGE_FILE: &str = "index.html";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("Failed to render card for {id}: {source}")]
    Card { id: String, source: CardError },
}

/// Attach the failing path to an I/O error.
trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T, BuildError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T, BuildError> {
        self.map_err(|source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Counts for one build run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub quotes: usize,
    pub cards_rendered: usize,
    pub wrappers_rendered: usize,
    pub source_pages_rendered: usize,
    pub cards_removed: usize,
    pub wrappers_removed: usize,
    pub source_pages_removed: usize,
}

impl BuildStats {
    pub fn rendered(&self) -> usize {
        self.cards_rendered + self.wrappers_rendered + self.source_pages_rendered
    }

    pub fn removed(&self) -> usize {
        self.cards_removed + self.wrappers_removed + self.source_pages_removed
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.quotes == 1 { "quote" } else { "quotes" };
        if self.rendered() == 0 && self.removed() == 0 {
            return write!(f, "{} {noun}, everything up to date", self.quotes);
        }
        write!(
            f,
            "{} {noun}: {} cards, {} wrappers, {} source pages rendered",
            self.quotes, self.cards_rendered, self.wrappers_rendered, self.source_pages_rendered
        )?;
        if self.removed() > 0 {
            write!(
                f,
                "; {} cards, {} wrappers, {} source pages removed",
                self.cards_removed, self.wrappers_removed, self.source_pages_removed
            )?;
        }
        Ok(())
    }
}

/// Progress reported while the build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// Output trees and manifest wiped (force mode or no quotes).
    Cleaned,
    QuoteRemoved { id: String },
    CardRendered { id: String },
    WrapperRendered { id: String },
    SourcePageRendered {
        domain: String,
        slug: String,
        quotes: usize,
    },
    SourcePageRemoved { domain: String, slug: String },
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutcome {
    pub stats: BuildStats,
    /// The manifest as persisted, or [`Manifest::empty`] when there were no
    /// quotes and the manifest file was deleted.
    pub manifest: Manifest,
}

/// Global fingerprints for the current renderer, templates, and settings.
pub fn globals(backend: &dyn CardBackend, config: &BuildConfig) -> Globals {
    let signature = backend.signature();
    Globals {
        card_version: config.card_version.clone(),
        card_render_version: CARD_RENDER_VERSION.to_string(),
        card_render_hash: backend.render_fingerprint().to_string(),
        card_extension: backend.extension().to_string(),
        wrapper_render_version: WRAPPER_RENDER_VERSION.to_string(),
        wrapper_template_hash: template_hash(WRAPPER_RENDER_VERSION, WRAPPER_TEMPLATE, &signature),
        source_render_version: SOURCE_RENDER_VERSION.to_string(),
        source_template_hash: template_hash(SOURCE_RENDER_VERSION, SOURCE_TEMPLATE, &signature),
    }
}

/// Output paths under one output directory.
struct Layout<'a> {
    cards: PathBuf,
    wrappers: PathBuf,
    sources: PathBuf,
    extension: &'a str,
}

impl<'a> Layout<'a> {
    fn new(output_dir: &Path, extension: &'a str) -> Self {
        Self {
            cards: output_dir.join(CARDS_DIR),
            wrappers: output_dir.join(WRAPPERS_DIR),
            sources: output_dir.join(SOURCES_DIR),
            extension,
        }
    }

    fn card(&self, id: &str, extension: &str) -> PathBuf {
        self.cards.join(format!("{id}.{extension}"))
    }

    fn wrapper_dir(&self, id: &str) -> PathBuf {
        self.wrappers.join(id)
    }

    fn source_dir(&self, domain: &str, slug: &str) -> PathBuf {
        self.sources.join(domain).join(slug)
    }

    fn exists(&self, artifact: Artifact<'_>) -> bool {
        match artifact {
            Artifact::Card(id) => self.card(id, self.extension).is_file(),
            Artifact::Wrapper(id) => self.wrapper_dir(id).join(PAGE_FILE).is_file(),
            Artifact::Source { domain, slug } => {
                self.source_dir(domain, slug).join(PAGE_FILE).is_file()
            }
        }
    }

    fn clean(&self) -> Result<(), BuildError> {
        for dir in [&self.cards, &self.wrappers, &self.sources] {
            remove_dir_if_exists(dir)?;
        }
        Ok(())
    }
}

fn send(events: Option<&Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Bring `output_dir` up to date with `quotes`.
pub fn build(
    quotes: &[Quote],
    output_dir: &Path,
    config: &BuildConfig,
    backend: &dyn CardBackend,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildOutcome, BuildError> {
    let events = events.as_ref();
    let layout = Layout::new(output_dir, backend.extension());
    let mut stats = BuildStats {
        quotes: quotes.len(),
        ..BuildStats::default()
    };

    // Force never reads the old manifest, so it also gets past a corrupt one.
    let previous = if config.force {
        tracing::info!("force rebuild, wiping outputs");
        layout.clean()?;
        Manifest::remove(output_dir)?;
        send(events, BuildEvent::Cleaned);
        Manifest::empty()
    } else {
        Manifest::load(output_dir)?
    };

    if quotes.is_empty() {
        tracing::info!("no quotes, wiping outputs");
        layout.clean()?;
        Manifest::remove(output_dir)?;
        if !config.force {
            send(events, BuildEvent::Cleaned);
        }
        return Ok(BuildOutcome {
            stats,
            manifest: Manifest::empty(),
        });
    }

    let globals = globals(backend, config);
    let plan = plan::compute(&previous, &globals, quotes, config, |a| layout.exists(a));

    for dir in [&layout.cards, &layout.wrappers, &layout.sources] {
        fs::create_dir_all(dir).at(dir)?;
    }

    // Cards under a previous format would otherwise linger forever.
    if let Some(old) = &plan.changes.stale_card_extension {
        tracing::info!(from = %old, to = layout.extension, "card format changed");
        for id in previous.quotes.keys() {
            remove_file_if_exists(&layout.card(id, old))?;
        }
    }

    let previous_extension = if previous.globals.card_extension.is_empty() {
        layout.extension
    } else {
        previous.globals.card_extension.as_str()
    };
    for removed in &plan.removed {
        tracing::debug!(id = %removed.id, "removing outputs of deleted quote");
        if remove_file_if_exists(&layout.card(&removed.id, previous_extension))? {
            stats.cards_removed += 1;
        }
        if remove_dir_if_exists(&layout.wrapper_dir(&removed.id))? {
            stats.wrappers_removed += 1;
        }
        send(
            events,
            BuildEvent::QuoteRemoved {
                id: removed.id.clone(),
            },
        );
    }

    let card = CardInfo::of(backend);

    quotes
        .par_iter()
        .filter(|q| plan.cards.contains(&q.id))
        .try_for_each(|quote| -> Result<(), BuildError> {
            let bytes = backend.render(&quote.text).map_err(|source| BuildError::Card {
                id: quote.id.clone(),
                source,
            })?;
            let path = layout.card(&quote.id, layout.extension);
            fs::write(&path, bytes).at(&path)?;
            send(events, BuildEvent::CardRendered { id: quote.id.clone() });
            Ok(())
        })?;
    stats.cards_rendered = plan.cards.len();

    quotes
        .par_iter()
        .filter(|q| plan.wrappers.contains(&q.id))
        .try_for_each(|quote| -> Result<(), BuildError> {
            let dir = layout.wrapper_dir(&quote.id);
            fs::create_dir_all(&dir).at(&dir)?;
            let path = dir.join(PAGE_FILE);
            fs::write(&path, pages::wrapper_page(quote, config, card)).at(&path)?;
            send(events, BuildEvent::WrapperRendered { id: quote.id.clone() });
            Ok(())
        })?;
    stats.wrappers_rendered = plan.wrappers.len();

    // Barrier: every per-quote artifact is on disk before groups are assembled.
    let groups = pages::group_quotes(quotes);
    let (render, delete): (Vec<_>, Vec<_>) = plan
        .groups
        .iter()
        .partition(|(key, _)| groups.contains_key(key.as_str()));

    for (_, location) in &delete {
        if remove_source_group(&layout, location)? {
            stats.source_pages_removed += 1;
            send(
                events,
                BuildEvent::SourcePageRemoved {
                    domain: location.domain.clone(),
                    slug: location.slug.clone(),
                },
            );
        }
    }

    render
        .par_iter()
        .filter_map(|(key, _)| groups.get(key.as_str()))
        .try_for_each(|group| -> Result<(), BuildError> {
            let dir = layout.source_dir(&group.domain, &group.slug);
            fs::create_dir_all(&dir).at(&dir)?;
            let path = dir.join(PAGE_FILE);
            fs::write(&path, pages::source_page(group, config, card)).at(&path)?;
            send(
                events,
                BuildEvent::SourcePageRendered {
                    domain: group.domain.clone(),
                    slug: group.slug.clone(),
                    quotes: group.quotes.len(),
                },
            );
            Ok(())
        })?;
    stats.source_pages_rendered = render.len();

    let mut manifest = Manifest::new(globals, plan.entries);
    manifest.save(output_dir)?;
    tracing::info!(%stats, "build finished");

    Ok(BuildOutcome { stats, manifest })
}

/// Delete a group's page directory, then its domain directory if that left it
/// empty. Returns whether a page was removed.
fn remove_source_group(layout: &Layout<'_>, location: &GroupLocation) -> Result<bool, BuildError> {
    if location.domain.is_empty() || location.slug.is_empty() {
        return Ok(false);
    }
    let removed = remove_dir_if_exists(&layout.source_dir(&location.domain, &location.slug))?;
    let domain_dir = layout.sources.join(&location.domain);
    if domain_dir.is_dir() && fs::read_dir(&domain_dir).at(&domain_dir)?.next().is_none() {
        fs::remove_dir(&domain_dir).at(&domain_dir)?;
    }
    Ok(removed)
}

fn remove_file_if_exists(path: &Path) -> Result<bool, BuildError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).at(path),
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<bool, BuildError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).at(path),
    }
}
