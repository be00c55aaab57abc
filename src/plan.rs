//! Dirty-set computation.
//!
//! Compares fresh fingerprints against the previous manifest and decides, per
//! artifact, whether it has to be written again. No I/O happens here; the
//! only view of the output tree is the `exists` probe the caller passes in,
//! so the whole decision table is unit testable.
//!
//! ## Rules
//!
//! | Artifact | Dirty when |
//! |---|---|
//! | card | no previous entry, card renderer changed, card fingerprint differs, file missing |
//! | wrapper | no previous entry, wrapper version or template changed, cache-bust token changed, wrapper fingerprint differs, file missing |
//! | group | any member's group-item fingerprint or group key changed, any member new, source version or template changed, a former member removed or moved away, page missing |
//!
//! Removed records are looked up through the *previous* manifest, which is
//! the only place that still knows which group they belonged to.

use crate::config::BuildConfig;
use crate::content::Quote;
use crate::fingerprint;
use crate::manifest::{Globals, Manifest, QuoteEntry};
use std::collections::{BTreeMap, BTreeSet};

/// An output file the planner may ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact<'a> {
    /// `cards/<id>.<ext>` with the current extension.
    Card(&'a str),
    /// `q/<id>/index.html`.
    Wrapper(&'a str),
    /// `sources/<domain>/<slug>/index.html`.
    Source { domain: &'a str, slug: &'a str },
}

/// Which global fingerprints moved since the last build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalChanges {
    pub card_render: bool,
    pub wrapper_render: bool,
    pub wrapper_template: bool,
    pub card_version: bool,
    pub source_render: bool,
    pub source_template: bool,
    /// Extension cards were previously written with, when it differs from
    /// the current one. Those files are orphans.
    pub stale_card_extension: Option<String>,
}

impl GlobalChanges {
    pub fn between(previous: &Globals, next: &Globals) -> Self {
        let stale_card_extension = (!previous.card_extension.is_empty()
            && previous.card_extension != next.card_extension)
            .then(|| previous.card_extension.clone());
        Self {
            card_render: previous.card_render_version != next.card_render_version
                || previous.card_render_hash != next.card_render_hash,
            wrapper_render: previous.wrapper_render_version != next.wrapper_render_version,
            wrapper_template: previous.wrapper_template_hash != next.wrapper_template_hash,
            card_version: previous.card_version != next.card_version,
            source_render: previous.source_render_version != next.source_render_version,
            source_template: previous.source_template_hash != next.source_template_hash,
            stale_card_extension,
        }
    }

    fn wrappers(&self) -> bool {
        self.wrapper_render || self.wrapper_template || self.card_version
    }

    fn sources(&self) -> bool {
        self.source_render || self.source_template
    }
}

/// Where a group's page lives. Kept for groups that may have no members left.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupLocation {
    pub domain: String,
    pub slug: String,
}

/// A record present in the previous manifest but not in the current input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub id: String,
    pub entry: QuoteEntry,
}

/// Everything the orchestrator needs to do for one build.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub changes: GlobalChanges,
    /// Ids whose card must be rendered.
    pub cards: BTreeSet<String>,
    /// Ids whose wrapper page must be rendered.
    pub wrappers: BTreeSet<String>,
    /// Group keys whose source page must be rendered or deleted.
    pub groups: BTreeMap<String, GroupLocation>,
    pub removed: Vec<Removed>,
    /// Per-record entries of the next manifest, current records only.
    pub entries: BTreeMap<String, QuoteEntry>,
}

impl Plan {
    /// `true` when nothing has to be written or deleted.
    pub fn is_noop(&self) -> bool {
        self.cards.is_empty()
            && self.wrappers.is_empty()
            && self.groups.is_empty()
            && self.removed.is_empty()
            && self.changes.stale_card_extension.is_none()
    }
}

/// Fingerprints of one record, as stored in the manifest.
pub fn entry_for(quote: &Quote, config: &BuildConfig) -> QuoteEntry {
    QuoteEntry {
        card_hash: fingerprint::card_hash(quote),
        wrapper_hash: fingerprint::wrapper_hash(quote, config),
        group_item_hash: fingerprint::group_item_hash(quote, config),
        group_key: quote.group_key(),
        source_domain: quote.source_domain.clone(),
        article_slug: quote.article_slug.clone(),
    }
}

/// Work out what is stale.
///
/// `previous` is the manifest from the last successful build, or
/// [`Manifest::empty`] for a full rebuild. `exists` reports whether an
/// artifact is still on disk; an artifact that is up to date by fingerprint
/// but missing is rebuilt anyway.
pub fn compute(
    previous: &Manifest,
    globals: &Globals,
    quotes: &[Quote],
    config: &BuildConfig,
    exists: impl Fn(Artifact<'_>) -> bool,
) -> Plan {
    let changes = GlobalChanges::between(&previous.globals, globals);
    let mut plan = Plan {
        changes,
        ..Plan::default()
    };

    for quote in quotes {
        let entry = entry_for(quote, config);
        let prev = previous.quotes.get(&quote.id);
        let id = quote.id.as_str();

        let card_stale = plan.changes.card_render
            || prev.is_none_or(|p| p.card_hash != entry.card_hash);
        if card_stale || !exists(Artifact::Card(id)) {
            plan.cards.insert(quote.id.clone());
        }

        let wrapper_stale = plan.changes.wrappers()
            || prev.is_none_or(|p| p.wrapper_hash != entry.wrapper_hash);
        if wrapper_stale || !exists(Artifact::Wrapper(id)) {
            plan.wrappers.insert(quote.id.clone());
        }

        let group_stale = plan.changes.sources()
            || prev.is_none_or(|p| {
                p.group_item_hash != entry.group_item_hash || p.group_key != entry.group_key
            });
        let page_missing = !exists(Artifact::Source {
            domain: &quote.source_domain,
            slug: &quote.article_slug,
        });
        if group_stale || page_missing {
            plan.groups
                .entry(entry.group_key.clone())
                .or_insert_with(|| location(&entry));
        }

        // A record that moved leaves a hole in its old group.
        if let Some(p) = prev.filter(|p| p.group_key != entry.group_key) {
            plan.groups
                .entry(p.group_key.clone())
                .or_insert_with(|| location(p));
        }

        plan.entries.insert(quote.id.clone(), entry);
    }

    for (id, entry) in &previous.quotes {
        if plan.entries.contains_key(id) {
            continue;
        }
        plan.groups
            .entry(entry.group_key.clone())
            .or_insert_with(|| location(entry));
        plan.removed.push(Removed {
            id: id.clone(),
            entry: entry.clone(),
        });
    }

    tracing::debug!(
        cards = plan.cards.len(),
        wrappers = plan.wrappers.len(),
        groups = plan.groups.len(),
        removed = plan.removed.len(),
        "dirty sets computed"
    );
    plan
}

fn location(entry: &QuoteEntry) -> GroupLocation {
    GroupLocation {
        domain: entry.source_domain.clone(),
        slug: entry.article_slug.clone(),
    }
}
