//! End-to-end builds through the public API: load quotes from a content
//! directory, build into an output directory, edit, and build again.
//!
//! Uses the real raster backend (PNG, bundled font) on a small canvas so every
//! card is actually encoded and decoded.

use quote_cards::build::{self, BuildOutcome};
use quote_cards::card::{CardBackend, CardFormat, CardParams, RasterBackend};
use quote_cards::config::BuildConfig;
use quote_cards::content;
use quote_cards::manifest::{Manifest, manifest_path};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn params() -> CardParams {
    CardParams {
        format: CardFormat::Png,
        width: 600,
        height: 314,
        padding_x: 60,
        padding_y: 50,
        font_max: 40,
        font_min: 20,
        font_step: 4,
        ..CardParams::default()
    }
}

fn backend() -> RasterBackend {
    RasterBackend::new(params(), None).unwrap()
}

fn write(dir: &Path, id: &str, extra: &str) {
    let body = format!(
        "---\nid: {id}\nquote: \"The words of {id}.\"\nname: Jane Doe\n{extra}\n---\n"
    );
    fs::write(dir.join(format!("{id}.md")), body).unwrap();
}

fn build_dir(content_dir: &Path, out: &Path, config: &BuildConfig) -> BuildOutcome {
    let loaded = content::load(content_dir).unwrap();
    assert!(!loaded.has_errors(), "{:?}", loaded.errors);
    build::build(&loaded.quotes, out, config, &backend(), None).unwrap()
}

fn plain() -> BuildConfig {
    BuildConfig::default()
}

struct Site {
    _tmp: TempDir,
    content: std::path::PathBuf,
    out: std::path::PathBuf,
}

impl Site {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("quotes");
        let out = tmp.path().join("dist");
        fs::create_dir_all(&content).unwrap();
        Site {
            _tmp: tmp,
            content,
            out,
        }
    }

    fn build(&self) -> BuildOutcome {
        build_dir(&self.content, &self.out, &plain())
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.out.join(rel)).unwrap()
    }
}

/// Two quotes from one article (URLs differ only by slash and fragment) and
/// one from another site.
fn seed(site: &Site) {
    write(
        &site.content,
        "first",
        "url: https://blog.example/posts/deep-work/\narticle_title: Deep Work\ncreated_at: 2024-01-01",
    );
    write(
        &site.content,
        "second",
        "url: https://blog.example/posts/deep-work#part-2\ncreated_at: 2024-03-01",
    );
    write(&site.content, "other", "url: https://elsewhere.example/");
}

#[test]
fn first_build_writes_cards_pages_and_manifest() {
    let site = Site::new();
    seed(&site);

    let outcome = site.build();

    assert_eq!(outcome.stats.cards_rendered, 3);
    assert_eq!(outcome.stats.wrappers_rendered, 3);
    assert_eq!(outcome.stats.source_pages_rendered, 2);
    assert!(manifest_path(&site.out).exists());

    let card = image::open(site.out.join("cards/first.png")).unwrap();
    assert_eq!((card.width(), card.height()), (600, 314));

    let wrapper = site.read("q/first/index.html");
    assert!(wrapper.contains("The words of first."));
    assert!(wrapper.contains("/cards/first.png"));
    assert!(site.out.join("sources/elsewhere.example/index/index.html").exists());
}

#[test]
fn rebuild_without_changes_renders_nothing() {
    let site = Site::new();
    seed(&site);
    let first = site.build();

    let second = site.build();

    assert_eq!(second.stats.rendered(), 0);
    assert_eq!(second.stats.removed(), 0);
    assert_eq!(
        first.manifest.without_timestamp(),
        second.manifest.without_timestamp()
    );
}

#[test]
fn equivalent_urls_share_one_source_page_newest_first() {
    let site = Site::new();
    seed(&site);
    site.build();

    let page = site.read("sources/blog.example/posts-deep-work/index.html");
    let second = page.find("/q/second/").unwrap();
    let first = page.find("/q/first/").unwrap();
    assert!(second < first, "newer quote should be listed first");
    assert!(page.contains("Deep Work \u{2014} blog.example"));
}

#[test]
fn title_edit_rerenders_pages_but_not_card() {
    let site = Site::new();
    seed(&site);
    site.build();
    let card_before = fs::read(site.out.join("cards/first.png")).unwrap();

    write(
        &site.content,
        "first",
        "url: https://blog.example/posts/deep-work/\narticle_title: Deep Work, Revised\ncreated_at: 2024-01-01",
    );
    let outcome = site.build();

    assert_eq!(outcome.stats.cards_rendered, 0);
    assert_eq!(outcome.stats.wrappers_rendered, 1);
    assert_eq!(outcome.stats.source_pages_rendered, 1);
    assert_eq!(fs::read(site.out.join("cards/first.png")).unwrap(), card_before);
    assert!(site.read("q/first/index.html").contains("Deep Work, Revised"));
}

#[test]
fn text_edit_rerenders_card_wrapper_and_group() {
    let site = Site::new();
    seed(&site);
    site.build();

    fs::write(
        site.content.join("other.md"),
        "---\nid: other\nquote: \"Something else entirely.\"\nname: Jane Doe\nurl: https://elsewhere.example/\n---\n",
    )
    .unwrap();
    let outcome = site.build();

    assert_eq!(outcome.stats.cards_rendered, 1);
    assert_eq!(outcome.stats.wrappers_rendered, 1);
    assert_eq!(outcome.stats.source_pages_rendered, 1);
}

#[test]
fn cache_bust_token_rerenders_every_wrapper() {
    let site = Site::new();
    seed(&site);
    site.build();

    let bumped = BuildConfig {
        card_version: Some("v2".into()),
        ..plain()
    };
    let outcome = build_dir(&site.content, &site.out, &bumped);

    assert_eq!(outcome.stats.wrappers_rendered, 3);
    assert_eq!(outcome.stats.cards_rendered, 0);
    assert!(site.read("q/other/index.html").contains("/cards/other.png?v=v2"));
}

#[test]
fn removing_a_quote_cleans_up_after_it() {
    let site = Site::new();
    seed(&site);
    site.build();

    fs::remove_file(site.content.join("second.md")).unwrap();
    fs::remove_file(site.content.join("other.md")).unwrap();
    let outcome = site.build();

    assert_eq!(outcome.stats.cards_removed, 2);
    assert_eq!(outcome.stats.wrappers_removed, 2);
    assert_eq!(outcome.stats.source_pages_rendered, 1);
    assert_eq!(outcome.stats.source_pages_removed, 1);
    assert!(!site.out.join("cards/second.png").exists());
    assert!(!site.out.join("q/other").exists());
    assert!(!site.out.join("sources/elsewhere.example").exists());

    let page = site.read("sources/blog.example/posts-deep-work/index.html");
    assert!(page.contains("/q/first/"));
    assert!(!page.contains("/q/second/"));
}

#[test]
fn forced_and_incremental_builds_agree() {
    let incremental = Site::new();
    write(&incremental.content, "first", "url: https://blog.example/a");
    incremental.build();
    seed(&incremental);
    let a = incremental.build();

    let forced = Site::new();
    seed(&forced);
    let force = BuildConfig {
        force: true,
        ..plain()
    };
    let b = build_dir(&forced.content, &forced.out, &force);

    assert_eq!(a.manifest.without_timestamp(), b.manifest.without_timestamp());
}

#[test]
fn emptied_content_wipes_output() {
    let site = Site::new();
    seed(&site);
    site.build();

    for id in ["first", "second", "other"] {
        fs::remove_file(site.content.join(format!("{id}.md"))).unwrap();
    }
    let outcome = site.build();

    assert_eq!(outcome.manifest, Manifest::empty());
    assert!(!manifest_path(&site.out).exists());
    assert!(!site.out.join("cards").exists());
    assert!(!site.out.join("sources").exists());
}

#[test]
fn invalid_content_is_reported_before_any_write() {
    let site = Site::new();
    seed(&site);
    fs::write(
        site.content.join("broken.md"),
        "---\nid: first\nquote: dup\nname: x\nurl: not a url\n---\n",
    )
    .unwrap();

    let loaded = content::load(&site.content).unwrap();

    assert!(loaded.has_errors());
    assert!(!site.out.exists());
}

#[test]
fn long_text_still_renders_a_fixed_size_card() {
    let backend = backend();
    let short = backend.layout("Brief.");
    assert_eq!(short.size, 40);
    assert!(short.fits);

    let long = "an unreasonably long quotation ".repeat(40);
    let layout = backend.layout(&long);
    assert!(!layout.fits);
    assert_eq!(layout.size, 20);

    let bytes = backend.render(&long).unwrap();
    let card = image::load_from_memory(&bytes).unwrap();
    assert_eq!((card.width(), card.height()), (600, 314));
}
