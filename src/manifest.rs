//! Build manifest: what the last successful build produced.
//!
//! The manifest records, per quote id, the fingerprint each of its three
//! artifacts was rendered from, plus the global fingerprints (card renderer,
//! templates, cache-bust token) in effect at the time. The next build compares
//! fresh fingerprints against it to decide what is stale.
//!
//! ## Storage
//!
//! `<output_dir>/.build-manifest.json`, pretty-printed JSON with keys in sorted
//! order so two builds of the same content differ only in `generated_at`.
//! It travels with the output directory, so caching `dist/` in CI caches the
//! incremental state too.
//!
//! ## Failure semantics
//!
//! - Missing file: an empty manifest. Its global fingerprints are blank, so
//!   every artifact compares as stale and the build is a full rebuild.
//! - Unknown `version`: also treated as empty (format changed, rebuild).
//! - Unreadable or undecodable file: a hard [`ManifestError`]. Ignoring a
//!   corrupt manifest could skip a rebuild that is actually required.
//! - Saving goes through a temp file and a rename, so a crash mid-write leaves
//!   the previous manifest intact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".build-manifest.json";

/// Version of the manifest format. Bump to force a rebuild everywhere when
/// the format or fingerprint encoding changes.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt manifest {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fingerprints that apply to every record at once.
///
/// A change to any of these invalidates a whole artifact class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Globals {
    /// Cache-bust token appended to card URLs. `None` when unset.
    pub card_version: Option<String>,
    pub card_render_version: String,
    pub card_render_hash: String,
    /// File extension cards were written with (`jpg`, `png`, ...).
    pub card_extension: String,
    pub wrapper_render_version: String,
    pub wrapper_template_hash: String,
    pub source_render_version: String,
    pub source_template_hash: String,
}

/// Per-record fingerprints.
///
/// `group_key`, `source_domain`, and `article_slug` are kept so that once the
/// record is gone, its old source page can still be found and rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEntry {
    pub card_hash: String,
    pub wrapper_hash: String,
    pub group_item_hash: String,
    pub group_key: String,
    pub source_domain: String,
    pub article_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// RFC 3339 timestamp of the last save. Empty on a fresh manifest.
    #[serde(default)]
    pub generated_at: String,
    pub globals: Globals,
    pub quotes: BTreeMap<String, QuoteEntry>,
}

impl Manifest {
    /// A manifest that matches nothing: every artifact will be rebuilt.
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            generated_at: String::new(),
            globals: Globals::default(),
            quotes: BTreeMap::new(),
        }
    }

    pub fn new(globals: Globals, quotes: BTreeMap<String, QuoteEntry>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            generated_at: String::new(),
            globals,
            quotes,
        }
    }

    /// Load the manifest from an output directory.
    pub fn load(output_dir: &Path) -> Result<Self, ManifestError> {
        let path = manifest_path(output_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(source) => return Err(ManifestError::Read { path, source }),
        };
        let manifest: Self = serde_json::from_str(&content)
            .map_err(|source| ManifestError::Decode { path, source })?;
        if manifest.version != MANIFEST_VERSION {
            tracing::info!(
                found = manifest.version,
                expected = MANIFEST_VERSION,
                "manifest version changed, rebuilding everything"
            );
            return Ok(Self::empty());
        }
        Ok(manifest)
    }

    /// Stamp `generated_at` and write atomically to the output directory.
    pub fn save(&mut self, output_dir: &Path) -> Result<(), ManifestError> {
        self.generated_at =
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let json = serde_json::to_string_pretty(self)?;
        let path = manifest_path(output_dir);
        write_atomic(&path, json.as_bytes()).map_err(|source| ManifestError::Write { path, source })
    }

    /// Delete the manifest file. Missing is fine.
    pub fn remove(output_dir: &Path) -> Result<(), ManifestError> {
        let path = manifest_path(output_dir);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ManifestError::Write { path, source }),
        }
    }

    /// The same manifest with the timestamp cleared, for comparisons.
    pub fn without_timestamp(&self) -> Self {
        Self {
            generated_at: String::new(),
            ..self.clone()
        }
    }
}

/// Resolve the manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

/// Write via a sibling temp file and rename, so readers see either the old
/// file or the complete new one.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let tmp = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("manifest"),
        std::process::id()
    ));
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}
