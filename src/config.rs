//! Build configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Stock defaults (the values shown below).
//! 2. `quote-cards.toml` in the working directory, or the file given with
//!    `--config`. Sparse: override only what you need.
//! 3. Environment / CLI flags for the per-deploy values: `BASE_PATH`,
//!    `SITE_ORIGIN`, `CARD_VERSION`, `QUOTE_CARDS_FORCE`.
//!
//! The environment is read once in `main` and resolved into a [`BuildConfig`]
//! that is passed down explicitly. Nothing below `main` reads env vars.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! base_path = ""            # Prefix for every emitted link ("/quotes")
//! site_origin = ""          # Scheme + host for absolute URLs (og:image)
//!
//! [cards]
//! format = "jpeg"           # jpeg | png | webp | avif
//! quality = 88              # Lossy quality (1-100), JPEG and AVIF only
//! width = 1200
//! height = 628
//! padding_x = 150
//! padding_y = 120
//! font_max = 72             # Largest font size tried
//! font_min = 36             # Smallest, and fallback on overflow
//! font_step = 2
//! line_height = 1.32
//! # font = "fonts/Serif.ttf" # TTF/OTF face; omit for bundled DejaVu Sans
//! background = "#f7f4ec"
//! foreground = "#26211a"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys and sections are errors, so a misspelled option never passes silently.

use crate::card::{CardFormat, CardParams, Quality, Rgb};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "quote-cards.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `quote-cards.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Link prefixes for the deployed site.
    pub site: SiteConfig,
    /// Card canvas, typography, and encoding.
    pub cards: CardsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cards.card_params().map(|_| ())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub base_path: String,
    pub site_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardsConfig {
    pub format: CardFormat,
    pub quality: u32,
    pub width: u32,
    pub height: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub font_max: u32,
    pub font_min: u32,
    pub font_step: u32,
    pub line_height: f32,
    /// Path to a TTF/OTF font replacing the bundled DejaVu Sans. Relative
    /// paths resolve against the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
    pub background: String,
    pub foreground: String,
}

impl Default for CardsConfig {
    fn default() -> Self {
        let params = CardParams::default();
        Self {
            format: params.format,
            quality: params.quality.value(),
            width: params.width,
            height: params.height,
            padding_x: params.padding_x,
            padding_y: params.padding_y,
            font_max: params.font_max,
            font_min: params.font_min,
            font_step: params.font_step,
            line_height: params.line_height,
            font: None,
            background: params.background.to_hex(),
            foreground: params.foreground.to_hex(),
        }
    }
}

impl CardsConfig {
    /// Check ranges and build the renderer parameters.
    pub fn card_params(&self) -> Result<CardParams, ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(msg.into()));

        if !(1..=100).contains(&self.quality) {
            return invalid("cards.quality must be 1-100");
        }
        if self.width == 0 || self.height == 0 {
            return invalid("cards.width and cards.height must be non-zero");
        }
        if self.padding_x.saturating_mul(2) >= self.width
            || self.padding_y.saturating_mul(2) >= self.height
        {
            return invalid("cards padding leaves no room for text");
        }
        if self.font_min == 0 || self.font_step == 0 {
            return invalid("cards.font_min and cards.font_step must be non-zero");
        }
        if self.font_min > self.font_max {
            return invalid("cards.font_min must not exceed cards.font_max");
        }
        if !(self.line_height.is_finite() && self.line_height > 0.0) {
            return invalid("cards.line_height must be positive");
        }
        let color = |name: &str, value: &str| {
            Rgb::parse_hex(value).ok_or_else(|| {
                ConfigError::Validation(format!("cards.{name} must be #rrggbb, got {value:?}"))
            })
        };

        Ok(CardParams {
            format: self.format,
            quality: Quality::new(self.quality),
            width: self.width,
            height: self.height,
            padding_x: self.padding_x,
            padding_y: self.padding_y,
            font_max: self.font_max,
            font_min: self.font_min,
            font_step: self.font_step,
            line_height: self.line_height,
            background: color("background", &self.background)?,
            foreground: color("foreground", &self.foreground)?,
        })
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Per-run settings handed to the build orchestrator.
///
/// Built once from the config file plus environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    /// `""` or `/prefix`, never with a trailing slash.
    pub base_path: String,
    /// `""` or `scheme://host[:port]`, never with a trailing slash.
    pub site_origin: String,
    /// Cache-bust token. Empty input is normalized to `None`.
    pub card_version: Option<String>,
    /// Wipe outputs and ignore the manifest.
    pub force: bool,
}

impl BuildConfig {
    /// Combine `[site]` with overrides. An override of `Some("")` clears the
    /// file value.
    pub fn resolve(
        site: &SiteConfig,
        base_path: Option<&str>,
        site_origin: Option<&str>,
        card_version: Option<&str>,
        force: bool,
    ) -> Result<Self, ConfigError> {
        let site_origin = normalize_origin(site_origin.unwrap_or(&site.site_origin));
        if !site_origin.is_empty() {
            let parsed = url::Url::parse(&site_origin).map_err(|e| {
                ConfigError::Validation(format!("site_origin {site_origin:?}: {e}"))
            })?;
            if parsed.host_str().is_none() {
                return Err(ConfigError::Validation(format!(
                    "site_origin {site_origin:?} has no host"
                )));
            }
        }
        Ok(Self {
            base_path: normalize_base_path(base_path.unwrap_or(&site.base_path)),
            site_origin,
            // Opaque token: only the empty string means unset.
            card_version: card_version.filter(|v| !v.is_empty()).map(String::from),
            force,
        })
    }
}

/// `"blog/"` → `"/blog"`, `"/"` → `""`.
fn normalize_base_path(value: &str) -> String {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn normalize_origin(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Built-in defaults as a TOML table, the bottom layer every user file is
/// merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Deep-merge `overlay` onto `base`. Tables merge per key; any other overlay
/// value replaces the base value outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// `Ok(None)` when the file is absent; a present but malformed file is an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// With `Some(path)` the file must exist. With `None`,
/// [`DEFAULT_CONFIG_FILE`] is used if present, stock defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let overlay = match path {
        Some(path) => Some(
            load_raw_config(path)?.ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?,
        ),
        None => load_raw_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `quote-cards.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Quote Cards Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
# Prefix for every link the build emits, e.g. "/quotes" when the site is
# served from a subdirectory. Overridden by the BASE_PATH environment variable.
base_path = ""

# Scheme and host used to build absolute URLs (og:image), e.g.
# "https://quotes.example.com". Overridden by SITE_ORIGIN.
site_origin = ""

# ---------------------------------------------------------------------------
# Cards
# ---------------------------------------------------------------------------
[cards]
# Output format: "jpeg", "png", "webp" (lossless), or "avif".
format = "jpeg"

# Encoding quality for jpeg and avif (1 = worst, 100 = best).
quality = 88

# Canvas size in pixels. 1200x628 is the common social preview size.
width = 1200
height = 628

# Space kept free around the text block.
padding_x = 150
padding_y = 120

# Font sizes tried from font_max down to font_min in font_step increments.
# The first size whose wrapped text fits is used; text that does not fit even
# at font_min is drawn at font_min and allowed to overflow.
font_max = 72
font_min = 36
font_step = 2

# Line advance as a multiple of the font size.
line_height = 1.32

# TTF/OTF face used to measure and draw text. Omit to use the bundled
# DejaVu Sans. The font bytes are part of the card fingerprint.
# font = "fonts/AtkinsonHyperlegible-Regular.ttf"

background = "#f7f4ec"
foreground = "#26211a"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
