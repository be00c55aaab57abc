use clap::{Parser, Subcommand};
use quote_cards::card::RasterBackend;
use quote_cards::config::{self, BuildConfig};
use quote_cards::{build, content, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("QC_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("QC_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "quote-cards")]
#[command(about = "Incremental builder for quote cards and quote pages")]
#[command(long_about = "\
Incremental builder for quote cards and quote pages

Every Markdown file under the content directory holds one quote as YAML
front matter. Each quote becomes a card image, a wrapper page, and an entry
on the source page of the article it came from. Only what changed since the
last build is rendered again.

Content structure:

  quotes/
  ├── 2024/
  │   └── on-writing.md
  └── misc.md

  ---
  id: on-writing                  # required, unique, used in output paths
  quote: \"Writing is thinking.\"   # required
  name: Jane Doe                  # required
  url: https://example.com/essays/writing/   # required
  article_title: On Writing       # optional
  source_domain: example.com      # optional, defaults to the URL host
  created_at: 2024-05-01          # optional, orders source pages
  tags: [writing]                 # optional
  ---
  Optional markdown commentary, shown on the source page.

Output:

  dist/
  ├── cards/<id>.jpg
  ├── q/<id>/index.html
  └── sources/<domain>/<slug>/index.html

Run 'quote-cards gen-config' to generate a documented quote-cards.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "quotes", global = true)]
    content: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Config file (default: quote-cards.toml, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Prefix for every emitted link, e.g. /quotes
    #[arg(long, env = "BASE_PATH", global = true)]
    base_path: Option<String>,

    /// Scheme and host for absolute URLs, e.g. https://quotes.example.com
    #[arg(long, env = "SITE_ORIGIN", global = true)]
    site_origin: Option<String>,

    /// Cache-bust token appended to card URLs
    #[arg(long, env = "CARD_VERSION", global = true)]
    card_version: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load quotes and bring the output directory up to date
    Build {
        /// Wipe all outputs and the manifest, then rebuild everything
        #[arg(long, env = "QUOTE_CARDS_FORCE")]
        force: bool,
    },
    /// Validate quotes without writing anything
    Check,
    /// Print a stock quote-cards.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Build { force } => {
            let config = config::load_config(cli.config.as_deref())?;
            let build_config = BuildConfig::resolve(
                &config.site,
                cli.base_path.as_deref(),
                cli.site_origin.as_deref(),
                cli.card_version.as_deref(),
                force,
            )?;

            println!("==> Stage 1: Loading {}", cli.content.display());
            let loaded = content::load(&cli.content)?;
            log_warnings(&loaded);
            output::print_load_report(&loaded);
            if loaded.has_errors() {
                return Err(format!(
                    "{} invalid quote file(s), nothing was built",
                    loaded.errors.len()
                )
                .into());
            }

            println!("==> Stage 2: Building \u{2192} {}", cli.output.display());
            init_thread_pool(&config.processing);
            let backend = RasterBackend::from_font_file(
                config.cards.card_params()?,
                config.cards.font.as_deref(),
            )?;
            if let Some(font) = &config.cards.font {
                println!("    Card font: {}", font.display());
            }

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = build::build(
                &loaded.quotes,
                &cli.output,
                &build_config,
                &backend,
                Some(tx),
            );
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let outcome = result?;
            output::print_build_stats(&outcome.stats);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.content.display());
            let loaded = content::load(&cli.content)?;
            log_warnings(&loaded);
            output::print_load_report(&loaded);
            if loaded.has_errors() {
                return Err(format!("{} invalid quote file(s)", loaded.errors.len()).into());
            }
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `error`). Loader
/// warnings are already part of the printed report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn log_warnings(loaded: &content::LoadResult) {
    for warning in &loaded.warnings {
        tracing::warn!(location = %warning.location, "{}", warning.message);
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
