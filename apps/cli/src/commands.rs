//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use annorelay_core::payload::{DeliveryPayload, SHEET_HEADERS};
use annorelay_core::pipeline::{Extractor, ExtractorConfig, Outcome};
use annorelay_shared::{
    AnnoRelayError, AppConfig, DeliveryConfig, ItemKey, OversizePolicy, SheetConfig,
    config_file_path, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// annorelay: categorized Zotero highlights for chat and spreadsheets.
#[derive(Parser)]
#[command(
    name = "annorelay",
    version,
    about = "Extract Zotero highlights by color category for delivery to chat or spreadsheets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.annorelay/annorelay.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to zotero.sqlite, overriding the config file.
    #[arg(long, env = "ANNORELAY_DB", global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the per-category delivery payload for an attachment key.
    Extract {
        /// Zotero attachment key (e.g. RFCM2DHI).
        key: String,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Maximum characters per segment.
        #[arg(long)]
        max_length: Option<usize>,

        /// Truncate over-long highlights instead of sending them whole.
        #[arg(long)]
        truncate: bool,
    },

    /// Print the spreadsheet row for an attachment key.
    Row {
        /// Zotero attachment key.
        key: String,

        /// Emit JSON instead of tab-separated values.
        #[arg(long)]
        json: bool,
    },

    /// List the raw highlight colors of an attachment and how they classify.
    Colors {
        /// Zotero attachment key.
        key: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "annorelay=info",
        1 => "annorelay=debug",
        _ => "annorelay=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Extract {
            key,
            json,
            max_length,
            truncate,
        } => cmd_extract(&config, &key, json, max_length, truncate).await,
        Command::Row { key, json } => cmd_row(&config, &key, json).await,
        Command::Colors { key } => cmd_colors(&config, &key).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

/// Load the config file, then apply CLI overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(db) = &cli.db {
        config.store.path = db.to_string_lossy().to_string();
    }
    Ok(config)
}

/// Surface a request failure with its category, e.g. `[not_found] ...`.
fn request_error(err: AnnoRelayError) -> Report {
    eyre!("[{}] {err}", err.kind())
}

fn extractor(config: &AppConfig) -> Result<Extractor> {
    Ok(Extractor::new(ExtractorConfig::from_app_config(config)?))
}

async fn cmd_extract(
    config: &AppConfig,
    key: &str,
    json: bool,
    max_length: Option<usize>,
    truncate: bool,
) -> Result<()> {
    let key = ItemKey::new(key)?;
    let mut delivery = DeliveryConfig::from(config);
    if let Some(max) = max_length {
        if max == 0 {
            return Err(eyre!("--max-length must be positive"));
        }
        delivery.max_length = max;
    }
    if truncate {
        delivery.oversize = OversizePolicy::Truncate;
    }

    info!(%key, max_length = delivery.max_length, "extracting highlights");
    let extraction = extractor(config)?
        .extract(&key)
        .await
        .map_err(request_error)?;

    if extraction.outcome() == Outcome::NoAnnotations {
        println!("No categorized highlights found for {key}.");
        return Ok(());
    }

    let payload = extraction.delivery_payload(&delivery);
    info!(
        categories = payload.entries.len(),
        segments = payload.segment_count(),
        "payload ready"
    );
    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_payload(&payload);
    }
    Ok(())
}

fn print_payload(payload: &DeliveryPayload) {
    for entry in &payload.entries {
        println!("== {}", entry.intro);
        for (i, segment) in entry.segments.iter().enumerate() {
            if i > 0 {
                println!("--");
            }
            println!("{}", segment.text);
        }
        println!();
    }
    if let Some(note) = payload.oversize_note() {
        println!("note: {note}");
    }
}

async fn cmd_row(config: &AppConfig, key: &str, json: bool) -> Result<()> {
    let key = ItemKey::new(key)?;
    info!(%key, "building spreadsheet row");
    let extraction = extractor(config)?
        .extract(&key)
        .await
        .map_err(request_error)?;

    let row = extraction.sheet_row(&SheetConfig::from(config));
    if json {
        println!("{}", serde_json::to_string_pretty(&row)?);
    } else {
        println!("{}", SHEET_HEADERS.join("\t"));
        let cells: Vec<String> = row
            .to_cells()
            .iter()
            .map(|c| c.replace('\t', " ").replace('\n', "\\n"))
            .collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}

async fn cmd_colors(config: &AppConfig, key: &str) -> Result<()> {
    let key = ItemKey::new(key)?;
    let extractor = extractor(config)?;
    let report = extractor.color_report(&key).await.map_err(request_error)?;

    if report.is_empty() {
        println!("No highlights found for {key}.");
        return Ok(());
    }

    println!(
        "policy: {:?}, overrides: {} v{}",
        extractor.classifier().policy(),
        extractor.classifier().overrides().name,
        extractor.classifier().overrides().version
    );
    for line in report {
        let color = line.color.as_deref().unwrap_or("<null>");
        let target = match (line.bucket, line.category) {
            (Some(bucket), Some(category)) => format!("{bucket} -> {category}"),
            _ => "unclassified (dropped)".to_string(),
        };
        println!("  {color:<10} {:>5} hits  {target}", line.hits);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    let created = init_config()?;
    println!("Created default config at {}", created.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
