//! annorelay CLI: pull categorized Zotero highlights for one item key.
//!
//! Prints the chat delivery payload, the spreadsheet row, or a color
//! diagnostic for an attachment, reading the local Zotero database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
