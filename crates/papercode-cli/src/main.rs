//! papercode - papers-and-code warehouse ingestion
//!
//! Ingests the papers-with-code catalog, GitHub Archive push events and
//! live-crawled repository dependency manifests into an embedded warehouse.
//! Flows are meant to be driven by an external scheduler (cron expressions
//! under [schedule] in the config); a run is one scheduled invocation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use papercode_core::ProgressContext;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "papercode")]
#[command(about = "Papers-and-code warehouse ingestion pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./papercode.toml or ~/.config/papercode/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daily ingestion pipeline
    Run(cmd::run::RunArgs),
    /// Stage the weekly catalog resources into the object store
    Catalog(cmd::catalog::CatalogArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = ProgressContext::new();
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    papercode_core::init_logging(cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Catalog(args) => cmd::catalog::run(args, &config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Warehouse path",
                &config.warehouse.path.display().to_string(),
            ]);
            table.add_row(vec!["Catalog dataset", &config.warehouse.catalog_dataset]);
            table.add_row(vec!["Archive dataset", &config.warehouse.archive_dataset]);
            table.add_row(vec!["Archive source", &config.warehouse.archive_source]);
            table.add_row(vec!["Source base URL", &config.source.base_url]);
            table.add_row(vec!["Catalog API URL", &config.source.api_url]);
            table.add_row(vec![
                "Storage",
                &format!(
                    "{}/{}",
                    config.storage.root.display(),
                    config.storage.bucket
                ),
            ]);
            table.add_row(vec![
                "GitHub token",
                if config.github.token.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec![
                "Throttle",
                &format!(
                    "{} req / {}s",
                    config.throttle.max_requests, config.throttle.interval_secs
                ),
            ]);
            table.add_row(vec![
                "Start date",
                &config.pipeline.start_date.to_string(),
            ]);
            table.add_row(vec![
                "Transfer settle",
                &format!("{}s", config.pipeline.transfer_settle_secs),
            ]);
            table.add_row(vec!["Catalog cron", &config.schedule.catalog_cron]);
            table.add_row(vec!["Pipeline cron", &config.schedule.pipeline_cron]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
