mod browser;
mod config;
mod crawler;
mod export;
mod extract;
mod models;
mod pipeline;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::pipeline::{CrawlMode, Pipeline};
use crate::storage::Repository;

#[derive(Parser)]
#[command(name = "mexc-premarket", about = "MEXC pre-market crawler", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the pre-market listing and every token's order book
    Crawl {
        /// Single token symbol to crawl instead of the full listing
        symbol: Option<String>,
    },

    /// Show database statistics
    Stats,

    /// List all stored token symbols
    Symbols,

    /// Write tokens and order-book levels to TSV files
    Export {
        /// Directory to write the TSV files into (default: data/)
        #[arg(short, long, default_value = "data")]
        dir: PathBuf,
    },

    /// Apply schema migrations without crawling
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "mexc_premarket=info,warn",
        1 => "mexc_premarket=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Crawl { symbol } => {
            let _t = utils::Timer::start("Pre-market crawl");
            let mode = match symbol {
                Some(s) => CrawlMode::Single(s.to_uppercase()),
                None => CrawlMode::Full,
            };
            let stats = Pipeline::new(config).run(mode).await?;
            info!(
                "Done: {} listed, {} books, {} levels, {} errors",
                stats.tokens_listed, stats.tokens_crawled, stats.levels_captured, stats.errors
            );
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            let tokens = repo.token_count()?;
            let levels = repo.level_count()?;
            let (min, max) = repo.capture_range().unwrap_or((None, None));
            println!("─────────────────────────────────────");
            println!("  MEXC Pre-Market — Database Stats");
            println!("─────────────────────────────────────");
            println!("  Tokens        : {}", utils::fmt_number(tokens));
            println!("  Book levels   : {}", utils::fmt_number(levels));
            println!("  First capture : {}", utils::fmt_opt_stamp(min));
            println!("  Last capture  : {}", utils::fmt_opt_stamp(max));
            if let Some(run) = repo.last_run()? {
                println!(
                    "  Last run      : #{} {} ({})",
                    run.id,
                    run.mode,
                    run.status.as_deref().unwrap_or("running")
                );
                println!(
                    "  Started       : {}",
                    utils::fmt_opt_stamp(Some(run.started_at))
                );
                println!(
                    "  Finished      : {}",
                    utils::fmt_opt_stamp(run.finished_at)
                );
                println!(
                    "  Crawled       : {} tokens, {} levels",
                    utils::fmt_number(run.tokens_crawled),
                    utils::fmt_number(run.levels_captured)
                );
                if let Some(error) = &run.error {
                    println!("  Error         : {}", error);
                }
            }
            println!("─────────────────────────────────────");
        }

        Command::Symbols => {
            let repo = Repository::open(&config.storage.db_path)?;
            let syms = repo.list_symbols()?;
            if syms.is_empty() {
                println!("No symbols — run `mexc-premarket crawl` first.");
            } else {
                println!("{} symbols:", syms.len());
                for s in &syms {
                    println!("  {}", s);
                }
            }
        }

        Command::Export { dir } => {
            let _t = utils::Timer::start("TSV export");
            let repo = Repository::open(&config.storage.db_path)?;
            let report = export::export_tsv(&repo, &dir)?;
            println!(
                "Wrote {} tokens to {} and {} levels to {}",
                report.tokens,
                report.tokens_file.display(),
                report.levels,
                report.levels_file.display()
            );
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}
