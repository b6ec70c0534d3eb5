//! TSV snapshots of the store, one file per entity type.

use crate::models::TokenSummary;
use crate::storage::Repository;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TOKENS_FILE: &str = "tokens.tsv";
pub const ORDERBOOK_FILE: &str = "orderbook.tsv";

const TOKEN_HEADER: [&str; 9] = [
    "Name",
    "Symbol",
    "Latest Price",
    "Price Change %",
    "Volume 24h",
    "Total Volume",
    "Start Time",
    "End Time",
    "Crawled At",
];

const LEVEL_HEADER: [&str; 6] = [
    "Token Symbol",
    "Order Type",
    "Price",
    "Quantity",
    "Total",
    "Crawled At",
];

pub struct ExportReport {
    pub tokens_file: PathBuf,
    pub levels_file: PathBuf,
    pub tokens: usize,
    pub levels: usize,
}

/// Write everything currently stored to `<dir>/tokens.tsv` and
/// `<dir>/orderbook.tsv`, replacing previous exports.
pub fn export_tsv(repo: &Repository, dir: &Path) -> Result<ExportReport> {
    std::fs::create_dir_all(dir).with_context(|| format!("Could not create dir {:?}", dir))?;

    let tokens = repo.list_tokens()?;
    let levels = repo.list_levels()?;

    let tokens_file = dir.join(TOKENS_FILE);
    let mut w = writer(&tokens_file)?;
    w.write_record(TOKEN_HEADER)?;
    for t in &tokens {
        w.write_record([
            t.name.clone(),
            t.symbol.clone(),
            fmt_num(t.latest_price),
            fmt_num(t.change_pct),
            fmt_num(t.volume_24h),
            fmt_num(t.total_volume),
            fmt_opt_stamp(t.starts_at),
            end_column(t),
            fmt_stamp(t.captured_at),
        ])?;
    }
    w.flush()?;

    let levels_file = dir.join(ORDERBOOK_FILE);
    let mut w = writer(&levels_file)?;
    w.write_record(LEVEL_HEADER)?;
    for l in &levels {
        w.write_record([
            l.symbol.clone(),
            l.side.as_str().to_string(),
            fmt_num(l.price),
            fmt_num(l.quantity),
            fmt_num(l.total),
            fmt_stamp(l.captured_at),
        ])?;
    }
    w.flush()?;

    info!(
        "Exported {} tokens and {} levels to {:?}",
        tokens.len(),
        levels.len(),
        dir
    );
    Ok(ExportReport {
        tokens_file,
        levels_file,
        tokens: tokens.len(),
        levels: levels.len(),
    })
}

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Could not create {:?}", path))
}

fn fmt_num(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn fmt_stamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn fmt_opt_stamp(ts: Option<NaiveDateTime>) -> String {
    ts.map(fmt_stamp).unwrap_or_default()
}

/// End Time column: the end timestamp when known, otherwise the status
/// phrase the card showed in its place.
fn end_column(token: &TokenSummary) -> String {
    match (token.ends_at, token.status) {
        (Some(ts), _) => fmt_stamp(ts),
        (None, Some(status)) => status.as_str().to_string(),
        (None, None) => String::new(),
    }
}
