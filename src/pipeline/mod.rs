//! Pipeline orchestrator: ties browser, extraction and storage together.
//!
//! ## Run modes
//!
//! `CrawlMode::Full`: crawl the hub listing, then every listed token's order
//!   book; afterwards delete persisted tokens that fell off the listing.
//!
//! `CrawlMode::Single(symbol)`: crawl the hub for metadata, then just the one
//!   token's book. Nothing is pruned; a symbol missing from the hub is still
//!   crawled with a bare summary.
//!
//! Order books are extracted concurrently, bounded by the surface pool, and
//! everything learned is persisted from this task alone once the workers have
//! joined. DuckDB gets exactly one writer that way.

use crate::browser::pool::SurfacePool;
use crate::browser::webdriver::WebdriverBrowser;
use crate::browser::Browser;
use crate::config::AppConfig;
use crate::crawler::{Crawler, Disposition, ExtractionError};
use crate::models::{OrderLevel, TokenSummary};
use crate::storage::Repository;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlMode {
    Full,
    Single(String),
}

impl CrawlMode {
    /// Label recorded on the crawl-run row.
    pub fn label(&self) -> &str {
        match self {
            CrawlMode::Full => "full",
            CrawlMode::Single(symbol) => symbol,
        }
    }
}

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, mode: CrawlMode) -> Result<PipelineStats> {
        let repo =
            Repository::open(&self.config.storage.db_path).context("Failed to open DuckDB")?;
        if self.config.storage.run_migrations {
            repo.run_migrations()?;
        }

        let browser = WebdriverBrowser::new(&self.config.browser);
        browser
            .probe()
            .await
            .context("WebDriver is not reachable; is chromedriver running?")?;

        self.run_with(Arc::new(browser), &repo, mode).await
    }

    /// The whole crawl against any session factory. `run` wires in the real
    /// WebDriver; tests wire in a scripted one.
    pub async fn run_with(
        &self,
        factory: Arc<dyn Browser>,
        repo: &Repository,
        mode: CrawlMode,
    ) -> Result<PipelineStats> {
        let run_id = repo.begin_crawl_run(mode.label()).unwrap_or(0);
        let crawler = Arc::new(Crawler::new(&self.config.crawler));
        let pool = Arc::new(SurfacePool::new(factory, self.config.crawler.surfaces));

        // ── 1. Listing hub ────────────────────────────────────────────────────
        info!("=== Step 1: Crawling the pre-market listing ===");
        let captured_at = Utc::now().naive_utc();
        let listing = match self.crawl_listing(&crawler, &pool, captured_at).await {
            Ok(listing) => listing,
            Err(e) => match &mode {
                CrawlMode::Full => {
                    repo.finish_crawl_run(run_id, 0, 0, Some(&e.to_string())).ok();
                    pool.shutdown().await;
                    return Err(e).context("Listing crawl failed");
                }
                CrawlMode::Single(symbol) => {
                    warn!("Listing crawl failed ({}); crawling {} alone", e, symbol);
                    Vec::new()
                }
            },
        };
        let tokens_listed = listing.len();
        info!("{} tokens listed", tokens_listed);

        let summaries: Vec<TokenSummary> = match &mode {
            CrawlMode::Full => listing
                .into_iter()
                .filter(|t| !t.symbol.is_empty())
                .collect(),
            CrawlMode::Single(symbol) => {
                let summary = listing
                    .into_iter()
                    .find(|t| &t.symbol == symbol)
                    .unwrap_or_else(|| TokenSummary::bare(symbol, captured_at));
                vec![summary]
            }
        };

        // ── 2. Order books ────────────────────────────────────────────────────
        info!("=== Step 2: Crawling order books ({} tokens) ===", summaries.len());
        let mut handles = Vec::new();
        for summary in &summaries {
            let symbol = summary.symbol.clone();
            let crawler = Arc::clone(&crawler);
            let pool = Arc::clone(&pool);

            let handle = tokio::spawn(async move {
                let mut surface = pool.acquire().await?;
                match crawler.crawl_token_book(&mut *surface, &symbol).await {
                    Ok(levels) => {
                        info!("{}: {} levels", symbol, levels.len());
                        pool.release(surface).await;
                        Ok(levels)
                    }
                    Err(e) => {
                        pool.discard(surface).await;
                        Err(e)
                    }
                }
            });

            handles.push((summary.symbol.clone(), handle));
        }

        let mut books: Vec<(String, Vec<OrderLevel>)> = Vec::new();
        let mut levels_captured = 0usize;
        let mut errors = 0usize;
        let mut abort: Option<ExtractionError> = None;

        for (symbol, handle) in handles {
            match handle.await {
                Ok(Ok(levels)) => {
                    levels_captured += levels.len();
                    books.push((symbol, levels));
                }
                Ok(Err(e)) => {
                    errors += 1;
                    match e.disposition() {
                        Disposition::SkipToken => warn!("{}: {}", symbol, e),
                        Disposition::AbortRun => {
                            error!("{}: {}", symbol, e);
                            abort = Some(e);
                        }
                    }
                }
                Err(e) => {
                    error!("Task panic for {}: {}", symbol, e);
                    errors += 1;
                }
            }
        }

        pool.shutdown().await;

        if let Some(e) = abort {
            repo.finish_crawl_run(run_id, 0, 0, Some(&e.to_string())).ok();
            return Err(e).context("Crawl aborted");
        }

        // ── 3. Persist ────────────────────────────────────────────────────────
        // A failed statement has already rolled its own transaction back; it
        // costs an error count and the run carries on to the audit row.
        if let Err(e) = repo.upsert_tokens(&summaries) {
            error!("Failed to persist token summaries: {:#}", e);
            errors += 1;
        }
        for (symbol, levels) in &books {
            if let Err(e) = repo.insert_order_levels(symbol, levels) {
                error!("{}: failed to persist order levels: {:#}", symbol, e);
                errors += 1;
            }
        }
        if mode == CrawlMode::Full {
            let keep: Vec<String> = summaries.iter().map(|t| t.symbol.clone()).collect();
            match repo.prune_missing(&keep) {
                Ok(pruned) if pruned > 0 => info!("Pruned {} delisted tokens", pruned),
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to prune delisted tokens: {:#}", e);
                    errors += 1;
                }
            }
        }

        let stats = PipelineStats {
            tokens_listed,
            tokens_crawled: books.len(),
            levels_captured,
            errors,
        };

        let note = (errors > 0).then(|| format!("{} errors", errors));
        repo.finish_crawl_run(
            run_id,
            stats.tokens_crawled,
            stats.levels_captured,
            note.as_deref(),
        )
        .ok();

        let (first, last) = repo.capture_range().unwrap_or((None, None));
        info!(
            "=== Done: {} listed | {} books | {} levels | {} errors | capture range: {:?} → {:?} ===",
            stats.tokens_listed,
            stats.tokens_crawled,
            stats.levels_captured,
            stats.errors,
            first,
            last,
        );

        Ok(stats)
    }

    async fn crawl_listing(
        &self,
        crawler: &Crawler,
        pool: &SurfacePool,
        captured_at: chrono::NaiveDateTime,
    ) -> Result<Vec<TokenSummary>, ExtractionError> {
        let mut surface = pool.acquire().await?;
        match crawler.crawl_listing(&mut *surface, captured_at).await {
            Ok(listing) => {
                pool.release(surface).await;
                Ok(listing)
            }
            Err(e) => {
                pool.discard(surface).await;
                Err(e)
            }
        }
    }
}

#[derive(Debug)]
pub struct PipelineStats {
    pub tokens_listed: usize,
    pub tokens_crawled: usize,
    pub levels_captured: usize,
    pub errors: usize,
}
