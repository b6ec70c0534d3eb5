//! Browser-driving crawl flows.
//!
//! The crawler owns navigation, waits and retries; everything it learns about
//! a page goes through `extract` over a fresh source snapshot. Re-parsing
//! after every navigation and click is what makes stale-element bugs
//! impossible here: there is no element handle to go stale.

pub mod pagination;

use crate::browser::{BrowserError, Surface};
use crate::config::CrawlerConfig;
use crate::extract::{listing, orderbook, InvalidSelector};
use crate::models::{OrderLevel, TokenSummary};
use chrono::{NaiveDateTime, Utc};
use rand::RngExt;
use scraper::Html;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tokio_retry::strategy::{jitter, FixedInterval};
use tracing::{debug, warn};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("page load failed after retries: {url}")]
    PageLoad { url: String },

    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Selector(#[from] InvalidSelector),
}

/// What the orchestrator should do about an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log, count, move on to the next token.
    SkipToken,
    /// Stop the run; retrying other tokens cannot help.
    AbortRun,
}

impl ExtractionError {
    /// Site and browser trouble costs one token. A selector that fails to
    /// compile is a typo in this codebase and would fail on every token.
    pub fn disposition(&self) -> Disposition {
        match self {
            ExtractionError::PageLoad { .. }
            | ExtractionError::Timeout { .. }
            | ExtractionError::Browser(_) => Disposition::SkipToken,
            ExtractionError::Selector(_) => Disposition::AbortRun,
        }
    }
}

// ── Crawler ───────────────────────────────────────────────────────────────────

pub struct Crawler {
    pub(crate) config: CrawlerConfig,
}

impl Crawler {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn hub_url(&self) -> &str {
        &self.config.base_url
    }

    /// Order-book page for one token, e.g. …/pre-market/MENTO.
    pub fn token_url(&self, symbol: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), symbol)
    }

    /// Load the hub and pull one `TokenSummary` per listed card.
    pub async fn crawl_listing(
        &self,
        surface: &mut dyn Surface,
        captured_at: NaiveDateTime,
    ) -> Result<Vec<TokenSummary>, ExtractionError> {
        let url = self.hub_url().to_string();
        self.load_with_retries(surface, &url).await?;
        self.wait_until(surface, "token list", listing::hub_ready)
            .await?;
        sleep(Duration::from_millis(self.config.settle_ms)).await;

        let html = surface.source().await?;
        let tokens = listing::extract_tokens(&Html::parse_document(&html), captured_at)?;
        debug!("Listing: {} cards", tokens.len());
        Ok(tokens)
    }

    /// Load one token's order-book page and pull every row of both sides,
    /// paginating each side to its last page.
    pub async fn crawl_token_book(
        &self,
        surface: &mut dyn Surface,
        symbol: &str,
    ) -> Result<Vec<OrderLevel>, ExtractionError> {
        self.polite_delay().await;

        let url = self.token_url(symbol);
        self.load_with_retries(surface, &url).await?;
        self.wait_until(surface, "order-book tables", orderbook::book_ready)
            .await?;
        sleep(Duration::from_millis(self.config.settle_ms)).await;

        let captured_at = Utc::now().naive_utc();
        let mut levels = Vec::new();

        for spec in orderbook::SIDES {
            let html = surface.source().await?;
            let first_page = {
                let doc = Html::parse_document(&html);
                orderbook::extract_side(&doc, spec, symbol, captured_at)?
            };
            debug!(
                "{}: {} rows on page 1 of the {} side",
                symbol,
                first_page.len(),
                spec.side.as_str()
            );
            levels.extend(first_page);

            let rest = pagination::walk_remaining_pages(self, surface, spec, symbol).await?;
            levels.extend(rest);
        }

        Ok(levels)
    }

    /// `goto` with a bounded retry loop; delays come from a jittered
    /// fixed-interval schedule.
    async fn load_with_retries(
        &self,
        surface: &mut dyn Surface,
        url: &str,
    ) -> Result<(), ExtractionError> {
        let mut delays = FixedInterval::from_millis(self.config.request_delay_ms.max(1))
            .map(jitter)
            .take(self.config.max_retries as usize);

        for attempt in 1..=(self.config.max_retries + 1) {
            debug!("goto {} (attempt {})", url, attempt);
            match surface.goto(url).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Page load attempt {} failed: {}", attempt, e);
                    match delays.next() {
                        Some(delay) => sleep(delay).await,
                        None => break,
                    }
                }
            }
        }

        Err(ExtractionError::PageLoad {
            url: url.to_string(),
        })
    }

    /// Poll snapshots until `ready` or the wait budget runs out.
    async fn wait_until<F>(
        &self,
        surface: &mut dyn Surface,
        what: &str,
        ready: F,
    ) -> Result<(), ExtractionError>
    where
        F: Fn(&Html) -> Result<bool, InvalidSelector>,
    {
        let deadline = Instant::now() + Duration::from_secs(self.config.wait_timeout_secs);
        loop {
            let html = surface.source().await?;
            if ready(&Html::parse_document(&html))? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ExtractionError::Timeout {
                    what: what.to_string(),
                });
            }
            sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    /// Fixed delay plus random jitter before each token page, so the crawl
    /// does not hammer the site at browser speed.
    async fn polite_delay(&self) {
        let jitter_ms = rand::rng().random_range(0..=self.config.jitter_ms);
        sleep(Duration::from_millis(
            self.config.request_delay_ms + jitter_ms,
        ))
        .await;
    }
}
