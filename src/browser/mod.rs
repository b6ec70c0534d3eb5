//! The browser seam: everything the crawl needs from a rendered page, small
//! enough to fake in tests. Element *lookup* happens on source snapshots in
//! `extract`; the surface only navigates, snapshots, scrolls, and clicks.

pub mod pool;
pub mod webdriver;

#[cfg(test)]
pub mod scripted;

use async_trait::async_trait;
use thiserror::Error;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("webdriver session could not be established: {0}")]
    Session(String),

    #[error("webdriver command failed: {0}")]
    Command(String),

    #[error("webdriver status probe failed: {0}")]
    Probe(String),

    #[error("browser surface already closed")]
    Closed,

    #[error("surface pool has no capacity")]
    Exhausted,
}

// ── Locator ───────────────────────────────────────────────────────────────────

/// One element out of possibly many matches: a CSS selector plus the
/// document-order index of the wanted occurrence. The same pair addresses an
/// element both in `scraper` snapshots and in `querySelectorAll` on the live
/// page, which is what keeps snapshot analysis and clicking in agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub css: String,
    pub index: usize,
}

impl Locator {
    pub fn first(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            index: 0,
        }
    }

    pub fn nth(css: impl Into<String>, index: usize) -> Self {
        Self {
            css: css.into(),
            index,
        }
    }
}

// ── Surface ───────────────────────────────────────────────────────────────────

/// One rendered browser tab, exclusively owned by whoever checked it out of
/// the pool.
#[async_trait]
pub trait Surface: Send {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Current rendered DOM as an HTML string.
    async fn source(&mut self) -> Result<String, BrowserError>;

    /// Programmatic click on `target` resolved inside `scope`, bypassing
    /// hit-testing so overlays cannot intercept it. Ok(false) means the
    /// scope or target did not resolve on the live page.
    async fn click_within(&mut self, scope: &Locator, target: &Locator)
        -> Result<bool, BrowserError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError>;

    async fn scroll_to_top(&mut self) -> Result<(), BrowserError>;

    /// Clear cookies and web storage so the next checkout starts clean.
    async fn reset(&mut self) -> Result<(), BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Opens fresh surfaces; the pool calls this lazily up to its capacity.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Surface>, BrowserError>;
}
