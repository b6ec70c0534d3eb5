//! Pure DOM extraction over page-source snapshots.
//!
//! Every function here takes a rendered-HTML snapshot (or a node of one) and
//! returns plain data. Nothing in this module talks to the browser; the
//! crawler re-snapshots after each navigation or click and hands the string
//! down, so stale-element problems cannot exist at this layer.

pub mod cleaner;
pub mod listing;
pub mod orderbook;
pub mod pager;
pub mod rows;

#[cfg(test)]
pub mod fixtures;

use scraper::{ElementRef, Selector};
use thiserror::Error;

/// A CSS selector string that failed to compile. These are hard-coded
/// constants, so hitting this means a typo, not a site change.
#[derive(Debug, Error)]
#[error("invalid selector `{selector}`")]
pub struct InvalidSelector {
    pub selector: String,
}

pub(crate) fn sel(css: &str) -> Result<Selector, InvalidSelector> {
    Selector::parse(css).map_err(|_| InvalidSelector {
        selector: css.to_string(),
    })
}

/// Visible text of an element: each text fragment trimmed, empties dropped,
/// fragments joined with newlines. Labels and their values end up on
/// adjacent lines the way a real browser reports element text, so the
/// label-anchored patterns in `listing` can match across the boundary.
pub(crate) fn text_content(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
