use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Order side ────────────────────────────────────────────────────────────────

/// Side of a pre-market order level, named by the action button rendered in
/// the row ("Mua" = buy the offer, "Bán" = sell into the bid). The wrapper
/// table class names on the site are inverted relative to these labels, so
/// the button text is the authority and is stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Mua,
    Ban,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Mua => "Mua",
            Side::Ban => "Bán",
        }
    }

    /// Matches the exact label the site renders, nothing looser.
    pub fn from_label(label: &str) -> Option<Side> {
        match label.trim() {
            "Mua" => Some(Side::Mua),
            "Bán" => Some(Side::Ban),
            _ => None,
        }
    }
}

// ── Listing status ────────────────────────────────────────────────────────────

/// Lifecycle phase shown on the hub card when no end timestamp is rendered.
/// Closed set of phrases observed on the Vietnamese site; stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    AwaitingConfirmation,  // "Đợi xác nhận"
    Ended,                 // "Đã kết thúc"
    InProgress,            // "Đang diễn ra"
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::AwaitingConfirmation => "Đợi xác nhận",
            ListingStatus::Ended => "Đã kết thúc",
            ListingStatus::InProgress => "Đang diễn ra",
        }
    }

    pub fn from_phrase(s: &str) -> Option<ListingStatus> {
        match s.trim() {
            "Đợi xác nhận" => Some(ListingStatus::AwaitingConfirmation),
            "Đã kết thúc" => Some(ListingStatus::Ended),
            "Đang diễn ra" => Some(ListingStatus::InProgress),
            _ => None,
        }
    }

    /// Checked in this order against free card text; first hit wins.
    pub const PHRASES: [&'static str; 3] =
        ["Đợi xác nhận", "Đã kết thúc", "Đang diễn ra"];
}

// ── Token summary ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenSummary {
    pub symbol: String,
    pub name: String,
    pub latest_price: Option<f64>,
    pub change_pct: Option<f64>,
    pub volume_24h: Option<f64>,     // K/M/B shorthand already expanded
    pub total_volume: Option<f64>,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
    pub status: Option<ListingStatus>,
    pub captured_at: NaiveDateTime,
}

impl TokenSummary {
    /// Placeholder for a symbol crawled directly that was absent from the
    /// hub listing. Every market field stays unknown.
    pub fn bare(symbol: &str, captured_at: NaiveDateTime) -> Self {
        TokenSummary {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            latest_price: None,
            change_pct: None,
            volume_24h: None,
            total_volume: None,
            starts_at: None,
            ends_at: None,
            status: None,
            captured_at,
        }
    }
}

// ── Order level ───────────────────────────────────────────────────────────────

/// One row of one side of a token's order book. A field that failed numeric
/// normalization is None, never zero; rows keep the on-page order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLevel {
    pub symbol: String,
    pub side: Side,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub total: Option<f64>,
    pub captured_at: NaiveDateTime,
}

// ── Crawl run ─────────────────────────────────────────────────────────────────

/// Audit row bracketing one pipeline invocation.
#[derive(Debug, Clone)]
pub struct CrawlRun {
    pub id: i64,
    pub mode: String,                // "full" or the single symbol
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub status: Option<String>,      // "ok" / "failed"
    pub tokens_crawled: i64,
    pub levels_captured: i64,
    pub error: Option<String>,
}
