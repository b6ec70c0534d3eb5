//! Token cards on the pre-market hub page.
//!
//! Cards are mostly free text, so fields come out of the card's visible text
//! with label-anchored patterns, and only the display name goes through a
//! selector chain. Anything that does not match stays None or empty; the
//! extractor never invents a value.

use crate::extract::cleaner::{parse_amount, parse_decimal, parse_pct, parse_timestamp, tidy_name};
use crate::extract::{sel, text_content, InvalidSelector};
use crate::models::{ListingStatus, TokenSummary};
use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,10}\b").expect("symbol regex"));
static PRICE_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Giá giao dịch mới nhất\s*([\d,]+\.?\d*)").expect("price regex")
});
static PRICE_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d{2,4}").expect("bare price regex"));
static CHANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]?\d+\.?\d*)%").expect("change regex"));
static VOLUME_24H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Khối lượng 24 giờ\s*([\d,]+\.?\d*[KMB]?)").expect("volume regex")
});
static VOLUME_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Tổng khối lượng\s*([\d,]+\.?\d*[KMB]?)").expect("total volume regex")
});
static VOLUME_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*[KMB]").expect("bare volume regex"));
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").expect("timestamp regex")
});

/// Boilerplate labels that must never be taken for a token name.
static NAME_BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Giá giao dịch|Khối lượng|Tổng khối lượng|Đang diễn ra|Đợi xác nhận")
        .expect("name boilerplate regex")
});
/// Stricter filter for the generic fallback selectors, which also trip over
/// figures and percentages.
static NAME_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\d,]+\.?\d*|[+-]?\d+\.?\d*%|Giá giao dịch|Khối lượng|Tổng khối lượng|Đang diễn ra|Đợi xác nhận",
    )
    .expect("name noise regex")
});

/// The hub is ready once the pre-market tab panel and its token list exist.
pub fn hub_ready(doc: &Html) -> Result<bool, InvalidSelector> {
    let panel = sel("#rc-tabs-0-panel-1")?;
    let list = sel("ul.ant-list-items")?;
    Ok(doc.select(&panel).next().is_some() && doc.select(&list).next().is_some())
}

/// One `TokenSummary` per card in the hub's token list, in list order.
/// Cards with no visible text are dropped; a card whose symbol cannot be
/// parsed is kept with an empty symbol so callers can count and log it.
pub fn extract_tokens(
    doc: &Html,
    captured_at: NaiveDateTime,
) -> Result<Vec<TokenSummary>, InvalidSelector> {
    let list_sel = sel("ul.ant-list-items")?;
    let item_sel = sel("li")?;
    let names = NameChain::new()?;

    let Some(list) = doc.select(&list_sel).next() else {
        return Ok(Vec::new());
    };

    let mut tokens = Vec::new();
    for item in list.select(&item_sel) {
        let text = text_content(&item);
        if text.trim().is_empty() {
            continue;
        }
        tokens.push(parse_item(&item, &text, &names, captured_at));
    }
    Ok(tokens)
}

fn parse_item(
    item: &ElementRef,
    text: &str,
    names: &NameChain,
    captured_at: NaiveDateTime,
) -> TokenSummary {
    let symbol = SYMBOL
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let name = if symbol.is_empty() {
        String::new()
    } else {
        names
            .display_name(item, &symbol)
            .unwrap_or_else(|| symbol.clone())
    };

    let latest_price = PRICE_LABELED
        .captures(text)
        .and_then(|c| parse_decimal(c.get(1)?.as_str()))
        .or_else(|| PRICE_BARE.find(text).and_then(|m| parse_decimal(m.as_str())));
    let change_pct = CHANGE
        .captures(text)
        .and_then(|c| parse_pct(c.get(1)?.as_str()));

    let mut volume_24h = VOLUME_24H
        .captures(text)
        .and_then(|c| parse_amount(c.get(1)?.as_str()));
    let mut total_volume = VOLUME_TOTAL
        .captures(text)
        .and_then(|c| parse_amount(c.get(1)?.as_str()));
    if volume_24h.is_none() || total_volume.is_none() {
        // Unlabelled cards list the 24h figure before the cumulative one.
        let bare: Vec<&str> = VOLUME_BARE.find_iter(text).map(|m| m.as_str()).collect();
        if volume_24h.is_none() {
            volume_24h = bare.first().and_then(|s| parse_amount(s));
        }
        if total_volume.is_none() {
            total_volume = bare.get(1).and_then(|s| parse_amount(s));
        }
    }

    let stamps: Vec<NaiveDateTime> = TIMESTAMP
        .find_iter(text)
        .filter_map(|m| parse_timestamp(m.as_str()))
        .collect();
    let starts_at = stamps.first().copied();
    let ends_at = stamps.get(1).copied();
    let status = if ends_at.is_none() {
        find_status(text)
    } else {
        None
    };

    TokenSummary {
        symbol,
        name,
        latest_price,
        change_pct,
        volume_24h,
        total_volume,
        starts_at,
        ends_at,
        status,
        captured_at,
    }
}

fn find_status(text: &str) -> Option<ListingStatus> {
    ListingStatus::PHRASES
        .into_iter()
        .find(|phrase| text.contains(*phrase))
        .and_then(ListingStatus::from_phrase)
}

/// Display-name selector chain. The generated class for the full name is
/// first and gets the lenient filter; the generic attribute probes behind it
/// match all sorts of figure elements and need the strict one.
struct NameChain {
    primary: Selector,
    fallbacks: Vec<Selector>,
}

impl NameChain {
    fn new() -> Result<Self, InvalidSelector> {
        Ok(Self {
            primary: sel(".trade-list-item_fullCurrency__UGLmN")?,
            fallbacks: vec![
                sel(".trade-list-item_currency__GO5BC")?,
                sel("[class*='fullCurrency']")?,
                sel("[class*='currency']")?,
                sel("[class*='name']")?,
                sel("[class*='title']")?,
            ],
        })
    }

    fn display_name(&self, item: &ElementRef, symbol: &str) -> Option<String> {
        if let Some(el) = item.select(&self.primary).next() {
            let text = text_content(&el);
            if let Some(name) = accept(text.trim(), symbol, &NAME_BOILERPLATE) {
                return Some(name);
            }
        }
        for selector in &self.fallbacks {
            for el in item.select(selector) {
                let text = text_content(&el);
                if let Some(name) = accept(text.trim(), symbol, &NAME_NOISE) {
                    return Some(name);
                }
            }
        }
        None
    }
}

fn accept(text: &str, symbol: &str, reject: &Regex) -> Option<String> {
    if text.is_empty() || text == symbol || text == "Giá giao dịch mới nhất" {
        return None;
    }
    if reject.is_match(text) {
        return None;
    }
    tidy_name(text)
}
