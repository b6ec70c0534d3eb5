//! Walking an order-book side past page 1.
//!
//! The pager re-renders on every click, so nothing located on one snapshot is
//! trusted on the next: each page is found, clicked, confirmed and extracted
//! against a fresh source. When a page link cannot be found even after
//! scrolling and revealing, the walk stops with what it has rather than
//! clicking blind.

use super::{Crawler, ExtractionError};
use crate::browser::{Locator, Surface};
use crate::extract::orderbook::{extract_side, SideSpec};
use crate::extract::pager;
use crate::models::OrderLevel;
use chrono::Utc;
use scraper::Html;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Pages beyond the first can only be revealed by the next arrow while the
/// pager still renders single-digit page numbers.
const REVEAL_LIMIT: u32 = 9;

/// Click through pages 2..=max of one side, appending rows page by page.
/// Page 1 is the caller's; it was extracted before any click. Rows carry a
/// per-page capture stamp taken after the page settled.
pub async fn walk_remaining_pages(
    crawler: &Crawler,
    surface: &mut dyn Surface,
    spec: &SideSpec,
    symbol: &str,
) -> Result<Vec<OrderLevel>, ExtractionError> {
    let cfg = &crawler.config;
    let mut collected = Vec::new();

    let html = surface.source().await?;
    let setup = {
        let doc = Html::parse_document(&html);
        pager::setup(&doc, spec.pager_candidates, spec.pager_pick_last)?
    };
    let Some((scope, max)) = setup else {
        debug!("{} {}: no pager, single page", symbol, spec.side.as_str());
        return Ok(collected);
    };
    if max <= 1 {
        return Ok(collected);
    }
    debug!("{} {}: walking pages 2..={}", symbol, spec.side.as_str(), max);

    for n in 2..=max {
        let mut target = locate_item(surface, &scope, n).await?;

        // The pager can sit below the fold until the page has been scrolled.
        if target.is_none() {
            nudge_scroll(surface, cfg.refresh_ms).await?;
            target = locate_item(surface, &scope, n).await?;
        }

        if target.is_none() && n <= REVEAL_LIMIT {
            target = reveal_with_next(crawler, surface, &scope, n).await?;
        }

        let Some(target) = target else {
            warn!(
                "{} {}: page {} link not found, stopping at {} rows",
                symbol,
                spec.side.as_str(),
                n,
                collected.len()
            );
            break;
        };

        if !surface.click_within(&scope, &target).await? {
            warn!(
                "{} {}: page {} link did not resolve on the live page, stopping",
                symbol,
                spec.side.as_str(),
                n
            );
            break;
        }

        sleep(Duration::from_millis(cfg.settle_ms)).await;
        confirm_active(crawler, surface, &scope, n).await?;
        sleep(Duration::from_millis(cfg.refresh_ms)).await;

        // Bottom-then-top pass so lazily rendered rows exist in the snapshot.
        surface.scroll_to_bottom().await?;
        sleep(Duration::from_millis(cfg.pause_ms)).await;
        surface.scroll_to_top().await?;
        sleep(Duration::from_millis(cfg.pause_ms)).await;

        let captured_at = Utc::now().naive_utc();
        let html = surface.source().await?;
        let rows = {
            let doc = Html::parse_document(&html);
            extract_side(&doc, spec, symbol, captured_at)?
        };
        debug!(
            "{} {} page {}: {} rows",
            symbol,
            spec.side.as_str(),
            n,
            rows.len()
        );
        collected.extend(rows);
    }

    Ok(collected)
}

/// Find page `n`'s link on a fresh snapshot.
async fn locate_item(
    surface: &mut dyn Surface,
    scope: &Locator,
    n: u32,
) -> Result<Option<Locator>, ExtractionError> {
    let html = surface.source().await?;
    let doc = Html::parse_document(&html);
    Ok(pager::locate_page_item(&doc, scope, n)?)
}

/// Click the next arrow once and look for the page link again.
async fn reveal_with_next(
    crawler: &Crawler,
    surface: &mut dyn Surface,
    scope: &Locator,
    n: u32,
) -> Result<Option<Locator>, ExtractionError> {
    let html = surface.source().await?;
    let arrow = {
        let doc = Html::parse_document(&html);
        pager::next_arrow(&doc, scope)?
    };
    let Some(arrow) = arrow else {
        return Ok(None);
    };
    if !surface.click_within(scope, &arrow).await? {
        return Ok(None);
    }
    sleep(Duration::from_millis(crawler.config.refresh_ms)).await;
    locate_item(surface, scope, n).await
}

/// Poll until the pager reports page `n` active. Running out of attempts is
/// only worth a warning; the click landed and extraction still reads a fresh
/// snapshot afterwards.
async fn confirm_active(
    crawler: &Crawler,
    surface: &mut dyn Surface,
    scope: &Locator,
    n: u32,
) -> Result<(), ExtractionError> {
    let cfg = &crawler.config;
    for attempt in 1..=cfg.poll_attempts {
        let html = surface.source().await?;
        let active = {
            let doc = Html::parse_document(&html);
            pager::active_page(&doc, scope)?
        };
        if active == Some(n) {
            return Ok(());
        }
        debug!(
            "page {} not active yet (attempt {}, pager shows {:?})",
            n, attempt, active
        );
        sleep(Duration::from_millis(cfg.poll_interval_ms)).await;
    }
    warn!("page {} never confirmed active, extracting anyway", n);
    Ok(())
}

async fn nudge_scroll(surface: &mut dyn Surface, wait_ms: u64) -> Result<(), ExtractionError> {
    surface.scroll_to_bottom().await?;
    sleep(Duration::from_millis(wait_ms)).await;
    surface.scroll_to_top().await?;
    sleep(Duration::from_millis(wait_ms)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::scripted::ScriptedBrowser;
    use crate::browser::Browser;
    use crate::config::CrawlerConfig;
    use crate::extract::fixtures;
    use crate::extract::orderbook::{BAN_SIDE, MUA_SIDE};
    use std::collections::HashMap;

    fn cfg() -> CrawlerConfig {
        CrawlerConfig {
            base_url: "page".to_string(),
            wait_timeout_secs: 0,
            settle_ms: 1,
            refresh_ms: 1,
            pause_ms: 1,
            poll_attempts: 2,
            poll_interval_ms: 1,
            request_delay_ms: 0,
            jitter_ms: 0,
            max_retries: 1,
            surfaces: 1,
        }
    }

    fn sell_row(price: &str) -> String {
        fixtures::row_for(
            "order-book-table_sellPrice__xAuZe",
            price,
            "10",
            "100",
            Some("Mua"),
        )
    }

    fn buy_row(price: &str) -> String {
        fixtures::row_for(
            "order-book-table_buyPrice__uY0OB",
            price,
            "10",
            "100",
            Some("Bán"),
        )
    }

    fn sell_page(prices: &[&str], max: u32, active: u32) -> String {
        let rows: Vec<String> = prices.iter().map(|p| sell_row(p)).collect();
        fixtures::book_page(
            &fixtures::sell_table(&rows),
            &fixtures::pager(max, active),
            "",
            "",
        )
    }

    async fn walk(
        browser: &ScriptedBrowser,
        spec: &SideSpec,
    ) -> Result<Vec<OrderLevel>, ExtractionError> {
        let mut surface = browser.open().await.unwrap();
        surface.goto("page").await.unwrap();
        let crawler = Crawler::new(&cfg());
        walk_remaining_pages(&crawler, surface.as_mut(), spec, "MENTO").await
    }

    #[test]
    fn test_walk_clicks_pages_in_order_and_appends() {
        let states = vec![
            sell_page(&["1.00"], 5, 1),
            sell_page(&["2.00", "2.10"], 5, 2),
            sell_page(&["3.00"], 5, 3),
            sell_page(&["4.00"], 5, 4),
            sell_page(&["5.00"], 5, 5),
        ];
        let browser = ScriptedBrowser::new(HashMap::from([("page".to_string(), states)]));

        let rows = tokio_test::block_on(walk(&browser, &MUA_SIDE)).unwrap();

        let prices: Vec<f64> = rows.iter().filter_map(|r| r.price).collect();
        assert_eq!(prices, vec![2.0, 2.1, 3.0, 4.0, 5.0]);

        let clicks = browser.clicks();
        assert_eq!(clicks.len(), 4);
        for (click, page) in clicks.iter().zip(2..=5) {
            assert!(click.contains(&format!(".ant-pagination-item-{}", page)));
        }
        assert!(clicks.iter().all(|c| !c.contains("item-1")));
    }

    #[test]
    fn test_walk_extracts_after_confirm_poll_gives_up() {
        // Three source polls per click (two confirms, one extraction) against
        // a lag of three: the confirm loop runs out, the extraction snapshot
        // is the one that finally shows the new page.
        let states = vec![
            sell_page(&["1.00"], 3, 1),
            sell_page(&["2.00", "2.10"], 3, 2),
            sell_page(&["3.00"], 3, 3),
        ];
        let browser =
            ScriptedBrowser::new(HashMap::from([("page".to_string(), states)])).with_click_lag(3);

        let rows = tokio_test::block_on(walk(&browser, &MUA_SIDE)).unwrap();

        let prices: Vec<f64> = rows.iter().filter_map(|r| r.price).collect();
        assert_eq!(prices, vec![2.0, 2.1, 3.0]);
    }

    #[test]
    fn test_walk_stops_when_page_link_stays_missing() {
        // The first snapshot advertises three pages but page 2's pager only
        // renders two items, so page 3 cannot be found even after the scroll
        // and next-arrow attempts.
        let states = vec![
            sell_page(&["1.00"], 3, 1),
            sell_page(&["2.00"], 2, 2),
        ];
        let browser = ScriptedBrowser::new(HashMap::from([("page".to_string(), states)]));

        let rows = tokio_test::block_on(walk(&browser, &MUA_SIDE)).unwrap();

        let prices: Vec<f64> = rows.iter().filter_map(|r| r.price).collect();
        assert_eq!(prices, vec![2.0]);

        let clicks = browser.clicks();
        assert_eq!(clicks.len(), 2);
        assert!(clicks[0].contains(".ant-pagination-item-2"));
        assert!(clicks[1].contains(".ant-pagination-next"));
    }

    #[test]
    fn test_walk_without_pager_returns_nothing() {
        let page = fixtures::book_page(&fixtures::sell_table(&[sell_row("1.00")]), "", "", "");
        let browser =
            ScriptedBrowser::new(HashMap::from([("page".to_string(), vec![page])]));

        let rows = tokio_test::block_on(walk(&browser, &MUA_SIDE)).unwrap();

        assert!(rows.is_empty());
        assert!(browser.clicks().is_empty());
    }

    #[test]
    fn test_walk_scopes_clicks_to_its_own_side() {
        let sell = fixtures::sell_table(&[sell_row("1.00")]);
        let states = vec![
            fixtures::book_page(
                &sell,
                &fixtures::pager(2, 1),
                &fixtures::buy_table(&[buy_row("9.00")]),
                &fixtures::pager(2, 1),
            ),
            fixtures::book_page(
                &sell,
                &fixtures::pager(2, 1),
                &fixtures::buy_table(&[buy_row("9.50")]),
                &fixtures::pager(2, 2),
            ),
        ];
        let browser = ScriptedBrowser::new(HashMap::from([("page".to_string(), states)]));

        let rows = tokio_test::block_on(walk(&browser, &BAN_SIDE)).unwrap();

        let prices: Vec<f64> = rows.iter().filter_map(|r| r.price).collect();
        assert_eq!(prices, vec![9.5]);

        let clicks = browser.clicks();
        assert_eq!(clicks.len(), 1);
        assert!(clicks[0].starts_with(".order-book-table_buyTable__xqBVW + "));
    }
}
