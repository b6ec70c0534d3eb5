//! Pagination controls on the order-book page, read from page snapshots.
//!
//! Each side of the book renders its own Ant Design pager. The page runs a
//! chain of increasingly generic selectors per side, because the generated
//! wrapper class names change between site builds while `.ant-pagination`
//! does not. When a generic candidate matches several pagers at once, the
//! side decides which occurrence to take: the first for the sell-classed
//! table, the last for the buy-classed one.

use crate::browser::Locator;
use crate::extract::{sel, InvalidSelector};
use scraper::{ElementRef, Html};

const PAGE_ITEM: &str = ".ant-pagination-item";
const ACTIVE_ITEM: &str = ".ant-pagination-item-active";
pub const NEXT_ARROW: &str = ".ant-pagination-next";

/// Find the pager for a side and read its page count. `Ok(None)` when the
/// snapshot has no pager at all, which is how a single-page book looks.
pub fn setup(
    doc: &Html,
    candidates: &[&str],
    pick_last: bool,
) -> Result<Option<(Locator, u32)>, InvalidSelector> {
    let Some(pager) = locate_pager(doc, candidates, pick_last)? else {
        return Ok(None);
    };
    let max = max_page(doc, &pager)?;
    Ok(Some((pager, max)))
}

pub fn locate_pager(
    doc: &Html,
    candidates: &[&str],
    pick_last: bool,
) -> Result<Option<Locator>, InvalidSelector> {
    for css in candidates {
        let matches = doc.select(&sel(css)?).count();
        if matches > 0 {
            let index = if pick_last { matches - 1 } else { 0 };
            return Ok(Some(Locator {
                css: (*css).to_string(),
                index,
            }));
        }
    }
    Ok(None)
}

/// Highest page number advertised by the pager's numbered items. Items carry
/// the page number in their `title` attribute; items without a parseable
/// title (ellipsis jumpers, the arrows) are ignored. No parseable items
/// means a single page.
pub fn max_page(doc: &Html, pager: &Locator) -> Result<u32, InvalidSelector> {
    let Some(scope) = resolve(doc, pager)? else {
        return Ok(1);
    };
    let items = sel(PAGE_ITEM)?;
    let max = scope
        .select(&items)
        .filter_map(|item| item.attr("title")?.trim().parse::<u32>().ok())
        .max();
    Ok(max.unwrap_or(1))
}

/// Page number the pager currently marks active, if any.
pub fn active_page(doc: &Html, pager: &Locator) -> Result<Option<u32>, InvalidSelector> {
    let Some(scope) = resolve(doc, pager)? else {
        return Ok(None);
    };
    let active = sel(ACTIVE_ITEM)?;
    Ok(scope
        .select(&active)
        .next()
        .and_then(|item| item.attr("title")?.trim().parse::<u32>().ok()))
}

/// Locate the clickable item for page `n` inside the pager scope.
///
/// Tries named selectors first, then matches numbered items by their text,
/// then falls back to position (item `n` is usually the n-th numbered item).
/// The returned locator is relative to the pager scope so a click resolves
/// against the same side's pager in the live page.
pub fn locate_page_item(
    doc: &Html,
    pager: &Locator,
    n: u32,
) -> Result<Option<Locator>, InvalidSelector> {
    let Some(scope) = resolve(doc, pager)? else {
        return Ok(None);
    };

    let named = [
        format!(".ant-pagination-item-{}", n),
        format!("[title='{}']", n),
        format!("li[title='{}']", n),
        format!("a[title='{}']", n),
        format!("button[title='{}']", n),
    ];
    for css in &named {
        if scope.select(&sel(css)?).next().is_some() {
            return Ok(Some(Locator::first(css)));
        }
    }

    let items = sel(PAGE_ITEM)?;
    let want = n.to_string();
    for (i, item) in scope.select(&items).enumerate() {
        if item.text().collect::<String>().trim() == want {
            return Ok(Some(Locator::nth(PAGE_ITEM, i)));
        }
    }

    let count = scope.select(&items).count();
    let index = (n as usize).saturating_sub(1);
    if n >= 1 && index < count {
        return Ok(Some(Locator::nth(PAGE_ITEM, index)));
    }

    Ok(None)
}

/// The pager's next arrow, when present and not disabled.
pub fn next_arrow(doc: &Html, pager: &Locator) -> Result<Option<Locator>, InvalidSelector> {
    let Some(scope) = resolve(doc, pager)? else {
        return Ok(None);
    };
    let next = sel(NEXT_ARROW)?;
    match scope.select(&next).next() {
        Some(item) if item.attr("aria-disabled") != Some("true") => {
            Ok(Some(Locator::first(NEXT_ARROW)))
        }
        _ => Ok(None),
    }
}

fn resolve<'a>(doc: &'a Html, loc: &Locator) -> Result<Option<ElementRef<'a>>, InvalidSelector> {
    Ok(doc.select(&sel(&loc.css)?).nth(loc.index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures;
    use crate::extract::orderbook::{BAN_SIDE, MUA_SIDE};
    use scraper::Html;

    fn book_with_pagers(sell_pager: &str, buy_pager: &str) -> Html {
        Html::parse_document(&fixtures::book_page(
            &fixtures::sell_table(&[]),
            sell_pager,
            &fixtures::buy_table(&[]),
            buy_pager,
        ))
    }

    #[test]
    fn test_setup_reads_max_page() {
        let doc = book_with_pagers(&fixtures::pager(5, 1), &fixtures::pager(3, 1));

        let (sell, sell_max) = setup(&doc, MUA_SIDE.pager_candidates, MUA_SIDE.pager_pick_last)
            .unwrap()
            .unwrap();
        let (buy, buy_max) = setup(&doc, BAN_SIDE.pager_candidates, BAN_SIDE.pager_pick_last)
            .unwrap()
            .unwrap();

        assert_eq!(sell_max, 5);
        assert_eq!(buy_max, 3);
        assert_ne!((sell.css.clone(), sell.index), (buy.css.clone(), buy.index));
    }

    #[test]
    fn test_no_pager_means_single_page() {
        let doc = book_with_pagers("", "");
        let found = setup(&doc, MUA_SIDE.pager_candidates, MUA_SIDE.pager_pick_last).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_generic_candidate_scopes_by_occurrence() {
        // No site wrapper classes anywhere, so both sides fall through to the
        // shared `.ant-pagination` candidate and must split by occurrence.
        let html = format!(
            "<html><body>\
             <table><tbody></tbody></table><ul class=\"ant-pagination\">\
             <li title=\"1\" class=\"ant-pagination-item ant-pagination-item-1\">1</li>\
             <li title=\"2\" class=\"ant-pagination-item ant-pagination-item-2\">2</li>\
             </ul>\
             <table><tbody></tbody></table><ul class=\"ant-pagination\">\
             <li title=\"1\" class=\"ant-pagination-item ant-pagination-item-1\">1</li>\
             </ul>\
             </body></html>"
        );
        let doc = Html::parse_document(&html);

        let sell = locate_pager(&doc, MUA_SIDE.pager_candidates, MUA_SIDE.pager_pick_last)
            .unwrap()
            .unwrap();
        let buy = locate_pager(&doc, BAN_SIDE.pager_candidates, BAN_SIDE.pager_pick_last)
            .unwrap()
            .unwrap();

        assert_eq!(sell.css, ".ant-pagination");
        assert_eq!(sell.index, 0);
        assert_eq!(buy.css, ".ant-pagination");
        assert_eq!(buy.index, 1);
        assert_eq!(max_page(&doc, &sell).unwrap(), 2);
        assert_eq!(max_page(&doc, &buy).unwrap(), 1);
    }

    #[test]
    fn test_active_page() {
        let doc = book_with_pagers(&fixtures::pager(5, 3), &fixtures::pager(2, 1));
        let (sell, _) = setup(&doc, MUA_SIDE.pager_candidates, MUA_SIDE.pager_pick_last)
            .unwrap()
            .unwrap();
        assert_eq!(active_page(&doc, &sell).unwrap(), Some(3));
    }

    #[test]
    fn test_locate_page_item_prefers_named_selector() {
        let doc = book_with_pagers(&fixtures::pager(5, 1), "");
        let (pager, _) = setup(&doc, MUA_SIDE.pager_candidates, MUA_SIDE.pager_pick_last)
            .unwrap()
            .unwrap();

        let item = locate_page_item(&doc, &pager, 3).unwrap().unwrap();
        assert_eq!(item.css, ".ant-pagination-item-3");
        assert_eq!(item.index, 0);
    }

    #[test]
    fn test_locate_page_item_text_fallback() {
        let doc = book_with_pagers(&fixtures::bare_pager(5, 1), "");
        let (pager, _) = setup(&doc, MUA_SIDE.pager_candidates, MUA_SIDE.pager_pick_last)
            .unwrap()
            .unwrap();

        let item = locate_page_item(&doc, &pager, 3).unwrap().unwrap();
        assert_eq!(item.css, PAGE_ITEM);
        assert_eq!(item.index, 2);
    }

    #[test]
    fn test_locate_page_item_positional_fallback() {
        // Items with neither titles nor numeric text, so only position works.
        let html = "<html><body><div class=\"order-book-table_paginationWrapper__O_FJg\">\
                    <ul class=\"ant-pagination\">\
                    <li class=\"ant-pagination-item\"><a>•</a></li>\
                    <li class=\"ant-pagination-item\"><a>•</a></li>\
                    <li class=\"ant-pagination-item\"><a>•</a></li>\
                    </ul></div></body></html>";
        let doc = Html::parse_document(html);
        let pager = Locator::first(".order-book-table_paginationWrapper__O_FJg");

        let item = locate_page_item(&doc, &pager, 2).unwrap().unwrap();
        assert_eq!(item.css, PAGE_ITEM);
        assert_eq!(item.index, 1);

        assert!(locate_page_item(&doc, &pager, 4).unwrap().is_none());
    }

    #[test]
    fn test_next_arrow_found_unless_disabled() {
        let doc = book_with_pagers(&fixtures::pager(5, 1), "");
        let (pager, _) = setup(&doc, MUA_SIDE.pager_candidates, MUA_SIDE.pager_pick_last)
            .unwrap()
            .unwrap();
        assert!(next_arrow(&doc, &pager).unwrap().is_some());

        let disabled = "<html><body><ul class=\"ant-pagination\">\
                        <li title=\"1\" class=\"ant-pagination-item\">1</li>\
                        <li class=\"ant-pagination-next\" aria-disabled=\"true\"><button></button></li>\
                        </ul></body></html>";
        let doc = Html::parse_document(disabled);
        let pager = Locator::first(".ant-pagination");
        assert!(next_arrow(&doc, &pager).unwrap().is_none());
    }
}
