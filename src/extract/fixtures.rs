//! Hand-built snapshots of the site's rendered markup, shaped like the real
//! pre-market pages (generated Ant Design class names included) so extractor
//! tests exercise the same selector chains production does.

use chrono::{NaiveDate, NaiveDateTime};

pub fn stamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

// ── Order-book rows ───────────────────────────────────────────────────────────

/// One data row with the sell-classed price cell (the side whose action
/// button reads "Mua").
pub fn order_row(price: &str, quantity: &str, total: &str, button: Option<&str>) -> String {
    row_for("order-book-table_sellPrice__xAuZe", price, quantity, total, button)
}

pub fn row_for(
    price_class: &str,
    price: &str,
    quantity: &str,
    total: &str,
    button: Option<&str>,
) -> String {
    let action = match button {
        Some(label) => format!(
            "<td><button type=\"button\" class=\"ant-btn\"><span>{label}</span></button></td>"
        ),
        None => String::new(),
    };
    format!(
        "<tr class=\"ant-table-row\">\
         <td><span class=\"{price_class}\">{price}</span></td>\
         <td><span class=\"order-book-table_content__ZSAZ_\">{quantity}</span></td>\
         <td><span class=\"order-book-table_content__ZSAZ_\">{total}</span></td>\
         {action}\
         </tr>"
    )
}

/// A table wrapper in the site's shape: the generated wrapper class on a
/// div around a real `<table>`.
pub fn side_table(wrapper_class: &str, rows: &[String]) -> String {
    format!(
        "<div class=\"{wrapper_class}\"><table>\
         <tbody class=\"ant-table-tbody\">{}</tbody>\
         </table></div>",
        rows.join("")
    )
}

pub fn sell_table(rows: &[String]) -> String {
    side_table("order-book-table_sellTable__Dxd2s", rows)
}

pub fn buy_table(rows: &[String]) -> String {
    side_table("order-book-table_buyTable__xqBVW", rows)
}

// ── Pagination ────────────────────────────────────────────────────────────────

/// An Ant pagination control with numbered items 1..=max inside the site's
/// wrapper div. Every item carries both the numbered class and a title.
pub fn pager(max: u32, active: u32) -> String {
    let mut items = String::new();
    for p in 1..=max {
        let active_class = if p == active {
            " ant-pagination-item-active"
        } else {
            ""
        };
        items.push_str(&format!(
            "<li title=\"{p}\" class=\"ant-pagination-item ant-pagination-item-{p}{active_class}\"><a rel=\"nofollow\">{p}</a></li>"
        ));
    }
    format!(
        "<div class=\"order-book-table_paginationWrapper__O_FJg\">\
         <ul class=\"ant-pagination\">{items}\
         <li class=\"ant-pagination-next\"><button type=\"button\" class=\"ant-pagination-item-link\"></button></li>\
         </ul></div>"
    )
}

/// Like `pager`, but the numbered items carry neither the per-page class nor
/// a title attribute, only text. Forces the text/positional fallbacks.
pub fn bare_pager(max: u32, active: u32) -> String {
    let mut items = String::new();
    for p in 1..=max {
        let active_class = if p == active {
            " ant-pagination-item-active"
        } else {
            ""
        };
        items.push_str(&format!(
            "<li class=\"ant-pagination-item{active_class}\"><a>{p}</a></li>"
        ));
    }
    format!(
        "<div class=\"order-book-table_paginationWrapper__O_FJg\">\
         <ul class=\"ant-pagination\">{items}</ul></div>"
    )
}

// ── Whole pages ───────────────────────────────────────────────────────────────

/// Order-book page in document order: sell table, its pager, buy table, its
/// pager.
pub fn book_page(sell: &str, sell_pager: &str, buy: &str, buy_pager: &str) -> String {
    format!(
        "<html><head><title>Pre-Market</title></head><body><div id=\"app\">\
         {sell}{sell_pager}{buy}{buy_pager}\
         </div></body></html>"
    )
}

/// Listing hub page with the tab panel the crawl waits for.
pub fn listing_page(items: &[String]) -> String {
    format!(
        "<html><body><div id=\"rc-tabs-0-panel-1\">\
         <ul class=\"ant-list-items\">{}</ul>\
         </div></body></html>",
        items.join("")
    )
}

/// One hub card: symbol line, display-name element, then free card text
/// (labels, figures, schedule) the way the site renders it.
pub fn listing_item(symbol: &str, name: &str, body: &str) -> String {
    format!(
        "<li class=\"ant-list-item\">\
         <div class=\"trade-list-item_currency__GO5BC\">{symbol}</div>\
         <div class=\"trade-list-item_fullCurrency__UGLmN\">{name}</div>\
         <div class=\"trade-list-item_info__Q1GHW\">{body}</div>\
         </li>"
    )
}
