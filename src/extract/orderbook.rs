//! Order-book side tables.
//!
//! The page renders two tables whose generated wrapper classes are named for
//! the *maker* side: the sell-classed table lists asks you can hit with the
//! "Mua" (buy) button, the buy-classed table lists bids with "Bán" (sell)
//! buttons. Rows are tagged with the button label, so the wrapper naming
//! inversion never leaks into stored data.

use crate::extract::rows::{parse_order_row, RowSelectors};
use crate::extract::{sel, InvalidSelector};
use crate::models::{OrderLevel, Side};
use chrono::NaiveDateTime;
use scraper::Html;

/// Selector bundle for one side of the book. Literal generated class names
/// from the current site build; when MEXC ships a new CSS-module hash these
/// strings are what to refresh.
pub struct SideSpec {
    pub side: Side,
    pub wrapper: &'static str,
    pub price_cell: &'static str,
    pub pager_candidates: &'static [&'static str],
    pub pager_pick_last: bool,
}

pub const MUA_SIDE: SideSpec = SideSpec {
    side: Side::Mua,
    wrapper: ".order-book-table_sellTable__Dxd2s",
    price_cell: ".order-book-table_sellPrice__xAuZe",
    pager_candidates: &[
        ".order-book-table_paginationWrapper__O_FJg:first-of-type",
        ".order-book-table_sellTable__Dxd2s + .order-book-table_paginationWrapper__O_FJg",
        ".ant-pagination",
        "[class*='pagination']",
    ],
    pager_pick_last: false,
};

pub const BAN_SIDE: SideSpec = SideSpec {
    side: Side::Ban,
    wrapper: ".order-book-table_buyTable__xqBVW",
    price_cell: ".order-book-table_buyPrice__uY0OB",
    pager_candidates: &[
        ".order-book-table_buyTable__xqBVW .order-book-table_paginationWrapper__O_FJg",
        ".order-book-table_buyTable__xqBVW + .order-book-table_paginationWrapper__O_FJg",
        ".order-book-table_paginationWrapper__O_FJg:last-of-type",
        ".ant-pagination",
        "[class*='pagination']",
    ],
    pager_pick_last: true,
};

/// Crawl order: the Mua-labelled side first, like the page lays them out.
pub const SIDES: [&SideSpec; 2] = [&MUA_SIDE, &BAN_SIDE];

/// An order-book page is ready once either side's table wrapper rendered.
/// A dead or 404'd token page never grows one.
pub fn book_ready(doc: &Html) -> Result<bool, InvalidSelector> {
    let sell = sel(MUA_SIDE.wrapper)?;
    let buy = sel(BAN_SIDE.wrapper)?;
    Ok(doc.select(&sell).next().is_some() || doc.select(&buy).next().is_some())
}

/// Every order row from one side, in table order (best price first). A
/// missing wrapper is a side with zero open orders, not an error.
pub fn extract_side(
    doc: &Html,
    spec: &SideSpec,
    symbol: &str,
    captured_at: NaiveDateTime,
) -> Result<Vec<OrderLevel>, InvalidSelector> {
    let wrapper = sel(spec.wrapper)?;
    let rows = sel("tr")?;
    let sels = RowSelectors::with_price(spec.price_cell)?;

    let Some(table) = doc.select(&wrapper).next() else {
        return Ok(Vec::new());
    };

    Ok(table
        .select(&rows)
        .filter_map(|row| parse_order_row(symbol, &row, &sels, spec.side, captured_at))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures;

    fn two_sided_page() -> Html {
        let sell_rows = vec![
            fixtures::row_for(
                "order-book-table_sellPrice__xAuZe",
                "1.2345",
                "10.5K",
                "12,960.22",
                Some("Mua"),
            ),
            fixtures::row_for(
                "order-book-table_sellPrice__xAuZe",
                "1.3000",
                "500",
                "650",
                Some("Mua"),
            ),
        ];
        let buy_rows = vec![fixtures::row_for(
            "order-book-table_buyPrice__uY0OB",
            "1.2000",
            "2M",
            "2.4M",
            Some("Bán"),
        )];
        Html::parse_document(&fixtures::book_page(
            &fixtures::sell_table(&sell_rows),
            "",
            &fixtures::buy_table(&buy_rows),
            "",
        ))
    }

    #[test]
    fn test_extract_side_keeps_row_order() {
        let doc = two_sided_page();
        let levels = extract_side(&doc, &MUA_SIDE, "MENTO", fixtures::stamp()).unwrap();

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, Some(1.2345));
        assert_eq!(levels[0].quantity, Some(10_500.0));
        assert_eq!(levels[1].price, Some(1.3));
        assert!(levels.iter().all(|l| l.side == Side::Mua));
        assert!(levels.iter().all(|l| l.symbol == "MENTO"));
    }

    #[test]
    fn test_sides_do_not_bleed_into_each_other() {
        let doc = two_sided_page();
        let buys = extract_side(&doc, &BAN_SIDE, "MENTO", fixtures::stamp()).unwrap();

        assert_eq!(buys.len(), 1);
        assert_eq!(buys[0].side, Side::Ban);
        assert_eq!(buys[0].quantity, Some(2_000_000.0));
    }

    #[test]
    fn test_missing_wrapper_is_empty_not_error() {
        let doc = Html::parse_document(&fixtures::book_page(
            &fixtures::sell_table(&[]),
            "",
            "",
            "",
        ));
        let buys = extract_side(&doc, &BAN_SIDE, "MENTO", fixtures::stamp()).unwrap();
        assert!(buys.is_empty());
    }

    #[test]
    fn test_measurement_rows_dropped_from_side() {
        let measure = "<tr aria-hidden=\"true\" class=\"ant-table-measure-row\">\
                       <td></td><td></td><td></td></tr>"
            .to_string();
        let real = fixtures::row_for(
            "order-book-table_sellPrice__xAuZe",
            "0.5",
            "100",
            "50",
            Some("Mua"),
        );
        let doc = Html::parse_document(&fixtures::book_page(
            &fixtures::sell_table(&[measure, real]),
            "",
            "",
            "",
        ));

        let levels = extract_side(&doc, &MUA_SIDE, "XYZ", fixtures::stamp()).unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, Some(0.5));
    }

    #[test]
    fn test_book_ready() {
        assert!(book_ready(&two_sided_page()).unwrap());

        let blank = Html::parse_document("<html><body><div id=\"app\"></div></body></html>");
        assert!(!book_ready(&blank).unwrap());
    }
}
