use crate::extract::cleaner::parse_amount;
use crate::extract::{sel, text_content, InvalidSelector};
use crate::models::{OrderLevel, Side};
use chrono::NaiveDateTime;
use scraper::{ElementRef, Selector};

/// Generated class wrapping the value inside quantity/total cells. Later
/// pages of the paginated grid sometimes drop it, which is why every cell
/// read falls back to the cell's own text.
pub const CONTENT_CELL: &str = ".order-book-table_content__ZSAZ_";

// ── Selectors ─────────────────────────────────────────────────────────────────

/// Compiled selectors shared by every row of one side's table.
pub struct RowSelectors {
    pub td: Selector,
    pub price: Selector,
    pub content: Selector,
    pub button: Selector,
    pub span: Selector,
}

impl RowSelectors {
    /// `price_css` is the side-specific generated class for the price cell.
    pub fn with_price(price_css: &str) -> Result<Self, InvalidSelector> {
        Ok(Self {
            td: sel("td")?,
            price: sel(price_css)?,
            content: sel(CONTENT_CELL)?,
            button: sel("button")?,
            span: sel("span")?,
        })
    }
}

// ── Row classifier ────────────────────────────────────────────────────────────

/// True when the row is an Ant Design layout-measurement artifact rather than
/// data. First match wins:
/// 1. `aria-hidden="true"`
/// 2. class list carries `ant-table-measure-row`
/// 3. inline style pins both height and font-size to 0px
/// 4. the first three cells are blank (NBSP counts as blank) and the first
///    cell's inline style pins its height to zero
pub fn is_measurement_row(row: &ElementRef, cells: &[ElementRef]) -> bool {
    if row.value().attr("aria-hidden") == Some("true") {
        return true;
    }

    if row
        .value()
        .classes()
        .any(|c| c == "ant-table-measure-row")
    {
        return true;
    }

    let style = row.value().attr("style").unwrap_or("");
    if style.contains("height: 0px") && style.contains("font-size: 0px") {
        return true;
    }

    if cells.len() >= 3 {
        // str::trim covers U+00A0, the NBSP these rows are padded with
        let blank = cells[..3]
            .iter()
            .all(|c| c.text().collect::<String>().trim().is_empty());
        let flattened = cells[0]
            .value()
            .attr("style")
            .is_some_and(|s| s.contains("height: 0"));
        if blank && flattened {
            return true;
        }
    }

    false
}

// ── Cell normalizer ───────────────────────────────────────────────────────────

/// First non-empty trimmed text among descendant matches of each selector in
/// order, else the cell's own text, else empty. Raw text only; numeric
/// coercion happens in the row parser.
pub fn cell_text(cell: &ElementRef, preferred: &[&Selector]) -> String {
    for selector in preferred {
        for found in cell.select(selector) {
            let text = text_content(&found);
            if !text.is_empty() {
                return text;
            }
        }
    }
    text_content(cell)
}

// ── Row parser ────────────────────────────────────────────────────────────────

/// One `<tr>` → one order level, or None for measurement rows, short rows,
/// and rows with neither a price nor a quantity. The side comes from the
/// row's action button when it carries one of the two known labels, else
/// from `expected`. Fields that fail numeric coercion stay None; a row with
/// only the total missing is still kept.
pub fn parse_order_row(
    symbol: &str,
    row: &ElementRef,
    sels: &RowSelectors,
    expected: Side,
    captured_at: NaiveDateTime,
) -> Option<OrderLevel> {
    let cells: Vec<ElementRef> = row.select(&sels.td).collect();

    if is_measurement_row(row, &cells) {
        return None;
    }
    if cells.len() < 3 {
        return None;
    }

    let price_text = cell_text(&cells[0], &[&sels.price, &sels.content]);
    let quantity_text = cell_text(&cells[1], &[&sels.content]);
    let total_text = cell_text(&cells[2], &[&sels.content]);

    if price_text.is_empty() && quantity_text.is_empty() {
        return None;
    }

    Some(OrderLevel {
        symbol: symbol.to_string(),
        side: row_side(row, sels).unwrap_or(expected),
        price: parse_amount(&price_text),
        quantity: parse_amount(&quantity_text),
        total: parse_amount(&total_text),
        captured_at,
    })
}

fn row_side(row: &ElementRef, sels: &RowSelectors) -> Option<Side> {
    let button = row.select(&sels.button).next()?;
    Side::from_label(&text_content(&button)).or_else(|| {
        let span = button.select(&sels.span).next()?;
        Side::from_label(&text_content(&span))
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
