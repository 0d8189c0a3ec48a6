//! Table flattening and permissive cell parsing shared by the page parsers.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// Every table in the document as rows of normalized cell text, in
/// document order.
///
/// Rows and cells belong to their nearest table only, so layout tables
/// wrapping a data table don't swallow its rows.
pub(crate) fn tables(document: &Html) -> Vec<Vec<Vec<String>>> {
    document
        .select(&TABLE_SELECTOR)
        .map(|table| {
            table
                .select(&ROW_SELECTOR)
                .filter(|row| nearest_table(row).map(|t| t.id()) == Some(table.id()))
                .map(|row| row_cells(&row))
                .filter(|cells| !cells.is_empty())
                .collect()
        })
        .collect()
}

fn nearest_table<'a>(row: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

fn row_cells(row: &ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .map(|cell| normalize_text(&cell.text().collect::<String>()))
        .collect()
}

/// Collapses runs of whitespace (including non-breaking spaces) to one space.
pub(crate) fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a class count: trims, drops thousands separators, accepts `12` and `12.0`.
pub(crate) fn parse_count(cell: &str) -> Option<u32> {
    let cleaned: String = cell.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if let Ok(n) = cleaned.parse::<u32>() {
        return Some(n);
    }
    let value = cleaned.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
        .then_some(value as u32)
}

/// Parses a percentage cell such as `" 87.5 %"`.
pub(crate) fn parse_percentage(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| *c != '%' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
