use scraper::{ElementRef, Html, Selector};
use scrape_logging::scrape_warn;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const EMPTY_MESSAGE_CLASS: &str = "ui-datatable-empty-message";

/// Header row plus data rows. After [`TableFragment::normalized`] every row
/// has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableFragment {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableFragment {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Pad short rows with empty cells and truncate long ones to the header
    /// width. Without headers, positional `col_N` headers sized to the widest
    /// row are synthesized first.
    pub fn normalized(mut self) -> Self {
        if self.headers.is_empty() {
            let widest = self.rows.iter().map(Vec::len).max().unwrap_or(0);
            self.headers = positional_headers(widest);
        }
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        self
    }
}

/// Parse a data-table fragment into headers and rows.
///
/// The body is the `tbody` whose id ends in `_data`, else the first `tbody`.
/// Headers come from the `thead` whose id ends in `_head` (else the first
/// `thead`), preferring `role="columnheader"` cells over the widest header
/// row. Blank headers are inferred from the first data row when it looks like
/// the month-wise maker report, and fall back to positional names otherwise.
pub fn parse_table(fragment_html: &str) -> TableFragment {
    let doc = Html::parse_fragment(&wrap_bare_rows(fragment_html));

    let rows = find_body(&doc).map(body_rows).unwrap_or_default();
    let mut headers = find_head(&doc).map(head_cells).unwrap_or_default();

    if headers.iter().all(|h| h.is_empty()) {
        headers = rows
            .first()
            .and_then(|first| infer_headers(first))
            .unwrap_or_default();
        if headers.is_empty() && !rows.is_empty() {
            scrape_warn!("table has no usable headers; falling back to positional names");
        }
    }

    TableFragment::new(headers, rows).normalized()
}

/// Body rows only, unnormalized. Page responses re-render the body alone.
pub fn parse_body_rows(fragment_html: &str) -> Vec<Vec<String>> {
    let doc = Html::parse_fragment(&wrap_bare_rows(fragment_html));
    find_body(&doc).map(body_rows).unwrap_or_default()
}

/// Synthesize the combined "all pages" document for a table.
pub fn render_table_html(table: &TableFragment) -> String {
    let mut out = String::from("<table id=\"combinedFull\"><thead><tr>");
    for header in &table.headers {
        out.push_str("<th>");
        out.push_str(&html_escape::encode_text(header));
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(&html_escape::encode_text(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

/// Collapse whitespace (non-breaking spaces included) and drop thousands
/// separators from cells made only of digits and commas.
pub fn clean_cell_text(raw: &str) -> String {
    let collapsed = raw
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if is_numeric(&collapsed) {
        collapsed.replace(',', "")
    } else {
        collapsed
    }
}

fn is_numeric(cell: &str) -> bool {
    cell.bytes().any(|b| b.is_ascii_digit()) && cell.bytes().all(|b| b.is_ascii_digit() || b == b',')
}

fn is_serial(cell: &str) -> bool {
    !cell.is_empty() && cell.bytes().all(|b| b.is_ascii_digit())
}

/// Month-wise maker report: `S No, Maker, JAN..DEC, TOTAL`. Shorter rows are
/// read as a partial year with the last column holding the total.
fn infer_headers(first: &[String]) -> Option<Vec<String>> {
    if first.len() < 5 || !is_serial(&first[0]) || is_numeric(&first[1]) {
        return None;
    }
    let month_count = if first.len() >= 14 {
        MONTHS.len()
    } else {
        first.len() - 3
    };
    let mut headers = vec!["S No".to_string(), "Maker".to_string()];
    headers.extend(MONTHS[..month_count].iter().map(|m| m.to_string()));
    headers.push("TOTAL".to_string());
    Some(headers)
}

fn positional_headers(width: usize) -> Vec<String> {
    (0..width).map(|i| format!("col_{i}")).collect()
}

/// Page responses carry bare `<tr>` rows, which an HTML parser drops outside
/// a table context.
fn wrap_bare_rows(fragment: &str) -> String {
    let lower = fragment.to_ascii_lowercase();
    if lower.contains("<tr") && !lower.contains("<table") {
        format!("<table><tbody>{fragment}</tbody></table>")
    } else {
        fragment.to_string()
    }
}

fn first_match<'a>(doc: &'a Html, preferred: &str, fallback: &str) -> Option<ElementRef<'a>> {
    let preferred = Selector::parse(preferred).ok();
    let fallback = Selector::parse(fallback).ok();
    preferred
        .as_ref()
        .and_then(|sel| doc.select(sel).next())
        .or_else(|| fallback.as_ref().and_then(|sel| doc.select(sel).next()))
}

fn find_body(doc: &Html) -> Option<ElementRef<'_>> {
    first_match(doc, "tbody[id$='_data']", "tbody")
}

fn find_head(doc: &Html) -> Option<ElementRef<'_>> {
    first_match(doc, "thead[id$='_head']", "thead")
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    names: &'a [&'a str],
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| names.contains(&el.value().name()))
}

fn cell_texts(row: ElementRef<'_>) -> Vec<String> {
    child_elements(row, &["td", "th"])
        .map(|cell| clean_cell_text(&cell.text().collect::<String>()))
        .collect()
}

fn body_rows(body: ElementRef<'_>) -> Vec<Vec<String>> {
    child_elements(body, &["tr"])
        .filter(|tr| !tr.value().classes().any(|c| c == EMPTY_MESSAGE_CLASS))
        .map(cell_texts)
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect()
}

fn head_cells(head: ElementRef<'_>) -> Vec<String> {
    let role_headers: Vec<String> =
        Selector::parse("th[role='columnheader'], td[role='columnheader']")
            .ok()
            .map(|sel| {
                head.select(&sel)
                    .map(|cell| clean_cell_text(&cell.text().collect::<String>()))
                    .collect()
            })
            .unwrap_or_default();
    if !role_headers.is_empty() {
        return role_headers;
    }

    child_elements(head, &["tr"])
        .map(cell_texts)
        .max_by_key(Vec::len)
        .unwrap_or_default()
}
