use pretty_assertions::assert_eq;
use vahan_engine::{clean_cell_text, parse_body_rows, parse_table, render_table_html, TableFragment};

fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[test]
fn explicit_column_headers_are_preferred() {
    let html = r#"
<div id="combTablePnl"><table>
  <thead id="groupingTable_head">
    <tr><th colspan="3">Maker Wise Data</th></tr>
    <tr><th role="columnheader">S No</th><th role="columnheader">Maker</th><th role="columnheader">Total</th></tr>
  </thead>
  <tbody id="groupingTable_data">
    <tr role="row"><td>1</td><td>Acme, Inc.</td><td>12,345</td></tr>
    <tr role="row"><td>2</td><td>Zenith&nbsp;Motors</td><td>678</td></tr>
  </tbody>
</table></div>"#;

    let table = parse_table(html);
    assert_eq!(table.headers, strings(&["S No", "Maker", "Total"]));
    assert_eq!(
        table.rows,
        vec![
            strings(&["1", "Acme, Inc.", "12345"]),
            strings(&["2", "Zenith Motors", "678"]),
        ]
    );
}

#[test]
fn widest_header_row_is_used_without_role_markers() {
    let html = r#"<table>
  <thead><tr><th>Report</th></tr><tr><th>A</th><th>B</th></tr></thead>
  <tbody><tr><td>x</td><td>y</td></tr></tbody>
</table>"#;
    let table = parse_table(html);
    assert_eq!(table.headers, strings(&["A", "B"]));
    assert_eq!(table.rows, vec![strings(&["x", "y"])]);
}

#[test]
fn month_wise_headers_are_inferred_for_fifteen_cell_rows() {
    let cells: Vec<String> = std::iter::once("1".to_string())
        .chain(std::iter::once("MARUTI SUZUKI INDIA LTD".to_string()))
        .chain((1..=13).map(|n| format!("{},000", n)))
        .collect();
    let row = cells
        .iter()
        .map(|c| format!("<td>{c}</td>"))
        .collect::<String>();
    let html = format!(
        r#"<table><thead id="groupingTable_head"><tr><th></th></tr></thead><tbody id="groupingTable_data"><tr>{row}</tr></tbody></table>"#
    );

    let table = parse_table(&html);
    assert_eq!(
        table.headers,
        strings(&[
            "S No", "Maker", "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT",
            "NOV", "DEC", "TOTAL",
        ])
    );
    assert_eq!(table.rows[0][2], "1000");
    assert_eq!(table.rows[0][14], "13000");
}

#[test]
fn partial_year_rows_get_leading_months_and_total() {
    let html = "<table><tbody><tr><td>1</td><td>HERO</td><td>10</td><td>20</td><td>30</td><td>60</td></tr></tbody></table>";
    let table = parse_table(html);
    assert_eq!(
        table.headers,
        strings(&["S No", "Maker", "JAN", "FEB", "MAR", "TOTAL"])
    );
}

#[test]
fn unrecognized_rows_get_positional_headers_and_are_padded() {
    let html = "<table><tbody><tr><td>a</td><td>b</td><td>c</td></tr><tr><td>d</td></tr></tbody></table>";
    let table = parse_table(html);
    assert_eq!(table.headers, strings(&["col_0", "col_1", "col_2"]));
    assert_eq!(
        table.rows,
        vec![strings(&["a", "b", "c"]), strings(&["d", "", ""])]
    );
}

#[test]
fn empty_message_rows_are_not_data() {
    let html = r#"<table><thead><tr><th>Maker</th><th>Total</th></tr></thead>
<tbody id="groupingTable_data"><tr class="ui-widget-content ui-datatable-empty-message"><td colspan="2">No records found.</td></tr></tbody></table>"#;
    let table = parse_table(html);
    assert_eq!(table.headers, strings(&["Maker", "Total"]));
    assert!(table.rows.is_empty());
}

#[test]
fn bare_page_rows_are_parsed() {
    let fragment = r#"<tr data-ri="100" role="row"><td>101</td><td>TATA</td></tr><tr data-ri="101" role="row"><td>102</td><td>BAJAJ</td></tr>"#;
    assert_eq!(
        parse_body_rows(fragment),
        vec![strings(&["101", "TATA"]), strings(&["102", "BAJAJ"])]
    );
}

#[test]
fn cell_cleaning_strips_thousands_separators_only_from_numbers() {
    assert_eq!(clean_cell_text(" 12,345 "), "12345");
    assert_eq!(clean_cell_text("Acme, Inc."), "Acme, Inc.");
    assert_eq!(clean_cell_text("TWO\u{a0} WHEELER\n (NT)"), "TWO WHEELER (NT)");
    assert_eq!(clean_cell_text(","), ",");
}

#[test]
fn parsing_the_rendered_combined_table_gives_the_same_table() {
    let table = TableFragment::new(
        strings(&["Maker", "Total"]),
        vec![
            strings(&["Acme, Inc.", "12345"]),
            strings(&["R&D <Motors>", "7"]),
        ],
    );
    let html = render_table_html(&table);
    assert!(html.starts_with("<table id=\"combinedFull\">"));
    assert_eq!(parse_table(&html), table);
}
