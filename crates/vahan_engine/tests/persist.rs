use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vahan_core::{SelectOption, Selection};
use vahan_engine::{
    all_pages_filename, encode_csv, ensure_output_dir, raw_fragment_filename, sanitize_part,
    write_scrape_artifacts, AtomicFileWriter, ScrapeResult, TableFragment,
};

fn selection(y: &str, x: &str, year: &str) -> Selection {
    Selection {
        y: SelectOption::new("1", y),
        x: SelectOption::new("2", x),
        year: SelectOption::new("3", year),
    }
}

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("raw_responses");
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn file_in_place_of_output_dir_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("table.csv", "data").is_err());
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "x");
}

#[test]
fn atomic_write_replaces_existing_content() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("table.csv", "old").unwrap();
    let second = writer.write("table.csv", "new").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "new");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn filenames_are_sanitized_per_part() {
    let sel = selection("Vehicle Class", "Month Wise", "2024");
    assert_eq!(raw_fragment_filename(&sel), "Vehicle_Class_Month_Wise_2024.html");
    assert_eq!(
        all_pages_filename(&sel, "csv"),
        "Vehicle_Class_Month_Wise_ALLPAGES_2024.csv"
    );

    assert_eq!(sanitize_part("  Fuel / Norms : BS-VI  "), "Fuel_Norms_BS-VI");
    assert_eq!(sanitize_part("???"), "NA");
    assert_eq!(sanitize_part("con"), "con_");
    assert_eq!(sanitize_part(&"x".repeat(120)).len(), 80);
}

#[test]
fn csv_quotes_only_where_needed() {
    let csv = encode_csv(
        &["Maker".to_string(), "Note".to_string()],
        &[
            vec!["Acme, Inc.".to_string(), "say \"hi\"".to_string()],
            vec!["Plain".to_string(), "two\nlines".to_string()],
        ],
    );
    assert_eq!(
        csv,
        "Maker,Note\n\"Acme, Inc.\",\"say \"\"hi\"\"\"\nPlain,\"two\nlines\"\n"
    );
}

#[test]
fn artifacts_are_written_for_a_populated_table() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("out"));
    let result = ScrapeResult {
        selection: selection("Maker", "Y-Wise", "2023"),
        table: TableFragment::new(
            vec!["Maker".to_string(), "Total".to_string()],
            vec![vec!["Acme".to_string(), "5".to_string()]],
        ),
        raw_fragment: "<div id=\"combTablePnl\"></div>".to_string(),
    };

    let paths = write_scrape_artifacts(&writer, &result).unwrap();
    assert_eq!(
        fs::read_to_string(&paths.raw_fragment).unwrap(),
        "<div id=\"combTablePnl\"></div>"
    );
    assert_eq!(
        fs::read_to_string(paths.csv.unwrap()).unwrap(),
        "Maker,Total\nAcme,5\n"
    );
    assert!(paths.combined_html.unwrap().ends_with("Maker_Y-Wise_ALLPAGES_2023.html"));
}

#[test]
fn empty_table_writes_only_the_raw_fragment() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    let result = ScrapeResult {
        selection: selection("Maker", "Y-Wise", "2023"),
        table: TableFragment::default(),
        raw_fragment: "<div>No records found.</div>".to_string(),
    };

    let paths = write_scrape_artifacts(&writer, &result).unwrap();
    assert!(paths.raw_fragment.exists());
    assert_eq!(paths.combined_html, None);
    assert_eq!(paths.csv, None);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}
