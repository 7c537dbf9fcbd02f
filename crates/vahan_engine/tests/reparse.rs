use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vahan_engine::{reparse_directory, ReparseOptions};

const SAVED_ENVELOPE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<partial-response><changes>
<update id="combTablePnl"><![CDATA[<table><thead><tr><th role="columnheader">Maker</th><th role="columnheader">Total</th></tr></thead><tbody id="groupingTable_data"><tr><td>Acme</td><td>1,000</td></tr><tr><td>Zenith</td><td>20</td></tr></tbody></table>]]></update>
<update id="msg"><![CDATA[<span>ok</span>]]></update>
<update id="j_id1:javax.faces.ViewState:0"><![CDATA[-1:2]]></update>
</changes></partial-response>"#;

const SAVED_TABLE: &str = "<table id=\"combinedFull\"><thead><tr><th>Maker</th><th>Total</th></tr></thead><tbody><tr><td>Orbit</td><td>3</td></tr></tbody></table>";

fn options() -> ReparseOptions {
    ReparseOptions {
        generated_utc: "2026-10-17T00:00:00Z".to_string(),
        ..ReparseOptions::default()
    }
}

#[test]
fn saved_responses_become_csvs_an_aggregate_and_a_manifest() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a_envelope.html"), SAVED_ENVELOPE).unwrap();
    fs::write(temp.path().join("b_table.html"), SAVED_TABLE).unwrap();
    fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

    let summary = reparse_directory(temp.path(), options()).unwrap();

    assert_eq!(summary.files_scanned, 2);
    assert_eq!(summary.tables.len(), 2);
    assert_eq!(summary.aggregate_rows, 3);
    assert_eq!(
        fs::read_to_string(temp.path().join("a_envelope.csv")).unwrap(),
        "Maker,Total\nAcme,1000\nZenith,20\n"
    );
    assert_eq!(
        fs::read_to_string(summary.aggregate_path.unwrap()).unwrap(),
        "SourceFile,Maker,Total\na_envelope.csv,Acme,1000\na_envelope.csv,Zenith,20\nb_table.csv,Orbit,3\n"
    );

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(summary.manifest_path.unwrap()).unwrap())
            .unwrap();
    assert_eq!(manifest["generated_utc"], "2026-10-17T00:00:00Z");
    assert_eq!(manifest["aggregate_rows"], 3);
    assert_eq!(manifest["tables"][0]["source_file"], "a_envelope.html");
    assert_eq!(manifest["tables"][0]["csv"], "a_envelope.csv");
    assert_eq!(manifest["tables"][1]["rows"], 1);
}

#[test]
fn several_table_updates_get_numbered_csvs() {
    let temp = TempDir::new().unwrap();
    let xml = "<partial-response><changes>\
        <update id=\"combTablePnl\"><![CDATA[<table><tbody><tr><td>a</td></tr></tbody></table>]]></update>\
        <update id=\"groupingTable\"><![CDATA[<tr><td>b</td></tr>]]></update>\
        </changes></partial-response>";
    fs::write(temp.path().join("paged.html"), xml).unwrap();

    let summary = reparse_directory(temp.path(), options()).unwrap();

    let names: Vec<String> = summary
        .tables
        .iter()
        .map(|t| t.csv_path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["paged_1.csv", "paged_2.csv"]);
}

#[test]
fn directory_without_tables_writes_no_aggregate() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("empty.html"), "<html><body>nothing</body></html>").unwrap();

    let summary = reparse_directory(temp.path(), options()).unwrap();
    assert!(summary.tables.is_empty());
    assert_eq!(summary.aggregate_path, None);
    assert!(!temp.path().join("all_data.csv").exists());
    assert!(summary.manifest_path.is_some());
}
