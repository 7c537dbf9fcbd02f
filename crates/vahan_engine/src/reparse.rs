use std::fs;
use std::path::{Path, PathBuf};

use scrape_logging::{scrape_error, scrape_info, scrape_warn};
use serde_json::json;

use crate::decode::decode_body;
use crate::envelope::parse_partial_response;
use crate::pagination::Row;
use crate::persist::{encode_csv, AtomicFileWriter, PersistError};
use crate::table::{parse_table, TableFragment};

/// Update ids that carry the result table.
const TABLE_UPDATE_MARKERS: [&str; 2] = ["combTablePnl", "groupingTable"];

#[derive(Debug, Clone)]
pub struct ReparseOptions {
    pub aggregate_filename: String,
    pub manifest_filename: Option<String>,
    /// Recorded verbatim in the manifest.
    pub generated_utc: String,
}

impl Default for ReparseOptions {
    fn default() -> Self {
        Self {
            aggregate_filename: "all_data.csv".to_string(),
            manifest_filename: Some("manifest.json".to_string()),
            generated_utc: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReparsedTable {
    pub source_file: String,
    pub csv_path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReparseSummary {
    pub files_scanned: usize,
    pub tables: Vec<ReparsedTable>,
    pub aggregate_rows: usize,
    /// Absent when no table had rows.
    pub aggregate_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReparseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Rebuild CSVs from every saved `*.html` response in `dir`.
///
/// Each non-empty table becomes `<stem>.csv` (or `<stem>_<n>.csv` when a
/// file holds several), all rows are gathered into one aggregate CSV with
/// a leading `SourceFile` column, and a JSON manifest lists what was
/// written. A file that cannot be read or written is logged and skipped.
pub fn reparse_directory(dir: &Path, options: ReparseOptions) -> Result<ReparseSummary, ReparseError> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        })
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let writer = AtomicFileWriter::new(dir.to_path_buf());
    let mut tables = Vec::new();
    let mut aggregate_headers: Option<Vec<String>> = None;
    let mut aggregate_rows: Vec<Row> = Vec::new();

    for entry in &entries {
        let path = entry.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                scrape_error!("failed reading {}: {}", path.display(), err);
                continue;
            }
        };
        let text = decode_body(&bytes, None).text;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let fragments = table_fragments(&text, &path);
        let several = fragments.len() > 1;
        for (index, fragment) in fragments.iter().enumerate() {
            let table = parse_table(fragment);
            if table.rows.is_empty() {
                continue;
            }
            let csv_name = if several {
                format!("{stem}_{}.csv", index + 1)
            } else {
                format!("{stem}.csv")
            };
            let csv_path = match writer.write(&csv_name, &encode_csv(&table.headers, &table.rows)) {
                Ok(path) => path,
                Err(err) => {
                    scrape_error!("failed writing {}: {}", csv_name, err);
                    continue;
                }
            };
            scrape_info!(
                "parsed {} -> {} ({} rows)",
                path.display(),
                csv_name,
                table.rows.len()
            );

            aggregate(&mut aggregate_headers, &mut aggregate_rows, &csv_name, &table);
            tables.push(ReparsedTable {
                source_file: entry.file_name().to_string_lossy().into_owned(),
                csv_path,
                rows: table.rows.len(),
                columns: table.headers.len(),
            });
        }
    }

    let aggregate_path = match &aggregate_headers {
        Some(headers) => {
            let path = writer.write(
                &options.aggregate_filename,
                &encode_csv(headers, &aggregate_rows),
            )?;
            scrape_info!(
                "wrote {} ({} rows)",
                path.display(),
                aggregate_rows.len()
            );
            Some(path)
        }
        None => {
            scrape_warn!("no tables extracted from {}", dir.display());
            None
        }
    };

    let manifest_path = if let Some(name) = &options.manifest_filename {
        let manifest = json!({
            "generated_utc": options.generated_utc,
            "files_scanned": entries.len(),
            "aggregate_rows": aggregate_rows.len(),
            "aggregate": aggregate_path.as_ref().map(|_| options.aggregate_filename.clone()),
            "tables": tables.iter().map(|t| {
                json!({
                    "source_file": t.source_file,
                    "csv": t.csv_path.file_name().map(|n| n.to_string_lossy().into_owned()),
                    "rows": t.rows,
                    "columns": t.columns,
                })
            }).collect::<Vec<_>>()
        });
        Some(writer.write(name, &manifest.to_string())?)
    } else {
        None
    };

    Ok(ReparseSummary {
        files_scanned: entries.len(),
        aggregate_rows: aggregate_rows.len(),
        tables,
        aggregate_path,
        manifest_path,
    })
}

/// Table-bearing HTML pieces of one saved response. Partial responses are
/// split into their table updates, falling back to every update; anything
/// else is treated as one document.
fn table_fragments(text: &str, path: &Path) -> Vec<String> {
    if !text.contains("<partial-response") {
        return vec![text.to_string()];
    }
    match parse_partial_response(text) {
        Ok(envelope) => {
            let targeted: Vec<String> = envelope
                .updates
                .iter()
                .filter(|u| TABLE_UPDATE_MARKERS.iter().any(|m| u.id.contains(m)))
                .map(|u| u.content.clone())
                .collect();
            if targeted.is_empty() {
                envelope.updates.into_iter().map(|u| u.content).collect()
            } else {
                targeted
            }
        }
        Err(err) => {
            scrape_error!("envelope parse failed for {}: {}", path.display(), err);
            vec![text.to_string()]
        }
    }
}

/// The first table's headers (behind `SourceFile`) define the aggregate
/// width; later rows are padded or cut to fit.
fn aggregate(
    headers: &mut Option<Vec<String>>,
    rows: &mut Vec<Row>,
    csv_name: &str,
    table: &TableFragment,
) {
    let width = headers
        .get_or_insert_with(|| {
            std::iter::once("SourceFile".to_string())
                .chain(table.headers.iter().cloned())
                .collect()
        })
        .len();
    for row in &table.rows {
        let mut line = Vec::with_capacity(width);
        line.push(csv_name.to_string());
        line.extend(row.iter().cloned());
        line.resize(width, String::new());
        rows.push(line);
    }
}
