use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use scrape_logging::{scrape_info, scrape_warn};
use tempfile::NamedTempFile;
use thiserror::Error;
use vahan_core::Selection;

use crate::filename::{all_pages_filename, raw_fragment_filename};
use crate::table::{render_table_html, TableFragment};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file in the same directory, so
/// a reader sees either the previous file or the complete new one.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Everything gathered for one (Y, X, Year) selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResult {
    pub selection: Selection,
    pub table: TableFragment,
    pub raw_fragment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub raw_fragment: PathBuf,
    /// Absent when no rows were collected.
    pub combined_html: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Write the raw first-page fragment, the combined all-pages document and
/// the CSV for one scrape.
pub fn write_scrape_artifacts(
    writer: &AtomicFileWriter,
    result: &ScrapeResult,
) -> Result<ArtifactPaths, PersistError> {
    let raw_fragment = writer.write(
        &raw_fragment_filename(&result.selection),
        &result.raw_fragment,
    )?;
    scrape_info!("saved {}", raw_fragment.display());

    if result.table.rows.is_empty() || result.table.headers.is_empty() {
        scrape_warn!(
            "no rows for {} | {} | {}; skipping combined html and csv",
            result.selection.y.label,
            result.selection.x.label,
            result.selection.year.label
        );
        return Ok(ArtifactPaths {
            raw_fragment,
            combined_html: None,
            csv: None,
        });
    }

    let combined_html = writer.write(
        &all_pages_filename(&result.selection, "html"),
        &render_table_html(&result.table),
    )?;
    let csv = writer.write(
        &all_pages_filename(&result.selection, "csv"),
        &encode_csv(&result.table.headers, &result.table.rows),
    )?;
    scrape_info!(
        "saved {} rows to {} and {}",
        result.table.rows.len(),
        combined_html.display(),
        csv.display()
    );

    Ok(ArtifactPaths {
        raw_fragment,
        combined_html: Some(combined_html),
        csv: Some(csv),
    })
}

/// Header line followed by one line per row, RFC 4180 quoting.
pub fn encode_csv(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    push_csv_line(&mut out, headers);
    for row in rows {
        push_csv_line(&mut out, row);
    }
    out
}

fn push_csv_line(out: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}
