//! Text extraction for uploaded and on-disk documents.
//!
//! Supported formats mirror the upload surface: PDF (`pdf-extract`), CSV
//! (`csv`), XLSX/XLS (`calamine`, first worksheet), and plain text/markdown
//! passthrough. Everything else is rejected with
//! [`ExtractError::UnsupportedFileType`] so callers can skip or 400 as
//! appropriate.

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use thiserror::Error;

/// Errors raised while turning a document into plain text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// File extension is not one of the supported formats.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// The parser could not decode the file contents.
    #[error("Failed to parse '{name}': {message}")]
    Parse {
        /// File name as supplied by the caller.
        name: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Parsing succeeded but produced no usable text.
    #[error("No extractable text in '{0}'")]
    EmptyDocument(String),
}

/// File formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Portable Document Format.
    Pdf,
    /// Comma-separated values.
    Csv,
    /// Excel workbooks (`.xlsx`/`.xls`).
    Excel,
    /// Plain text and markdown.
    Text,
}

/// Classify a file name by extension, case-insensitively.
pub fn detect_kind(name: &str) -> Option<FileKind> {
    let extension = Path::new(name).extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "pdf" => Some(FileKind::Pdf),
        "csv" => Some(FileKind::Csv),
        "xlsx" | "xls" => Some(FileKind::Excel),
        "txt" | "md" => Some(FileKind::Text),
        _ => None,
    }
}

/// Extract the textual content of an in-memory document.
///
/// Returns [`ExtractError::EmptyDocument`] when parsing succeeds but yields
/// only whitespace, so callers never feed an empty context to the LLM.
pub fn extract_text(name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let kind =
        detect_kind(name).ok_or_else(|| ExtractError::UnsupportedFileType(name.to_string()))?;

    let text = match kind {
        FileKind::Pdf => extract_pdf(name, bytes)?,
        FileKind::Csv => extract_csv(name, bytes)?,
        FileKind::Excel => extract_excel(name, bytes)?,
        FileKind::Text => String::from_utf8_lossy(bytes).into_owned(),
    };

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyDocument(name.to_string()));
    }
    Ok(text)
}

fn extract_pdf(name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|err| ExtractError::Parse {
        name: name.to_string(),
        message: err.to_string(),
    })
}

/// Flatten a CSV file into one line per record with tab-separated fields.
fn extract_csv(name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| ExtractError::Parse {
            name: name.to_string(),
            message: err.to_string(),
        })?;
        lines.push(record.iter().collect::<Vec<_>>().join("\t"));
    }
    Ok(lines.join("\n"))
}

/// Flatten the first worksheet of an Excel workbook, mirroring the CSV shape.
fn extract_excel(name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor).map_err(|err| ExtractError::Parse {
        name: name.to_string(),
        message: err.to_string(),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExtractError::Parse {
            name: name.to_string(),
            message: "workbook contains no worksheets".to_string(),
        })?
        .map_err(|err| ExtractError::Parse {
            name: name.to_string(),
            message: err.to_string(),
        })?;

    let mut lines = Vec::new();
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(format_cell).collect();
        lines.push(cells.join("\t"));
    }
    Ok(lines.join("\n"))
}

fn format_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_extensions() {
        assert_eq!(detect_kind("report.PDF"), Some(FileKind::Pdf));
        assert_eq!(detect_kind("table.csv"), Some(FileKind::Csv));
        assert_eq!(detect_kind("sheet.xlsx"), Some(FileKind::Excel));
        assert_eq!(detect_kind("old.xls"), Some(FileKind::Excel));
        assert_eq!(detect_kind("notes.md"), Some(FileKind::Text));
        assert_eq!(detect_kind("archive.zip"), None);
        assert_eq!(detect_kind("no_extension"), None);
    }

    #[test]
    fn rejects_unsupported_type() {
        let error = extract_text("image.png", b"\x89PNG").unwrap_err();
        assert!(matches!(error, ExtractError::UnsupportedFileType(_)));
    }

    #[test]
    fn csv_rows_become_tabbed_lines() {
        let data = b"name,role\nada,engineer\ngrace,admiral";
        let text = extract_text("people.csv", data).expect("csv extraction");
        assert_eq!(text, "name\trole\nada\tengineer\ngrace\tadmiral");
    }

    #[test]
    fn ragged_csv_is_tolerated() {
        let data = b"a,b,c\nd,e";
        let text = extract_text("ragged.csv", data).expect("flexible parsing");
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn empty_text_file_is_reported() {
        let error = extract_text("blank.txt", b"   \n ").unwrap_err();
        assert!(matches!(error, ExtractError::EmptyDocument(_)));
    }

    #[test]
    fn plain_text_passes_through() {
        let text = extract_text("notes.txt", "attention is all you need".as_bytes())
            .expect("text extraction");
        assert_eq!(text, "attention is all you need");
    }
}
