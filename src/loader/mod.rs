//! Corpus loading: turn a directory of source documents into plain text.
//!
//! Traversal is recursive and deterministic (entries sorted by file name at
//! every level), so a rebuilt store always sees documents in the same order.
//! Unsupported file types are skipped silently; a file that fails to parse is
//! logged and skipped rather than aborting the whole corpus.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::extract::{self, ExtractError};

/// Errors raised while enumerating the document corpus.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Corpus root does not exist or is not a directory.
    #[error("Corpus directory not found: {0}")]
    CorpusMissing(PathBuf),
    /// Filesystem error while walking or reading the corpus.
    #[error("Failed to read corpus: {0}")]
    Io(#[from] std::io::Error),
}

/// A source document normalized to plain text.
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable identifier: the path relative to the corpus root.
    pub id: String,
    /// Extracted textual content.
    pub text: String,
    /// Absolute or corpus-relative path retained for provenance.
    pub source_path: PathBuf,
}

/// Load every supported document under `dir`, in deterministic order.
///
/// An empty directory yields an empty vector, not an error.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>, LoaderError> {
    if !dir.is_dir() {
        return Err(LoaderError::CorpusMissing(dir.to_path_buf()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| match err.into_io_error() {
            Some(io) => LoaderError::Io(io),
            None => LoaderError::CorpusMissing(dir.to_path_buf()),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if extract::detect_kind(name).is_none() {
            tracing::debug!(path = %path.display(), "Skipping unsupported file type");
            continue;
        }

        match load_one(dir, path, name) {
            Ok(document) => documents.push(document),
            Err(LoadOneError::Io(err)) => return Err(LoaderError::Io(err)),
            Err(LoadOneError::Extract(err)) => {
                tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable document");
            }
        }
    }

    tracing::info!(
        corpus = %dir.display(),
        documents = documents.len(),
        "Corpus loaded"
    );
    Ok(documents)
}

enum LoadOneError {
    Io(std::io::Error),
    Extract(ExtractError),
}

fn load_one(root: &Path, path: &Path, name: &str) -> Result<Document, LoadOneError> {
    let bytes = std::fs::read(path).map_err(LoadOneError::Io)?;
    let text = extract::extract_text(name, &bytes).map_err(LoadOneError::Extract)?;
    let id = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();
    Ok(Document {
        id,
        text,
        source_path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).expect("write corpus file");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let error = load_documents(Path::new("/nonexistent/corpus")).unwrap_err();
        assert!(matches!(error, LoaderError::CorpusMissing(_)));
    }

    #[test]
    fn empty_directory_yields_no_documents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let documents = load_documents(dir.path()).expect("load");
        assert!(documents.is_empty());
    }

    #[test]
    fn loads_supported_files_in_sorted_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "b.txt", "second document");
        write(dir.path(), "a.txt", "first document");
        write(dir.path(), "c.bin", "ignored binary");

        let documents = load_documents(dir.path()).expect("load");
        let ids: Vec<&str> = documents.iter().map(|doc| doc.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.txt"]);
        assert_eq!(documents[0].text, "first document");
    }

    #[test]
    fn unparseable_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "good.txt", "usable text");
        // Empty file extracts to nothing and is skipped.
        write(dir.path(), "bad.csv", "");

        let documents = load_documents(dir.path()).expect("load");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "good.txt");
    }

    #[test]
    fn recurses_into_subdirectories() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
        write(dir.path(), "top.txt", "top level");
        write(&dir.path().join("nested"), "inner.txt", "nested text");

        let documents = load_documents(dir.path()).expect("load");
        assert_eq!(documents.len(), 2);
        assert!(documents.iter().any(|doc| doc.id.contains("inner.txt")));
    }
}
