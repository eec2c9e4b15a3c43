//! CLI module for agsload
//!
//! `import` writes to PostGIS; `inspect` and `check-epsg` work offline.

pub mod check_epsg;
pub mod config;
pub mod error;
pub mod import;
pub mod inspect;
pub mod output;

use agsload_ags::AgsError;
use agsload_core::ExchangeDocument;
use error::HelpfulError;
use std::path::Path;

/// Read an AGS4 file, turning reader errors into actionable messages.
pub(crate) fn read_document(path: &Path) -> anyhow::Result<ExchangeDocument> {
    if !path.exists() {
        return Err(HelpfulError::file_not_found(path).into());
    }
    agsload_ags::read_path(path).map_err(|err| match err {
        AgsError::Io { path, source } => {
            HelpfulError::new(format!("Cannot read file: {}", path.display()))
                .with_context(source.to_string())
                .with_suggestion(format!(
                    "TRY: Check file permissions: ls -la {}",
                    path.display()
                ))
                .into()
        }
        other => HelpfulError::cannot_parse_ags(path, &other.to_string()).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_document_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(&dir.path().join("absent.ags")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_read_document_parse_error_points_at_inspect() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\"DATA\",\"1\"").unwrap();

        let err = read_document(file.path()).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("Cannot read AGS file"));
        assert!(display.contains("agsload inspect"));
    }
}
