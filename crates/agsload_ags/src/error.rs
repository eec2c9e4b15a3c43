//! Error types for the AGS4 reader.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgsError>;

#[derive(Debug, Error)]
pub enum AgsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: GROUP line without a group name")]
    MissingGroupName { line: u64 },

    #[error("Line {line}: group {name} appears more than once")]
    DuplicateGroup { name: String, line: u64 },

    #[error("Line {line}: {descriptor} line before any GROUP")]
    OutsideGroup { descriptor: String, line: u64 },

    #[error("Line {line}: unknown line descriptor {descriptor:?}")]
    UnknownDescriptor { descriptor: String, line: u64 },

    #[error("Line {line}: group {group} has {found} values but {expected} headings")]
    RowWidth {
        group: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Invalid table: {0}")]
    Table(String),
}

impl AgsError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        AgsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
