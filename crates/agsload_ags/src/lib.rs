//! AGS4 reader.
//!
//! Turns AGS4 text into an [`ExchangeDocument`]. Each `GROUP` becomes a table whose
//! columns come from its `HEADING` line; `UNIT` and `TYPE` lines are kept as metadata
//! and `DATA` lines become rows. Columns with a numeric TYPE are converted to numbers.

mod error;
mod types;

pub use error::{AgsError, Result};
pub use types::DataType;

use agsload_core::{ExchangeDocument, Table, Value};
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// A group parsed from an AGS4 file, before conversion into a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub headings: Vec<String>,
    pub units: Vec<String>,
    pub types: Vec<String>,
    pub data: Vec<Vec<String>>,
}

impl Group {
    fn new(name: String) -> Self {
        Self {
            name,
            headings: Vec::new(),
            units: Vec::new(),
            types: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Convert to a table, typing each column from its TYPE entry.
    pub fn to_table(&self) -> Result<Table> {
        let types: Vec<DataType> = (0..self.headings.len())
            .map(|idx| {
                self.types
                    .get(idx)
                    .map(|t| DataType::parse(t))
                    .unwrap_or(DataType::Text)
            })
            .collect();

        let rows = self
            .data
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&types)
                    .map(|(raw, data_type)| data_type.convert(raw))
                    .collect::<Vec<Value>>()
            })
            .collect();

        Table::new(self.name.clone(), self.headings.clone(), rows)
            .map_err(|e| AgsError::Table(e.to_string()))
    }
}

/// Read an AGS4 file from disk.
pub fn read_path(path: impl AsRef<Path>) -> Result<ExchangeDocument> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| AgsError::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| AgsError::io(path, e))?;
    let (text, invalid_at) = decode_text(&bytes);
    if let Some(offset) = invalid_at {
        warn!(
            path = %path.display(),
            offset,
            "File is not valid UTF-8; invalid bytes were replaced with U+FFFD"
        );
    }

    let doc = read_str(&text)?;
    info!(path = %path.display(), tables = doc.len(), "Read AGS4 file");
    Ok(doc)
}

/// Decode file bytes as UTF-8, replacing invalid sequences.
///
/// Also returns the byte offset of the first invalid sequence, if there was one.
fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, Option<usize>) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (Cow::Borrowed(text), None),
        Err(err) => (String::from_utf8_lossy(bytes), Some(err.valid_up_to())),
    }
}

/// Parse AGS4 text into a document.
pub fn read_str(text: &str) -> Result<ExchangeDocument> {
    let groups = parse_groups(text)?;
    let mut doc = ExchangeDocument::new();
    for group in &groups {
        debug!(group = %group.name, rows = group.data.len(), "Parsed group");
        doc.push(group.to_table()?)
            .map_err(|e| AgsError::Table(e.to_string()))?;
    }
    Ok(doc)
}

/// Parse AGS4 text into raw groups, in file order.
pub fn parse_groups(text: &str) -> Result<Vec<Group>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut groups: Vec<Group> = Vec::new();
    let mut current: Option<Group> = None;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let mut fields = record.iter();
        let descriptor = match fields.next() {
            Some(d) if !d.trim().is_empty() => d.trim(),
            _ => continue,
        };
        let values: Vec<String> = fields.map(str::to_string).collect();

        match descriptor {
            "GROUP" => {
                let name = values
                    .first()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .ok_or(AgsError::MissingGroupName { line })?;
                if let Some(done) = current.take() {
                    groups.push(done);
                }
                if groups.iter().any(|g| g.name.eq_ignore_ascii_case(&name)) {
                    return Err(AgsError::DuplicateGroup { name, line });
                }
                current = Some(Group::new(name));
            }
            "HEADING" | "UNIT" | "TYPE" | "DATA" => {
                let group = current.as_mut().ok_or_else(|| AgsError::OutsideGroup {
                    descriptor: descriptor.to_string(),
                    line,
                })?;
                match descriptor {
                    "HEADING" => group.headings = values,
                    "UNIT" => group.units = values,
                    "TYPE" => group.types = values,
                    _ => {
                        if values.len() != group.headings.len() {
                            return Err(AgsError::RowWidth {
                                group: group.name.clone(),
                                line,
                                expected: group.headings.len(),
                                found: values.len(),
                            });
                        }
                        group.data.push(values);
                    }
                }
            }
            other => {
                return Err(AgsError::UnknownDescriptor {
                    descriptor: other.to_string(),
                    line,
                })
            }
        }
    }

    if let Some(done) = current.take() {
        groups.push(done);
    }
    Ok(groups)
}
