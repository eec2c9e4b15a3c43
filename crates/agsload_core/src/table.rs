//! Tabular data model: exchange documents, tables, and the lower-case column contract.

use crate::error::{LoadError, Result};
use crate::value::Value;
use std::collections::HashSet;

/// Column stamped with the campaign identifier on every written table.
pub const CAMPAIGN_COLUMN: &str = "campaign_id";

/// A named table of rows, one value per column heading.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table, checking every row has one value per column.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let name = name.into();
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(LoadError::malformed_table(
                name,
                format!(
                    "row {} has {} values but there are {} columns",
                    idx,
                    row.len(),
                    columns.len()
                ),
            ));
        }
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Build a table from key/value records.
    ///
    /// Columns appear in first-seen order; cells a record does not mention are null.
    pub fn from_records<K, I, R>(name: impl Into<String>, records: R) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
        R: IntoIterator<Item = I>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut sparse: Vec<Vec<(usize, Value)>> = Vec::new();

        for record in records {
            let mut cells = Vec::new();
            for (key, value) in record {
                let key = key.into();
                let idx = match columns.iter().position(|c| *c == key) {
                    Some(idx) => idx,
                    None => {
                        columns.push(key);
                        columns.len() - 1
                    }
                };
                cells.push((idx, value));
            }
            sparse.push(cells);
        }

        let rows = sparse
            .into_iter()
            .map(|cells| {
                let mut row = vec![Value::Null; columns.len()];
                for (idx, value) in cells {
                    row[idx] = value;
                }
                row
            })
            .collect();

        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Value at `row` for `column`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All values of one column, in row order.
    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Lower-case the table and column names.
    ///
    /// Fails when two headings collide after lower-casing.
    pub fn normalize(self) -> Result<NormalizedTable> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        let mut columns = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let lower = column.to_lowercase();
            if !seen.insert(lower.clone()) {
                return Err(LoadError::malformed_table(
                    self.name,
                    format!("column {} collides with another column once lower-cased", column),
                ));
            }
            columns.push(lower);
        }

        Ok(NormalizedTable {
            source_name: self.name.clone(),
            table: Table {
                name: self.name.to_lowercase(),
                columns,
                rows: self.rows,
            },
        })
    }
}

/// A table whose name and column names are all lower case.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    source_name: String,
    table: Table,
}

impl NormalizedTable {
    /// Lower-cased name used in the destination.
    pub fn name(&self) -> &str {
        &self.table.name
    }

    /// Name as it appeared in the exchange document.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// Set `column` to `value` on every row, adding the column if absent.
    pub fn stamp(&mut self, column: &str, value: Value) {
        let column = column.to_lowercase();
        match self.table.column_index(&column) {
            Some(idx) => {
                for row in &mut self.table.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.table.columns.push(column);
                for row in &mut self.table.rows {
                    row.push(value.clone());
                }
            }
        }
    }
}

/// Parsed exchange document: tables in document order, unique by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeDocument {
    tables: Vec<Table>,
}

impl ExchangeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from tables, rejecting duplicate names.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Result<Self> {
        let mut doc = Self::new();
        for table in tables {
            doc.push(table)?;
        }
        Ok(doc)
    }

    /// Append a table. Names that differ only in case collide, since both would be
    /// written to the same lower-cased destination table.
    pub fn push(&mut self, table: Table) -> Result<()> {
        let lower = table.name().to_lowercase();
        if self.tables.iter().any(|t| t.name().to_lowercase() == lower) {
            return Err(LoadError::malformed_table(
                table.name().to_string(),
                "table appears more than once in the document",
            ));
        }
        self.tables.push(table);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }
}

impl IntoIterator for ExchangeDocument {
    type Item = Table;
    type IntoIter = std::vec::IntoIter<Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}
