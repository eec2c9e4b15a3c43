//! `agsload inspect`: parse a file and summarise its groups without touching a database.

use crate::cli::output::{print_json, print_table};
use agsload_core::geometry::{is_location_table, LOCATION_X_COLUMN, LOCATION_Y_COLUMN};
use agsload_core::{ExchangeDocument, Table};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    pub json: bool,
}

/// One row of the inspect output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub columns: usize,
    pub rows: usize,
    /// `Some` only for the location table: whether both coordinate columns are present.
    pub has_coordinates: Option<bool>,
}

impl TableSummary {
    fn from_table(table: &Table) -> Self {
        let has_column = |wanted: &str| {
            table
                .columns()
                .iter()
                .any(|c| c.eq_ignore_ascii_case(wanted))
        };
        Self {
            name: table.name().to_string(),
            columns: table.columns().len(),
            rows: table.num_rows(),
            has_coordinates: is_location_table(table.name())
                .then(|| has_column(LOCATION_X_COLUMN) && has_column(LOCATION_Y_COLUMN)),
        }
    }
}

pub fn summarize(document: &ExchangeDocument) -> Vec<TableSummary> {
    document.tables().iter().map(TableSummary::from_table).collect()
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let document = super::read_document(&args.file)?;
    let summaries = summarize(&document);

    if args.json {
        return print_json(&summaries);
    }

    let rows = summaries
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.columns.to_string(),
                s.rows.to_string(),
                match s.has_coordinates {
                    Some(true) => "point layer".to_string(),
                    Some(false) => "missing X/Y".to_string(),
                    None => String::new(),
                },
            ]
        })
        .collect();
    print_table(&["GROUP", "COLUMNS", "ROWS", "GEOMETRY"], rows);

    let total: usize = summaries.iter().map(|s| s.rows).sum();
    println!("{} groups, {} rows", summaries.len(), total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agsload_core::Value;

    #[test]
    fn test_summarize_flags_location_table() {
        let document = ExchangeDocument::from_tables(vec![
            Table::from_records("PROJ", vec![vec![("PROJ_ID", Value::from("P1"))]]),
            Table::from_records(
                "LOCA",
                vec![vec![
                    ("LOCA_ID", Value::from("BH1")),
                    ("LOCA_LOCX", Value::Real(1.0)),
                    ("LOCA_LOCY", Value::Real(2.0)),
                ]],
            ),
        ])
        .unwrap();

        let summaries = summarize(&document);
        assert_eq!(summaries[0].has_coordinates, None);
        assert_eq!(summaries[1].has_coordinates, Some(true));
        assert_eq!(summaries[1].columns, 3);
        assert_eq!(summaries[1].rows, 1);
    }

    #[test]
    fn test_location_table_without_coordinates() {
        let document = ExchangeDocument::from_tables(vec![Table::from_records(
            "LOCA",
            vec![vec![("LOCA_ID", Value::from("BH1"))]],
        )])
        .unwrap();
        assert_eq!(summarize(&document)[0].has_coordinates, Some(false));
    }
}
