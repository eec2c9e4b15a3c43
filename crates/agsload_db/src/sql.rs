//! SQL text generation and column typing for appends.

use crate::error::{DbError, Result};
use agsload_core::{EpsgCode, Table, Value};

/// Column types the store creates, plus whatever an existing table declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Text,
    /// Any other declared type, written through an explicit cast from text.
    Other(String),
}

impl ColumnType {
    /// DDL type name.
    pub fn sql_name(&self) -> &str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Other(name) => name,
        }
    }

    /// Map an `information_schema.columns` entry. Unknown types keep their `udt_name`.
    pub fn from_information_schema(data_type: &str, udt_name: &str) -> Self {
        match data_type {
            "bigint" | "integer" | "smallint" => ColumnType::BigInt,
            "double precision" | "real" | "numeric" => ColumnType::Double,
            "text" | "character varying" | "character" => ColumnType::Text,
            _ => ColumnType::Other(udt_name.to_string()),
        }
    }

    /// Narrowest type that holds every value of a column.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut inferred: Option<ColumnType> = None;
        for value in values {
            let kind = match value {
                Value::Null => continue,
                Value::Integer(_) => ColumnType::BigInt,
                Value::Real(_) => ColumnType::Double,
                Value::Text(_) => return ColumnType::Text,
            };
            inferred = Some(match (inferred, kind) {
                (None, kind) => kind,
                (Some(ColumnType::BigInt), ColumnType::BigInt) => ColumnType::BigInt,
                _ => ColumnType::Double,
            });
        }
        inferred.unwrap_or(ColumnType::Text)
    }

    /// Placeholder expression for parameter `$n`.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            ColumnType::Other(name) => format!("CAST(${} AS {})", n, name),
            _ => format!("${}", n),
        }
    }
}

/// A value converted to the Rust type bound for its column.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    BigInt(Option<i64>),
    Double(Option<f64>),
    Text(Option<String>),
}

impl BindValue {
    /// Convert `value` for a column of type `column_type`.
    pub fn for_column(value: &Value, column_type: &ColumnType, column: &str) -> Result<Self> {
        Ok(match column_type {
            ColumnType::BigInt => BindValue::BigInt(match value {
                Value::Null => None,
                Value::Integer(v) => Some(*v),
                Value::Real(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                    Some(*v as i64)
                }
                other => {
                    return Err(DbError::type_conversion(format!(
                        "column {} is BIGINT but value is {} ({})",
                        column,
                        other.kind(),
                        other
                    )))
                }
            }),
            ColumnType::Double => BindValue::Double(match value {
                Value::Null => None,
                Value::Integer(v) => Some(*v as f64),
                Value::Real(v) => Some(*v),
                Value::Text(v) => {
                    return Err(DbError::type_conversion(format!(
                        "column {} is numeric but value is text ({})",
                        column, v
                    )))
                }
            }),
            ColumnType::Text | ColumnType::Other(_) => BindValue::Text(match value {
                Value::Null => None,
                other => Some(other.to_string()),
            }),
        })
    }
}

/// Double-quote an identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Inferred `(column, type)` pairs for a table.
pub fn infer_columns(table: &Table) -> Vec<(String, ColumnType)> {
    table
        .columns()
        .iter()
        .map(|column| {
            let values = table.column_values(column).into_iter().flatten();
            (column.clone(), ColumnType::infer(values))
        })
        .collect()
}

/// `CREATE TABLE IF NOT EXISTS` for the given columns and optional point geometry.
pub fn create_table_sql(
    schema: &str,
    table: &str,
    columns: &[(String, ColumnType)],
    geometry: Option<(&str, EpsgCode)>,
) -> String {
    let mut defs: Vec<String> = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql_name()))
        .collect();
    if let Some((column, srid)) = geometry {
        defs.push(format!("{} geometry(Point, {})", quote_ident(column), srid));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified_name(schema, table),
        defs.join(", ")
    )
}

pub fn create_schema_sql(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema))
}

pub fn add_geometry_column_sql(schema: &str, table: &str, column: &str, srid: EpsgCode) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} geometry(Point, {})",
        qualified_name(schema, table),
        quote_ident(column),
        srid
    )
}

pub fn add_column_sql(schema: &str, table: &str, column: &str, ty: &ColumnType) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
        qualified_name(schema, table),
        quote_ident(column),
        ty.sql_name()
    )
}

/// Single-row `INSERT` with typed placeholders and an optional point geometry.
pub fn insert_sql(
    schema: &str,
    table: &str,
    columns: &[(String, ColumnType)],
    geometry: Option<(&str, EpsgCode)>,
) -> String {
    let mut names: Vec<String> = columns.iter().map(|(name, _)| quote_ident(name)).collect();
    let mut values: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(idx, (_, ty))| ty.placeholder(idx + 1))
        .collect();
    if let Some((column, srid)) = geometry {
        let x = columns.len() + 1;
        names.push(quote_ident(column));
        values.push(format!(
            "ST_SetSRID(ST_MakePoint(${}, ${}), {})",
            x,
            x + 1,
            srid
        ));
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_name(schema, table),
        names.join(", "),
        values.join(", ")
    )
}
