//! Point geometry for the location table.

use crate::crs::{EpsgCode, Reprojector};
use crate::error::{LoadError, Result};
use crate::table::Table;
use crate::value::Value;
use serde::Serialize;

/// Location table name in the exchange document.
pub const LOCATION_TABLE: &str = "LOCA";
/// Easting column of the location table (after normalization).
pub const LOCATION_X_COLUMN: &str = "loca_locx";
/// Northing column of the location table (after normalization).
pub const LOCATION_Y_COLUMN: &str = "loca_locy";
/// Geometry column name in the destination layer.
pub const GEOMETRY_COLUMN: &str = "geom";
/// Offset added to every northing before reprojection.
pub const NORTHING_OFFSET: f64 = 10_000.0;

/// 2D point tagged with its reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub srid: EpsgCode,
}

impl Point {
    pub fn new(x: f64, y: f64, srid: EpsgCode) -> Self {
        Self { x, y, srid }
    }
}

/// True when `name` designates the location table.
pub fn is_location_table(name: &str) -> bool {
    name.eq_ignore_ascii_case(LOCATION_TABLE)
}

/// A table whose rows each carry one point geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialLayer {
    table: Table,
    geometry_column: String,
    points: Vec<Point>,
    srid: EpsgCode,
}

impl SpatialLayer {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn geometry_column(&self) -> &str {
        &self.geometry_column
    }

    /// Geometry of each row, in row order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn srid(&self) -> EpsgCode {
        self.srid
    }

    pub fn num_rows(&self) -> usize {
        self.table.num_rows()
    }
}

/// Build the spatial layer for a normalized location table.
///
/// Every row gets `(x, y + NORTHING_OFFSET)`, reprojected when a reprojector is given.
/// A row without a numeric X or Y fails the whole layer.
pub fn build_location_layer(
    table: Table,
    target: EpsgCode,
    reprojector: Option<&Reprojector>,
) -> Result<SpatialLayer> {
    let x_idx = table.column_index(LOCATION_X_COLUMN).ok_or_else(|| {
        LoadError::malformed_location(0, format!("missing column {}", LOCATION_X_COLUMN))
    })?;
    let y_idx = table.column_index(LOCATION_Y_COLUMN).ok_or_else(|| {
        LoadError::malformed_location(0, format!("missing column {}", LOCATION_Y_COLUMN))
    })?;

    let source_srid = reprojector.map(|r| r.source_code()).unwrap_or(target);
    let mut points = Vec::with_capacity(table.num_rows());
    for (row_idx, row) in table.rows().iter().enumerate() {
        let x = coordinate(&row[x_idx], row_idx, LOCATION_X_COLUMN)?;
        let y = coordinate(&row[y_idx], row_idx, LOCATION_Y_COLUMN)?;
        points.push(Point::new(x, y + NORTHING_OFFSET, source_srid));
    }

    let points = match reprojector {
        Some(reprojector) => reprojector.transform(&points)?,
        None => points,
    };

    Ok(SpatialLayer {
        table,
        geometry_column: GEOMETRY_COLUMN.to_string(),
        points,
        srid: target,
    })
}

fn coordinate(value: &Value, row: usize, column: &str) -> Result<f64> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(LoadError::malformed_location(
            row,
            format!("{} is not finite ({})", column, v),
        )),
        None => Err(LoadError::malformed_location(
            row,
            format!("{} is {} ({}), expected a number", column, value.kind(), value),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BNG: EpsgCode = EpsgCode::new(27700);

    fn loca(rows: Vec<(Value, Value)>) -> Table {
        Table::from_records(
            "loca",
            rows.into_iter().enumerate().map(|(i, (x, y))| {
                vec![
                    ("loca_id", Value::from(format!("BH{}", i + 1))),
                    (LOCATION_X_COLUMN, x),
                    (LOCATION_Y_COLUMN, y),
                ]
            }),
        )
    }

    #[test]
    fn test_offset_applied_to_northing_only() {
        let table = loca(vec![(Value::Real(100.0), Value::Real(200.0))]);
        let layer = build_location_layer(table, BNG, None).unwrap();

        assert_eq!(layer.points(), &[Point::new(100.0, 10_200.0, BNG)]);
        assert_eq!(layer.geometry_column(), "geom");
        assert_eq!(layer.srid(), BNG);
    }

    #[test]
    fn test_integer_coordinates_widen() {
        let table = loca(vec![(Value::Integer(5), Value::Integer(-20_000))]);
        let layer = build_location_layer(table, BNG, None).unwrap();
        assert_eq!(layer.points()[0], Point::new(5.0, -10_000.0, BNG));
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let table = Table::from_records("loca", vec![vec![(LOCATION_X_COLUMN, Value::Real(1.0))]]);
        let err = build_location_layer(table, BNG, None).unwrap_err();
        assert!(matches!(err, LoadError::MalformedLocationData { .. }));
    }

    #[test]
    fn test_non_numeric_row_is_reported() {
        let table = loca(vec![
            (Value::Real(1.0), Value::Real(2.0)),
            (Value::Null, Value::Real(2.0)),
        ]);
        match build_location_layer(table, BNG, None) {
            Err(LoadError::MalformedLocationData { row, reason }) => {
                assert_eq!(row, 1);
                assert!(reason.contains("loca_locx"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let table = loca(vec![(Value::Real(1.0), Value::from("north"))]);
        assert!(build_location_layer(table, BNG, None).is_err());
    }

    #[test]
    fn test_empty_location_table_builds_empty_layer() {
        let table = Table::new(
            "loca",
            vec![LOCATION_X_COLUMN.into(), LOCATION_Y_COLUMN.into()],
            vec![],
        )
        .unwrap();
        let layer = build_location_layer(table, BNG, None).unwrap();
        assert_eq!(layer.num_rows(), 0);
        assert!(layer.points().is_empty());
    }

    #[test]
    fn test_location_table_match_is_case_insensitive() {
        assert!(is_location_table("LOCA"));
        assert!(is_location_table("loca"));
        assert!(!is_location_table("LOCA_EXTRA"));
    }
}
