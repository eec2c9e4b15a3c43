//! In-memory destination store.
//!
//! Follows the append semantics of the relational store: tables are created on first
//! write, later writes map columns by name and add columns the table lacks. Failures
//! can be injected per operation to exercise partial imports.

use crate::crs::EpsgCode;
use crate::geometry::{Point, SpatialLayer};
use crate::store::{DestinationStore, StoreError, StoreResult};
use crate::table::{Table, CAMPAIGN_COLUMN};
use crate::campaign::LOCATION_LAYER;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// One call made against the store, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    TableExists { schema: String, table: String },
    MaxValue { schema: String, table: String, column: String },
    GeometrySrid { schema: String, table: String },
    Append { schema: String, table: String },
    AppendSpatial { schema: String, table: String },
}

impl StoreOp {
    pub fn is_write(&self) -> bool {
        matches!(self, StoreOp::Append { .. } | StoreOp::AppendSpatial { .. })
    }
}

/// Contents of one stored table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Geometry column, SRID and per-row points for spatial tables.
    pub geometry: Option<StoredGeometry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredGeometry {
    pub column: String,
    pub srid: Option<EpsgCode>,
    pub points: Vec<Point>,
}

impl StoredTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_values(&self, column: &str) -> Vec<Value> {
        match self.columns.iter().position(|c| c == column) {
            Some(idx) => self.rows.iter().map(|row| row[idx].clone()).collect(),
            None => Vec::new(),
        }
    }

    pub fn points(&self) -> &[Point] {
        self.geometry.as_ref().map(|g| g.points.as_slice()).unwrap_or(&[])
    }

    fn append(&mut self, table: &Table) {
        let mapping: Vec<usize> = table
            .columns()
            .iter()
            .map(|column| match self.columns.iter().position(|c| c == column) {
                Some(idx) => idx,
                None => {
                    self.columns.push(column.clone());
                    for row in &mut self.rows {
                        row.push(Value::Null);
                    }
                    self.columns.len() - 1
                }
            })
            .collect();

        for row in table.rows() {
            let mut stored = vec![Value::Null; self.columns.len()];
            for (value, idx) in row.iter().zip(&mapping) {
                stored[*idx] = value.clone();
            }
            self.rows.push(stored);
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    reads: Option<String>,
    writes: HashMap<String, String>,
}

/// `DestinationStore` kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<(String, String), StoredTable>,
    ops: Vec<StoreOp>,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a location layer in `schema` holding one row per campaign id.
    ///
    /// Each row gets a placeholder point at the origin with SRID 0 (unknown).
    pub fn seed_location_layer(&mut self, schema: &str, campaign_ids: &[i64]) {
        let table = StoredTable {
            columns: vec![CAMPAIGN_COLUMN.to_string()],
            rows: campaign_ids
                .iter()
                .map(|id| vec![Value::Integer(*id)])
                .collect(),
            geometry: Some(StoredGeometry {
                column: "geom".to_string(),
                srid: None,
                points: campaign_ids
                    .iter()
                    .map(|_| Point::new(0.0, 0.0, EpsgCode::new(0)))
                    .collect(),
            }),
        };
        self.tables
            .insert((schema.to_string(), LOCATION_LAYER.to_string()), table);
    }

    /// Record the SRID of an existing spatial table.
    pub fn set_srid(&mut self, schema: &str, table: &str, srid: EpsgCode) {
        if let Some(geometry) = self
            .tables
            .get_mut(&(schema.to_string(), table.to_string()))
            .and_then(|t| t.geometry.as_mut())
        {
            geometry.srid = Some(srid);
        }
    }

    /// Make every read operation fail with `message`.
    pub fn fail_reads(&mut self, message: impl Into<String>) {
        self.faults.reads = Some(message.into());
    }

    /// Make writes to `table` fail with `message`.
    pub fn fail_writes_to(&mut self, table: &str, message: impl Into<String>) {
        self.faults.writes.insert(table.to_string(), message.into());
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&StoredTable> {
        self.tables.get(&(schema.to_string(), table.to_string()))
    }

    /// Names of the tables stored under `schema`.
    pub fn table_names(&self, schema: &str) -> Vec<&str> {
        self.tables
            .keys()
            .filter(|(s, _)| s == schema)
            .map(|(_, t)| t.as_str())
            .collect()
    }

    /// Every call made so far.
    pub fn operations(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn write_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_write()).count()
    }

    fn check_read(&self) -> StoreResult<()> {
        match &self.faults.reads {
            Some(message) => Err(StoreError::message(message.clone())),
            None => Ok(()),
        }
    }

    fn check_write(&self, table: &str) -> StoreResult<()> {
        match self.faults.writes.get(table) {
            Some(message) => Err(StoreError::message(message.clone())),
            None => Ok(()),
        }
    }

    fn key(schema: &str, table: &str) -> (String, String) {
        (schema.to_string(), table.to_string())
    }
}

impl DestinationStore for MemoryStore {
    fn table_exists(&mut self, schema: &str, table: &str) -> StoreResult<bool> {
        self.ops.push(StoreOp::TableExists {
            schema: schema.to_string(),
            table: table.to_string(),
        });
        self.check_read()?;
        Ok(self.tables.contains_key(&Self::key(schema, table)))
    }

    fn max_value(&mut self, schema: &str, table: &str, column: &str) -> StoreResult<Option<i64>> {
        self.ops.push(StoreOp::MaxValue {
            schema: schema.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        });
        self.check_read()?;
        let stored = self
            .tables
            .get(&Self::key(schema, table))
            .ok_or_else(|| StoreError::message(format!("relation \"{}\" does not exist", table)))?;
        Ok(stored
            .column_values(column)
            .iter()
            .filter_map(Value::as_i64)
            .max())
    }

    fn append_rows(&mut self, schema: &str, table: &Table) -> StoreResult<u64> {
        self.ops.push(StoreOp::Append {
            schema: schema.to_string(),
            table: table.name().to_string(),
        });
        self.check_write(table.name())?;

        let stored = self
            .tables
            .entry(Self::key(schema, table.name()))
            .or_insert_with(|| StoredTable {
                columns: table.columns().to_vec(),
                ..StoredTable::default()
            });
        stored.append(table);
        Ok(table.num_rows() as u64)
    }

    fn append_spatial_rows(&mut self, schema: &str, layer: &SpatialLayer) -> StoreResult<u64> {
        self.ops.push(StoreOp::AppendSpatial {
            schema: schema.to_string(),
            table: layer.name().to_string(),
        });
        self.check_write(layer.name())?;

        let stored = self
            .tables
            .entry(Self::key(schema, layer.name()))
            .or_insert_with(|| StoredTable {
                columns: layer.table().columns().to_vec(),
                rows: Vec::new(),
                geometry: Some(StoredGeometry {
                    column: layer.geometry_column().to_string(),
                    srid: Some(layer.srid()),
                    points: Vec::new(),
                }),
            });

        let geometry_column = match &stored.geometry {
            Some(geometry) => geometry.column.clone(),
            None => {
                return Err(StoreError::message(format!(
                    "relation \"{}\" has no geometry column",
                    layer.name()
                )))
            }
        };
        if geometry_column != layer.geometry_column() {
            return Err(StoreError::message(format!(
                "column \"{}\" of relation \"{}\" does not exist",
                layer.geometry_column(),
                layer.name()
            )));
        }

        stored.append(layer.table());
        if let Some(geometry) = stored.geometry.as_mut() {
            geometry.points.extend_from_slice(layer.points());
        }
        Ok(layer.num_rows() as u64)
    }

    fn geometry_srid(
        &mut self,
        schema: &str,
        table: &str,
        _column: &str,
    ) -> StoreResult<Option<EpsgCode>> {
        self.ops.push(StoreOp::GeometrySrid {
            schema: schema.to_string(),
            table: table.to_string(),
        });
        self.check_read()?;
        Ok(self
            .tables
            .get(&Self::key(schema, table))
            .and_then(|t| t.geometry.as_ref())
            .and_then(|g| g.srid))
    }
}
