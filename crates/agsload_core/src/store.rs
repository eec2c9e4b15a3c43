//! Destination store capability consumed by the load pipeline.

use crate::crs::EpsgCode;
use crate::geometry::SpatialLayer;
use crate::table::Table;
use thiserror::Error;

/// Failure reported by a destination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{message}")]
    Message { message: String },
    #[error("{message}")]
    Source {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn message(message: impl Into<String>) -> Self {
        StoreError::Message {
            message: message.into(),
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Source {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

/// Append-only relational/spatial sink.
///
/// `append_*` create the table on first write and never replace or truncate it.
pub trait DestinationStore {
    fn table_exists(&mut self, schema: &str, table: &str) -> StoreResult<bool>;

    /// Maximum of an integer column, `None` when the table holds no non-null values.
    fn max_value(&mut self, schema: &str, table: &str, column: &str) -> StoreResult<Option<i64>>;

    /// Append attribute rows under `table.name()`. Returns rows written.
    fn append_rows(&mut self, schema: &str, table: &Table) -> StoreResult<u64>;

    /// Append rows with geometry under `layer.name()`. Returns rows written.
    fn append_spatial_rows(&mut self, schema: &str, layer: &SpatialLayer) -> StoreResult<u64>;

    /// SRID of an existing geometry column, when the store can tell.
    fn geometry_srid(
        &mut self,
        _schema: &str,
        _table: &str,
        _column: &str,
    ) -> StoreResult<Option<EpsgCode>> {
        Ok(None)
    }
}

impl<S: DestinationStore + ?Sized> DestinationStore for &mut S {
    fn table_exists(&mut self, schema: &str, table: &str) -> StoreResult<bool> {
        (**self).table_exists(schema, table)
    }

    fn max_value(&mut self, schema: &str, table: &str, column: &str) -> StoreResult<Option<i64>> {
        (**self).max_value(schema, table, column)
    }

    fn append_rows(&mut self, schema: &str, table: &Table) -> StoreResult<u64> {
        (**self).append_rows(schema, table)
    }

    fn append_spatial_rows(&mut self, schema: &str, layer: &SpatialLayer) -> StoreResult<u64> {
        (**self).append_spatial_rows(schema, layer)
    }

    fn geometry_srid(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> StoreResult<Option<EpsgCode>> {
        (**self).geometry_srid(schema, table, column)
    }
}
