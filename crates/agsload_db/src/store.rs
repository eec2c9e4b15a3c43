//! PostGIS implementation of the destination store.
//!
//! The load pipeline is synchronous, so the store owns a current-thread tokio runtime
//! and blocks on each sqlx call. Every append runs in its own transaction: a failed
//! table leaves nothing behind, but tables committed before it stay committed.

use crate::config::DatabaseConfig;
use crate::error::{DbError, Result};
use crate::sql::{self, BindValue, ColumnType};
use agsload_core::{DestinationStore, EpsgCode, Point, SpatialLayer, StoreResult, Table};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgConnection, Postgres};
use std::collections::HashMap;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Geometry written alongside the attribute rows of a spatial layer.
struct GeometrySpec<'a> {
    column: &'a str,
    srid: EpsgCode,
    points: &'a [Point],
}

/// Destination store backed by a PostgreSQL database with PostGIS enabled.
pub struct PostgisStore {
    runtime: Runtime,
    pool: PgPool,
}

impl PostgisStore {
    /// Open a connection pool for the whole import.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let pool = runtime.block_on(
            PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(config.acquire_timeout())
                .connect_with(config.connect_options()),
        )?;

        info!("Connected to {}", config);
        Ok(Self { runtime, pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run a future on the store's runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Close every pooled connection.
    pub fn close(self) {
        self.runtime.block_on(self.pool.close());
        debug!("Connection pool closed");
    }
}

impl DestinationStore for PostgisStore {
    fn table_exists(&mut self, schema: &str, table: &str) -> StoreResult<bool> {
        Ok(self.runtime.block_on(table_exists(&self.pool, schema, table))?)
    }

    fn max_value(&mut self, schema: &str, table: &str, column: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .runtime
            .block_on(max_value(&self.pool, schema, table, column))?)
    }

    fn append_rows(&mut self, schema: &str, table: &Table) -> StoreResult<u64> {
        Ok(self.runtime.block_on(append(&self.pool, schema, table, None))?)
    }

    fn append_spatial_rows(&mut self, schema: &str, layer: &SpatialLayer) -> StoreResult<u64> {
        let geometry = GeometrySpec {
            column: layer.geometry_column(),
            srid: layer.srid(),
            points: layer.points(),
        };
        Ok(self
            .runtime
            .block_on(append(&self.pool, schema, layer.table(), Some(geometry)))?)
    }

    fn geometry_srid(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> StoreResult<Option<EpsgCode>> {
        Ok(self
            .runtime
            .block_on(geometry_srid(&self.pool, schema, table, column))?)
    }
}

async fn table_exists(pool: &PgPool, schema: &str, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = $1 AND table_name = $2)",
    )
    .bind(schema)
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

async fn max_value(pool: &PgPool, schema: &str, table: &str, column: &str) -> Result<Option<i64>> {
    let query = format!(
        "SELECT MAX({})::BIGINT FROM {}",
        sql::quote_ident(column),
        sql::qualified_name(schema, table)
    );
    debug!("{}", query);
    let max: Option<i64> = sqlx::query_scalar(&query).fetch_one(pool).await?;
    Ok(max)
}

async fn geometry_srid(
    pool: &PgPool,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<Option<EpsgCode>> {
    let result: std::result::Result<i32, sqlx::Error> =
        sqlx::query_scalar("SELECT Find_SRID($1, $2, $3)")
            .bind(schema)
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await;

    match result {
        Ok(srid) if srid > 0 => Ok(Some(EpsgCode::new(srid as u32))),
        Ok(_) => Ok(None),
        // Find_SRID raises when the column is not registered as a geometry column.
        Err(sqlx::Error::Database(err)) => {
            debug!(schema, table, column, "No geometry SRID: {}", err);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

async fn append(
    pool: &PgPool,
    schema: &str,
    table: &Table,
    geometry: Option<GeometrySpec<'_>>,
) -> Result<u64> {
    let name = table.name();
    let mut tx = pool.begin().await?;

    let inferred = sql::infer_columns(table);
    let geometry_def = geometry.as_ref().map(|g| (g.column, g.srid));
    for statement in schema_statements(schema, name, &inferred, geometry_def) {
        debug!("{}", statement);
        sqlx::query(&statement).execute(&mut *tx).await?;
    }

    let declared = declared_types(&mut *tx, schema, name).await?;
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            declared
                .get(column)
                .map(|ty| (column.clone(), ty.clone()))
                .ok_or_else(|| DbError::MissingColumn {
                    table: sql::qualified_name(schema, name),
                    column: column.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let insert = sql::insert_sql(schema, name, &columns, geometry_def);
    debug!("{}", insert);

    let mut written = 0u64;
    for (row_idx, row) in table.rows().iter().enumerate() {
        let mut query = sqlx::query(&insert);
        for ((column, ty), value) in columns.iter().zip(row) {
            query = bind_value(query, BindValue::for_column(value, ty, column)?);
        }
        if let Some(geometry) = &geometry {
            let point = geometry.points.get(row_idx);
            query = query.bind(point.map(|p| p.x)).bind(point.map(|p| p.y));
        }
        written += query.execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    debug!("Wrote {} rows to {}", written, sql::qualified_name(schema, name));
    Ok(written)
}

/// DDL that brings `schema.table` up to the columns being appended.
fn schema_statements(
    schema: &str,
    table: &str,
    columns: &[(String, ColumnType)],
    geometry: Option<(&str, EpsgCode)>,
) -> Vec<String> {
    let mut statements = vec![
        sql::create_schema_sql(schema),
        sql::create_table_sql(schema, table, columns, geometry),
    ];
    statements.extend(
        columns
            .iter()
            .map(|(column, ty)| sql::add_column_sql(schema, table, column, ty)),
    );
    if let Some((column, srid)) = geometry {
        statements.push(sql::add_geometry_column_sql(schema, table, column, srid));
    }
    statements
}

async fn declared_types(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> Result<HashMap<String, ColumnType>> {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT column_name::text, data_type::text, udt_name::text \
         FROM information_schema.columns \
         WHERE table_schema = $1 AND table_name = $2",
    )
    .bind(schema)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(column, data_type, udt_name)| {
            let ty = ColumnType::from_information_schema(&data_type, &udt_name);
            (column, ty)
        })
        .collect())
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: BindValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        BindValue::BigInt(v) => query.bind(v),
        BindValue::Double(v) => query.bind(v),
        BindValue::Text(v) => query.bind(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_for_spatial_layer() {
        let columns = vec![("loca_id".to_string(), ColumnType::Text)];
        let statements =
            schema_statements("site", "loca", &columns, Some(("geom", EpsgCode::new(27700))));

        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], "CREATE SCHEMA IF NOT EXISTS \"site\"");
        assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS \"site\".\"loca\""));
        assert_eq!(
            statements[2],
            "ALTER TABLE \"site\".\"loca\" ADD COLUMN IF NOT EXISTS \"loca_id\" TEXT"
        );
        assert_eq!(
            statements[3],
            "ALTER TABLE \"site\".\"loca\" ADD COLUMN IF NOT EXISTS \"geom\" geometry(Point, 27700)"
        );
    }

    #[test]
    fn test_schema_statements_without_geometry() {
        let columns = vec![
            ("samp_id".to_string(), ColumnType::Text),
            ("samp_top".to_string(), ColumnType::Double),
        ];
        let statements = schema_statements("site", "samp", &columns, None);
        assert_eq!(statements.len(), 4);
        assert!(statements.iter().all(|s| !s.contains("geometry")));
    }
}
