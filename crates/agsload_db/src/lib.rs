//! PostgreSQL/PostGIS destination store for agsload.
//!
//! `PostgisStore` implements [`agsload_core::DestinationStore`] over a sqlx `PgPool`.
//! Tables are created on first append and grow new columns as later imports bring
//! them; rows are only ever appended.
//!
//! ```rust,ignore
//! use agsload_db::{DatabaseConfig, PostgisStore};
//!
//! let config = DatabaseConfig::from_url("postgres://loader@localhost/site_data")?;
//! let mut store = PostgisStore::connect(&config)?;
//! let report = agsload_core::import_document(&mut store, &import_config, document)?;
//! store.close();
//! ```

pub mod config;
pub mod error;
pub mod sql;
mod store;

pub use config::DatabaseConfig;
pub use error::{DbError, Result};
pub use store::PostgisStore;
