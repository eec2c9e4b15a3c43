//! Ingestion-and-load pipeline for AGS4 site investigation data.
//!
//! Takes an already-parsed exchange document and appends every table to a spatial
//! destination store, tagging all rows of one import with a shared campaign id.
//! The `LOCA` table becomes a point layer; every other table is written as-is.
//!
//! # Usage
//!
//! ```rust,ignore
//! use agsload_core::{import_document, EpsgCode, ImportConfig, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! let config = ImportConfig::new(EpsgCode::new(27700), "site_a");
//! let report = import_document(&mut store, &config, document)?;
//! println!("campaign {} wrote {} rows", report.campaign_id, report.total_rows());
//! ```

mod error;

pub mod campaign;
pub mod crs;
pub mod geometry;
pub mod loader;
pub mod memory;
pub mod store;
pub mod table;
pub mod value;

pub use campaign::{allocate_campaign, CampaignId, LOCATION_LAYER};
pub use crs::{validate_reference_systems, CrsRegistry, CrsRole, EpsgCode, EpsgRegistry, Reprojector};
pub use error::{LoadError, Result};
pub use geometry::{build_location_layer, Point, SpatialLayer, GEOMETRY_COLUMN, NORTHING_OFFSET};
pub use loader::{import_document, ImportConfig, ImportReport, Loader, TableReport};
pub use memory::MemoryStore;
pub use store::{DestinationStore, StoreError, StoreResult};
pub use table::{ExchangeDocument, NormalizedTable, Table, CAMPAIGN_COLUMN};
pub use value::Value;
