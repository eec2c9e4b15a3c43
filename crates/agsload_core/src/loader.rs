//! Load orchestration: one exchange document into one destination schema.

use crate::campaign::{allocate_campaign, CampaignId, LOCATION_LAYER};
use crate::crs::{validate_reference_systems, CrsRegistry, EpsgCode, EpsgRegistry, Reprojector};
use crate::error::{LoadError, Result};
use crate::geometry::{build_location_layer, is_location_table, GEOMETRY_COLUMN};
use crate::store::DestinationStore;
use crate::table::{ExchangeDocument, CAMPAIGN_COLUMN};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, info_span};

/// Per-import settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// CRS of the location coordinates; `None` means already in the target CRS.
    pub source_crs: Option<EpsgCode>,
    /// CRS of the written geometry.
    pub target_crs: EpsgCode,
    /// Destination schema name.
    pub schema: String,
    /// Overrides campaign allocation when set.
    pub campaign_id: Option<CampaignId>,
}

impl ImportConfig {
    pub fn new(target_crs: EpsgCode, schema: impl Into<String>) -> Self {
        Self {
            source_crs: None,
            target_crs,
            schema: schema.into(),
            campaign_id: None,
        }
    }

    pub fn with_source_crs(mut self, source: EpsgCode) -> Self {
        self.source_crs = Some(source);
        self
    }

    pub fn with_campaign_id(mut self, id: CampaignId) -> Self {
        self.campaign_id = Some(id);
        self
    }
}

/// Outcome of writing one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    /// Name written to the destination.
    pub name: String,
    /// Name in the exchange document.
    pub source_name: String,
    pub rows: u64,
    pub spatial: bool,
}

/// Summary of a completed import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub schema: String,
    pub campaign_id: CampaignId,
    pub target_crs: EpsgCode,
    pub reprojected_from: Option<EpsgCode>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub tables: Vec<TableReport>,
}

impl ImportReport {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Drives one import against an injected destination store.
///
/// Tables are appended one at a time in document order. A failure stops the import
/// and leaves earlier tables of the same campaign in place; nothing is rolled back.
pub struct Loader<S, R = EpsgRegistry> {
    store: S,
    registry: R,
}

impl<S: DestinationStore> Loader<S, EpsgRegistry> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            registry: EpsgRegistry,
        }
    }
}

impl<S: DestinationStore, R: CrsRegistry> Loader<S, R> {
    pub fn with_registry(store: S, registry: R) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Load `document` into the destination described by `config`.
    pub fn import(&mut self, config: &ImportConfig, document: ExchangeDocument) -> Result<ImportReport> {
        let span = info_span!("import", schema = %config.schema, target = %config.target_crs);
        let _guard = span.enter();
        let started_at = Utc::now();
        let timer = Instant::now();

        validate_reference_systems(&self.registry, config.source_crs, config.target_crs)?;
        let reprojector = Reprojector::for_import(config.source_crs, config.target_crs)?;

        let campaign_id = allocate_campaign(&mut self.store, &config.schema, config.campaign_id)?;
        info!(
            campaign_id = %campaign_id,
            tables = document.len(),
            reproject = reprojector.is_some(),
            "Starting import"
        );

        if document.tables().iter().any(|t| is_location_table(t.name())) {
            self.check_layer_srid(config)?;
        }

        let mut tables = Vec::with_capacity(document.len());
        for table in document {
            let mut normalized = table.normalize()?;
            normalized.stamp(CAMPAIGN_COLUMN, Value::Integer(campaign_id.value()));
            let source_name = normalized.source_name().to_string();
            let name = normalized.name().to_string();

            let (rows, spatial) = if is_location_table(&source_name) {
                let layer = build_location_layer(
                    normalized.into_table(),
                    config.target_crs,
                    reprojector.as_ref(),
                )?;
                (self.store.append_spatial_rows(&config.schema, &layer)?, true)
            } else {
                (self.store.append_rows(&config.schema, normalized.table())?, false)
            };

            info!(table = %name, rows, spatial, "Table written");
            tables.push(TableReport {
                name,
                source_name,
                rows,
                spatial,
            });
        }

        let report = ImportReport {
            schema: config.schema.clone(),
            campaign_id,
            target_crs: config.target_crs,
            reprojected_from: reprojector.as_ref().map(|r| r.source_code()),
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
            tables,
        };
        info!(
            campaign_id = %campaign_id,
            rows = report.total_rows(),
            duration_ms = report.duration_ms,
            "Import complete"
        );
        Ok(report)
    }

    fn check_layer_srid(&mut self, config: &ImportConfig) -> Result<()> {
        let existing = self
            .store
            .geometry_srid(&config.schema, LOCATION_LAYER, GEOMETRY_COLUMN)?;
        match existing {
            Some(existing) if existing != config.target_crs => {
                Err(LoadError::ReferenceSystemMismatch {
                    table: LOCATION_LAYER.to_string(),
                    existing,
                    target: config.target_crs,
                })
            }
            Some(_) => Ok(()),
            None => {
                debug!("Location layer SRID unknown or layer absent");
                Ok(())
            }
        }
    }
}

/// Load `document` with the bundled EPSG registry.
pub fn import_document<S: DestinationStore>(
    store: S,
    config: &ImportConfig,
    document: ExchangeDocument,
) -> Result<ImportReport> {
    Loader::new(store).import(config, document)
}
