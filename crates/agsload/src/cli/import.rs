//! `agsload import`: read an AGS4 file and append it to a PostGIS schema.

use crate::cli::config::DbArgs;
use crate::cli::error::HelpfulError;
use crate::cli::output::{format_duration_ms, print_json, print_table};
use agsload_core::{
    import_document, validate_reference_systems, CampaignId, EpsgCode, EpsgRegistry,
    ImportConfig, ImportReport, LoadError,
};
use agsload_db::PostgisStore;
use anyhow::Context;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug)]
pub struct ImportArgs {
    pub file: PathBuf,
    pub target_epsg: EpsgCode,
    pub source_epsg: Option<EpsgCode>,
    pub schema: String,
    pub campaign_id: Option<i64>,
    pub db: DbArgs,
    pub json: bool,
}

impl ImportArgs {
    fn import_config(&self) -> anyhow::Result<ImportConfig> {
        let mut config = ImportConfig::new(self.target_epsg, self.schema.clone());
        if let Some(source) = self.source_epsg {
            config = config.with_source_crs(source);
        }
        if let Some(id) = self.campaign_id {
            config = config.with_campaign_id(CampaignId::new(id)?);
        }
        Ok(config)
    }
}

pub fn run(args: ImportArgs) -> anyhow::Result<()> {
    let config = args.import_config()?;

    // Reject bad codes before the file is read or a connection is opened.
    validate_reference_systems(&EpsgRegistry, config.source_crs, config.target_crs)
        .map_err(explain_load_error)?;

    let document = super::read_document(&args.file)?;
    let db_config = args.db.resolve()?;

    let mut store = PostgisStore::connect(&db_config).map_err(|e| {
        HelpfulError::connection_failed(&db_config.to_string(), &e.to_string())
    })?;

    let result = import_document(&mut store, &config, document);
    store.close();

    let report = result.map_err(explain_load_error).with_context(|| {
        format!(
            "Import of {} into schema {} failed",
            args.file.display(),
            config.schema
        )
    })?;

    info!(
        campaign = report.campaign_id.value(),
        rows = report.total_rows(),
        "Imported {}",
        args.file.display()
    );

    if args.json {
        print_json(&report)
    } else {
        print_report(&report);
        Ok(())
    }
}

fn explain_load_error(err: LoadError) -> anyhow::Error {
    match err {
        LoadError::InvalidReferenceSystem { role, code } => {
            HelpfulError::invalid_epsg(code, Some(role)).into()
        }
        LoadError::ReferenceSystemMismatch {
            table,
            existing,
            target,
        } => HelpfulError::new(format!(
            "Target EPSG:{} does not match existing layer {} (EPSG:{})",
            target, table, existing
        ))
        .with_context("All campaigns in one schema share the location layer's reference system")
        .with_suggestions([
            format!("TRY: --target-epsg {} --source-epsg {}", existing, target),
            "TRY: Import into a different --schema".to_string(),
        ])
        .into(),
        err if err.may_leave_partial_import() => {
            warn!("Import stopped part way; tables written before the failure remain");
            anyhow::Error::new(err).context(
                "Tables written before this failure were committed and are not rolled back",
            )
        }
        err => err.into(),
    }
}

fn print_report(report: &ImportReport) {
    let rows = report
        .tables
        .iter()
        .map(|t| {
            vec![
                t.source_name.clone(),
                format!("{}.{}", report.schema, t.name),
                t.rows.to_string(),
                if t.spatial {
                    format!("EPSG:{}", report.target_crs)
                } else {
                    String::new()
                },
            ]
        })
        .collect();
    print_table(&["GROUP", "TABLE", "ROWS", "GEOMETRY"], rows);

    let reprojected = report
        .reprojected_from
        .map(|from| format!(", reprojected from EPSG:{}", from))
        .unwrap_or_default();
    println!(
        "Campaign {}: {} rows in {} tables ({}{})",
        report.campaign_id,
        report.total_rows(),
        report.tables.len(),
        format_duration_ms(report.duration_ms),
        reprojected
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use agsload_core::CrsRole;

    fn args() -> ImportArgs {
        ImportArgs {
            file: PathBuf::from("site.ags"),
            target_epsg: EpsgCode::new(27700),
            source_epsg: None,
            schema: "harbour".to_string(),
            campaign_id: None,
            db: DbArgs::default(),
            json: false,
        }
    }

    #[test]
    fn test_import_config_from_args() {
        let config = ImportArgs {
            source_epsg: Some(EpsgCode::new(4326)),
            campaign_id: Some(12),
            ..args()
        }
        .import_config()
        .unwrap();

        assert_eq!(config.schema, "harbour");
        assert_eq!(config.source_crs, Some(EpsgCode::new(4326)));
        assert_eq!(config.campaign_id.map(CampaignId::value), Some(12));
    }

    #[test]
    fn test_non_positive_campaign_id_rejected() {
        let result = ImportArgs {
            campaign_id: Some(0),
            ..args()
        }
        .import_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_code_fails_before_reading_file() {
        let err = run(ImportArgs {
            file: PathBuf::from("/nonexistent/site.ags"),
            target_epsg: EpsgCode::new(999999),
            ..args()
        })
        .unwrap_err();

        let display = err.to_string();
        assert!(display.contains("Unknown target reference system: EPSG:999999"));
    }

    #[test]
    fn test_partial_import_errors_say_so() {
        let err = explain_load_error(LoadError::malformed_location(2, "missing loca_locx"));
        assert!(err.to_string().contains("not rolled back"));

        let err = explain_load_error(LoadError::InvalidReferenceSystem {
            role: CrsRole::Source,
            code: EpsgCode::new(1),
        });
        assert!(!err.to_string().contains("rolled back"));
    }
}
