//! Error types for the load pipeline.

use crate::crs::{CrsRole, EpsgCode};
use crate::store::StoreError;
use thiserror::Error;

/// Load pipeline result type.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors raised while loading an exchange document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A supplied EPSG code is not in the registry. Raised before any I/O.
    #[error("{role} reference system EPSG:{code} is not a known EPSG code")]
    InvalidReferenceSystem { role: CrsRole, code: EpsgCode },

    /// The target code does not match the SRID of the existing location layer.
    #[error("target EPSG:{target} does not match existing layer {table} (EPSG:{existing})")]
    ReferenceSystemMismatch {
        table: String,
        existing: EpsgCode,
        target: EpsgCode,
    },

    /// Building or applying a coordinate transformation failed.
    #[error("Reprojection error: {0}")]
    Reprojection(String),

    /// The location table lacks usable X/Y coordinates.
    #[error("Malformed location data at row {row}: {reason}")]
    MalformedLocationData { row: usize, reason: String },

    /// A table violates the row/column contract.
    #[error("Malformed table {table}: {reason}")]
    MalformedTable { table: String, reason: String },

    /// Campaign identifiers must be positive.
    #[error("Invalid campaign id {0}: campaign ids must be positive")]
    InvalidCampaignId(i64),

    /// The stored maximum campaign id cannot be incremented.
    #[error("Campaign id overflow: stored maximum is {0}")]
    CampaignOverflow(i64),

    /// Any failure reported by the destination store.
    #[error("Destination unavailable: {0}")]
    DestinationUnavailable(#[from] StoreError),
}

impl LoadError {
    pub fn malformed_location(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedLocationData {
            row,
            reason: reason.into(),
        }
    }

    pub fn malformed_table(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// True when the destination may hold a partial import.
    pub fn may_leave_partial_import(&self) -> bool {
        matches!(
            self,
            LoadError::MalformedLocationData { .. }
                | LoadError::MalformedTable { .. }
                | LoadError::Reprojection(_)
                | LoadError::DestinationUnavailable(_)
        )
    }
}
