//! Campaign identifier allocation.
//!
//! The next identifier is read from the destination's location layer with no lock
//! held, so two imports started together against one schema can both receive the
//! same value. Serialize imports or pass an explicit id when that matters.

use crate::error::{LoadError, Result};
use crate::store::DestinationStore;
use crate::table::CAMPAIGN_COLUMN;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Destination name of the location layer.
pub const LOCATION_LAYER: &str = "loca";

/// Positive per-import identifier shared by every table of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct CampaignId(i64);

impl CampaignId {
    pub const FIRST: CampaignId = CampaignId(1);

    pub fn new(id: i64) -> Result<Self> {
        if id < 1 {
            return Err(LoadError::InvalidCampaignId(id));
        }
        Ok(Self(id))
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Identifier following a stored maximum.
    fn after(stored_max: i64) -> Result<Self> {
        let next = stored_max
            .checked_add(1)
            .ok_or(LoadError::CampaignOverflow(stored_max))?;
        Ok(Self(next.max(1)))
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for CampaignId {
    type Error = LoadError;

    fn try_from(id: i64) -> Result<Self> {
        Self::new(id)
    }
}

impl From<CampaignId> for i64 {
    fn from(id: CampaignId) -> Self {
        id.0
    }
}

/// Resolve the campaign identifier for an import.
///
/// An explicit id wins without touching the store. Otherwise: `1` when the schema has
/// no location layer or the layer holds no ids, else the stored maximum plus one.
pub fn allocate_campaign<S: DestinationStore + ?Sized>(
    store: &mut S,
    schema: &str,
    explicit: Option<CampaignId>,
) -> Result<CampaignId> {
    if let Some(id) = explicit {
        debug!(campaign_id = %id, "Using explicit campaign id");
        return Ok(id);
    }

    if !store.table_exists(schema, LOCATION_LAYER)? {
        debug!(schema, "No location layer yet, starting at campaign 1");
        return Ok(CampaignId::FIRST);
    }

    match store.max_value(schema, LOCATION_LAYER, CAMPAIGN_COLUMN)? {
        Some(max) => {
            let id = CampaignId::after(max)?;
            debug!(schema, stored_max = max, campaign_id = %id, "Allocated campaign id");
            Ok(id)
        }
        None => {
            warn!(schema, "Location layer exists but holds no campaign ids, starting at 1");
            Ok(CampaignId::FIRST)
        }
    }
}
