//! `agsload check-epsg`: look a code up in the bundled registry.

use crate::cli::error::HelpfulError;
use agsload_core::{CrsRegistry, EpsgCode, EpsgRegistry};

#[derive(Debug)]
pub struct CheckEpsgArgs {
    pub code: EpsgCode,
}

pub fn run(args: CheckEpsgArgs) -> anyhow::Result<()> {
    if !EpsgRegistry.is_known_code(args.code) {
        return Err(HelpfulError::invalid_epsg(args.code, None).into());
    }

    println!("EPSG:{} is a known reference system", args.code);
    if let Some(definition) = EpsgRegistry::proj4_definition(args.code) {
        println!("  {}", definition.trim());
    }
    Ok(())
}
