//! Coordinate reference systems: EPSG code validation and point reprojection.

use crate::error::{LoadError, Result};
use crate::geometry::Point;
use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// Numeric EPSG identifier of a coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpsgCode(u32);

impl EpsgCode {
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EpsgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EpsgCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl std::str::FromStr for EpsgCode {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        digits.parse::<u32>().map(Self)
    }
}

/// Which side of the transformation a code was supplied for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsRole {
    Source,
    Target,
}

impl fmt::Display for CrsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsRole::Source => write!(f, "source"),
            CrsRole::Target => write!(f, "target"),
        }
    }
}

/// Lookup of known reference system codes.
pub trait CrsRegistry {
    fn is_known_code(&self, code: EpsgCode) -> bool;
}

/// Registry backed by the bundled EPSG definition table.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpsgRegistry;

impl EpsgRegistry {
    /// proj4 definition string for a code, if the table carries one.
    pub fn proj4_definition(code: EpsgCode) -> Option<&'static str> {
        let code = u16::try_from(code.value()).ok()?;
        crs_definitions::from_code(code).map(|def| def.proj4)
    }
}

impl CrsRegistry for EpsgRegistry {
    fn is_known_code(&self, code: EpsgCode) -> bool {
        Self::proj4_definition(code).is_some()
    }
}

/// Check the target code and, when present, the source code.
///
/// Must run before any other work so invalid input fails with no side effects.
pub fn validate_reference_systems<R: CrsRegistry + ?Sized>(
    registry: &R,
    source: Option<EpsgCode>,
    target: EpsgCode,
) -> Result<()> {
    if let Some(source) = source {
        if !registry.is_known_code(source) {
            return Err(LoadError::InvalidReferenceSystem {
                role: CrsRole::Source,
                code: source,
            });
        }
    }
    if !registry.is_known_code(target) {
        return Err(LoadError::InvalidReferenceSystem {
            role: CrsRole::Target,
            code: target,
        });
    }
    Ok(())
}

/// Transforms points between two reference systems.
///
/// Geographic systems take and return degrees, longitude first.
pub struct Reprojector {
    source_code: EpsgCode,
    target_code: EpsgCode,
    source: Proj,
    target: Proj,
}

impl fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojector")
            .field("source", &self.source_code)
            .field("target", &self.target_code)
            .finish()
    }
}

impl Reprojector {
    /// Build a transformer between two validated codes.
    pub fn new(source: EpsgCode, target: EpsgCode) -> Result<Self> {
        Ok(Self {
            source_code: source,
            target_code: target,
            source: load_proj(source)?,
            target: load_proj(target)?,
        })
    }

    /// Build a transformer only when one is needed.
    ///
    /// Returns `None` when the source is absent or equal to the target.
    pub fn for_import(source: Option<EpsgCode>, target: EpsgCode) -> Result<Option<Self>> {
        match source {
            Some(source) if source != target => {
                debug!(%source, %target, "Building reprojector");
                Self::new(source, target).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn source_code(&self) -> EpsgCode {
        self.source_code
    }

    pub fn target_code(&self) -> EpsgCode {
        self.target_code
    }

    /// Transform every point, preserving count and order.
    pub fn transform(&self, points: &[Point]) -> Result<Vec<Point>> {
        points
            .iter()
            .enumerate()
            .map(|(idx, point)| self.transform_one(point).map_err(|e| {
                LoadError::Reprojection(format!("point {}: {}", idx, e))
            }))
            .collect()
    }

    fn transform_one(&self, point: &Point) -> std::result::Result<Point, String> {
        let (mut x, mut y) = (point.x, point.y);
        if self.source.is_latlong() {
            x = x.to_radians();
            y = y.to_radians();
        }

        let mut coords = (x, y, 0.0_f64);
        proj4rs::transform::transform(&self.source, &self.target, &mut coords)
            .map_err(|e| e.to_string())?;

        let (mut x, mut y) = (coords.0, coords.1);
        if self.target.is_latlong() {
            x = x.to_degrees();
            y = y.to_degrees();
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(format!("({}, {}) has no finite image", point.x, point.y));
        }
        Ok(Point::new(x, y, self.target_code))
    }
}

/// OSGB36 to WGS84 Helmert parameters (EPSG:1314).
const OSGB36_TOWGS84: &str = "+towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489";

/// Datum shifts for codes whose bundled definition may omit one.
fn datum_shift(code: EpsgCode) -> Option<&'static str> {
    match code.value() {
        27700 | 4277 => Some(OSGB36_TOWGS84),
        _ => None,
    }
}

/// proj4 string for `code`, with a datum shift appended when the definition lacks one.
fn proj_string(code: EpsgCode) -> Result<Cow<'static, str>> {
    let definition = EpsgRegistry::proj4_definition(code)
        .ok_or_else(|| LoadError::Reprojection(format!("no definition for EPSG:{}", code)))?;
    let has_datum = definition.contains("+towgs84") || definition.contains("+datum=");
    Ok(match datum_shift(code) {
        Some(shift) if !has_datum => Cow::Owned(format!("{} {}", definition, shift)),
        _ => Cow::Borrowed(definition),
    })
}

fn load_proj(code: EpsgCode) -> Result<Proj> {
    let definition = proj_string(code)?;
    Proj::from_proj_string(&definition)
        .map_err(|e| LoadError::Reprojection(format!("EPSG:{}: {}", code, e)))
}
