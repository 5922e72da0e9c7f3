//! Firmware version resolution
//!
//! Service firmware always carries revision 255. Everything else takes its
//! revision from the version source (or a per-target override) and must stay
//! in 0..=254 so it can never be mistaken for a service build.

use serde::{Deserialize, Serialize};

use crate::config::defs::{PRODUCT_ID, PRODUCT_MINOR_VER, PRODUCT_REVISION, PRODUCT_VERSION};
use crate::error::VersionExtractionError;

pub const SERVICE_REVISION: u8 = 255;
pub const MAX_REVISION: i64 = 254;
pub const MIN_MINOR: i64 = 1;
pub const MAX_MINOR: i64 = 15;

/// Unvalidated values as read from a version source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVersion {
    pub product_id: i64,
    pub major: i64,
    pub minor: i64,
    pub revision: Option<i64>,
}

/// Validated run-global version constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConstants {
    pub product_id: u8,
    pub major: u8,
    pub minor: u8,
}

/// Resolves the revision for a run or for individual targets
#[derive(Debug, Clone)]
pub struct VersionResolver {
    constants: VersionConstants,
    base_revision: Option<i64>,
    is_service_firmware: bool,
    source_name: String,
}

impl VersionResolver {
    /// Validate the constant parts of a raw version
    pub fn new(
        raw: RawVersion,
        is_service_firmware: bool,
        source_name: impl Into<String>,
    ) -> Result<Self, VersionExtractionError> {
        let constants = VersionConstants {
            product_id: in_range(PRODUCT_ID, raw.product_id, 1, 255)?,
            major: in_range(PRODUCT_VERSION, raw.major, 1, 255)?,
            minor: in_range(PRODUCT_MINOR_VER, raw.minor, MIN_MINOR, MAX_MINOR)?,
        };

        Ok(Self {
            constants,
            base_revision: raw.revision,
            is_service_firmware,
            source_name: source_name.into(),
        })
    }

    pub fn constants(&self) -> VersionConstants {
        self.constants
    }

    /// Resolve a revision; `override_revision` is a per-target value
    pub fn resolve(&self, override_revision: Option<i64>) -> Result<u8, VersionExtractionError> {
        if self.is_service_firmware {
            return Ok(SERVICE_REVISION);
        }

        let (symbol, value) = match override_revision {
            Some(value) => ("revision_ver", value),
            None => {
                let value =
                    self.base_revision
                        .ok_or_else(|| VersionExtractionError::MissingSymbol {
                            symbol: PRODUCT_REVISION.to_string(),
                            source_name: self.source_name.clone(),
                        })?;
                (PRODUCT_REVISION, value)
            }
        };

        in_range(symbol, value, 0, MAX_REVISION)
    }
}

fn in_range(symbol: &str, value: i64, min: i64, max: i64) -> Result<u8, VersionExtractionError> {
    if (min..=max).contains(&value) {
        // max <= 255 for every caller
        Ok(value as u8)
    } else {
        Err(VersionExtractionError::OutOfRange {
            symbol: symbol.to_string(),
            value,
            min,
            max,
        })
    }
}
