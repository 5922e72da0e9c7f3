//! Firmware version constants from a C header (`defs.h`)
//!
//! Recognized forms:
//! ```c
//! #define PRODUCT_ID 12
//! #define PRODUCT_REVISION (4)
//! ```

use regex::Regex;
use std::path::Path;

use crate::domain::version::RawVersion;
use crate::error::VersionExtractionError;

pub const PRODUCT_ID: &str = "PRODUCT_ID";
pub const PRODUCT_VERSION: &str = "PRODUCT_VERSION";
pub const PRODUCT_MINOR_VER: &str = "PRODUCT_VARIANT_MINOR_VER";
pub const PRODUCT_REVISION: &str = "PRODUCT_REVISION";

/// Read and parse a defs header
pub fn load_defs(path: &Path) -> Result<RawVersion, VersionExtractionError> {
    let text = std::fs::read_to_string(path).map_err(|e| VersionExtractionError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    parse_defs(&text, &path.display().to_string())
}

/// Extract version defines from header text
///
/// `PRODUCT_REVISION` is optional here: service firmware never reads it, so a
/// missing revision is reported by the version resolver only when needed.
pub fn parse_defs(text: &str, source_name: &str) -> Result<RawVersion, VersionExtractionError> {
    let required = |symbol: &str| {
        find_define(text, symbol).ok_or_else(|| VersionExtractionError::MissingSymbol {
            symbol: symbol.to_string(),
            source_name: source_name.to_string(),
        })
    };

    Ok(RawVersion {
        product_id: required(PRODUCT_ID)?,
        major: required(PRODUCT_VERSION)?,
        minor: required(PRODUCT_MINOR_VER)?,
        revision: find_define(text, PRODUCT_REVISION),
    })
}

fn find_define(text: &str, symbol: &str) -> Option<i64> {
    let pattern = format!(
        r"(?m)^\s*#define\s+{}\s+\(?\s*(\d+)\s*\)?",
        regex::escape(symbol)
    );
    let re = Regex::new(&pattern).ok()?;
    let captures = re.captures(text)?;
    // Digits only, so the sole failure mode is overflow
    Some(captures[1].parse::<i64>().unwrap_or(i64::MAX))
}
