//! Bounding box side file.
//!
//! The file is a header-less CSV of `key,value` rows, one per
//! [`BoundKey`]:
//!
//! ```text
//! minlatitude,35
//! maxlatitude,47.5
//! minlongitude,5
//! maxlongitude,20
//! ```
//!
//! Reading never creates the file. Call [`ensure_bounding_box`] once during
//! setup to write the default when it is absent.

use std::collections::BTreeMap;
use std::path::Path;

use quake_map_quake_models::{BoundKey, BoundingBox};
use strum::IntoEnumIterator;

use crate::SourceError;

fn bbox_error(path: &Path, message: impl std::fmt::Display) -> SourceError {
    SourceError::BoundingBox {
        message: format!("{}: {message}", path.display()),
    }
}

/// Writes `bbox` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`SourceError`] if the parent directory or file cannot be written.
pub fn write_bounding_box(path: &Path, bbox: &BoundingBox) -> Result<(), SourceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| bbox_error(path, e))?;

    for key in BoundKey::iter() {
        writer
            .write_record([key.as_ref(), bbox.get(key).to_string().as_str()])
            .map_err(|e| bbox_error(path, e))?;
    }

    writer.flush()?;
    Ok(())
}

/// Reads the bounding box from `path`.
///
/// Unknown keys are ignored.
///
/// # Errors
///
/// Returns [`SourceError::BoundingBox`] if the file is missing, any of the
/// four keys is absent, or a value is not a number.
pub fn read_bounding_box(path: &Path) -> Result<BoundingBox, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| bbox_error(path, e))?;

    let mut values: BTreeMap<BoundKey, f64> = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| bbox_error(path, e))?;
        let (Some(key), Some(value)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let Ok(key) = key.trim().parse::<BoundKey>() else {
            log::debug!("Ignoring unknown bounding box key {key:?}");
            continue;
        };
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|e| bbox_error(path, format!("{key}: {e}")))?;
        values.insert(key, value);
    }

    let get = |key: BoundKey| {
        values
            .get(&key)
            .copied()
            .ok_or_else(|| bbox_error(path, format!("missing {key}")))
    };

    Ok(BoundingBox {
        minlatitude: get(BoundKey::MinLatitude)?,
        maxlatitude: get(BoundKey::MaxLatitude)?,
        minlongitude: get(BoundKey::MinLongitude)?,
        maxlongitude: get(BoundKey::MaxLongitude)?,
    })
}

/// Setup step: writes [`BoundingBox::default`] to `path` if the file does
/// not exist yet, then returns the box stored there.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be written or read back.
pub fn ensure_bounding_box(path: &Path) -> Result<BoundingBox, SourceError> {
    if !path.exists() {
        log::info!("Writing default bounding box to {}", path.display());
        write_bounding_box(path, &BoundingBox::default())?;
    }
    read_bounding_box(path)
}
