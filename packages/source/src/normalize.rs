//! Mapping of raw `GeoJSON` event features to canonical [`Earthquake`]
//! records.
//!
//! FDSN services agree on the overall feature shape but differ in details:
//! INGV sends naive ISO 8601 timestamps in UTC while USGS sends epoch
//! milliseconds, and either may omit or null the magnitude.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use quake_map_quake_models::Earthquake;
use serde_json::Value;

use crate::SourceError;

/// Error for a single raw event that cannot be normalized.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// Timestamp or coordinates are missing or unparseable.
    #[error("Malformed event: {message}")]
    MalformedEvent {
        /// Description of what went wrong.
        message: String,
    },
}

/// What to do with a malformed event inside an otherwise valid collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Log and drop the event; the rest of the batch is kept.
    #[default]
    Skip,
    /// Fail the whole batch with [`NormalizeError::MalformedEvent`].
    Abort,
}

/// Result of normalizing an event collection.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Successfully normalized events, in response order.
    pub earthquakes: Vec<Earthquake>,
    /// Number of malformed events that were dropped.
    pub skipped: usize,
}

fn malformed(message: impl Into<String>) -> NormalizeError {
    NormalizeError::MalformedEvent {
        message: message.into(),
    }
}

/// Normalizes a single `GeoJSON` feature.
///
/// # Errors
///
/// Returns [`NormalizeError::MalformedEvent`] if the timestamp or the
/// coordinates are missing or unparseable. A missing magnitude is not an
/// error.
pub fn normalize(raw: &Value) -> Result<Earthquake, NormalizeError> {
    let properties = &raw["properties"];

    let timestamp = parse_event_time(&properties["time"])
        .ok_or_else(|| malformed(format!("bad or missing time: {}", properties["time"])))?;
    let (latitude, longitude) = parse_coordinates(&raw["geometry"]["coordinates"])
        .ok_or_else(|| {
            malformed(format!(
                "bad or missing coordinates: {}",
                raw["geometry"]["coordinates"]
            ))
        })?;

    let place = properties["place"].as_str().unwrap_or_default().trim().to_string();
    let magnitude = parse_magnitude(&properties["mag"], &place);

    let time = timestamp.time();
    Ok(Earthquake {
        date: timestamp.date_naive(),
        time: time.with_nanosecond(0).unwrap_or(time),
        magnitude,
        latitude,
        longitude,
        place,
    })
}

/// Normalizes every feature of a `FeatureCollection` body.
///
/// # Errors
///
/// Returns [`SourceError::Upstream`] if the body has no `features` array, or
/// [`SourceError::Normalize`] for the first malformed event when `policy` is
/// [`MalformedPolicy::Abort`].
pub fn normalize_collection(
    body: &Value,
    policy: MalformedPolicy,
) -> Result<NormalizedBatch, SourceError> {
    let features = body["features"]
        .as_array()
        .ok_or_else(|| SourceError::Upstream {
            message: "response is not a GeoJSON FeatureCollection".to_string(),
        })?;

    let mut batch = NormalizedBatch {
        earthquakes: Vec::with_capacity(features.len()),
        skipped: 0,
    };

    for feature in features {
        match normalize(feature) {
            Ok(earthquake) => batch.earthquakes.push(earthquake),
            Err(e) => match policy {
                MalformedPolicy::Skip => {
                    log::warn!("Skipping event: {e}");
                    batch.skipped += 1;
                }
                MalformedPolicy::Abort => return Err(e.into()),
            },
        }
    }

    Ok(batch)
}

/// Parses an event time as UTC.
///
/// Accepts RFC 3339 strings, naive ISO 8601 strings (assumed UTC) with or
/// without fractional seconds, and integer epoch milliseconds.
fn parse_event_time(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(millis) = value.as_i64() {
        return DateTime::from_timestamp_millis(millis);
    }

    let s = value.as_str()?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|naive| naive.and_utc())
}

/// Reads `[longitude, latitude, ...]` and returns `(latitude, longitude)`.
fn parse_coordinates(value: &Value) -> Option<(f64, f64)> {
    let coords = value.as_array()?;
    let longitude = coords.first()?.as_f64().filter(|v| v.is_finite())?;
    let latitude = coords.get(1)?.as_f64().filter(|v| v.is_finite())?;
    Some((latitude, longitude))
}

fn parse_magnitude(value: &Value, place: &str) -> Option<f64> {
    let magnitude = match value {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|m| m.is_finite());

    if magnitude.is_none() {
        log::warn!("Event at {place:?} has no usable magnitude ({value}); storing as null");
    }

    magnitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn feature(time: &Value, mag: &Value, coordinates: &Value) -> Value {
        json!({
            "type": "Feature",
            "properties": {"time": time, "mag": mag, "place": "3 km SW Norcia (PG)"},
            "geometry": {"type": "Point", "coordinates": coordinates}
        })
    }

    #[test]
    fn normalizes_ingv_feature() {
        let raw = feature(
            &json!("2024-03-01T12:30:05.120000"),
            &json!(3.4),
            &json!([13.0936, 42.7930, 8.2]),
        );
        let q = normalize(&raw).unwrap();
        assert_eq!(q.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(q.time, NaiveTime::from_hms_opt(12, 30, 5).unwrap());
        assert_eq!(q.magnitude, Some(3.4));
        assert!((q.latitude - 42.7930).abs() < f64::EPSILON);
        assert!((q.longitude - 13.0936).abs() < f64::EPSILON);
        assert_eq!(q.place, "3 km SW Norcia (PG)");
    }

    #[test]
    fn converts_offsets_to_utc() {
        let raw = feature(
            &json!("2024-03-01T00:30:00+02:00"),
            &json!(2.0),
            &json!([13.0, 42.0]),
        );
        let q = normalize(&raw).unwrap();
        assert_eq!(q.day_string(), "2024-02-29");
        assert_eq!(q.time_string(), "22:30:00");
    }

    #[test]
    fn parses_epoch_millis() {
        let raw = feature(&json!(1_709_296_205_000_i64), &json!(4.1), &json!([13.0, 42.0]));
        let q = normalize(&raw).unwrap();
        assert_eq!(q.day_string(), "2024-03-01");
        assert_eq!(q.time_string(), "12:30:05");
    }

    #[test]
    fn missing_magnitude_is_null() {
        for mag in [json!(null), json!("n/a")] {
            let raw = feature(&json!("2024-03-01T12:30:05"), &mag, &json!([13.0, 42.0]));
            assert_eq!(normalize(&raw).unwrap().magnitude, None);
        }

        let raw = json!({
            "properties": {"time": "2024-03-01T12:30:05", "place": "X"},
            "geometry": {"coordinates": [13.0, 42.0]}
        });
        assert_eq!(normalize(&raw).unwrap().magnitude, None);
    }

    #[test]
    fn numeric_string_magnitude_is_parsed() {
        let raw = feature(&json!("2024-03-01T12:30:05"), &json!("2.7"), &json!([13.0, 42.0]));
        assert_eq!(normalize(&raw).unwrap().magnitude, Some(2.7));
    }

    #[test]
    fn rejects_missing_time() {
        let raw = feature(&json!(null), &json!(2.0), &json!([13.0, 42.0]));
        assert!(matches!(
            normalize(&raw),
            Err(NormalizeError::MalformedEvent { .. })
        ));
    }

    #[test]
    fn rejects_bad_time() {
        let raw = feature(&json!("yesterday"), &json!(2.0), &json!([13.0, 42.0]));
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn rejects_short_or_non_numeric_coordinates() {
        for coords in [json!([13.0]), json!(["13.0", "42.0"]), json!(null)] {
            let raw = feature(&json!("2024-03-01T12:30:05"), &json!(2.0), &coords);
            assert!(normalize(&raw).is_err(), "accepted {coords}");
        }
    }

    #[test]
    fn missing_place_is_empty() {
        let raw = json!({
            "properties": {"time": "2024-03-01T12:30:05", "mag": 1.0},
            "geometry": {"coordinates": [13.0, 42.0]}
        });
        assert_eq!(normalize(&raw).unwrap().place, "");
    }

    #[test]
    fn collection_policy_controls_malformed_events() {
        let body = json!({
            "features": [
                feature(&json!("2024-03-01T12:30:05"), &json!(2.0), &json!([13.0, 42.0])),
                feature(&json!("garbage"), &json!(2.0), &json!([13.0, 42.0])),
            ]
        });

        let batch = normalize_collection(&body, MalformedPolicy::Skip).unwrap();
        assert_eq!(batch.earthquakes.len(), 1);
        assert_eq!(batch.skipped, 1);

        let err = normalize_collection(&body, MalformedPolicy::Abort).unwrap_err();
        assert!(matches!(err, SourceError::Normalize(_)));
    }

    #[test]
    fn rejects_body_without_features() {
        let err = normalize_collection(&json!([]), MalformedPolicy::Skip).unwrap_err();
        assert!(matches!(err, SourceError::Upstream { .. }));
    }
}
