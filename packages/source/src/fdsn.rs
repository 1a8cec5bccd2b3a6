//! FDSN event web service client.
//!
//! Issues a single `GET {base_url}?format=geojson&...` per fetch. There is
//! no retry loop: a failed request surfaces as [`SourceError::Upstream`] or
//! [`SourceError::Http`] and the caller decides what to do.
//!
//! See <https://www.fdsn.org/webservices/fdsnws-event-1.2.pdf>

use std::time::Duration;

use async_trait::async_trait;
use quake_map_quake_models::{BoundKey, BoundingBox};
use reqwest::StatusCode;
use strum::IntoEnumIterator;

use crate::registry::EventService;
use crate::{EventSource, SourceError, TimeWindow};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timestamp format for `starttime` / `endtime`.
const FDSN_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 200;

/// [`EventSource`] backed by an FDSN `GeoJSON` endpoint (INGV, USGS, ...).
pub struct FdsnClient {
    client: reqwest::Client,
    service: EventService,
}

impl FdsnClient {
    /// Creates a client for the given service.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(service: EventService) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("quake_map/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, service })
    }
}

#[async_trait]
impl EventSource for FdsnClient {
    fn id(&self) -> &str {
        &self.service.id
    }

    async fn fetch_raw(
        &self,
        window: &TimeWindow,
        bbox: &BoundingBox,
    ) -> Result<serde_json::Value, SourceError> {
        let params = query_params(window, bbox, self.service.limit);
        log::debug!("[{}] GET {} {params:?}", self.service.id, self.service.base_url);

        let response = self
            .client
            .get(&self.service.base_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        parse_response(status, &text)
    }
}

/// Builds the FDSN query string for a window and bounding box.
fn query_params(
    window: &TimeWindow,
    bbox: &BoundingBox,
    limit: Option<u64>,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("format".to_string(), "geojson".to_string()),
        (
            "starttime".to_string(),
            window.start.format(FDSN_TIME_FORMAT).to_string(),
        ),
        (
            "endtime".to_string(),
            window.end.format(FDSN_TIME_FORMAT).to_string(),
        ),
    ];

    for key in BoundKey::iter() {
        params.push((key.to_string(), bbox.get(key).to_string()));
    }

    if let Some(limit) = limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// Interprets an FDSN response.
///
/// `204 No Content` is how FDSN services report an empty result, so it maps
/// to an empty `FeatureCollection`.
fn parse_response(status: StatusCode, text: &str) -> Result<serde_json::Value, SourceError> {
    if status == StatusCode::NO_CONTENT {
        return Ok(serde_json::json!({"type": "FeatureCollection", "features": []}));
    }

    if !status.is_success() {
        return Err(SourceError::Upstream {
            message: format!("HTTP {status}: {}", preview(text)),
        });
    }

    serde_json::from_str(text).map_err(|e| SourceError::Upstream {
        message: format!(
            "invalid JSON body ({e}, received {} bytes): {}",
            text.len(),
            preview(text)
        ),
    })
}

fn preview(text: &str) -> String {
    text.chars().take(BODY_PREVIEW_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow {
            start: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 8, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn builds_query_params() {
        let params = query_params(&window(), &BoundingBox::default(), None);
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("format"), Some("geojson"));
        assert_eq!(get("starttime"), Some("2024-03-01T08:00:00"));
        assert_eq!(get("endtime"), Some("2024-03-08T08:00:00"));
        assert_eq!(get("minlatitude"), Some("35"));
        assert_eq!(get("maxlatitude"), Some("47.5"));
        assert_eq!(get("minlongitude"), Some("5"));
        assert_eq!(get("maxlongitude"), Some("20"));
        assert_eq!(get("limit"), None);
    }

    #[test]
    fn includes_limit_when_configured() {
        let params = query_params(&window(), &BoundingBox::default(), Some(20_000));
        assert!(params.contains(&("limit".to_string(), "20000".to_string())));
    }

    #[test]
    fn no_content_is_empty_collection() {
        let body = parse_response(StatusCode::NO_CONTENT, "").unwrap();
        assert_eq!(body["features"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn error_status_is_upstream_error() {
        let err = parse_response(StatusCode::SERVICE_UNAVAILABLE, "maintenance").unwrap_err();
        match err {
            SourceError::Upstream { message } => assert!(message.contains("503")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_body_is_upstream_error() {
        let err = parse_response(StatusCode::OK, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, SourceError::Upstream { .. }));
    }

    #[test]
    fn parses_json_body() {
        let body = parse_response(StatusCode::OK, r#"{"features": []}"#).unwrap();
        assert!(body["features"].is_array());
    }
}
