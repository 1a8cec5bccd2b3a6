#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Earthquake event sources and normalization logic.
//!
//! Each remote provider implements the [`EventSource`] trait to return a raw
//! `GeoJSON` `FeatureCollection` for a time window and bounding box.
//! [`fetch`] ties a source to the [`normalize`] step and produces canonical
//! [`Earthquake`] records.

pub mod bounding_box;
pub mod fdsn;
pub mod normalize;
pub mod registry;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use quake_map_quake_models::{BoundingBox, Earthquake};

pub use normalize::{MalformedPolicy, NormalizeError};

/// Errors that can occur during event source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The remote service failed or returned something other than an event
    /// collection.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Description of what went wrong.
        message: String,
    },

    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The bounding box side file is missing or malformed.
    #[error("Bounding box error: {message}")]
    BoundingBox {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A raw event could not be normalized.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Closed time window `[start, end]` for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive start instant.
    pub start: DateTime<Utc>,
    /// Inclusive end instant.
    pub end: DateTime<Utc>,
}

/// Largest `days_back` accepted by callers that validate user input.
///
/// FDSN catalogs do not reach back further than this.
pub const MAX_DAYS_BACK: i64 = 36_500;

impl TimeWindow {
    /// Rolling window covering the last `days_back` days, anchored to `now`
    /// rather than to midnight.
    ///
    /// A `days_back` too large for the calendar saturates the start at the
    /// earliest representable instant.
    #[must_use]
    pub fn last_days(days_back: i64, now: DateTime<Utc>) -> Self {
        let start = Duration::try_days(days_back)
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }
}

/// A remote provider of raw earthquake events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., `"ingv"`).
    fn id(&self) -> &str;

    /// Requests every event inside `window` and `bbox` and returns the raw
    /// `GeoJSON` `FeatureCollection`.
    ///
    /// Implementations issue a single request and do not retry.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the response is not
    /// valid JSON.
    async fn fetch_raw(
        &self,
        window: &TimeWindow,
        bbox: &BoundingBox,
    ) -> Result<serde_json::Value, SourceError>;
}

/// Fetches the last `days_back` days of events inside `bbox` from `source`
/// and normalizes them.
///
/// Malformed events are handled according to `policy`.
///
/// # Errors
///
/// Returns [`SourceError`] if the fetch fails, the body is not an event
/// collection, or a malformed event is met under [`MalformedPolicy::Abort`].
pub async fn fetch(
    source: &dyn EventSource,
    days_back: i64,
    bbox: &BoundingBox,
    policy: MalformedPolicy,
) -> Result<Vec<Earthquake>, SourceError> {
    let window = TimeWindow::last_days(days_back, Utc::now());
    log::info!(
        "[{}] Fetching events from {} to {}",
        source.id(),
        window.start.format("%Y-%m-%dT%H:%M:%S"),
        window.end.format("%Y-%m-%dT%H:%M:%S"),
    );

    let body = source.fetch_raw(&window, bbox).await?;
    let normalized = normalize::normalize_collection(&body, policy)?;

    if normalized.skipped > 0 {
        log::warn!(
            "[{}] Skipped {} malformed event(s)",
            source.id(),
            normalized.skipped
        );
    }
    log::info!(
        "[{}] Normalized {} event(s)",
        source.id(),
        normalized.earthquakes.len()
    );

    Ok(normalized.earthquakes)
}
