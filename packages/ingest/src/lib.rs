#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fetch, store and rank recent earthquakes.
//!
//! [`QueryService`] wires an [`EventSource`] to the [`EarthquakeStore`]: every
//! run pulls the requested window from the remote service, merges it into the
//! store, and answers a top-K query against everything stored so far.

use std::path::PathBuf;

use quake_map_database::{DbError, EarthquakeStore};
use quake_map_geography::{ProximityError, ProximityIndex};
use quake_map_quake_models::{BoundingBox, Earthquake};
use quake_map_source::{
    EventSource, MAX_DAYS_BACK, MalformedPolicy, NormalizeError, SourceError,
};

/// Number of settlements attached to each row when proximity is requested.
pub const CLOSEST_SETTLEMENTS: usize = 5;

/// Errors surfaced by a query run, grouped by kind.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A raw event could not be normalized under [`MalformedPolicy::Abort`].
    #[error(transparent)]
    MalformedEvent(NormalizeError),

    /// The remote service failed or returned an unusable response.
    #[error(transparent)]
    Upstream(SourceError),

    /// The durable store failed.
    #[error(transparent)]
    Storage(#[from] DbError),

    /// A local reference file (bounding box, settlement dataset) is missing
    /// or unreadable.
    #[error("Data unavailable: {0}")]
    DataUnavailable(Box<dyn std::error::Error + Send + Sync>),

    /// The query parameters were rejected before any work started.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// Which parameter was rejected and why.
        message: String,
    },
}

impl QueryError {
    /// Stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "MalformedEvent",
            Self::Upstream(_) => "UpstreamError",
            Self::Storage(_) => "StorageError",
            Self::DataUnavailable(_) => "DataUnavailable",
            Self::InvalidQuery { .. } => "InvalidQuery",
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }
}

impl From<SourceError> for QueryError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Normalize(e) => Self::MalformedEvent(e),
            SourceError::BoundingBox { .. } | SourceError::Io(_) => {
                Self::DataUnavailable(Box::new(e))
            }
            SourceError::Upstream { .. } | SourceError::Http(_) => Self::Upstream(e),
        }
    }
}

impl From<ProximityError> for QueryError {
    fn from(e: ProximityError) -> Self {
        Self::DataUnavailable(Box::new(e))
    }
}

/// User-supplied parameters for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryParams {
    /// How many days back to fetch and to consider in the ranking.
    pub days: i64,
    /// Maximum number of rows returned.
    pub k: i64,
    /// Inclusive lower bound on magnitude.
    pub min_magnitude: f64,
    /// Attach the closest settlements to each row.
    pub with_proximity: bool,
}

impl QueryParams {
    /// Checks the parameters without touching the network or the store.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidQuery`] if `k <= 0`, `days` is outside
    /// `0..=MAX_DAYS_BACK`, or `min_magnitude` is not finite.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.k <= 0 {
            return Err(QueryError::invalid(format!(
                "K must be positive, got {}",
                self.k
            )));
        }
        if !(0..=MAX_DAYS_BACK).contains(&self.days) {
            return Err(QueryError::invalid(format!(
                "days must be between 0 and {MAX_DAYS_BACK}, got {}",
                self.days
            )));
        }
        if !self.min_magnitude.is_finite() {
            return Err(QueryError::invalid(format!(
                "magnitude must be a finite number, got {}",
                self.min_magnitude
            )));
        }
        Ok(())
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    /// The stored earthquake.
    pub earthquake: Earthquake,
    /// Closest settlements as `(name, km)`, nearest first, when requested.
    pub closest: Option<Vec<(String, f64)>>,
}

/// End-to-end fetch, store and rank pipeline.
pub struct QueryService {
    source: Box<dyn EventSource>,
    store: EarthquakeStore,
    bbox: BoundingBox,
    settlements_path: PathBuf,
    policy: MalformedPolicy,
}

impl QueryService {
    /// Creates a service that skips malformed events.
    #[must_use]
    pub fn new(
        source: Box<dyn EventSource>,
        store: EarthquakeStore,
        bbox: BoundingBox,
        settlements_path: PathBuf,
    ) -> Self {
        Self {
            source,
            store,
            bbox,
            settlements_path,
            policy: MalformedPolicy::default(),
        }
    }

    /// Sets how malformed events in a fetched collection are handled.
    #[must_use]
    pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &EarthquakeStore {
        &self.store
    }

    /// Fetches the last `params.days` days, merges them into the store and
    /// returns the top `params.k` stored earthquakes.
    ///
    /// # Errors
    ///
    /// Returns the first [`QueryError`] met. Records already committed to the
    /// store stay there, but no partial result is returned.
    pub async fn run(&self, params: &QueryParams) -> Result<Vec<QueryRow>, QueryError> {
        params.validate()?;

        let fetched =
            quake_map_source::fetch(self.source.as_ref(), params.days, &self.bbox, self.policy)
                .await?;
        self.store.upsert_all(&fetched)?;

        let k = u64::try_from(params.k).map_err(|e| QueryError::invalid(e.to_string()))?;
        let days = u64::try_from(params.days).map_err(|e| QueryError::invalid(e.to_string()))?;
        let earthquakes = self.store.query_top_k(k, days, params.min_magnitude)?;
        log::info!("Query returned {} earthquake(s)", earthquakes.len());

        let index = if params.with_proximity {
            Some(ProximityIndex::load(&self.settlements_path)?)
        } else {
            None
        };

        Ok(earthquakes
            .into_iter()
            .map(|earthquake| {
                let closest = index.as_ref().map(|index| {
                    index.nearest(
                        earthquake.latitude,
                        earthquake.longitude,
                        CLOSEST_SETTLEMENTS,
                    )
                });
                QueryRow {
                    earthquake,
                    closest,
                }
            })
            .collect())
    }
}

/// Renders an earthquake as a single output line.
#[must_use]
pub fn format_row(earthquake: &Earthquake) -> String {
    let magnitude = earthquake
        .magnitude
        .map_or_else(|| "None".to_string(), |mag| format!("{mag:?}"));
    format!(
        "day: {}, time: {}, magnitude: {magnitude}, lat: {:?}, lon: {:?}, place: {}",
        earthquake.day_string(),
        earthquake.time_string(),
        earthquake.latitude,
        earthquake.longitude,
        earthquake.place,
    )
}

/// Renders one closest-settlement line.
#[must_use]
pub fn format_closest(name: &str, km: f64) -> String {
    format!("  - {name}: {km:.2} km")
}
