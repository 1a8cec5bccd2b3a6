#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical earthquake record and the geographic reference types used
//! across the quake-map system.
//!
//! Every event source normalizes its raw records into [`Earthquake`]. The
//! full six-field tuple returned by [`Earthquake::identity`] is what the
//! store deduplicates on; upstream services do not expose a stable event ID
//! to us.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Format of [`Earthquake::date`] when rendered or stored as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of [`Earthquake::time`] when rendered or stored as text.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// An earthquake event normalized to the canonical schema.
///
/// Date and time are in UTC. Magnitude is `None` when the source omitted it
/// or sent something that is not a number; it is never defaulted to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Earthquake {
    /// Calendar date of the event (UTC).
    pub date: NaiveDate,
    /// Time of day of the event (UTC), whole seconds.
    pub time: NaiveTime,
    /// Reported magnitude, if any.
    pub magnitude: Option<f64>,
    /// Epicenter latitude (WGS84).
    pub latitude: f64,
    /// Epicenter longitude (WGS84).
    pub longitude: f64,
    /// Human-readable location description (e.g. "3 km SW Norcia (PG)").
    pub place: String,
}

/// Hashable, totally ordered form of the six-field identity tuple.
///
/// Floats are compared by bit pattern after folding `-0.0` into `0.0`, and
/// two null magnitudes are equal.
pub type IdentityKey = (NaiveDate, NaiveTime, Option<u64>, u64, u64, String);

impl Earthquake {
    /// Returns the identity tuple used for duplicate suppression.
    #[must_use]
    pub fn identity(&self) -> IdentityKey {
        (
            self.date,
            self.time,
            self.magnitude.map(float_key),
            float_key(self.latitude),
            float_key(self.longitude),
            self.place.clone(),
        )
    }

    /// Date rendered as `YYYY-MM-DD`.
    #[must_use]
    pub fn day_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Time rendered as `HH:MM:SS`.
    #[must_use]
    pub fn time_string(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }
}

fn float_key(value: f64) -> u64 {
    if value == 0.0 { 0 } else { value.to_bits() }
}

/// One of the four keys in the bounding box side file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum BoundKey {
    /// Southern edge.
    MinLatitude,
    /// Northern edge.
    MaxLatitude,
    /// Western edge.
    MinLongitude,
    /// Eastern edge.
    MaxLongitude,
}

/// Rectangular geographic filter applied to every remote fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge in decimal degrees.
    pub minlatitude: f64,
    /// Northern edge in decimal degrees.
    pub maxlatitude: f64,
    /// Western edge in decimal degrees.
    pub minlongitude: f64,
    /// Eastern edge in decimal degrees.
    pub maxlongitude: f64,
}

impl Default for BoundingBox {
    /// The Italian territory.
    fn default() -> Self {
        Self {
            minlatitude: 35.0,
            maxlatitude: 47.5,
            minlongitude: 5.0,
            maxlongitude: 20.0,
        }
    }
}

impl BoundingBox {
    /// Returns the value for a single bound.
    #[must_use]
    pub const fn get(&self, key: BoundKey) -> f64 {
        match key {
            BoundKey::MinLatitude => self.minlatitude,
            BoundKey::MaxLatitude => self.maxlatitude,
            BoundKey::MinLongitude => self.minlongitude,
            BoundKey::MaxLongitude => self.maxlongitude,
        }
    }

    /// Whether the point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.minlatitude..=self.maxlatitude).contains(&latitude)
            && (self.minlongitude..=self.maxlongitude).contains(&longitude)
    }
}

/// A named settlement from the reference dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settlement {
    /// Settlement name (e.g. "Padova").
    pub name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}
