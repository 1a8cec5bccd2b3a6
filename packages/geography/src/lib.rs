#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic helpers for annotating earthquakes.
//!
//! Provides the haversine great-circle distance and a [`ProximityIndex`]
//! over the settlement reference dataset that answers "which towns are
//! closest to this epicenter" queries.

pub mod proximity;

pub use proximity::ProximityIndex;

use thiserror::Error;

/// Mean Earth radius in kilometers used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum ProximityError {
    /// The settlement reference dataset could not be read or parsed.
    #[error("Settlement dataset unavailable ({path}): {message}")]
    DataUnavailable {
        /// Path that was being read.
        path: String,
        /// Description of what went wrong.
        message: String,
    },
}

/// Great-circle distance in kilometers between two points given in decimal
/// degrees.
///
/// Inputs are not validated; NaN propagates.
#[must_use]
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const PADOVA: (f64, f64) = (45.4064, 11.8768);
    const PALERMO: (f64, f64) = (38.1157, 13.3615);

    #[test]
    fn distance_to_self_is_zero() {
        for (lat, lon) in [PADOVA, PALERMO, (0.0, 0.0), (-33.86, 151.21)] {
            assert!(distance_km(lat, lon, lat, lon).abs() < 1e-9);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = distance_km(PADOVA.0, PADOVA.1, PALERMO.0, PALERMO.1);
        let ba = distance_km(PALERMO.0, PALERMO.1, PADOVA.0, PADOVA.1);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn padova_to_palermo_is_about_820_km() {
        let d = distance_km(PADOVA.0, PADOVA.1, PALERMO.0, PALERMO.1);
        assert!((810.0..830.0).contains(&d), "unexpected distance {d}");
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.01, "unexpected distance {d}");
    }

    #[test]
    fn nan_input_propagates() {
        assert!(distance_km(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }
}
