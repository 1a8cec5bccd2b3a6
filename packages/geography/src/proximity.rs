//! Nearest-settlement lookups over the reference dataset.
//!
//! The dataset is a CSV file with a `name,latitude,longitude` header. It is
//! small enough (a few thousand rows) that a linear scan with a stable sort
//! is both exact and fast, so no spatial index is built.

use std::path::Path;

use quake_map_quake_models::Settlement;

use crate::{ProximityError, distance_km};

/// In-memory settlement dataset, kept in file order.
#[derive(Debug, Clone, Default)]
pub struct ProximityIndex {
    settlements: Vec<Settlement>,
}

impl ProximityIndex {
    /// Loads every settlement from the CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::DataUnavailable`] if the file cannot be
    /// opened or any row fails to parse.
    pub fn load(path: &Path) -> Result<Self, ProximityError> {
        let unavailable = |message: String| ProximityError::DataUnavailable {
            path: path.display().to_string(),
            message,
        };

        let mut reader = csv::Reader::from_path(path).map_err(|e| unavailable(e.to_string()))?;

        let settlements = reader
            .deserialize::<Settlement>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| unavailable(e.to_string()))?;

        log::debug!(
            "Loaded {} settlements from {}",
            settlements.len(),
            path.display()
        );

        Ok(Self { settlements })
    }

    /// Builds an index from settlements already in memory.
    #[must_use]
    pub const fn from_settlements(settlements: Vec<Settlement>) -> Self {
        Self { settlements }
    }

    /// Number of settlements in the dataset.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settlements.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }

    /// Returns the `n` settlements closest to the given point as
    /// `(name, distance_km)`, nearest first.
    ///
    /// Equal distances keep dataset order. Returns every settlement when `n`
    /// exceeds the dataset size.
    #[must_use]
    pub fn nearest(&self, lat: f64, lon: f64, n: usize) -> Vec<(String, f64)> {
        let mut distances: Vec<(&Settlement, f64)> = self
            .settlements
            .iter()
            .map(|s| (s, distance_km(lat, lon, s.latitude, s.longitude)))
            .collect();

        distances.sort_by(|a, b| a.1.total_cmp(&b.1));

        distances
            .into_iter()
            .take(n)
            .map(|(s, d)| (s.name.clone(), d))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settlement(name: &str, latitude: f64, longitude: f64) -> Settlement {
        Settlement {
            name: name.to_string(),
            latitude,
            longitude,
        }
    }

    fn sample_index() -> ProximityIndex {
        ProximityIndex::from_settlements(vec![
            settlement("Palermo", 38.1157, 13.3615),
            settlement("Padova", 45.4064, 11.8768),
            settlement("Parma", 44.8015, 10.3279),
            settlement("Norcia", 42.7930, 13.0936),
            settlement("Cascia", 42.7178, 13.0136),
        ])
    }

    #[test]
    fn returns_nearest_first() {
        let index = sample_index();
        let result = index.nearest(42.80, 13.10, 3);

        let names: Vec<&str> = result.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Norcia", "Cascia", "Padova"]);
        for window in result.windows(2) {
            assert!(window[0].1 <= window[1].1);
        }
    }

    #[test]
    fn returns_whole_dataset_when_n_is_larger() {
        let index = sample_index();
        let result = index.nearest(42.0, 12.0, 50);
        assert_eq!(result.len(), index.len());
        for window in result.windows(2) {
            assert!(window[0].1 <= window[1].1);
        }
    }

    #[test]
    fn zero_n_returns_nothing() {
        assert!(sample_index().nearest(42.0, 12.0, 0).is_empty());
    }

    #[test]
    fn ties_keep_dataset_order() {
        let index = ProximityIndex::from_settlements(vec![
            settlement("North", 1.0, 0.0),
            settlement("South", -1.0, 0.0),
            settlement("Origin", 0.0, 0.0),
        ]);
        let result = index.nearest(0.0, 0.0, 3);
        let names: Vec<&str> = result.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Origin", "North", "South"]);
        assert!((result[1].1 - result[2].1).abs() < f64::EPSILON);
    }

    #[test]
    fn loads_csv_dataset() {
        let tmp = std::env::temp_dir().join("quake_map_proximity_load_test");
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("settlements.csv");
        std::fs::write(
            &path,
            "name,latitude,longitude\n\
             Norcia,42.7930,13.0936\n\
             \"Reggio nell'Emilia\",44.6983,10.6312\n",
        )
        .unwrap();

        let index = ProximityIndex::load(&path).unwrap();
        assert_eq!(index.len(), 2);
        let result = index.nearest(44.70, 10.63, 1);
        assert_eq!(result[0].0, "Reggio nell'Emilia");
        assert!(result[0].1 < 1.0);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn missing_dataset_is_unavailable() {
        let path = std::env::temp_dir().join("quake_map_no_such_settlements.csv");
        let err = ProximityIndex::load(&path).unwrap_err();
        assert!(matches!(err, ProximityError::DataUnavailable { .. }));
    }

    #[test]
    fn malformed_row_is_unavailable() {
        let tmp = std::env::temp_dir().join("quake_map_proximity_bad_row_test");
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("settlements.csv");
        std::fs::write(&path, "name,latitude,longitude\nNorcia,north,13.0\n").unwrap();

        let err = ProximityIndex::load(&path).unwrap_err();
        assert!(matches!(err, ProximityError::DataUnavailable { .. }));

        std::fs::remove_dir_all(&tmp).ok();
    }
}
