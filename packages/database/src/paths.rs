#![allow(clippy::module_name_repetitions)]
//! Canonical file paths inside the data directory.
//!
//! Nothing here is resolved relative to the binary or the source tree: the
//! root is always supplied by the caller.

use std::path::{Path, PathBuf};

/// Environment variable consulted when no data directory is given
/// explicitly.
pub const DATA_DIR_ENV: &str = "QUAKE_MAP_DATA_DIR";

/// Fallback data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Root of all on-disk state (store, bounding box, settlement dataset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Uses `root` as the data directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the data directory from an explicit value, then
    /// [`DATA_DIR_ENV`], then [`DEFAULT_DATA_DIR`].
    #[must_use]
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let root = explicit
            .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self::new(root)
    }

    /// The directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the earthquake `DuckDB` file.
    #[must_use]
    pub fn earthquakes_db_path(&self) -> PathBuf {
        self.root.join("earthquakes.duckdb")
    }

    /// Path of the bounding box side file.
    #[must_use]
    pub fn bounding_box_path(&self) -> PathBuf {
        self.root.join("bounding_box.csv")
    }

    /// Path of the settlement reference dataset.
    #[must_use]
    pub fn settlements_path(&self) -> PathBuf {
        self.root.join("italian_municipalities.csv")
    }
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_wins() {
        let dir = DataDir::resolve(Some(PathBuf::from("/srv/quakes")));
        assert_eq!(dir.root(), Path::new("/srv/quakes"));
        assert_eq!(
            dir.earthquakes_db_path(),
            PathBuf::from("/srv/quakes/earthquakes.duckdb")
        );
        assert_eq!(
            dir.bounding_box_path(),
            PathBuf::from("/srv/quakes/bounding_box.csv")
        );
        assert_eq!(
            dir.settlements_path(),
            PathBuf::from("/srv/quakes/italian_municipalities.csv")
        );
    }
}
