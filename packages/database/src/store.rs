//! Deduplicated earthquake storage in `DuckDB`.
//!
//! The `earthquakes` table carries a six-column UNIQUE constraint over the
//! identity tuple. SQL treats NULLs as distinct in UNIQUE constraints, so
//! each insert additionally checks for an existing row with
//! `IS NOT DISTINCT FROM`, which makes two null-magnitude copies of the same
//! event collide as well.
//!
//! Writers share one connection behind a mutex and apply each batch in a
//! single transaction. Readers use a second connection to the same
//! database, so a query never waits on (or sees part of) an in-flight batch.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use duckdb::Connection;
use quake_map_quake_models::{DATE_FORMAT, Earthquake, TIME_FORMAT};

use crate::DbError;

const INSERT_SQL: &str = r#"
    INSERT INTO earthquakes ("day", "time", mag, latitude, longitude, place)
    SELECT ?::TEXT, ?::TEXT, ?::DOUBLE, ?::DOUBLE, ?::DOUBLE, ?::TEXT
    WHERE NOT EXISTS (
        SELECT 1 FROM earthquakes
        WHERE "day" = ?
          AND "time" = ?
          AND mag IS NOT DISTINCT FROM ?
          AND latitude = ?
          AND longitude = ?
          AND place = ?
    )
    ON CONFLICT DO NOTHING"#;

/// Durable, deduplicated collection of [`Earthquake`] records.
pub struct EarthquakeStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl EarthquakeStore {
    /// Opens (or creates) the store at `path` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the directory, connection, or schema creation
    /// fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            crate::paths::ensure_dir(parent)?;
        }

        log::debug!("Opening earthquake store at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        create_schema(&conn)?;
        let reader = conn.try_clone()?;
        Ok(Self {
            writer: Mutex::new(conn),
            reader: Mutex::new(reader),
        })
    }

    fn writer(&self) -> MutexGuard<'_, Connection> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reader(&self) -> MutexGuard<'_, Connection> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts every record whose identity tuple is not already stored.
    ///
    /// Existing rows are never overwritten. The batch is applied in one
    /// transaction: on error nothing from it is kept.
    ///
    /// Returns the number of newly inserted rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any database operation fails.
    pub fn upsert_all(&self, records: &[Earthquake]) -> Result<u64, DbError> {
        if records.is_empty() {
            return Ok(0);
        }

        // Deduplicate within the batch: keep the first occurrence
        let mut seen = BTreeSet::new();
        let deduped: Vec<&Earthquake> = records
            .iter()
            .filter(|record| seen.insert(record.identity()))
            .collect();

        if deduped.len() < records.len() {
            log::info!(
                "Deduplicated INSERT batch: {} -> {} rows ({} duplicates removed)",
                records.len(),
                deduped.len(),
                records.len() - deduped.len(),
            );
        }

        let mut conn = self.writer();
        let tx = conn.transaction()?;
        let mut inserted = 0u64;

        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for record in &deduped {
                let day = record.day_string();
                let time = record.time_string();
                let rows = stmt.execute(duckdb::params![
                    day,
                    time,
                    record.magnitude,
                    record.latitude,
                    record.longitude,
                    record.place,
                    day,
                    time,
                    record.magnitude,
                    record.latitude,
                    record.longitude,
                    record.place,
                ])?;
                inserted += u64::try_from(rows).unwrap_or(0);
            }
        }

        tx.commit()?;

        log::info!(
            "Inserted {inserted} new earthquake(s), skipped {} already stored",
            deduped.len() as u64 - inserted
        );

        Ok(inserted)
    }

    /// Returns up to `k` stored earthquakes with magnitude `>= min_magnitude`
    /// dated within the last `days` days (UTC), strongest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn query_top_k(
        &self,
        k: u64,
        days: u64,
        min_magnitude: f64,
    ) -> Result<Vec<Earthquake>, DbError> {
        self.query_top_k_as_of(k, days, min_magnitude, Utc::now().date_naive())
    }

    /// [`Self::query_top_k`] relative to an explicit `today`.
    ///
    /// Dates are compared at day granularity and the lower bound
    /// `today - days` is inclusive. Null magnitudes never match. Equal
    /// magnitudes are ordered most recent first, then by insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a stored row cannot be
    /// converted back into an [`Earthquake`].
    pub fn query_top_k_as_of(
        &self,
        k: u64,
        days: u64,
        min_magnitude: f64,
        today: NaiveDate,
    ) -> Result<Vec<Earthquake>, DbError> {
        let min_date = today
            .checked_sub_days(Days::new(days))
            .unwrap_or(NaiveDate::MIN)
            .format(DATE_FORMAT)
            .to_string();

        let sql = format!(
            r#"SELECT "day", "time", mag, latitude, longitude, place
               FROM earthquakes
               WHERE mag >= ? AND "day" >= ?
               ORDER BY mag DESC, "day" DESC, "time" DESC, rowid ASC
               LIMIT {k}"#
        );

        let conn = self.reader();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(duckdb::params![min_magnitude, min_date])?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let day: String = row.get(0)?;
            let time: String = row.get(1)?;
            results.push(Earthquake {
                date: NaiveDate::parse_from_str(&day, DATE_FORMAT).map_err(|e| {
                    DbError::Conversion {
                        message: format!("bad stored day {day:?}: {e}"),
                    }
                })?,
                time: NaiveTime::parse_from_str(&time, TIME_FORMAT).map_err(|e| {
                    DbError::Conversion {
                        message: format!("bad stored time {time:?}: {e}"),
                    }
                })?,
                magnitude: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
                place: row.get(5)?,
            });
        }

        log::debug!(
            "Top-{k} query (days={days}, min_magnitude={min_magnitude}) returned {} row(s)",
            results.len()
        );

        Ok(results)
    }

    /// Returns the number of stored earthquakes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn record_count(&self) -> Result<u64, DbError> {
        let conn = self.reader();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM earthquakes", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|e| DbError::Conversion {
            message: format!("negative row count {count}: {e}"),
        })
    }

    /// Returns the largest stored magnitude, or `None` if no row has one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn max_magnitude(&self) -> Result<Option<f64>, DbError> {
        let conn = self.reader();
        let max: Option<f64> =
            conn.query_row("SELECT MAX(mag) FROM earthquakes", [], |row| row.get(0))?;
        Ok(max)
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        r#"CREATE TABLE IF NOT EXISTS earthquakes (
            "day" TEXT NOT NULL,
            "time" TEXT NOT NULL,
            mag DOUBLE,
            latitude DOUBLE NOT NULL,
            longitude DOUBLE NOT NULL,
            place TEXT NOT NULL,
            UNIQUE ("day", "time", mag, latitude, longitude, place)
        );"#,
    )?;
    Ok(())
}
