//! SQLite flash-result store
//!
//! Schema:
//! - `chip`: one row per physical unit, keyed by the optional `chip_number`
//! - `flash`: one row per flashing attempt, `flashed_time` in epoch seconds
//! - `test`: key/value measurements recorded against a flash attempt
//!
//! The connection is owned by `FlashStore` and closed when it is dropped, on
//! success and error paths alike.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::window::TimeWindow;

/// Latest flash attempt of one device inside a time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFlash {
    pub chip_type: String,
    pub software: String,
    pub chip_number: Option<String>,
    pub latest_flash_id: i64,
    pub flashed_id: Option<String>,
}

/// One key/value test result of a flash attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub key: String,
    pub value: String,
}

impl Measurement {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Measurement {
            key: key.into(),
            value: value.into(),
        }
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chip (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chip_type TEXT NOT NULL,
    chip_number TEXT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS flash (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chip_fk INTEGER NOT NULL,
    software TEXT NOT NULL,
    flashed_id TEXT NULL,
    flashed_time INTEGER NULL,
    FOREIGN KEY(chip_fk) REFERENCES chip(id)
);
CREATE TABLE IF NOT EXISTS test (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    flash_fk INTEGER NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    FOREIGN KEY(flash_fk) REFERENCES flash(id)
);
";

// Latest in-window flash per chip_number, ordered by the externally assigned
// flashed_id. The subquery picks the max flash id per device among in-window
// events only.
const LATEST_FLASH_PER_DEVICE: &str = "
SELECT chip.chip_type, flash.software, chip.chip_number, flash.id, flash.flashed_id
FROM flash
JOIN chip ON flash.chip_fk = chip.id
WHERE flash.id IN (
    SELECT MAX(f.id)
    FROM flash f
    JOIN chip c ON f.chip_fk = c.id
    WHERE f.flashed_time > ?1 AND f.flashed_time < ?2
    GROUP BY c.chip_number
)
ORDER BY flash.flashed_id, flash.id
";

const MEASUREMENTS_FOR_FLASH: &str =
    "SELECT key, value FROM test WHERE flash_fk = ?1 ORDER BY id";

pub struct FlashStore {
    conn: Connection,
}

impl FlashStore {
    /// Open (creating if needed) a database and ensure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            ReportError::storage(format!("opening database {}", path.display()), e)
        })?;
        let store = FlashStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an existing database read-only; a missing file is a storage error
    pub fn open_existing(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ReportError::storage(format!("opening database {}", path.display()), e))?;
        Ok(FlashStore { conn })
    }

    /// In-memory store with schema, for tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ReportError::storage("opening in-memory database", e))?;
        let store = FlashStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create the chip/flash/test tables if they do not exist
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(|e| ReportError::storage("creating schema", e))
    }

    /// One row per device with a flash strictly inside `window`, ordered by `flashed_id`
    pub fn latest_flashes(&self, window: &TimeWindow) -> Result<Vec<DeviceFlash>> {
        let context = "selecting latest flash per device";
        let mut stmt = self
            .conn
            .prepare(LATEST_FLASH_PER_DEVICE)
            .map_err(|e| ReportError::storage(context, e))?;
        let rows = stmt
            .query_map(params![window.start_epoch(), window.end_epoch()], |row| {
                Ok(DeviceFlash {
                    chip_type: row.get(0)?,
                    software: row.get(1)?,
                    chip_number: text_column(row, 2)?,
                    latest_flash_id: row.get(3)?,
                    flashed_id: text_column(row, 4)?,
                })
            })
            .map_err(|e| ReportError::storage(context, e))?;

        let devices = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| ReportError::storage(context, e))?;
        debug!(
            devices = devices.len(),
            start = window.start_epoch(),
            end = window.end_epoch(),
            "selected devices in window"
        );
        Ok(devices)
    }

    /// All measurements recorded for one flash attempt, in insertion order
    pub fn measurements(&self, flash_id: i64) -> Result<Vec<Measurement>> {
        let context = format!("reading measurements of flash {}", flash_id);
        let mut stmt = self
            .conn
            .prepare_cached(MEASUREMENTS_FOR_FLASH)
            .map_err(|e| ReportError::storage(context.clone(), e))?;
        let rows = stmt
            .query_map(params![flash_id], |row| {
                Ok(Measurement {
                    key: row.get(0)?,
                    value: row.get(1)?,
                })
            })
            .map_err(|e| ReportError::storage(context.clone(), e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| ReportError::storage(context, e))
    }

    /// Insert a chip, or update the type of the chip already holding `chip_number`
    pub fn register_chip(&self, chip_type: &str, chip_number: Option<&str>) -> Result<i64> {
        let context = "registering chip";
        let existing: Option<i64> = match chip_number {
            Some(number) => self
                .conn
                .query_row(
                    "SELECT id FROM chip WHERE chip_number = ?1",
                    params![number],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| ReportError::storage(context, e))?,
            None => None,
        };

        match existing {
            Some(id) => {
                self.conn
                    .execute(
                        "UPDATE chip SET chip_type = ?1 WHERE id = ?2",
                        params![chip_type, id],
                    )
                    .map_err(|e| ReportError::storage(context, e))?;
                debug!(id, chip_type, "updated existing chip");
                Ok(id)
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO chip (chip_type, chip_number) VALUES (?1, ?2)",
                        params![chip_type, chip_number],
                    )
                    .map_err(|e| ReportError::storage(context, e))?;
                let id = self.conn.last_insert_rowid();
                debug!(id, chip_type, "inserted chip");
                Ok(id)
            }
        }
    }

    /// Record a flashing attempt at `flashed_time` (epoch seconds)
    pub fn register_flash(
        &self,
        chip_id: i64,
        software: &str,
        flashed_time: f64,
        flashed_id: Option<&str>,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO flash (chip_fk, software, flashed_id, flashed_time)
                 VALUES (?1, ?2, ?3, ?4)",
                params![chip_id, software, flashed_id, flashed_time],
            )
            .map_err(|e| ReportError::storage("registering flash", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record one key/value measurement of a flashing attempt
    pub fn register_test(&self, flash_id: i64, key: &str, value: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO test (flash_fk, key, value) VALUES (?1, ?2, ?3)",
                params![flash_id, key, value],
            )
            .map_err(|e| ReportError::storage("registering test result", e))?;
        Ok(self.conn.last_insert_rowid())
    }
}

/// Read a nullable identifier column that may hold text or a number
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Timezone;

    fn window(start: i64, end: i64) -> TimeWindow {
        let to_naive = |secs: i64| chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
        TimeWindow::new(to_naive(start), to_naive(end), Timezone::Utc).unwrap()
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let store = FlashStore::open_in_memory().unwrap();
        store.init_schema().unwrap();
        store.init_schema().unwrap();
    }

    #[test]
    fn test_register_chip_upserts_by_number() {
        let store = FlashStore::open_in_memory().unwrap();
        let first = store.register_chip("green", Some("7")).unwrap();
        let second = store.register_chip("blue-shiny", Some("7")).unwrap();
        assert_eq!(first, second);

        let flash = store.register_flash(first, "master", 150.0, Some("f1")).unwrap();
        let devices = store.latest_flashes(&window(100, 200)).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].chip_type, "blue-shiny");
        assert_eq!(devices[0].latest_flash_id, flash);
    }

    #[test]
    fn test_chips_without_number_are_distinct_rows() {
        let store = FlashStore::open_in_memory().unwrap();
        let a = store.register_chip("green", None).unwrap();
        let b = store.register_chip("green", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unnumbered_chips_share_one_device_row() {
        let store = FlashStore::open_in_memory().unwrap();
        let a = store.register_chip("green", None).unwrap();
        let b = store.register_chip("blue-shiny", None).unwrap();
        store.register_flash(a, "master", 120.0, Some("u1")).unwrap();
        let newer = store.register_flash(b, "relay_mk1", 130.0, Some("u2")).unwrap();

        let devices = store.latest_flashes(&window(100, 200)).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].latest_flash_id, newer);
        assert_eq!(devices[0].chip_number, None);
        assert_eq!(devices[0].chip_type, "blue-shiny");
    }

    #[test]
    fn test_latest_flash_wins_within_window() {
        let store = FlashStore::open_in_memory().unwrap();
        let chip = store.register_chip("green", Some("1")).unwrap();
        store.register_flash(chip, "relay_mk1", 110.0, Some("a")).unwrap();
        let latest = store.register_flash(chip, "master", 120.0, Some("a")).unwrap();
        // Newer attempt outside the window must not be selected
        store.register_flash(chip, "master", 500.0, Some("a")).unwrap();

        let devices = store.latest_flashes(&window(100, 200)).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].latest_flash_id, latest);
        assert_eq!(devices[0].software, "master");
    }

    #[test]
    fn test_measurements_in_insertion_order() {
        let store = FlashStore::open_in_memory().unwrap();
        let chip = store.register_chip("green", Some("1")).unwrap();
        let flash = store.register_flash(chip, "master", 150.0, None).unwrap();
        store.register_test(flash, "rssi", "-40").unwrap();
        store.register_test(flash, "flashed", "true").unwrap();
        store.register_test(flash, "rssi", "-42").unwrap();

        let measurements = store.measurements(flash).unwrap();
        assert_eq!(
            measurements,
            vec![
                Measurement::new("rssi", "-40"),
                Measurement::new("flashed", "true"),
                Measurement::new("rssi", "-42"),
            ]
        );
        assert!(store.measurements(flash + 1).unwrap().is_empty());
    }

    #[test]
    fn test_open_existing_missing_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FlashStore::open_existing(&dir.path().join("absent.sqlite3"));
        assert!(matches!(result, Err(ReportError::Storage { .. })));
    }

    #[test]
    fn test_query_without_schema_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite3");
        // Create an empty database file without tables
        drop(Connection::open(&path).unwrap());
        let store = FlashStore::open_existing(&path).unwrap();
        let result = store.latest_flashes(&window(0, 10));
        assert!(matches!(result, Err(ReportError::Storage { .. })));
    }
}
