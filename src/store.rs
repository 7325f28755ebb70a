//! SQLite persistence for readings and rollups
//!
//! Every write runs inside its own transaction. Status rows are keyed by the
//! poll second and never overwritten; daily rows are keyed by date and
//! replaced on every refetch so partial days converge to their final totals.

pub mod schema;

use crate::aggregate::Bucket;
use crate::error::{Result, SolarlogError};
use crate::logging::{StructuredLogger, get_logger};
use crate::models::{DailyReading, StatusReading};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use schema::{
    COPY_LEGACY_DAILY_SQL, COPY_LEGACY_SAMPLES_SQL, LEGACY_COLUMNS, LEGACY_PREFIX, SCHEMA_SQL,
    SMALL_AGGREGATE_TABLES, TABLE_COLUMNS,
};
use std::path::Path;

/// What a write did to the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new row was created
    Inserted,
    /// An existing row was overwritten
    Replaced,
    /// The row already existed and was left alone
    Unchanged,
}

impl WriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Inserted => "inserted",
            WriteOutcome::Replaced => "replaced",
            WriteOutcome::Unchanged => "unchanged",
        }
    }
}

/// One row of a rollup table
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// Slot start (RFC 3339 for sample buckets, a date for calendar buckets)
    pub slot: String,
    pub grid: f64,
    pub solar: f64,
    pub home: f64,
    pub samples: u32,
}

/// Text form of a sample timestamp; sorts chronologically
pub(crate) fn timestamp_key(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

pub(crate) fn parse_date(text: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(text, "%Y-%m-%d")?)
}

/// Column names of `table`, empty when it does not exist
fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Owner of the SQLite connection
pub struct Store {
    conn: Connection,
    logger: StructuredLogger,
}

impl Store {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                SolarlogError::storage(format!(
                    "Cannot create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| {
            SolarlogError::storage(format!("Cannot open database {}: {}", path.display(), e))
        })?;
        let store = Self::with_connection(conn)?;
        store
            .logger
            .info(&format!("Opened database {}", path.display()));
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let mut store = Self {
            conn,
            logger: get_logger("store"),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create missing tables, moving legacy ones aside first
    ///
    /// Tables left by the earlier logger are renamed to `legacy_<name>` and
    /// their samples and daily rows copied over. The rollups are rebuilt by
    /// the next aggregation pass. Any other layout fails the open.
    fn init_schema(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        let mut migrated = Vec::new();
        for (table, required) in TABLE_COLUMNS {
            let existing = table_columns(&tx, table)?;
            if existing.is_empty() || required.iter().all(|c| existing.contains(&c.to_string())) {
                continue;
            }

            if !LEGACY_COLUMNS.iter().all(|c| existing.contains(&c.to_string())) {
                let missing: Vec<&str> = required
                    .iter()
                    .filter(|c| !existing.contains(&c.to_string()))
                    .copied()
                    .collect();
                return Err(SolarlogError::storage(format!(
                    "Table {} has an unknown layout (missing {}); use a fresh database file",
                    table,
                    missing.join(", ")
                )));
            }

            let renamed = format!("{}{}", LEGACY_PREFIX, table);
            if !table_columns(&tx, &renamed)?.is_empty() {
                return Err(SolarlogError::storage(format!(
                    "Cannot migrate legacy table {}: {} already exists",
                    table, renamed
                )));
            }
            tx.execute_batch(&format!("ALTER TABLE {} RENAME TO {}", table, renamed))?;
            migrated.push(table);
        }

        tx.execute_batch(SCHEMA_SQL)?;
        let mut copied = 0;
        if migrated.contains(&"samples") {
            copied += tx.execute(COPY_LEGACY_SAMPLES_SQL, [])?;
        }
        if migrated.contains(&"daily") {
            copied += tx.execute(COPY_LEGACY_DAILY_SQL, params![timestamp_key(Utc::now())])?;
        }
        tx.commit()?;

        if !migrated.is_empty() {
            self.logger.for_operation("migrate").info(&format!(
                "Moved legacy tables {} aside and copied {} rows",
                migrated.join(", "),
                copied
            ));
        }
        Ok(())
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Insert a status reading; an existing row for the same second wins
    pub fn write_status(&mut self, reading: &StatusReading) -> Result<WriteOutcome> {
        let inverters = if reading.inverters.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&reading.inverters)?)
        };
        let key = timestamp_key(reading.timestamp);

        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "INSERT OR IGNORE INTO samples
                (timestamp, solar, grid, home, energy_today, energy_total, is_online, inverters)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                key,
                reading.power_now,
                reading.grid_power,
                reading.home_power,
                reading.energy_today,
                reading.energy_total,
                reading.is_online,
                inverters,
            ],
        )?;
        tx.commit()?;

        let outcome = if changed == 0 {
            WriteOutcome::Unchanged
        } else {
            WriteOutcome::Inserted
        };
        self.logger
            .with_field("timestamp", key)
            .debug(&format!("Status row {}", outcome.as_str()));
        Ok(outcome)
    }

    /// Insert or replace the row for `reading.date`
    pub fn write_daily(&mut self, reading: &DailyReading) -> Result<WriteOutcome> {
        let key = date_key(reading.date);
        let tx = self.conn.transaction()?;
        let existed = tx
            .query_row("SELECT 1 FROM daily WHERE date = ?1", params![key], |_| Ok(()))
            .optional()?
            .is_some();
        tx.execute(
            "INSERT INTO daily (date, solar, grid, home, feed_in, direct, complete, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(date) DO UPDATE SET
                solar = excluded.solar,
                grid = excluded.grid,
                home = excluded.home,
                feed_in = excluded.feed_in,
                direct = excluded.direct,
                complete = excluded.complete,
                updated_at = excluded.updated_at",
            params![
                key,
                reading.energy_produced,
                reading.grid_import,
                reading.home_consumption,
                reading.feed_in,
                reading.direct_consumption,
                reading.complete,
                timestamp_key(Utc::now()),
            ],
        )?;
        tx.commit()?;

        let outcome = if existed {
            WriteOutcome::Replaced
        } else {
            WriteOutcome::Inserted
        };
        self.logger
            .with_field("date", key)
            .debug(&format!("Daily row {}", outcome.as_str()));
        Ok(outcome)
    }

    pub fn status_count(&self) -> Result<u64> {
        self.count("samples")
    }

    pub fn daily_count(&self) -> Result<u64> {
        self.count("daily")
    }

    fn count(&self, table: &str) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(n as u64)
    }

    /// Stored rollup rows for `bucket`, oldest slot first
    pub fn aggregate_rows(&self, bucket: Bucket) -> Result<Vec<AggregateRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT slot, grid, solar, home, samples FROM {} ORDER BY slot",
            bucket.table()
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AggregateRow {
                    slot: row.get(0)?,
                    grid: row.get(1)?,
                    solar: row.get(2)?,
                    home: row.get(3)?,
                    samples: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Stored totals for one day
    pub fn daily(&self, date: NaiveDate) -> Result<Option<DailyReading>> {
        self.conn
            .query_row(
                "SELECT solar, grid, home, feed_in, direct, complete FROM daily WHERE date = ?1",
                params![date_key(date)],
                |row| {
                    Ok(DailyReading {
                        date,
                        energy_produced: row.get(0)?,
                        grid_import: row.get(1)?,
                        home_consumption: row.get(2)?,
                        feed_in: row.get(3)?,
                        direct_consumption: row.get(4)?,
                        complete: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// All stored dates, oldest first
    pub fn daily_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare("SELECT date FROM daily ORDER BY date")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.iter().map(|d| parse_date(d)).collect()
    }

    /// Most recent status row
    pub fn latest_status(&self) -> Result<Option<StatusReading>> {
        let row = self
            .conn
            .query_row(
                "SELECT timestamp, solar, grid, home, energy_today, energy_total, is_online, inverters
                 FROM samples ORDER BY timestamp DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((ts, solar, grid, home, energy_today, energy_total, is_online, inverters)) = row
        else {
            return Ok(None);
        };
        let inverters = match inverters {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        Ok(Some(StatusReading {
            timestamp: parse_timestamp(&ts)?,
            power_now: solar,
            grid_power: grid,
            home_power: home,
            energy_today,
            energy_total,
            is_online,
            inverters,
        }))
    }

    /// Newest date whose totals were fetched after the day ended
    pub fn latest_complete_daily_date(&self) -> Result<Option<NaiveDate>> {
        let date: Option<String> = self.conn.query_row(
            "SELECT MAX(date) FROM daily WHERE complete = 1",
            [],
            |row| row.get(0),
        )?;
        date.as_deref().map(parse_date).transpose()
    }

    /// Clear the five-minute and hourly rollups; they are rebuilt from samples
    pub fn delete_small_aggregates(&mut self) -> Result<u64> {
        let tx = self.conn.transaction()?;
        let mut removed = 0u64;
        for table in SMALL_AGGREGATE_TABLES {
            removed += tx.execute(&format!("DELETE FROM {}", table), [])? as u64;
        }
        tx.commit()?;
        self.logger
            .for_operation("delete_small_aggregates")
            .info(&format!("Removed {} aggregate rows", removed));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn status(second: u32) -> StatusReading {
        StatusReading {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, second).unwrap(),
            power_now: 3.0,
            grid_power: -1.0,
            home_power: 2.0,
            energy_today: Some(10.0),
            energy_total: None,
            is_online: true,
            inverters: Vec::new(),
        }
    }

    #[test]
    fn status_write_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();
        assert_eq!(store.write_status(&status(1)).unwrap(), WriteOutcome::Inserted);
        assert_eq!(store.write_status(&status(1)).unwrap(), WriteOutcome::Unchanged);
        assert_eq!(store.status_count().unwrap(), 1);
        assert_eq!(store.latest_status().unwrap(), Some(status(1)));
    }

    #[test]
    fn daily_write_upserts() {
        let mut store = Store::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let first = DailyReading::from_series(date, 1.0, 2.0, 3.0);
        let second = DailyReading::from_series(date, 4.0, 5.0, 6.0).finalized_against(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        assert_eq!(store.write_daily(&first).unwrap(), WriteOutcome::Inserted);
        assert_eq!(store.write_daily(&second).unwrap(), WriteOutcome::Replaced);
        assert_eq!(store.daily_count().unwrap(), 1);
        assert_eq!(store.daily(date).unwrap(), Some(second));
        assert_eq!(store.latest_complete_daily_date().unwrap(), Some(date));
    }

    #[test]
    fn partial_days_are_not_complete() {
        let mut store = Store::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        store
            .write_daily(&DailyReading::from_series(date, 1.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(store.latest_complete_daily_date().unwrap(), None);
        assert_eq!(store.daily_dates().unwrap(), vec![date]);
    }

    #[test]
    fn timestamp_keys_sort_chronologically() {
        let a = timestamp_key(Utc.with_ymd_and_hms(2024, 5, 1, 9, 59, 59).unwrap());
        let b = timestamp_key(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        assert!(a < b);
        assert_eq!(b, "2024-05-01T10:00:00Z");
        assert_eq!(parse_timestamp(&b).unwrap().to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }
}
