//! Rollups of stored readings
//!
//! Five-minute and hourly slots average the status samples inside them;
//! weekly and monthly slots sum the daily rows. A slot is written only once
//! it has ended, and rows are upserted by slot start so reruns converge.

use crate::error::Result;
use crate::logging::get_logger;
use crate::store::{Store, date_key, parse_date, parse_timestamp, timestamp_key};
use chrono::{DateTime, Datelike, DurationRound, NaiveDate, TimeDelta, Utc};
use rusqlite::{OptionalExtension, Transaction, params};
use std::collections::BTreeMap;

/// Rollup granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    FiveMinute,
    Hourly,
    Weekly,
    Monthly,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::FiveMinute,
        Bucket::Hourly,
        Bucket::Weekly,
        Bucket::Monthly,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Bucket::FiveMinute => "fiveminute",
            Bucket::Hourly => "hourly",
            Bucket::Weekly => "weekly",
            Bucket::Monthly => "monthly",
        }
    }

    /// Slot width for the sample-fed buckets
    fn width(&self) -> Option<TimeDelta> {
        match self {
            Bucket::FiveMinute => Some(TimeDelta::minutes(5)),
            Bucket::Hourly => Some(TimeDelta::hours(1)),
            Bucket::Weekly | Bucket::Monthly => None,
        }
    }

    /// Start of the slot holding `ts`
    pub fn slot_of(&self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.width().and_then(|w| ts.duration_trunc(w).ok())
    }

    /// First day of the slot holding `date` (weeks start on Monday)
    pub fn slot_of_date(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Weekly => {
                date - TimeDelta::days(date.weekday().num_days_from_monday() as i64)
            }
            Bucket::Monthly => date.with_day(1).unwrap_or(date),
            Bucket::FiveMinute | Bucket::Hourly => date,
        }
    }
}

/// Rows written per bucket in one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    pub written: Vec<(Bucket, usize)>,
}

impl AggregateReport {
    pub fn total(&self) -> usize {
        self.written.iter().map(|(_, n)| n).sum()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    grid: f64,
    solar: f64,
    home: f64,
    samples: u32,
}

impl Totals {
    fn add(&mut self, grid: f64, solar: f64, home: f64) {
        self.grid += grid;
        self.solar += solar;
        self.home += home;
        self.samples += 1;
    }

    fn averaged(self) -> Self {
        let n = f64::from(self.samples.max(1));
        Self {
            grid: self.grid / n,
            solar: self.solar / n,
            home: self.home / n,
            samples: self.samples,
        }
    }

    fn is_zero(&self) -> bool {
        self.grid == 0.0 && self.solar == 0.0 && self.home == 0.0
    }
}

/// Refresh every bucket; `today` decides which calendar slots have ended
pub fn run_all(store: &mut Store, now: DateTime<Utc>, today: NaiveDate) -> Result<AggregateReport> {
    let logger = get_logger("aggregate");
    let mut report = AggregateReport::default();
    for bucket in Bucket::ALL {
        let written = match bucket {
            Bucket::FiveMinute | Bucket::Hourly => aggregate_samples(store, bucket, now)?,
            Bucket::Weekly | Bucket::Monthly => aggregate_daily(store, bucket, today)?,
        };
        if written > 0 {
            logger
                .for_operation(bucket.table())
                .debug(&format!("Wrote {} slots", written));
        }
        report.written.push((bucket, written));
    }
    Ok(report)
}

/// Average samples per slot, resuming after the newest written slot
fn aggregate_samples(store: &mut Store, bucket: Bucket, now: DateTime<Utc>) -> Result<usize> {
    let (Some(width), Some(current)) = (bucket.width(), bucket.slot_of(now)) else {
        return Ok(0);
    };
    let tx = store.conn_mut().transaction()?;

    let last: Option<String> = tx
        .query_row(
            &format!("SELECT MAX(slot) FROM {}", bucket.table()),
            [],
            |row| row.get(0),
        )
        .optional()?
        .flatten();
    let from = match last {
        Some(slot) => timestamp_key(parse_timestamp(&slot)? + width),
        None => String::new(),
    };

    let mut slots: BTreeMap<DateTime<Utc>, Totals> = BTreeMap::new();
    {
        let mut stmt = tx.prepare(
            "SELECT timestamp, solar, grid, home FROM samples
             WHERE timestamp >= ?1 AND timestamp < ?2 ORDER BY timestamp",
        )?;
        let rows = stmt
            .query_map(params![from, timestamp_key(current)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (ts, solar, grid, home) in rows {
            let Some(slot) = bucket.slot_of(parse_timestamp(&ts)?) else {
                continue;
            };
            // Exports are not grid consumption
            slots.entry(slot).or_default().add(grid.max(0.0), solar, home);
        }
    }

    let mut written = 0;
    for (slot, totals) in slots {
        let avg = totals.averaged();
        if avg.is_zero() {
            continue;
        }
        upsert_slot(&tx, bucket, &timestamp_key(slot), &avg)?;
        written += 1;
    }
    tx.commit()?;
    Ok(written)
}

/// Sum daily rows per calendar slot; always recomputed from scratch
fn aggregate_daily(store: &mut Store, bucket: Bucket, today: NaiveDate) -> Result<usize> {
    let current = bucket.slot_of_date(today);
    let tx = store.conn_mut().transaction()?;

    let mut slots: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
    {
        let mut stmt = tx.prepare("SELECT date, solar, grid, home FROM daily ORDER BY date")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (date, solar, grid, home) in rows {
            let slot = bucket.slot_of_date(parse_date(&date)?);
            if slot >= current {
                continue;
            }
            slots.entry(slot).or_default().add(grid, solar, home);
        }
    }

    let mut written = 0;
    for (slot, totals) in slots {
        if totals.is_zero() {
            continue;
        }
        upsert_slot(&tx, bucket, &date_key(slot), &totals)?;
        written += 1;
    }
    tx.commit()?;
    Ok(written)
}

fn upsert_slot(tx: &Transaction<'_>, bucket: Bucket, slot: &str, totals: &Totals) -> Result<()> {
    tx.execute(
        &format!(
            "INSERT INTO {} (slot, grid, solar, home, samples) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(slot) DO UPDATE SET
                grid = excluded.grid,
                solar = excluded.solar,
                home = excluded.home,
                samples = excluded.samples",
            bucket.table()
        ),
        params![slot, totals.grid, totals.solar, totals.home, totals.samples],
    )?;
    Ok(())
}
