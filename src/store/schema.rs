/// Tables created on first open
///
/// `samples` keeps one row per poll second, `daily` one row per calendar day.
/// The four rollup tables are keyed by slot start.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS samples (
    timestamp     TEXT PRIMARY KEY,
    solar         REAL NOT NULL,
    grid          REAL NOT NULL,
    home          REAL NOT NULL,
    energy_today  REAL,
    energy_total  REAL,
    is_online     INTEGER NOT NULL,
    inverters     TEXT
);

CREATE TABLE IF NOT EXISTS daily (
    date          TEXT PRIMARY KEY,
    solar         REAL NOT NULL,
    grid          REAL NOT NULL,
    home          REAL NOT NULL,
    feed_in       REAL NOT NULL,
    direct        REAL NOT NULL,
    complete      INTEGER NOT NULL DEFAULT 0,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fiveminute (
    slot          TEXT PRIMARY KEY,
    grid          REAL NOT NULL,
    solar         REAL NOT NULL,
    home          REAL NOT NULL,
    samples       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS hourly (
    slot          TEXT PRIMARY KEY,
    grid          REAL NOT NULL,
    solar         REAL NOT NULL,
    home          REAL NOT NULL,
    samples       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS weekly (
    slot          TEXT PRIMARY KEY,
    grid          REAL NOT NULL,
    solar         REAL NOT NULL,
    home          REAL NOT NULL,
    samples       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS monthly (
    slot          TEXT PRIMARY KEY,
    grid          REAL NOT NULL,
    solar         REAL NOT NULL,
    home          REAL NOT NULL,
    samples       INTEGER NOT NULL
);
"#;

/// Rollup tables fed from `samples`; safe to drop and rebuild
pub const SMALL_AGGREGATE_TABLES: [&str; 2] = ["fiveminute", "hourly"];

/// Columns each table must carry for the queries in this crate
pub const TABLE_COLUMNS: [(&str, &[&str]); 6] = [
    (
        "samples",
        &[
            "timestamp",
            "solar",
            "grid",
            "home",
            "energy_today",
            "energy_total",
            "is_online",
            "inverters",
        ],
    ),
    (
        "daily",
        &[
            "date",
            "solar",
            "grid",
            "home",
            "feed_in",
            "direct",
            "complete",
            "updated_at",
        ],
    ),
    ("fiveminute", &["slot", "grid", "solar", "home", "samples"]),
    ("hourly", &["slot", "grid", "solar", "home", "samples"]),
    ("weekly", &["slot", "grid", "solar", "home", "samples"]),
    ("monthly", &["slot", "grid", "solar", "home", "samples"]),
];

/// Layout written by the earlier Python logger: every table had these columns
pub const LEGACY_COLUMNS: [&str; 5] = ["id", "grid", "solar", "home", "timestamp"];

/// Prefix given to legacy tables when they are moved aside
pub const LEGACY_PREFIX: &str = "legacy_";

/// Legacy samples hold ISO timestamps with offsets and fractional seconds
pub const COPY_LEGACY_SAMPLES_SQL: &str = r#"
INSERT OR IGNORE INTO samples (timestamp, solar, grid, home, is_online)
SELECT strftime('%Y-%m-%dT%H:%M:%SZ', timestamp),
       COALESCE(solar, 0), COALESCE(grid, 0), COALESCE(home, 0), 1
FROM legacy_samples
WHERE strftime('%Y-%m-%dT%H:%M:%SZ', timestamp) IS NOT NULL
ORDER BY id
"#;

/// Legacy daily rows were only written for finished days.
/// solar = feed_in + direct and home = direct + grid.
pub const COPY_LEGACY_DAILY_SQL: &str = r#"
INSERT OR IGNORE INTO daily (date, solar, grid, home, feed_in, direct, complete, updated_at)
SELECT date(timestamp),
       COALESCE(solar, 0),
       COALESCE(grid, 0),
       COALESCE(home, 0),
       COALESCE(solar, 0) - (COALESCE(home, 0) - COALESCE(grid, 0)),
       COALESCE(home, 0) - COALESCE(grid, 0),
       1,
       ?1
FROM legacy_daily
WHERE date(timestamp) IS NOT NULL
ORDER BY id
"#;
