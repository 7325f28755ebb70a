//! # Solarlog - Solar.web telemetry logger
//!
//! Logs in to the Fronius Solar.web portal, polls the current production and
//! consumption figures of a PV system and stores them, together with daily
//! energy totals, in a local SQLite database.
//!
//! ## Features
//!
//! - **Portal session**: scripted OpenID login with automatic re-login on expiry
//! - **Normalization**: strict parsing of undocumented portal payloads
//! - **Persistence**: idempotent, transactional SQLite writes
//! - **Backfill**: one sweep from the installation date to today
//! - **Rollups**: five-minute, hourly, weekly and monthly aggregates
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `portal`: Solar.web client behind the `PortalClient` trait
//! - `normalize`: Payload to reading conversion
//! - `store`: SQLite persistence
//! - `aggregate`: Rollup tables
//! - `scheduler`: Polling loop, catch-up and backfill
//! - `shutdown`: Ctrl-C listener

pub mod aggregate;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod portal;
pub mod scheduler;
pub mod shutdown;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use error::{Result, SolarlogError};
pub use models::{DailyReading, StatusReading};
pub use portal::{PortalClient, PortalRequest};
pub use scheduler::{Scheduler, SchedulerOptions, SchedulerState};
pub use store::{Store, WriteOutcome};
