//! Typed readings produced by the normalizers and stored by [`crate::store`]

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One poll of the portal's current status
///
/// Power values are in kW as reported by Solar.web; `home_power` is positive
/// when the house consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReading {
    /// Poll instant, whole seconds (unique per row)
    pub timestamp: DateTime<Utc>,
    /// Current PV production
    pub power_now: f64,
    /// Grid exchange; positive values are imports
    pub grid_power: f64,
    /// House consumption
    pub home_power: f64,
    /// Energy produced today, when the portal reports it
    pub energy_today: Option<f64>,
    /// Lifetime production, when the portal reports it
    pub energy_total: Option<f64>,
    /// Whether the PV system is reachable by the portal
    pub is_online: bool,
    /// Per-inverter values, empty unless the payload lists inverters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inverters: Vec<InverterReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterReading {
    pub id: String,
    pub power: Option<f64>,
    pub energy_today: Option<f64>,
}

/// One calendar day's energy totals in kWh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReading {
    pub date: NaiveDate,
    /// Total PV production (`feed_in + direct_consumption`)
    pub energy_produced: f64,
    /// Energy drawn from the grid
    pub grid_import: f64,
    /// House consumption (`direct_consumption + grid_import`)
    pub home_consumption: f64,
    /// PV energy exported to the grid
    pub feed_in: f64,
    /// PV energy consumed on site
    pub direct_consumption: f64,
    /// Fetched after the day ended, so the totals are final
    pub complete: bool,
}

impl DailyReading {
    /// Build a reading from the three chart series the portal exposes
    pub fn from_series(date: NaiveDate, feed_in: f64, direct: f64, grid: f64) -> Self {
        Self {
            date,
            energy_produced: feed_in + direct,
            grid_import: grid,
            home_consumption: direct + grid,
            feed_in,
            direct_consumption: direct,
            complete: false,
        }
    }

    /// Mark complete when the day lies strictly before `today`
    pub fn finalized_against(mut self, today: NaiveDate) -> Self {
        self.complete = self.date < today;
        self
    }
}
