use super::{Normalizer, json_section};
use crate::error::{Result, SolarlogError};
use crate::models::DailyReading;
use crate::portal::types::{CONSUMPTION_SECTION, PRODUCTION_SECTION, RawPayload};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

const FEED_IN_SERIES: &str = "Energy to grid";
const DIRECT_SERIES: &str = "Consumed directly";
const GRID_SERIES: &str = "Energy from grid";

/// Shape of `Chart/GetChartNew`; only the parts we read
#[derive(Debug, Deserialize)]
struct Chart {
    settings: ChartSettings,
}

#[derive(Debug, Deserialize)]
struct ChartSettings {
    series: Vec<ChartSeries>,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    name: String,
    /// `[epoch_ms, kWh]` pairs; the value is null for days without data
    data: Vec<(f64, Option<f64>)>,
}

/// Normalizer for the month production/consumption chart pair
#[derive(Debug, Default, Clone, Copy)]
pub struct DailyNormalizer;

impl Normalizer for DailyNormalizer {
    type Key = NaiveDate;
    type Reading = DailyReading;

    fn normalize(&self, payload: &RawPayload, date: NaiveDate) -> Result<DailyReading> {
        let production = parse_chart(payload, PRODUCTION_SECTION)?;
        let consumption = parse_chart(payload, CONSUMPTION_SECTION)?;

        let feed_in = value_for(series(&production, PRODUCTION_SECTION, FEED_IN_SERIES)?, date)?;
        let direct = value_for(series(&production, PRODUCTION_SECTION, DIRECT_SERIES)?, date)?;
        let grid = value_for(series(&consumption, CONSUMPTION_SECTION, GRID_SERIES)?, date)?;

        // The requested date is the row's identity, whatever else the chart covers
        Ok(DailyReading::from_series(date, feed_in, direct, grid))
    }
}

fn parse_chart(payload: &RawPayload, section: &str) -> Result<Chart> {
    let value = json_section(payload, section)?;
    Chart::deserialize(value)
        .map_err(|e| SolarlogError::parse(format!("'{}' chart has unexpected shape: {}", section, e)))
}

fn series<'a>(chart: &'a Chart, section: &str, name: &str) -> Result<&'a ChartSeries> {
    chart
        .settings
        .series
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| {
            SolarlogError::parse(format!("'{}' chart has no '{}' series", section, name))
        })
}

/// Value of the point whose UTC calendar day is `date`
fn value_for(series: &ChartSeries, date: NaiveDate) -> Result<f64> {
    for (ts_ms, value) in &series.data {
        if !ts_ms.is_finite() {
            continue;
        }
        let Some(point) = DateTime::from_timestamp_millis(*ts_ms as i64) else {
            continue;
        };
        if point.date_naive() == date {
            let v = value.unwrap_or(0.0);
            if !v.is_finite() {
                return Err(SolarlogError::parse(format!(
                    "'{}' has a non-finite value for {}",
                    series.name, date
                )));
            }
            return Ok(v);
        }
    }
    Err(SolarlogError::parse(format!(
        "'{}' has no entry for {}",
        series.name, date
    )))
}
