use super::{Normalizer, json_section, optional_number};
use crate::error::{Result, SolarlogError};
use crate::models::{InverterReading, StatusReading};
use crate::portal::types::{RawPayload, STATUS_SECTION};
use chrono::{DurationRound, TimeDelta};
use serde_json::Value;

const POWER_FIELDS: [&str; 3] = ["P_PV", "P_Grid", "P_Load"];

/// Normalizer for `GetCompareDataForPvSystem` responses
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusNormalizer;

impl Normalizer for StatusNormalizer {
    type Key = ();
    type Reading = StatusReading;

    fn normalize(&self, payload: &RawPayload, _key: ()) -> Result<StatusReading> {
        let data = json_section(payload, STATUS_SECTION)?;
        let object = data
            .as_object()
            .ok_or_else(|| SolarlogError::parse("status payload is not a JSON object"))?;
        if object.is_empty() {
            return Err(SolarlogError::parse("status payload is empty"));
        }
        if !POWER_FIELDS.iter().any(|f| object.contains_key(*f)) {
            return Err(SolarlogError::parse(format!(
                "status payload has none of {}",
                POWER_FIELDS.join(", ")
            )));
        }

        // The portal reports null instead of 0 while the inverters sleep
        let pv = optional_number(data, "P_PV")?.unwrap_or(0.0);
        let grid = optional_number(data, "P_Grid")?.unwrap_or(0.0);
        let load = optional_number(data, "P_Load")?.unwrap_or(0.0);

        let is_online = match data.get("IsOnline") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(SolarlogError::parse(format!(
                    "field IsOnline is not a boolean: {}",
                    other
                )));
            }
        };

        let timestamp = payload
            .fetched_at
            .duration_trunc(TimeDelta::seconds(1))
            .map_err(|e| SolarlogError::parse(format!("invalid fetch time: {}", e)))?;

        Ok(StatusReading {
            timestamp,
            power_now: pv,
            grid_power: grid,
            // Load is reported as a negative flow
            home_power: -load,
            energy_today: optional_number(data, "E_Day")?,
            energy_total: optional_number(data, "E_Total")?,
            is_online,
            inverters: parse_inverters(data)?,
        })
    }
}

/// Optional `Inverters` map: `{"1": {"P": 1.2, "E_Day": 3.4}, ...}`
fn parse_inverters(data: &Value) -> Result<Vec<InverterReading>> {
    let Some(inverters) = data.get("Inverters") else {
        return Ok(Vec::new());
    };
    match inverters {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => map
            .iter()
            .map(|(id, values)| {
                if !values.is_object() {
                    return Err(SolarlogError::parse(format!(
                        "inverter {} is not an object",
                        id
                    )));
                }
                Ok(InverterReading {
                    id: id.clone(),
                    power: optional_number(values, "P")?,
                    energy_today: optional_number(values, "E_Day")?,
                })
            })
            .collect(),
        other => Err(SolarlogError::parse(format!(
            "field Inverters is not an object: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::types::PayloadBody;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn payload(body: Value) -> RawPayload {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 7).unwrap()
            + TimeDelta::milliseconds(345);
        RawPayload::new(at).with_section(STATUS_SECTION, PayloadBody::Json(body))
    }

    #[test]
    fn parses_full_payload() {
        let r = StatusNormalizer
            .normalize(
                &payload(json!({
                    "P_PV": 3.2, "P_Grid": -1.1, "P_Load": -2.1, "IsOnline": true,
                    "E_Day": 12.0, "E_Total": 4567.0,
                    "Inverters": {"1": {"P": 3.2, "E_Day": 12.0}}
                })),
                (),
            )
            .unwrap();
        assert!((r.power_now - 3.2).abs() < 1e-9);
        assert!((r.grid_power + 1.1).abs() < 1e-9);
        assert!((r.home_power - 2.1).abs() < 1e-9);
        assert_eq!(r.energy_today, Some(12.0));
        assert_eq!(r.energy_total, Some(4567.0));
        assert!(r.is_online);
        assert_eq!(r.inverters.len(), 1);
        assert_eq!(
            r.timestamp,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 7).unwrap()
        );
    }

    #[test]
    fn nulls_count_as_zero() {
        let r = StatusNormalizer
            .normalize(
                &payload(json!({"P_PV": null, "P_Grid": 0.4, "P_Load": null, "IsOnline": false})),
                (),
            )
            .unwrap();
        assert_eq!(r.power_now, 0.0);
        assert_eq!(r.home_power, 0.0);
        assert!(!r.is_online);
        assert!(r.energy_today.is_none());
    }

    #[test]
    fn rejects_drifted_payloads() {
        for body in [
            json!({}),
            json!([]),
            json!({"Something": 1}),
            json!({"P_PV": "lots"}),
            json!({"P_PV": 1.0, "IsOnline": "yes"}),
            json!({"P_PV": 1.0, "Inverters": [1, 2]}),
        ] {
            let err = StatusNormalizer.normalize(&payload(body.clone()), ()).unwrap_err();
            assert!(
                matches!(err, SolarlogError::Parse { .. }),
                "{} should be a parse error",
                body
            );
        }
    }
}
