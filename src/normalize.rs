//! Response normalizers
//!
//! The portal's payloads are undocumented and change without notice. Each
//! payload kind gets its own [`Normalizer`]; anything unexpected becomes a
//! `Parse` error for that cycle instead of a malformed row.

mod daily;
mod status;

pub use daily::DailyNormalizer;
pub use status::StatusNormalizer;

use crate::error::{Result, SolarlogError};
use crate::models::{DailyReading, StatusReading};
use crate::portal::html;
use crate::portal::types::{PayloadBody, RawPayload};
use chrono::NaiveDate;
use serde_json::Value;

/// Turns one kind of raw payload into a typed reading
pub trait Normalizer {
    /// Identity supplied by the caller (e.g. the requested date)
    type Key;
    type Reading;

    fn normalize(&self, payload: &RawPayload, key: Self::Key) -> Result<Self::Reading>;
}

/// Parse a current-status payload
pub fn parse_status(payload: &RawPayload) -> Result<StatusReading> {
    StatusNormalizer.normalize(payload, ())
}

/// Parse a daily-history payload for `date`
pub fn parse_daily(payload: &RawPayload, date: NaiveDate) -> Result<DailyReading> {
    DailyNormalizer.normalize(payload, date)
}

/// JSON body of a named section, or a descriptive parse error
pub(crate) fn json_section<'a>(payload: &'a RawPayload, name: &str) -> Result<&'a Value> {
    let body = payload
        .section(name)
        .ok_or_else(|| {
            let present: Vec<&str> = payload.section_names().collect();
            SolarlogError::parse(format!(
                "payload has no '{}' section (present: [{}])",
                name,
                present.join(", ")
            ))
        })?;
    match body {
        PayloadBody::Json(value) => Ok(value),
        PayloadBody::Html(page) => Err(SolarlogError::parse(format!(
            "'{}' is an HTML page ({}) instead of JSON",
            name,
            html::page_title(page).unwrap_or_else(|| "untitled".to_string())
        ))),
        PayloadBody::Text(text) => Err(SolarlogError::parse(format!(
            "'{}' is not JSON ({} bytes)",
            name,
            text.len()
        ))),
    }
}

/// Number, null or absent; anything else is a parse error
pub(crate) fn optional_number(object: &Value, field: &str) -> Result<Option<f64>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| SolarlogError::parse(format!("field {} is not a finite number", field))),
        Some(other) => Err(SolarlogError::parse(format!(
            "field {} is not numeric: {}",
            field, other
        ))),
    }
}
