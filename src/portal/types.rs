use chrono::{DateTime, Utc};
use serde_json::Value;

/// Section holding the `GetCompareDataForPvSystem` response
pub const STATUS_SECTION: &str = "actual_data";
/// Section holding the month production chart
pub const PRODUCTION_SECTION: &str = "production";
/// Section holding the month consumption chart
pub const CONSUMPTION_SECTION: &str = "consumption";

/// Body of one portal response, classified by content
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadBody {
    Json(Value),
    Html(String),
    Text(String),
}

impl PayloadBody {
    /// Classify a response body: markup, JSON, or anything else
    pub fn from_text(text: String) -> Self {
        let trimmed = text.trim_start();
        if trimmed.starts_with('<') {
            return PayloadBody::Html(text);
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => PayloadBody::Json(value),
            Err(_) => PayloadBody::Text(text),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PayloadBody::Json(_) => "json",
            PayloadBody::Html(_) => "html",
            PayloadBody::Text(_) => "text",
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            PayloadBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Unparsed portal response, possibly made of several named sections
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub fetched_at: DateTime<Utc>,
    sections: Vec<(String, PayloadBody)>,
}

impl RawPayload {
    pub fn new(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, name: &str, body: PayloadBody) -> Self {
        self.sections.push((name.to_string(), body));
        self
    }

    pub fn section(&self, name: &str) -> Option<&PayloadBody> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(n, _)| n.as_str())
    }
}
