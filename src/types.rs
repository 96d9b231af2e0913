use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::constants::fields;

/// A record as handed over by a source collector.
///
/// Field names map to optionally-absent string or number values. Nothing
/// about the record is guaranteed; it is only read, never mutated, by the
/// pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter used by collectors and tests
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Read a field as text. Numbers and booleans are rendered as their
    /// literal text; null, arrays and objects count as absent. Blank strings
    /// are returned as-is so callers can tell "blank" from "missing".
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// First present, non-blank value among `keys`
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.text(k))
            .find(|v| !v.trim().is_empty())
    }

    /// Origin tag of this record
    pub fn data_source(&self) -> Option<String> {
        self.first_text(fields::DATA_SOURCE)
            .map(|s| s.trim().to_string())
    }

    /// Discovery timestamp, accepting RFC 3339 or a plain `YYYY-MM-DD` date
    pub fn discovered_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.first_text(fields::DISCOVERED_AT)?;
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Ordinal company-size bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Solo,
    /// 1-10 people
    Small,
    /// 11-50 people
    Medium,
    /// more than 50 people
    Large,
    Unknown,
}

impl CompanySize {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySize::Solo => "solo",
            CompanySize::Small => "small",
            CompanySize::Medium => "medium",
            CompanySize::Large => "large",
            CompanySize::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CompanySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lead category decided by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadCategory {
    Business,
    Developer,
}

impl LeadCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadCategory::Business => "business",
            LeadCategory::Developer => "developer",
        }
    }
}

impl fmt::Display for LeadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a raw record never made it past normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Name or website is missing or blank
    MissingIdentity,
    /// Website could not be parsed into an absolute http(s) URL
    InvalidWebsite,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::MissingIdentity => "missing_identity",
            RejectionReason::InvalidWebsite => "invalid_website",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw record paired with the reason it was dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub record: RawRecord,
    pub reason: RejectionReason,
    /// Human-readable detail, e.g. the offending website value
    pub detail: String,
}

impl RejectedRecord {
    pub fn new(record: RawRecord, reason: RejectionReason, detail: impl Into<String>) -> Self {
        Self {
            record,
            reason,
            detail: detail.into(),
        }
    }
}
