//! Glucose reading records
//!
//! The readings endpoint returns an array of
//! `{"WT", "ST", "DT": "Date(<millis>[+-]HHMM)", "Value": <mg/dL>, "Trend": "<name>"}`.
//! Each record is schema-checked with serde and decoded into a
//! `GlucoseReading`; any mismatch is `ArgumentError::GlucoseReadingInvalid`.

use chrono::{DateTime, FixedOffset};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use dexcom_auth::{ArgumentError, Result};

use crate::trend::Trend;

/// mg/dL → mmol/L conversion factor.
pub const MMOL_L_CONVERSION_FACTOR: f64 = 0.0555;

/// Wire shape of one reading.
#[derive(Debug, Deserialize)]
struct RawReading {
    #[serde(rename = "WT")]
    #[allow(dead_code)]
    wt: Option<String>,
    #[serde(rename = "ST")]
    #[allow(dead_code)]
    st: Option<String>,
    #[serde(rename = "DT")]
    dt: String,
    #[serde(rename = "Value")]
    value: u32,
    #[serde(rename = "Trend")]
    trend: String,
}

/// A decoded glucose reading.
#[derive(Debug, Clone, PartialEq)]
pub struct GlucoseReading {
    value: u32,
    trend: Trend,
    datetime: DateTime<FixedOffset>,
    timezone: String,
    json: Value,
}

impl GlucoseReading {
    /// Validate and decode one record.
    pub fn from_json(json: Value) -> Result<Self> {
        let raw = RawReading::deserialize(&json).map_err(|_| ArgumentError::GlucoseReadingInvalid)?;
        let (datetime, timezone) = parse_dt(&raw.dt).ok_or(ArgumentError::GlucoseReadingInvalid)?;
        let trend = raw.trend.parse::<Trend>()?;
        Ok(Self {
            value: raw.value,
            trend,
            datetime,
            timezone: timezone.to_owned(),
            json,
        })
    }

    /// Decode a readings response body (a JSON array of records).
    pub fn from_response(body: Value) -> Result<Vec<Self>> {
        match body {
            Value::Array(records) => records.into_iter().map(Self::from_json).collect(),
            _ => Err(ArgumentError::GlucoseReadingInvalid.into()),
        }
    }

    /// Blood glucose in mg/dL.
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn mg_dl(&self) -> u32 {
        self.value
    }

    /// Blood glucose in mmol/L, rounded to one decimal.
    pub fn mmol_l(&self) -> f64 {
        (f64::from(self.value) * MMOL_L_CONVERSION_FACTOR * 10.0).round() / 10.0
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn trend_direction(&self) -> &'static str {
        self.trend.name()
    }

    pub fn trend_description(&self) -> &'static str {
        self.trend.description()
    }

    pub fn trend_arrow(&self) -> &'static str {
        self.trend.arrow()
    }

    /// Reading time in the offset the record was reported with.
    pub fn datetime(&self) -> DateTime<FixedOffset> {
        self.datetime
    }

    /// Raw offset string from the record, e.g. `"-0400"`.
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// The record exactly as received.
    pub fn json(&self) -> &Value {
        &self.json
    }
}

impl Serialize for GlucoseReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GlucoseReading", 9)?;
        state.serialize_field("mg_dl", &self.mg_dl())?;
        state.serialize_field("mmol_l", &self.mmol_l())?;
        state.serialize_field("trend", &self.trend.index())?;
        state.serialize_field("trend_direction", self.trend_direction())?;
        state.serialize_field("trend_description", self.trend_description())?;
        state.serialize_field("trend_arrow", self.trend_arrow())?;
        state.serialize_field("datetime", &self.datetime.to_rfc3339())?;
        state.serialize_field("timezone", &self.timezone)?;
        state.serialize_field("json", &self.json)?;
        state.end()
    }
}

/// Parse `Date(<millis><+|-HHMM>)` into a timestamp and its offset string.
fn parse_dt(dt: &str) -> Option<(DateTime<FixedOffset>, &str)> {
    let inner = dt.strip_prefix("Date(")?.strip_suffix(')')?;
    let split = inner.len().checked_sub(5)?;
    if !inner.is_char_boundary(split) {
        return None;
    }
    let (millis, timezone) = inner.split_at(split);
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let offset = parse_offset(timezone)?;
    let utc = DateTime::from_timestamp_millis(millis.parse().ok()?)?;
    Some((utc.with_timezone(&offset), timezone))
}

fn parse_offset(timezone: &str) -> Option<FixedOffset> {
    let (sign, digits) = match timezone.as_bytes().first()? {
        b'+' => (1, &timezone[1..]),
        b'-' => (-1, &timezone[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
