//! Field normalization
//!
//! Maps arbitrary source field names onto the canonical disaster event
//! schema and coerces mixed value representations (numeric strings,
//! qualitative severity words, assorted date formats) into typed
//! fields. A field that cannot be coerced is dropped with a recorded
//! reason; it never rejects the whole record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use dmp_common::types::DisasterEvent;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use crate::reader::RawRecord;

// ============================================================================
// Canonical Schema
// ============================================================================

/// The fixed set of typed target fields every source record is
/// normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    DisasterType,
    Status,
    Latitude,
    Longitude,
    LocationName,
    RiskScore,
    ConfidenceLevel,
    Magnitude,
    WindSpeedKmh,
    RainfallMm,
    AffectedAreaSqkm,
    PredictedTime,
    StartTime,
    EndTime,
    EstimatedAffectedPopulation,
    EstimatedDamageUsd,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisasterType => "disaster_type",
            Self::Status => "status",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::LocationName => "location_name",
            Self::RiskScore => "risk_score",
            Self::ConfidenceLevel => "confidence_level",
            Self::Magnitude => "magnitude",
            Self::WindSpeedKmh => "wind_speed_kmh",
            Self::RainfallMm => "rainfall_mm",
            Self::AffectedAreaSqkm => "affected_area_sqkm",
            Self::PredictedTime => "predicted_time",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::EstimatedAffectedPopulation => "estimated_affected_population",
            Self::EstimatedDamageUsd => "estimated_damage_usd",
        }
    }

    /// Target semantic type driving coercion.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::DisasterType => FieldKind::Keyword,
            Self::Status | Self::LocationName => FieldKind::Text,
            Self::RiskScore | Self::ConfidenceLevel => FieldKind::Score,
            Self::Latitude
            | Self::Longitude
            | Self::Magnitude
            | Self::WindSpeedKmh
            | Self::RainfallMm
            | Self::AffectedAreaSqkm => FieldKind::Float,
            Self::PredictedTime | Self::StartTime | Self::EndTime => FieldKind::Timestamp,
            Self::EstimatedAffectedPopulation | Self::EstimatedDamageUsd => FieldKind::Integer,
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target semantic type of a canonical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Lowercased string
    Keyword,
    /// String as-is
    Text,
    /// Float with a qualitative-word fallback
    Score,
    /// Plain float
    Float,
    /// Float truncated to integer
    Integer,
    /// Parsed timestamp, promoted to UTC
    Timestamp,
}

/// Accepted source aliases per canonical field. Order matters: the
/// first alias present with a usable value wins.
pub const FIELD_ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::DisasterType,
        &["disaster_type", "type", "event_type", "disaster"],
    ),
    (CanonicalField::Status, &["status", "state"]),
    (CanonicalField::Latitude, &["latitude", "lat", "y"]),
    (CanonicalField::Longitude, &["longitude", "lon", "long", "x"]),
    (
        CanonicalField::LocationName,
        &["location_name", "location", "place", "area"],
    ),
    (CanonicalField::RiskScore, &["risk_score", "risk", "severity"]),
    (
        CanonicalField::ConfidenceLevel,
        &["confidence_level", "confidence"],
    ),
    (CanonicalField::Magnitude, &["magnitude", "mag"]),
    (
        CanonicalField::WindSpeedKmh,
        &["wind_speed_kmh", "wind_speed", "windspeed"],
    ),
    (CanonicalField::RainfallMm, &["rainfall_mm", "rainfall", "rain"]),
    (
        CanonicalField::AffectedAreaSqkm,
        &["affected_area_sqkm", "area", "affected_area"],
    ),
    (
        CanonicalField::PredictedTime,
        &["predicted_time", "time", "timestamp", "datetime"],
    ),
    (CanonicalField::StartTime, &["start_time", "start"]),
    (CanonicalField::EndTime, &["end_time", "end"]),
    (
        CanonicalField::EstimatedAffectedPopulation,
        &["estimated_affected_population", "population", "people"],
    ),
    (
        CanonicalField::EstimatedDamageUsd,
        &["estimated_damage_usd", "damage", "cost"],
    ),
];

/// Qualitative severity words and their numeric score equivalents.
pub const SEVERITY_SCALE: &[(&str, f64)] = &[
    ("critical", 90.0),
    ("high", 75.0),
    ("medium", 50.0),
    ("low", 25.0),
    ("very high", 95.0),
    ("severe", 85.0),
    ("moderate", 50.0),
    ("minor", 20.0),
];

/// Timestamp patterns tried in order, datetime forms first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%SZ",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];

// ============================================================================
// Coercion
// ============================================================================

/// Why a source value was dropped instead of coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("cannot convert '{0}' to a number")]
    NotNumeric(String),

    #[error("cannot convert '{0}' to a numeric score")]
    UnknownSeverity(String),

    #[error("could not parse datetime: {0}")]
    InvalidTimestamp(String),

    #[error("value of type {0} is not usable here")]
    UnsupportedType(&'static str),
}

/// A successfully coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Text(String),
    Float(f64),
    Integer(i64),
    Timestamp(DateTime<Utc>),
}

/// Coerce one raw value into the target type of `field`.
pub fn coerce(field: CanonicalField, value: &Value) -> Result<CoercedValue, SkipReason> {
    match field.kind() {
        FieldKind::Keyword => Ok(CoercedValue::Text(value_to_string(value).to_lowercase())),
        FieldKind::Text => Ok(CoercedValue::Text(value_to_string(value))),
        FieldKind::Score => coerce_score(value).map(CoercedValue::Float),
        FieldKind::Float => coerce_float(value).map(CoercedValue::Float),
        FieldKind::Integer => coerce_float(value).map(|f| CoercedValue::Integer(f as i64)),
        FieldKind::Timestamp => coerce_timestamp(value).map(CoercedValue::Timestamp),
    }
}

pub(crate) fn coerce_float(value: &Value) -> Result<f64, SkipReason> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| SkipReason::NotNumeric(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| SkipReason::NotNumeric(s.clone())),
        other => Err(SkipReason::NotNumeric(other.to_string())),
    }
}

/// Numeric first, qualitative severity word second.
fn coerce_score(value: &Value) -> Result<f64, SkipReason> {
    if let Ok(score) = coerce_float(value) {
        return Ok(score);
    }

    let word = value_to_string(value).trim().to_lowercase();
    SEVERITY_SCALE
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, score)| *score)
        .ok_or_else(|| SkipReason::UnknownSeverity(value_to_string(value)))
}

fn coerce_timestamp(value: &Value) -> Result<DateTime<Utc>, SkipReason> {
    match value {
        Value::String(s) => parse_datetime(s),
        Value::Number(_) => Err(SkipReason::UnsupportedType("number")),
        Value::Bool(_) => Err(SkipReason::UnsupportedType("bool")),
        Value::Null => Err(SkipReason::UnsupportedType("null")),
        Value::Array(_) => Err(SkipReason::UnsupportedType("array")),
        Value::Object(_) => Err(SkipReason::UnsupportedType("object")),
    }
}

/// Parse a timestamp string against the fixed format ladder.
///
/// Naive results are promoted to UTC.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, SkipReason> {
    let trimmed = value.trim();

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(naive.and_utc());
            }
        }
    }

    Err(SkipReason::InvalidTimestamp(value.to_string()))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Empty-ish values do not satisfy an alias: null, false, zero, and
/// empty strings/arrays/objects are all treated as absent.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Lowercase a source key and fold spaces and hyphens to underscores.
fn normalize_key(key: &str) -> String {
    key.to_lowercase().replace([' ', '-'], "_")
}

// ============================================================================
// Normalized Output
// ============================================================================

/// Canonical event fields extracted from one raw record.
///
/// Each field is tri-state through `Option`: absent fields stay `None`
/// and are left untouched by the merge into an existing event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedEvent {
    pub disaster_type: Option<String>,
    pub status: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    pub risk_score: Option<f64>,
    pub confidence_level: Option<f64>,
    pub magnitude: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub rainfall_mm: Option<f64>,
    pub affected_area_sqkm: Option<f64>,
    pub predicted_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub estimated_affected_population: Option<i64>,
    pub estimated_damage_usd: Option<i64>,

    /// Fields dropped during coercion, with the reason for each.
    pub skipped: Vec<(CanonicalField, SkipReason)>,
}

impl NormalizedEvent {
    fn set(&mut self, field: CanonicalField, value: CoercedValue) {
        match (field, value) {
            (CanonicalField::DisasterType, CoercedValue::Text(v)) => self.disaster_type = Some(v),
            (CanonicalField::Status, CoercedValue::Text(v)) => self.status = Some(v),
            (CanonicalField::LocationName, CoercedValue::Text(v)) => self.location_name = Some(v),
            (CanonicalField::Latitude, CoercedValue::Float(v)) => self.latitude = Some(v),
            (CanonicalField::Longitude, CoercedValue::Float(v)) => self.longitude = Some(v),
            (CanonicalField::RiskScore, CoercedValue::Float(v)) => self.risk_score = Some(v),
            (CanonicalField::ConfidenceLevel, CoercedValue::Float(v)) => {
                self.confidence_level = Some(v)
            },
            (CanonicalField::Magnitude, CoercedValue::Float(v)) => self.magnitude = Some(v),
            (CanonicalField::WindSpeedKmh, CoercedValue::Float(v)) => self.wind_speed_kmh = Some(v),
            (CanonicalField::RainfallMm, CoercedValue::Float(v)) => self.rainfall_mm = Some(v),
            (CanonicalField::AffectedAreaSqkm, CoercedValue::Float(v)) => {
                self.affected_area_sqkm = Some(v)
            },
            (CanonicalField::PredictedTime, CoercedValue::Timestamp(v)) => {
                self.predicted_time = Some(v)
            },
            (CanonicalField::StartTime, CoercedValue::Timestamp(v)) => self.start_time = Some(v),
            (CanonicalField::EndTime, CoercedValue::Timestamp(v)) => self.end_time = Some(v),
            (CanonicalField::EstimatedAffectedPopulation, CoercedValue::Integer(v)) => {
                self.estimated_affected_population = Some(v)
            },
            (CanonicalField::EstimatedDamageUsd, CoercedValue::Integer(v)) => {
                self.estimated_damage_usd = Some(v)
            },
            // coerce() always returns the kind matching the field
            _ => {},
        }
    }

    fn has(&self, field: CanonicalField) -> bool {
        match field {
            CanonicalField::DisasterType => self.disaster_type.is_some(),
            CanonicalField::Status => self.status.is_some(),
            CanonicalField::Latitude => self.latitude.is_some(),
            CanonicalField::Longitude => self.longitude.is_some(),
            CanonicalField::LocationName => self.location_name.is_some(),
            CanonicalField::RiskScore => self.risk_score.is_some(),
            CanonicalField::ConfidenceLevel => self.confidence_level.is_some(),
            CanonicalField::Magnitude => self.magnitude.is_some(),
            CanonicalField::WindSpeedKmh => self.wind_speed_kmh.is_some(),
            CanonicalField::RainfallMm => self.rainfall_mm.is_some(),
            CanonicalField::AffectedAreaSqkm => self.affected_area_sqkm.is_some(),
            CanonicalField::PredictedTime => self.predicted_time.is_some(),
            CanonicalField::StartTime => self.start_time.is_some(),
            CanonicalField::EndTime => self.end_time.is_some(),
            CanonicalField::EstimatedAffectedPopulation => {
                self.estimated_affected_population.is_some()
            },
            CanonicalField::EstimatedDamageUsd => self.estimated_damage_usd.is_some(),
        }
    }

    /// Overwrite every present field onto `event`; absent fields leave
    /// the existing values alone.
    pub fn apply_to(&self, event: &mut DisasterEvent) {
        if let Some(ref v) = self.disaster_type {
            event.disaster_type = v.clone();
        }
        if let Some(ref v) = self.status {
            event.status = v.clone();
        }
        if let Some(v) = self.latitude {
            event.latitude = Some(v);
        }
        if let Some(v) = self.longitude {
            event.longitude = Some(v);
        }
        if let Some(ref v) = self.location_name {
            event.location_name = v.clone();
        }
        if let Some(v) = self.risk_score {
            event.risk_score = v;
        }
        if let Some(v) = self.confidence_level {
            event.confidence_level = v;
        }
        if let Some(v) = self.magnitude {
            event.magnitude = Some(v);
        }
        if let Some(v) = self.wind_speed_kmh {
            event.wind_speed_kmh = Some(v);
        }
        if let Some(v) = self.rainfall_mm {
            event.rainfall_mm = Some(v);
        }
        if let Some(v) = self.affected_area_sqkm {
            event.affected_area_sqkm = Some(v);
        }
        if let Some(v) = self.predicted_time {
            event.predicted_time = v;
        }
        if let Some(v) = self.start_time {
            event.start_time = Some(v);
        }
        if let Some(v) = self.end_time {
            event.end_time = Some(v);
        }
        if let Some(v) = self.estimated_affected_population {
            event.estimated_affected_population = v;
        }
        if let Some(v) = self.estimated_damage_usd {
            event.estimated_damage_usd = v;
        }
        event.updated_at = Utc::now();
    }
}

/// Normalize one raw record into canonical event fields.
///
/// Keys are folded, aliases are tried in order, and values that fail
/// coercion are dropped with their reason recorded. After mapping, the
/// four required-with-default fields are filled if still absent:
/// `status` ("predicted"), `predicted_time` (now), `risk_score` (50.0)
/// and `confidence_level` (50.0).
pub fn normalize(record: &RawRecord) -> NormalizedEvent {
    let keyed: HashMap<String, &Value> = record
        .iter()
        .map(|(name, value)| (normalize_key(name), value))
        .collect();

    let mut event = NormalizedEvent::default();

    for (field, aliases) in FIELD_ALIASES {
        for alias in *aliases {
            let Some(value) = keyed.get(*alias) else {
                continue;
            };
            if is_falsy(value) {
                continue;
            }

            match coerce(*field, value) {
                Ok(coerced) => {
                    event.set(*field, coerced);
                    break;
                },
                Err(reason) => {
                    warn!(
                        field = field.as_str(),
                        alias = *alias,
                        %reason,
                        "Could not convert source value, dropping field"
                    );
                    event.skipped.push((*field, reason));
                },
            }
        }
    }

    if !event.has(CanonicalField::Status) {
        event.status = Some("predicted".to_string());
    }
    if !event.has(CanonicalField::PredictedTime) {
        event.predicted_time = Some(Utc::now());
    }
    if !event.has(CanonicalField::RiskScore) {
        event.risk_score = Some(50.0);
    }
    if !event.has(CanonicalField::ConfidenceLevel) {
        event.confidence_level = Some(50.0);
    }

    event
}
