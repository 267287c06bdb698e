//! Common types used across DMP

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Disaster Events
// ============================================================================

/// A predicted or observed disaster event.
///
/// Events are deduplicated by the natural key
/// (`disaster_type`, `location_name`, `predicted_time`); incoming sync
/// records matching an existing key update that event in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisasterEvent {
    /// Unique identifier for the event
    pub id: Uuid,

    /// Lowercase disaster kind (e.g., "flood", "earthquake", "cyclone", "wildfire")
    pub disaster_type: String,

    /// Lifecycle status: "predicted", "active", "contained", or "resolved"
    pub status: String,

    /// Latitude in decimal degrees, if known
    pub latitude: Option<f64>,

    /// Longitude in decimal degrees, if known
    pub longitude: Option<f64>,

    /// Human-readable location name
    pub location_name: String,

    /// Risk score in the 0-100 range
    pub risk_score: f64,

    /// Prediction confidence in the 0-100 range
    pub confidence_level: f64,

    /// Magnitude (earthquakes)
    pub magnitude: Option<f64>,

    /// Wind speed in km/h (cyclones)
    pub wind_speed_kmh: Option<f64>,

    /// Rainfall in millimetres (floods)
    pub rainfall_mm: Option<f64>,

    /// Affected area in square kilometres
    pub affected_area_sqkm: Option<f64>,

    /// When the event is predicted to occur
    pub predicted_time: DateTime<Utc>,

    /// When the event actually started, if it has
    pub start_time: Option<DateTime<Utc>>,

    /// When the event ended, if it has
    pub end_time: Option<DateTime<Utc>>,

    /// Estimated number of people affected
    pub estimated_affected_population: i64,

    /// Estimated damage in US dollars
    pub estimated_damage_usd: i64,

    /// Timestamp when the record was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the record was last updated
    pub updated_at: DateTime<Utc>,
}

impl DisasterEvent {
    /// Create an empty event shell with defaulted scoring fields.
    pub fn new(disaster_type: impl Into<String>, location_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            disaster_type: disaster_type.into(),
            status: "predicted".to_string(),
            latitude: None,
            longitude: None,
            location_name: location_name.into(),
            risk_score: 50.0,
            confidence_level: 50.0,
            magnitude: None,
            wind_speed_kmh: None,
            rainfall_mm: None,
            affected_area_sqkm: None,
            predicted_time: now,
            start_time: None,
            end_time: None,
            estimated_affected_population: 0,
            estimated_damage_usd: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl std::fmt::Display for DisasterEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {} ({})", self.disaster_type, self.location_name, self.status)
    }
}

/// A single measurement attached to a disaster event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    /// Unique identifier for the measurement
    pub id: Uuid,

    /// Event this measurement belongs to
    pub event_id: Uuid,

    /// Kind of measurement (e.g., "water_level", "seismic_activity")
    pub data_type: String,

    /// Measured value
    pub value: f64,

    /// Unit of measurement
    pub unit: String,

    /// Name of the data source that produced the measurement
    pub source: String,

    /// When the measurement was taken
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Data Sources
// ============================================================================

/// Kind of configured data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Api,
    Csv,
    File,
    Database,
    Sensor,
    Satellite,
    Weather,
    Stream,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Csv => "csv",
            Self::File => "file",
            Self::Database => "database",
            Self::Sensor => "sensor",
            Self::Satellite => "satellite",
            Self::Weather => "weather",
            Self::Stream => "stream",
        }
    }

    /// Whether records from this source are transformed into disaster
    /// events. Other source types are counted but not interpreted.
    pub fn is_file_backed(&self) -> bool {
        matches!(self, Self::Csv | Self::File)
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for one ingestable data source.
///
/// The sync core only reads this configuration and writes back
/// `last_sync`; ownership stays with the surrounding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    /// Unique identifier for the source
    pub id: Uuid,

    /// Display name of the source
    pub name: String,

    /// Kind of source
    pub source_type: SourceType,

    /// Path to the uploaded file, relative to the media root
    #[serde(default)]
    pub file_path: String,

    /// Whether the source participates in batch sync
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// When the source last completed a sync attempt
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,

    /// Minimum minutes between batch syncs
    #[serde(default = "default_interval")]
    pub sync_interval_minutes: i64,
}

fn default_active() -> bool {
    true
}

fn default_interval() -> i64 {
    15
}

impl DataSource {
    /// Create a file-backed source with default interval and active flag.
    pub fn new(name: impl Into<String>, source_type: SourceType, file_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source_type,
            file_path: file_path.into(),
            is_active: true,
            last_sync: None,
            sync_interval_minutes: default_interval(),
        }
    }

    /// Whether this source is due for a sync at `now`.
    ///
    /// A source with no recorded sync is always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_sync {
            None => true,
            Some(last) => now >= last + Duration::minutes(self.sync_interval_minutes),
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ============================================================================
// Sync Results
// ============================================================================

/// Result of syncing a single data source.
///
/// Operational failures never surface as `Err`; they land in `errors`
/// with zero or partial `records_processed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncOutcome {
    /// Number of records fully processed
    pub records_processed: usize,

    /// One entry per failed record or whole-source failure
    pub errors: Vec<String>,
}

impl SyncOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            records_processed: 0,
            errors: vec![message.into()],
        }
    }
}

/// Per-source status within a batch sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceStatus {
    /// Every record processed cleanly
    Success { processed: usize },
    /// Sync ran but at least one record failed
    Failed { processed: usize, errors: Vec<String> },
    /// Source was not due for sync
    Skipped { reason: String },
}

/// One entry in a batch sync report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceReport {
    /// Source name
    pub source: String,

    /// Outcome for this source
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// Aggregate result of a batch sync across all active sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Number of active sources considered
    pub total_sources: usize,

    /// Sources that synced without errors
    pub synced: usize,

    /// Sources whose sync reported at least one error
    pub failed: usize,

    /// Sources skipped because their interval had not elapsed
    pub skipped: usize,

    /// Per-source detail, in iteration order
    pub details: Vec<SourceReport>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_source_due_without_last_sync() {
        let source = DataSource::new("sensors", SourceType::Csv, "uploads/sensors.csv");
        assert!(source.is_due(Utc::now()));
    }

    #[test]
    fn test_source_due_after_interval() {
        let mut source = DataSource::new("sensors", SourceType::Csv, "uploads/sensors.csv");
        let now = Utc::now();
        source.sync_interval_minutes = 15;

        source.last_sync = Some(now - Duration::minutes(5));
        assert!(!source.is_due(now));

        source.last_sync = Some(now - Duration::minutes(15));
        assert!(source.is_due(now));
    }

    #[test]
    fn test_source_type_as_str() {
        assert_eq!(SourceType::Csv.as_str(), "csv");
        assert_eq!(SourceType::Satellite.as_str(), "satellite");
        assert!(SourceType::File.is_file_backed());
        assert!(!SourceType::Api.is_file_backed());
    }

    #[test]
    fn test_source_status_serialization() {
        let report = SourceReport {
            source: "sensors".to_string(),
            status: SourceStatus::Skipped {
                reason: "Not due for sync".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["source"], "sensors");
        assert_eq!(json["reason"], "Not due for sync");
    }

    #[test]
    fn test_new_event_defaults() {
        let event = DisasterEvent::new("flood", "Venice");
        assert_eq!(event.status, "predicted");
        assert_eq!(event.risk_score, 50.0);
        assert_eq!(event.confidence_level, 50.0);
        assert_eq!(event.estimated_affected_population, 0);
    }
}
