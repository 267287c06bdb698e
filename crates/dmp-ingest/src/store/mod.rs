//! Collaborator seams for the sync core
//!
//! The sync manager never talks to a database directly; it goes
//! through the `EventStore` and `AuditSink` traits. The surrounding
//! application supplies real persistence, tests and the CLI use
//! [`MemoryStore`].

use chrono::{DateTime, Utc};
use dmp_common::audit::AuditEntry;
use dmp_common::types::{DataPoint, DisasterEvent};
use tracing::debug;
use uuid::Uuid;

/// Result type for store operations, carrying whatever error the
/// backing implementation produces.
pub type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Storage for disaster events and their nested measurements.
pub trait EventStore {
    /// Find an event by its natural key (exact match).
    fn find_event(
        &self,
        disaster_type: &str,
        location_name: &str,
        predicted_time: DateTime<Utc>,
    ) -> StoreResult<Option<DisasterEvent>>;

    /// Persist a new event.
    fn create_event(&mut self, event: DisasterEvent) -> StoreResult<()>;

    /// Persist an updated event in place, identified by its id.
    fn update_event(&mut self, event: &DisasterEvent) -> StoreResult<()>;

    /// Attach one measurement to an event.
    fn create_data_point(&mut self, point: DataPoint) -> StoreResult<()>;
}

/// Best-effort audit trail sink. Failures are logged by the caller and
/// never fail a sync.
pub trait AuditSink {
    fn append(&mut self, entry: AuditEntry) -> StoreResult<()>;
}

/// Vec-backed store used by tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Vec<DisasterEvent>,
    data_points: Vec<DataPoint>,
    audit_entries: Vec<AuditEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[DisasterEvent] {
        &self.events
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.data_points
    }

    pub fn data_points_for(&self, event_id: Uuid) -> Vec<&DataPoint> {
        self.data_points
            .iter()
            .filter(|point| point.event_id == event_id)
            .collect()
    }

    pub fn audit_entries(&self) -> &[AuditEntry] {
        &self.audit_entries
    }
}

impl EventStore for MemoryStore {
    fn find_event(
        &self,
        disaster_type: &str,
        location_name: &str,
        predicted_time: DateTime<Utc>,
    ) -> StoreResult<Option<DisasterEvent>> {
        Ok(self
            .events
            .iter()
            .find(|event| {
                event.disaster_type == disaster_type
                    && event.location_name == location_name
                    && event.predicted_time == predicted_time
            })
            .cloned())
    }

    fn create_event(&mut self, event: DisasterEvent) -> StoreResult<()> {
        debug!(event_id = %event.id, "Created disaster event");
        self.events.push(event);
        Ok(())
    }

    fn update_event(&mut self, event: &DisasterEvent) -> StoreResult<()> {
        let existing = self
            .events
            .iter_mut()
            .find(|candidate| candidate.id == event.id)
            .ok_or_else(|| format!("no event with id {}", event.id))?;
        debug!(event_id = %event.id, "Updated disaster event");
        *existing = event.clone();
        Ok(())
    }

    fn create_data_point(&mut self, point: DataPoint) -> StoreResult<()> {
        self.data_points.push(point);
        Ok(())
    }
}

impl AuditSink for MemoryStore {
    fn append(&mut self, entry: AuditEntry) -> StoreResult<()> {
        self.audit_entries.push(entry);
        Ok(())
    }
}
