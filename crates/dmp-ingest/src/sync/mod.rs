//! Sync manager
//!
//! End-to-end sync of configured data sources: validate the source,
//! read its file, normalize every record, upsert disaster events by
//! natural key, and report partial success with per-row error detail.
//! Operational failures never escape as errors; the caller always gets
//! a `(processed, errors[])` outcome.

use chrono::Utc;
use dmp_common::audit::{AuditAction, AuditEntry};
use dmp_common::config::SyncConfig;
use dmp_common::types::{
    DataPoint, DataSource, DisasterEvent, SourceReport, SourceStatus, SyncOutcome, SyncSummary,
};
use dmp_common::{DmpError, Result};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::normalize::{coerce_float, normalize, parse_datetime};
use crate::reader::{read_file, RawRecord};
use crate::store::{AuditSink, EventStore};

/// Orchestrates syncing uploaded files into disaster events.
pub struct SyncManager {
    config: SyncConfig,
}

impl SyncManager {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Sync a single data source.
    ///
    /// Returns the number of records processed and one error string per
    /// failed record. Whole-source failures (missing file, unsupported
    /// format, parse error) come back as `(0, [message])`.
    pub fn sync_data_source<S>(
        &self,
        source: &mut DataSource,
        store: &mut S,
        actor: Option<&str>,
    ) -> SyncOutcome
    where
        S: EventStore + AuditSink + ?Sized,
    {
        info!(source = %source.name, id = %source.id, "Starting sync for data source");

        let outcome = match self.sync_inner(source, store) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(source = %source.name, error = %e, "Error syncing data source");
                return SyncOutcome::failure(e.to_string());
            },
        };

        source.last_sync = Some(Utc::now());

        if let Some(actor) = actor {
            self.record_audit(source, store, actor, &outcome);
        }

        info!(
            source = %source.name,
            records = outcome.records_processed,
            errors = outcome.errors.len(),
            "Sync completed"
        );
        outcome
    }

    fn sync_inner<S>(&self, source: &DataSource, store: &mut S) -> Result<SyncOutcome>
    where
        S: EventStore + ?Sized,
    {
        if source.file_path.trim().is_empty() {
            return Err(DmpError::Config(format!(
                "DataSource {} has no file_path configured",
                source.name
            )));
        }

        let path = self.config.resolve(&source.file_path);
        let records = read_file(&path)?;
        info!(source = %source.name, records = records.len(), "Read records from source");

        if source.source_type.is_file_backed() {
            Ok(self.process_disaster_records(&records, source, store))
        } else {
            // Non-file sources are counted but not transformed
            Ok(SyncOutcome {
                records_processed: records.len(),
                errors: Vec::new(),
            })
        }
    }

    fn process_disaster_records<S>(
        &self,
        records: &[RawRecord],
        source: &DataSource,
        store: &mut S,
    ) -> SyncOutcome
    where
        S: EventStore + ?Sized,
    {
        let mut processed = 0;
        let mut errors = Vec::new();

        for (idx, record) in records.iter().enumerate() {
            let normalized = normalize(record);

            let (Some(disaster_type), Some(location_name)) = (
                normalized.disaster_type.clone(),
                normalized.location_name.clone(),
            ) else {
                errors.push(format!("Row {idx}: Missing disaster_type or location_name"));
                continue;
            };

            // Defaults guarantee a predicted_time, but rows without an
            // explicit one carry this run's "now" and never match an
            // earlier run's events.
            let lookup_time = normalized.predicted_time.unwrap_or_else(Utc::now);

            let existing = match store.find_event(&disaster_type, &location_name, lookup_time) {
                Ok(existing) => existing,
                Err(e) => {
                    errors.push(format!("Row {idx}: {e}"));
                    continue;
                },
            };

            let upsert = match existing {
                Some(mut event) => {
                    normalized.apply_to(&mut event);
                    store.update_event(&event).map(|_| event)
                },
                None => {
                    let mut event = DisasterEvent::new(disaster_type, location_name);
                    normalized.apply_to(&mut event);
                    store.create_event(event.clone()).map(|_| event)
                },
            };

            let event = match upsert {
                Ok(event) => event,
                Err(e) => {
                    errors.push(format!("Row {idx}: {e}"));
                    continue;
                },
            };

            if let Some(points) = record.get("data_points") {
                create_data_points(&event, points, &source.name, store);
            }

            processed += 1;
        }

        SyncOutcome {
            records_processed: processed,
            errors,
        }
    }

    fn record_audit<S>(&self, source: &DataSource, store: &mut S, actor: &str, outcome: &SyncOutcome)
    where
        S: AuditSink + ?Sized,
    {
        let entry = AuditEntry::builder()
            .actor(actor)
            .action(AuditAction::ModelChange)
            .resource_type("DataSync")
            .resource_id(source.id.to_string())
            .description(format!(
                "Synced data source: {} ({} records)",
                source.name, outcome.records_processed
            ))
            .new_values(json!({
                "records_processed": outcome.records_processed,
                "errors": outcome.errors.len(),
            }))
            .try_build();

        match entry {
            Ok(entry) => {
                if let Err(e) = store.append(entry) {
                    warn!(source = %source.name, error = %e, "Could not record audit entry");
                }
            },
            Err(e) => warn!(error = %e, "Could not build audit entry"),
        }
    }

    /// Sync every active source whose interval has elapsed.
    ///
    /// Sources are processed one at a time; a failing source never
    /// aborts the batch. A source whose sync reported any error is
    /// tallied as failed even if it made partial progress.
    pub fn sync_all_active_sources<S>(
        &self,
        sources: &mut [DataSource],
        store: &mut S,
        actor: Option<&str>,
    ) -> SyncSummary
    where
        S: EventStore + AuditSink + ?Sized,
    {
        let now = Utc::now();
        let mut summary = SyncSummary::default();

        for source in sources.iter_mut().filter(|source| source.is_active) {
            summary.total_sources += 1;

            if !source.is_due(now) {
                summary.skipped += 1;
                summary.details.push(SourceReport {
                    source: source.name.clone(),
                    status: SourceStatus::Skipped {
                        reason: "Not due for sync".to_string(),
                    },
                });
                continue;
            }

            let outcome = self.sync_data_source(source, store, actor);
            let status = if outcome.errors.is_empty() {
                summary.synced += 1;
                SourceStatus::Success {
                    processed: outcome.records_processed,
                }
            } else {
                summary.failed += 1;
                SourceStatus::Failed {
                    processed: outcome.records_processed,
                    errors: outcome.errors,
                }
            };

            summary.details.push(SourceReport {
                source: source.name.clone(),
                status,
            });
        }

        summary
    }
}

/// Create one measurement per `data_points` entry, skipping points
/// that cannot be built.
fn create_data_points<S>(event: &DisasterEvent, points: &Value, source_name: &str, store: &mut S)
where
    S: EventStore + ?Sized,
{
    let points = match points {
        Value::Object(_) => std::slice::from_ref(points),
        Value::Array(items) => items.as_slice(),
        other => {
            warn!(value = %other, "data_points is neither an object nor an array");
            return;
        },
    };

    for point in points {
        let Value::Object(fields) = point else {
            warn!("Skipping non-object data point");
            continue;
        };

        let value = match fields.get("value") {
            None => 0.0,
            Some(raw) => match coerce_float(raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "Could not create data point");
                    continue;
                },
            },
        };

        let timestamp = match fields.get("timestamp") {
            None => Utc::now(),
            Some(Value::String(raw)) => match parse_datetime(raw) {
                Ok(timestamp) => timestamp,
                Err(e) => {
                    warn!(error = %e, "Could not create data point");
                    continue;
                },
            },
            Some(other) => {
                warn!(value = %other, "Could not create data point: bad timestamp");
                continue;
            },
        };

        let data_point = DataPoint {
            id: Uuid::new_v4(),
            event_id: event.id,
            data_type: fields
                .get("data_type")
                .and_then(Value::as_str)
                .unwrap_or("measurement")
                .to_string(),
            value,
            unit: fields
                .get("unit")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            source: source_name.to_string(),
            timestamp,
        };

        if let Err(e) = store.create_data_point(data_point) {
            warn!(error = %e, "Could not create data point");
        }
    }
}
