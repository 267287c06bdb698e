//! End-to-end pipeline tests: file on disk through reader,
//! normalizer, and sync manager into the event store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use dmp_common::config::SyncConfig;
use dmp_common::types::{DataSource, SourceStatus, SourceType};
use dmp_common::DmpError;
use dmp_ingest::read_file;
use dmp_ingest::store::MemoryStore;
use dmp_ingest::sync::SyncManager;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_upload(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    name.to_string()
}

fn manager_for(dir: &TempDir) -> SyncManager {
    SyncManager::new(SyncConfig {
        media_root: dir.path().to_path_buf(),
    })
}

#[test]
fn csv_rows_become_disaster_events_with_mapped_scores() {
    let dir = TempDir::new().unwrap();
    let file = write_upload(
        &dir,
        "events.csv",
        "disaster_type,location_name,severity,status\n\
         earthquake,Tokyo,Critical,active\n\
         flood,Venice,High,predicted\n",
    );

    let manager = manager_for(&dir);
    let mut source = DataSource::new("uploads", SourceType::Csv, file);
    let mut store = MemoryStore::new();

    let outcome = manager.sync_data_source(&mut source, &mut store, None);

    assert_eq!(outcome.records_processed, 2);
    assert!(outcome.errors.is_empty());
    assert_eq!(store.events().len(), 2);

    let tokyo = store
        .events()
        .iter()
        .find(|event| event.location_name == "Tokyo")
        .unwrap();
    assert_eq!(tokyo.disaster_type, "earthquake");
    assert_eq!(tokyo.status, "active");
    assert_eq!(tokyo.risk_score, 90.0);

    let venice = store
        .events()
        .iter()
        .find(|event| event.location_name == "Venice")
        .unwrap();
    assert_eq!(venice.disaster_type, "flood");
    assert_eq!(venice.status, "predicted");
    assert_eq!(venice.risk_score, 75.0);
}

#[test]
fn json_single_object_syncs_like_one_element_array() {
    let dir = TempDir::new().unwrap();
    let object = write_upload(
        &dir,
        "single.json",
        r#"{"type": "wildfire", "place": "Athens", "confidence": "85"}"#,
    );
    let array = write_upload(
        &dir,
        "array.json",
        r#"[{"type": "wildfire", "place": "Athens", "confidence": "85"}]"#,
    );

    assert_eq!(
        read_file(&dir.path().join(&object)).unwrap(),
        read_file(&dir.path().join(&array)).unwrap()
    );

    let manager = manager_for(&dir);
    let mut store = MemoryStore::new();
    let mut source = DataSource::new("single", SourceType::File, object);
    let outcome = manager.sync_data_source(&mut source, &mut store, None);

    assert_eq!(outcome.records_processed, 1);
    let event = &store.events()[0];
    assert_eq!(event.disaster_type, "wildfire");
    assert_eq!(event.location_name, "Athens");
    assert_eq!(event.confidence_level, 85.0);
}

#[test]
fn xml_records_flow_through_the_pipeline() {
    let dir = TempDir::new().unwrap();
    let file = write_upload(
        &dir,
        "feed.xml",
        r#"<feed>
            <event>
                <disaster_type>cyclone</disaster_type>
                <location_name>Manila</location_name>
                <wind_speed>185</wind_speed>
                <predicted_time>2026-09-01 06:00:00</predicted_time>
            </event>
        </feed>"#,
    );

    let manager = manager_for(&dir);
    let mut source = DataSource::new("weather-feed", SourceType::File, file);
    let mut store = MemoryStore::new();

    let outcome = manager.sync_data_source(&mut source, &mut store, None);

    assert_eq!(outcome.records_processed, 1);
    let event = &store.events()[0];
    assert_eq!(event.disaster_type, "cyclone");
    assert_eq!(event.wind_speed_kmh, Some(185.0));
}

#[test]
fn unsupported_extension_fails_the_source() {
    let dir = TempDir::new().unwrap();
    let file = write_upload(&dir, "report.pdf", "not really a pdf");

    // Factory refuses before opening the file
    let err = read_file(&dir.path().join(&file)).unwrap_err();
    assert!(matches!(err, DmpError::UnsupportedFormat(_)));

    let manager = manager_for(&dir);
    let mut source = DataSource::new("reports", SourceType::File, file);
    let mut store = MemoryStore::new();

    let outcome = manager.sync_data_source(&mut source, &mut store, None);
    assert_eq!(outcome.records_processed, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("Unsupported file format"));
}

#[test]
fn repeated_sync_with_explicit_times_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let file = write_upload(
        &dir,
        "events.csv",
        "disaster_type,location_name,predicted_time\n\
         flood,Venice,2026-04-02 08:00:00\n\
         earthquake,Tokyo,2026-04-03 10:00:00\n",
    );

    let manager = manager_for(&dir);
    let mut source = DataSource::new("uploads", SourceType::Csv, file);
    let mut store = MemoryStore::new();

    manager.sync_data_source(&mut source, &mut store, None);
    assert_eq!(store.events().len(), 2);

    manager.sync_data_source(&mut source, &mut store, None);
    assert_eq!(store.events().len(), 2);
}

#[test]
fn batch_sync_reports_per_source_detail() {
    let dir = TempDir::new().unwrap();
    let good = write_upload(
        &dir,
        "good.csv",
        "disaster_type,location_name,predicted_time\nflood,Venice,2026-04-02 08:00:00\n",
    );

    let mut sources = vec![
        DataSource::new("good", SourceType::Csv, good),
        DataSource::new("missing", SourceType::Csv, "nope.csv"),
    ];
    let manager = manager_for(&dir);
    let mut store = MemoryStore::new();

    let summary = manager.sync_all_active_sources(&mut sources, &mut store, Some("admin"));

    assert_eq!(summary.total_sources, 2);
    assert_eq!(summary.synced, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);

    assert_eq!(summary.details[0].source, "good");
    assert!(matches!(
        summary.details[0].status,
        SourceStatus::Success { processed: 1 }
    ));
    assert!(matches!(
        summary.details[1].status,
        SourceStatus::Failed { processed: 0, .. }
    ));

    // Audit entry for the source that actually synced
    assert_eq!(store.audit_entries().len(), 1);
    assert_eq!(store.audit_entries()[0].actor, "admin");

    // last_sync written back for the synced source only
    assert!(sources[0].last_sync.is_some());
    assert!(sources[1].last_sync.is_none());
}

#[test]
fn media_root_resolution_keeps_sources_relative() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
    let file = write_upload(
        &dir,
        "uploads/events.csv",
        "disaster_type,location_name\nflood,Venice\n",
    );
    assert_eq!(PathBuf::from(&file), PathBuf::from("uploads/events.csv"));

    let manager = manager_for(&dir);
    let mut source = DataSource::new("uploads", SourceType::Csv, file);
    let mut store = MemoryStore::new();

    let outcome = manager.sync_data_source(&mut source, &mut store, None);
    assert_eq!(outcome.records_processed, 1);
}
