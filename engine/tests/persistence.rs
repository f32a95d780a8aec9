//! Tests that go through the file-backed local store.

use std::sync::Arc;

use chrono::NaiveDate;
use curtain_engine::activity::{from_record, to_payload};
use curtain_engine::{
    archive_season, Activity, ActivityKind, ActivityReport, CollectionKey, FileLocalStore,
    LocalSnapshot, MemoryRemoteStore, SeasonArchive, Season, SyncConfig, SyncCoordinator,
};
use serde_json::json;

fn open(dir: &std::path::Path, remote: Arc<MemoryRemoteStore>, online: bool) -> SyncCoordinator {
    let local = FileLocalStore::open(dir).unwrap();
    SyncCoordinator::new(
        Arc::new(local),
        remote,
        SyncConfig::default().with_start_online(online),
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn pending_records_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());

    let first = open(dir.path(), remote.clone(), false);
    let temp_id = first
        .save("activities", json!({"title": "Before restart"}))
        .await
        .unwrap();
    drop(first);

    let second = open(dir.path(), remote.clone(), false);
    let records = second.records("activities").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, temp_id);
    assert!(records[0].needs_sync);

    second.update_online_status(true).await;
    let records = second.records("activities").unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_temp());
    assert_eq!(remote.len("activities"), 1);
}

#[tokio::test]
async fn corrupt_collection_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("activities.json"), "{not json").unwrap();

    let coordinator = open(dir.path(), Arc::new(MemoryRemoteStore::new()), false);
    assert!(coordinator.records("activities").unwrap().is_empty());

    coordinator
        .save("activities", json!({"title": "Fresh start"}))
        .await
        .unwrap();
    assert_eq!(coordinator.records("activities").unwrap().len(), 1);
}

#[tokio::test]
async fn snapshot_moves_between_devices() {
    let source_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();

    let source = open(source_dir.path(), Arc::new(MemoryRemoteStore::new()), false);
    source
        .save("activities", json!({"title": "Offline note"}))
        .await
        .unwrap();
    let json = source.export_local().unwrap().to_json_pretty().unwrap();

    let target = open(target_dir.path(), Arc::new(MemoryRemoteStore::new()), false);
    target
        .import_local(&LocalSnapshot::from_json(&json).unwrap())
        .unwrap();

    assert_eq!(target.records("activities").unwrap().len(), 1);
    assert_eq!(target.sync_status().pending_uploads, 1);
}

#[tokio::test]
async fn archive_a_season() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());
    let coordinator = open(dir.path(), remote.clone(), true);

    let activity = Activity::new("Macbeth, read-through", date(2025, 10, 6))
        .with_kind(ActivityKind::Rehearsal)
        .with_participants(22);
    let activity_id = coordinator
        .save(
            CollectionKey::Activities.as_str(),
            to_payload(&activity).unwrap(),
        )
        .await
        .unwrap();

    let report = ActivityReport::new("Macbeth, read-through", date(2025, 10, 6))
        .for_activity(activity_id.clone())
        .with_narrative("Everyone had their lines.")
        .with_participants(20);
    coordinator
        .save(
            CollectionKey::ActivityReports.as_str(),
            to_payload(&report).unwrap(),
        )
        .await
        .unwrap();

    let archive_id = archive_season(&coordinator, Season::new(2025)).await.unwrap();
    assert!(!archive_id.starts_with("temp_"));

    let archives = coordinator
        .records(CollectionKey::SeasonArchives.as_str())
        .unwrap();
    assert_eq!(archives.len(), 1);

    let archive: SeasonArchive = from_record(&archives[0]).unwrap();
    assert_eq!(archive.season, Season::new(2025));
    assert_eq!(archive.summary.planned_participants, 22);
    assert_eq!(archive.summary.actual_participants, 20);
    assert_eq!(archive.activities[0].record_id, activity_id);
    assert_eq!(remote.len("season-archives"), 1);
}
