//! Appends and rotation racing on the same log.

use crate::helpers::{default_levels, expected_columns, sample_reading};
use chrono::NaiveDate;
use occupancy::guard::LogGuard;
use occupancy::log_writer::LogWriter;
use occupancy::rotator::{LogRotator, RotationOutcome};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const APPENDS: u32 = 64;

/// Every line has the full column count; only line 0 is a header.
fn assert_well_formed(path: &Path) -> usize {
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.ends_with('\n'), "{} ends mid-row", path.display());
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines[0].starts_with("timestamp,"), "{} has no header", path.display());
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line.split(',').count(), expected_columns(), "line {i}: {line}");
        if i > 0 {
            assert!(!line.starts_with("timestamp"), "repeated header at line {i}");
        }
    }
    lines.len() - 1
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rotation_never_splits_or_loses_rows() {
    let dir = tempfile::tempdir().unwrap();
    let active = dir.path().join("occupancy.csv");
    let guard = LogGuard::new();
    let writer = Arc::new(LogWriter::new(&active, default_levels(), guard.clone()));
    let rotator = LogRotator::new(&active, guard);
    let cancel = CancellationToken::new();
    let date = NaiveDate::from_ymd_opt(2025, 5, 19).unwrap();

    // Seed the file so rotation has something to move.
    writer.append(&sample_reading(0), &cancel).await.unwrap();

    let mut tasks = Vec::new();
    for i in 1..=APPENDS {
        let writer = Arc::clone(&writer);
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            writer.append(&sample_reading(i), &cancel).await.unwrap();
        }));
    }
    let outcome = rotator.rotate_on(date, &cancel).await.unwrap();
    for task in tasks {
        task.await.unwrap();
    }

    let archived = dir.path().join("occupancy_2025-05-19.csv");
    assert_eq!(outcome, RotationOutcome::Rotated(archived.clone()));

    let archived_rows = assert_well_formed(&archived);
    let active_rows = if active.exists() {
        assert_well_formed(&active)
    } else {
        0
    };
    assert_eq!(archived_rows + active_rows, APPENDS as usize + 1);
}

#[tokio::test]
async fn append_after_rotation_starts_fresh_file_with_header() {
    let dir = tempfile::tempdir().unwrap();
    let active = dir.path().join("occupancy.csv");
    let guard = LogGuard::new();
    let writer = LogWriter::new(&active, default_levels(), guard.clone());
    let rotator = LogRotator::new(&active, guard);
    let cancel = CancellationToken::new();

    writer.append(&sample_reading(1), &cancel).await.unwrap();
    writer.append(&sample_reading(2), &cancel).await.unwrap();
    let original = std::fs::read(&active).unwrap();

    let date = NaiveDate::from_ymd_opt(2025, 5, 26).unwrap();
    rotator.rotate_on(date, &cancel).await.unwrap();
    assert!(!active.exists());
    let archived = dir.path().join("occupancy_2025-05-26.csv");
    assert_eq!(std::fs::read(&archived).unwrap(), original);

    writer.append(&sample_reading(3), &cancel).await.unwrap();
    assert_eq!(assert_well_formed(&active), 1);
    assert_eq!(assert_well_formed(&archived), 2);
}

#[tokio::test]
async fn second_rotation_same_day_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let active = dir.path().join("occupancy.csv");
    let guard = LogGuard::new();
    let writer = LogWriter::new(&active, default_levels(), guard.clone());
    let rotator = LogRotator::new(&active, guard);
    let cancel = CancellationToken::new();
    let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

    writer.append(&sample_reading(1), &cancel).await.unwrap();
    rotator.rotate_on(date, &cancel).await.unwrap();
    writer.append(&sample_reading(2), &cancel).await.unwrap();
    let active_before = std::fs::read(&active).unwrap();

    let outcome = rotator.rotate_on(date, &cancel).await.unwrap();
    assert!(matches!(outcome, RotationOutcome::TargetExists(_)));
    assert_eq!(std::fs::read(&active).unwrap(), active_before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_appends_write_one_header() {
    for _ in 0..10 {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("logs").join("occupancy.csv");
        let writer = Arc::new(LogWriter::new(&active, default_levels(), LogGuard::new()));
        let cancel = CancellationToken::new();
        let start = Arc::new(tokio::sync::Barrier::new(APPENDS as usize));

        let mut tasks = Vec::new();
        for i in 0..APPENDS {
            let writer = Arc::clone(&writer);
            let cancel = cancel.clone();
            let start = Arc::clone(&start);
            tasks.push(tokio::spawn(async move {
                start.wait().await;
                writer.append(&sample_reading(i), &cancel).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let content = std::fs::read_to_string(&active).unwrap();
        let headers = content
            .lines()
            .filter(|l| l.starts_with("timestamp,"))
            .count();
        assert_eq!(headers, 1);
        assert_eq!(content.lines().count(), APPENDS as usize + 1);
        assert_eq!(assert_well_formed(&active), APPENDS as usize);
    }
}
