//! End-to-end: config -> scheduler -> first fetch lands in the log.

use crate::helpers::{expected_columns, fetch_config, occupancy_body};
use occupancy::scheduler::SchedulerState;
use occupancy::{CollectorConfig, build_scheduler};
use std::time::{Duration, Instant};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn first_tick_writes_header_and_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(occupancy_body()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = CollectorConfig::default();
    config.fetch = fetch_config(&server.uri());
    config.log.path = dir.path().join("logs").join("occupancy.csv");

    let mut scheduler = build_scheduler(&config).unwrap();
    scheduler.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut content = String::new();
    while Instant::now() < deadline {
        content = std::fs::read_to_string(&config.log.path).unwrap_or_default();
        if content.lines().count() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    scheduler.stop().await.unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "log was: {content}");
    assert_eq!(lines[1].split(',').count(), expected_columns());
}

#[test]
fn invalid_config_is_rejected_before_scheduling() {
    let mut config = CollectorConfig::default();
    config.rotation.minute = 60;
    assert!(build_scheduler(&config).is_err());
}
