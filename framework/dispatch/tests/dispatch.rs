mod common;

use std::path::Path;
use std::time::Duration;

use lockstep_core::prelude::Marker;
use lockstep_dispatch::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::common::{spawn_logger, unreachable_address};

fn config_in(dir: &Path, method: TransportKind, remote_address: &str) -> DispatchConfig {
    DispatchConfig {
        method,
        remote_address: remote_address.to_string(),
        channel: "CH2".to_string(),
        marker_log: dir.join("markers.log"),
        audit_csv: dir.join("markers_audit.csv"),
        helper: dir.join("send_marker.sh"),
        timeout: Duration::from_secs(2),
    }
}

fn audit_tags(config: &DispatchConfig) -> Vec<String> {
    read_audit_records(&config.audit_csv)
        .unwrap()
        .into_iter()
        .map(|record| record.tag)
        .collect()
}

#[cfg(unix)]
fn write_helper(path: &Path, script: &str) {
    use std::os::unix::fs::PermissionsExt as _;

    std::fs::write(path, script).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn file_transport_appends_lines_and_audit_rows() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), TransportKind::File, "unused:0");
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    for tag in ["start_f1_r1", "t20_f1_r1", "end_f1_r1"] {
        dispatcher.send_marker(Marker::new(tag)).await;
    }

    let log = std::fs::read_to_string(&config.marker_log).unwrap();
    let lines = log.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with(" [CH2] start_f1_r1"), "{}", lines[0]);
    assert!(lines[2].ends_with(" [CH2] end_f1_r1"), "{}", lines[2]);

    assert_eq!(audit_tags(&config), vec!["start_f1_r1", "t20_f1_r1", "end_f1_r1"]);
    assert_eq!(
        dispatcher.stats(),
        DispatchStats {
            dispatched: 3,
            delivery_failures: 0,
            audit_failures: 0,
        }
    );
}

#[tokio::test]
async fn http_transport_posts_message_and_channel() {
    let dir = TempDir::new().unwrap();
    let (address, mut requests) = spawn_logger(200).await;
    let config = config_in(dir.path(), TransportKind::HttpJson, &address);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    dispatcher
        .send_marker(Marker::new("start_f2_r1").with_scenario(2).with_repeat(1))
        .await;

    let request = requests.recv().await.unwrap();
    assert!(request.head.starts_with("POST /api/log HTTP/1.1"), "{}", request.head);
    assert!(request
        .head
        .to_ascii_lowercase()
        .contains("content-type: application/json"));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&request.body).unwrap(),
        serde_json::json!({"message": "start_f2_r1", "channelId": "CH2"})
    );

    assert_eq!(dispatcher.stats().delivery_failures, 0);
    assert_eq!(audit_tags(&config), vec!["start_f2_r1"]);
}

#[tokio::test]
async fn http_error_status_counts_as_failure_but_is_audited() {
    let dir = TempDir::new().unwrap();
    let (address, _requests) = spawn_logger(500).await;
    let config = config_in(dir.path(), TransportKind::HttpJson, &address);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    dispatcher.send_marker(Marker::new("start_f1_r1")).await;

    assert_eq!(dispatcher.stats().delivery_failures, 1);
    assert_eq!(audit_tags(&config), vec!["start_f1_r1"]);
}

#[tokio::test]
async fn cancelled_delivery_is_already_audited() {
    // Accepts connections but never answers.
    let silent_logger = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dir = TempDir::new().unwrap();
    let mut config = config_in(
        dir.path(),
        TransportKind::HttpJson,
        &silent_logger.local_addr().unwrap().to_string(),
    );
    config.timeout = Duration::from_secs(30);
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(300),
        dispatcher.send_marker(Marker::new("t20_f1_r1")),
    )
    .await;

    assert!(cancelled.is_err());
    assert_eq!(dispatcher.stats().dispatched, 1);
    assert_eq!(audit_tags(&config), vec!["t20_f1_r1"]);
}

#[tokio::test]
async fn unreachable_logger_does_not_lose_the_audit_row() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), TransportKind::HttpJson, &unreachable_address());
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    dispatcher.send_marker(Marker::new("start_f1_r1")).await;
    dispatcher.send_marker(Marker::new("end_f1_r1")).await;

    assert_eq!(
        dispatcher.stats(),
        DispatchStats {
            dispatched: 2,
            delivery_failures: 2,
            audit_failures: 0,
        }
    );
    assert_eq!(audit_tags(&config), vec!["start_f1_r1", "end_f1_r1"]);
}

#[tokio::test]
async fn missing_helper_falls_back_to_http() {
    let dir = TempDir::new().unwrap();
    let (address, mut requests) = spawn_logger(200).await;
    let config = config_in(dir.path(), TransportKind::ExternalScript, &address);
    assert!(!config.helper.exists());
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    dispatcher.send_marker(Marker::new("start_f3_r2")).await;

    let request = requests.recv().await.unwrap();
    assert!(request.body.contains("start_f3_r2"));
    assert_eq!(dispatcher.stats().delivery_failures, 0);
    assert_eq!(audit_tags(&config), vec!["start_f3_r2"]);
}

#[tokio::test]
async fn missing_helper_and_unreachable_logger_still_audits_once() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), TransportKind::ExternalScript, &unreachable_address());
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    dispatcher.send_marker(Marker::new("start_f1_r1")).await;

    assert_eq!(dispatcher.stats().delivery_failures, 1);
    assert_eq!(audit_tags(&config), vec!["start_f1_r1"]);
}

#[cfg(unix)]
#[tokio::test]
async fn helper_receives_address_channel_and_message() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), TransportKind::ExternalScript, "10.0.0.7:8080");
    let args_file = dir.path().join("args.txt");
    write_helper(
        &config.helper,
        &format!("#!/bin/sh\necho \"$1|$2|$3\" >> '{}'\n", args_file.display()),
    );
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    dispatcher.send_marker(Marker::new("t20_f2_r1")).await;

    assert_eq!(
        std::fs::read_to_string(&args_file).unwrap(),
        "10.0.0.7:8080|CH2|t20_f2_r1\n"
    );
    assert_eq!(dispatcher.stats().delivery_failures, 0);
    assert_eq!(audit_tags(&config), vec!["t20_f2_r1"]);
}

#[cfg(unix)]
#[tokio::test]
async fn failing_helper_falls_back_to_http() {
    let dir = TempDir::new().unwrap();
    let (address, mut requests) = spawn_logger(200).await;
    let config = config_in(dir.path(), TransportKind::ExternalScript, &address);
    write_helper(&config.helper, "#!/bin/sh\nexit 3\n");
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    dispatcher.send_marker(Marker::new("end_f1_r1")).await;

    let request = requests.recv().await.unwrap();
    assert!(request.body.contains("end_f1_r1"));
    assert_eq!(dispatcher.stats().delivery_failures, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn hanging_helper_is_cut_off_by_the_timeout() {
    let dir = TempDir::new().unwrap();
    let (address, mut requests) = spawn_logger(200).await;
    let mut config = config_in(dir.path(), TransportKind::ExternalScript, &address);
    config.timeout = Duration::from_millis(300);
    write_helper(&config.helper, "#!/bin/sh\nsleep 30\n");
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    let started = std::time::Instant::now();
    dispatcher.send_marker(Marker::new("start_f1_r1")).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(requests.recv().await.unwrap().body.contains("start_f1_r1"));
    assert_eq!(audit_tags(&config), vec!["start_f1_r1"]);
}

#[test]
fn transport_follows_configuration() {
    let dir = TempDir::new().unwrap();
    for kind in TransportKind::ALL {
        let config = config_in(dir.path(), kind, "127.0.0.1:9");
        let transport = Transport::from_config(&config).unwrap();
        assert_eq!(transport.kind(), kind);
    }
}
