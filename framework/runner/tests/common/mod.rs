#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use lockstep_dispatch::prelude::{read_audit_records, AuditRecord, DispatchConfig, TransportKind};

/// Dispatch through the `file` transport into `dir`, nothing leaves the machine.
pub fn file_dispatch_config(dir: &Path) -> DispatchConfig {
    DispatchConfig {
        method: TransportKind::File,
        remote_address: "127.0.0.1:9".to_string(),
        channel: "CH1".to_string(),
        marker_log: dir.join("markers.log"),
        audit_csv: dir.join("markers_audit.csv"),
        helper: dir.join("send_marker.sh"),
        timeout: Duration::from_secs(1),
    }
}

pub fn audit_rows(config: &DispatchConfig) -> Vec<AuditRecord> {
    read_audit_records(&config.audit_csv).unwrap()
}

pub fn audit_tags(config: &DispatchConfig) -> Vec<String> {
    audit_rows(config).into_iter().map(|row| row.tag).collect()
}
