use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context;
use lockstep_core::prelude::Marker;
use serde::Deserialize;

/// Column order of the audit CSV.
pub const AUDIT_HEADER: [&str; 6] = [
    "ts_iso",
    "epoch_ms",
    "tag",
    "scenario",
    "repeat",
    "t_rel_sec",
];

/// One row of the audit CSV, as read back for analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuditRecord {
    pub ts_iso: String,
    pub epoch_ms: i64,
    pub tag: String,
    pub scenario: Option<usize>,
    pub repeat: Option<u32>,
    pub t_rel_sec: Option<f64>,
}

/// The local, append-only record of every marker the dispatcher attempted.
///
/// Each append opens the file, writes one row and closes it again, so the file on disk is
/// complete up to the last dispatched marker even if the process is killed. The header row is
/// written when the file is missing or empty.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, marker: &Marker) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit directory {}", parent.display())
                })?;
            }
        }

        let needs_header = std::fs::metadata(&self.path)
            .map(|metadata| metadata.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit file {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(AUDIT_HEADER)?;
        }
        writer.write_record(audit_row(marker))?;
        writer.flush()?;

        Ok(())
    }
}

fn audit_row(marker: &Marker) -> [String; 6] {
    [
        marker.ts_iso(),
        marker.epoch_ms().to_string(),
        marker.tag().to_string(),
        marker.scenario().map(|s| s.to_string()).unwrap_or_default(),
        marker.repeat().map(|r| r.to_string()).unwrap_or_default(),
        marker.t_rel_sec().map(|t| t.to_string()).unwrap_or_default(),
    ]
}

/// Load an audit CSV back into memory.
pub fn read_audit_records(path: &Path) -> anyhow::Result<Vec<AuditRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open audit file {}", path.display()))?;

    let headers = reader.headers()?.clone();
    if headers.iter().ne(AUDIT_HEADER) {
        anyhow::bail!(
            "Unexpected audit header in {}: {:?}",
            path.display(),
            headers
        );
    }

    reader
        .deserialize()
        .collect::<Result<Vec<AuditRecord>, _>>()
        .with_context(|| format!("Failed to parse audit file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn header_is_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.csv");

        AuditLog::new(&path).append(&Marker::new("a")).unwrap();
        // A second log over the same file appends below the existing rows.
        AuditLog::new(&path).append(&Marker::new("b")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ts_iso,epoch_ms,tag,scenario,repeat,t_rel_sec");
        assert!(lines[1].contains(",a,"));
        assert!(lines[2].contains(",b,"));
    }

    #[test]
    fn missing_fields_are_empty_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.csv");
        let marker = Marker::new("bare");

        AuditLog::new(&path).append(&marker).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert_eq!(row, format!("{},{},bare,,,", marker.ts_iso(), marker.epoch_ms()));
    }

    #[test]
    fn rows_read_back_with_run_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("audit.csv");
        let log = AuditLog::new(&path);

        let marker = Marker::new("t20_f2_r1")
            .with_scenario(2)
            .with_repeat(1)
            .with_offset(Duration::from_secs(20));
        log.append(&marker).unwrap();
        log.append(&Marker::new("note")).unwrap();

        let records = read_audit_records(&path).unwrap();
        assert_eq!(
            records,
            vec![
                AuditRecord {
                    ts_iso: marker.ts_iso(),
                    epoch_ms: marker.epoch_ms(),
                    tag: "t20_f2_r1".to_string(),
                    scenario: Some(2),
                    repeat: Some(1),
                    t_rel_sec: Some(20.0),
                },
                AuditRecord {
                    ts_iso: records[1].ts_iso.clone(),
                    epoch_ms: records[1].epoch_ms,
                    tag: "note".to_string(),
                    scenario: None,
                    repeat: None,
                    t_rel_sec: None,
                },
            ]
        );
    }

    #[test]
    fn tags_with_commas_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.csv");

        AuditLog::new(&path)
            .append(&Marker::new("load 50%, 4 workers"))
            .unwrap();

        let records = read_audit_records(&path).unwrap();
        assert_eq!(records[0].tag, "load 50%, 4 workers");
    }

    #[test]
    fn foreign_csv_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("energy.csv");
        std::fs::write(&path, "Timestamp (ISO ms),Voltage (V)\n").unwrap();

        assert!(read_audit_records(&path).is_err());
    }
}
