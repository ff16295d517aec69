use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// The closed set of ways a marker can reach the remote data logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// POST a JSON message to the logger's HTTP API.
    HttpJson,
    /// Run an external helper program, falling back to [TransportKind::HttpJson] when it fails.
    ExternalScript,
    /// Append to a local file, for fully offline runs.
    File,
}

impl TransportKind {
    pub const ALL: [TransportKind; 3] = [
        TransportKind::HttpJson,
        TransportKind::ExternalScript,
        TransportKind::File,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::HttpJson => "http_json",
            TransportKind::ExternalScript => "external_script",
            TransportKind::File => "file",
        }
    }
}

impl Display for TransportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown marker transport '{0}', expected one of: http_json, external_script, file")]
pub struct UnknownTransportError(pub String);

impl FromStr for TransportKind {
    type Err = UnknownTransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TransportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTransportError(s.to_string()))
    }
}

/// Everything the dispatcher needs to know, fixed for the lifetime of an experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub method: TransportKind,
    /// `host:port` of the data logger.
    pub remote_address: String,
    /// Logger channel the markers belong to, e.g. `CH1`.
    pub channel: String,
    /// Target of the [TransportKind::File] transport.
    pub marker_log: PathBuf,
    /// Where every dispatched marker is recorded, whatever the transport did.
    pub audit_csv: PathBuf,
    /// Program run by the [TransportKind::ExternalScript] transport.
    pub helper: PathBuf,
    /// Upper bound on a single delivery attempt.
    pub timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            method: TransportKind::HttpJson,
            remote_address: "127.0.0.1:8080".to_string(),
            channel: "CH1".to_string(),
            marker_log: PathBuf::from("markers.log"),
            audit_csv: PathBuf::from("markers_audit.csv"),
            helper: PathBuf::from("send_marker.sh"),
            timeout: Duration::from_secs(2),
        }
    }
}
