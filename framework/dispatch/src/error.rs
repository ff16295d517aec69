use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Outcome of one delivery attempt.
///
/// The dispatcher logs and discards it. It never reaches the scheduler.
pub type DeliveryResult = Result<(), DeliveryError>;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("logger at {url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("marker helper '{}' was not found or is not executable", path.display())]
    HelperMissing { path: PathBuf },
    #[error("marker helper '{}' could not be started: {source}", path.display())]
    HelperSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("marker helper '{}' exited with {status}", path.display())]
    HelperStatus { path: PathBuf, status: ExitStatus },
    #[error("marker helper '{}' did not finish within {timeout:?}", path.display())]
    HelperTimeout { path: PathBuf, timeout: Duration },
    #[error("{helper}, and the HTTP fallback failed too: {http}")]
    Fallback {
        helper: Box<DeliveryError>,
        http: Box<DeliveryError>,
    },
    #[error("could not append to marker log '{}': {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
