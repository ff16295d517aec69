use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Summary of one lockstep invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each invocation.
    pub run_id: String,
    /// The time the experiment started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// What was run and how it was configured
    pub mode: RunMode,
    /// The transport markers were delivered with, e.g. `http_json`
    pub transport: String,
    /// The audit CSV the markers were recorded in
    pub audit_csv: String,
    /// The number of markers handed to the dispatcher
    ///
    /// Every one of these should have an audit row unless [RunSummary::audit_failures] says
    /// otherwise.
    pub markers_dispatched: u64,
    /// The number of markers the remote logger did not confirm
    pub delivery_failures: u64,
    /// The number of markers that could not be written to the audit CSV
    pub audit_failures: u64,
    /// Whether the experiment was stopped by a shutdown signal before it completed
    pub interrupted: bool,
    /// The exit code of the wrapped command
    ///
    /// Only set in wrap mode, and only if the command ran to completion.
    pub exit_code: Option<i32>,
    /// The version of Lockstep that was used for this run
    pub lockstep_version: String,
}

/// The experiment configuration recorded in a [RunSummary]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunMode {
    /// A phase schedule
    Schedule {
        /// Periodic marker interval of each scenario in seconds, in scenario order
        periods: Vec<f64>,
        repeats: u32,
        duration_s: f64,
        cooldown_s: f64,
    },
    /// A wrapped command
    Wrap {
        command: Vec<String>,
        interval_s: Option<f64>,
        tag: String,
    },
}

impl RunSummary {
    /// Create a new run summary with no markers counted yet
    pub fn new(
        run_id: String,
        started_at: i64,
        mode: RunMode,
        transport: String,
        audit_csv: String,
        lockstep_version: String,
    ) -> Self {
        Self {
            run_id,
            started_at,
            mode,
            transport,
            audit_csv,
            markers_dispatched: 0,
            delivery_failures: 0,
            audit_failures: 0,
            interrupted: false,
            exit_code: None,
            lockstep_version,
        }
    }

    /// Record the marker counters at the end of the run
    pub fn set_marker_counts(
        &mut self,
        markers_dispatched: u64,
        delivery_failures: u64,
        audit_failures: u64,
    ) {
        self.markers_dispatched = markers_dispatched;
        self.delivery_failures = delivery_failures;
        self.audit_failures = audit_failures;
    }

    pub fn set_interrupted(&mut self, interrupted: bool) {
        self.interrupted = interrupted;
    }

    pub fn set_exit_code(&mut self, exit_code: i32) {
        self.exit_code = Some(exit_code);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to identify the configuration of the experiment, so that runs
    /// with identical settings can be grouped. It uses the
    ///     - Mode and its settings
    ///     - Transport
    ///     - Lockstep version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        match &self.mode {
            RunMode::Schedule {
                periods,
                repeats,
                duration_s,
                cooldown_s,
            } => {
                Digest::update(&mut hasher, b"schedule");
                Digest::update(
                    &mut hasher,
                    periods.iter().map(|p| p.to_string()).join(",").as_bytes(),
                );
                Digest::update(&mut hasher, repeats.to_le_bytes());
                Digest::update(&mut hasher, duration_s.to_le_bytes());
                Digest::update(&mut hasher, cooldown_s.to_le_bytes());
            }
            RunMode::Wrap {
                command,
                interval_s,
                tag,
            } => {
                Digest::update(&mut hasher, b"wrap");
                command.iter().for_each(|arg| {
                    Digest::update(&mut hasher, arg.as_bytes());
                    Digest::update(&mut hasher, [0u8]);
                });
                if let Some(interval_s) = interval_s {
                    Digest::update(&mut hasher, interval_s.to_le_bytes());
                }
                Digest::update(&mut hasher, tag.as_bytes());
            }
        }
        Digest::update(&mut hasher, self.transport.as_bytes());
        Digest::update(&mut hasher, self.lockstep_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary]. Blank lines are skipped.
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}
