use std::fmt::{Display, Formatter};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

/// A synchronization event for the remote data logger.
///
/// The capture timestamp is taken when the marker is created, which is the moment it is handed to
/// the dispatcher. The optional fields identify which run the marker belongs to and where in that
/// run it falls, so that the logger's captured signal can be lined up with the schedule later.
///
/// Markers are immutable. A failed delivery is recorded, never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    tag: String,
    scenario: Option<usize>,
    repeat: Option<u32>,
    offset: Option<Duration>,
    captured_at: DateTime<Utc>,
}

impl Marker {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            scenario: None,
            repeat: None,
            offset: None,
            captured_at: Utc::now(),
        }
    }

    pub fn with_scenario(mut self, scenario: usize) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = Some(repeat);
        self
    }

    /// Offset of this marker from the start of its run.
    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn scenario(&self) -> Option<usize> {
        self.scenario
    }

    pub fn repeat(&self) -> Option<u32> {
        self.repeat
    }

    pub fn offset(&self) -> Option<Duration> {
        self.offset
    }

    /// The offset in seconds, at millisecond resolution.
    pub fn t_rel_sec(&self) -> Option<f64> {
        self.offset.map(offset_secs)
    }

    /// Capture time as UTC ISO-8601 with millisecond precision, e.g. `2026-10-19T08:30:00.125Z`.
    pub fn ts_iso(&self) -> String {
        self.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn epoch_ms(&self) -> i64 {
        self.captured_at.timestamp_millis()
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag)?;
        if let Some(t_rel_sec) = self.t_rel_sec() {
            write!(f, " @ {t_rel_sec}s")?;
        }
        Ok(())
    }
}

/// Seconds with millisecond resolution. Whole seconds print without a fraction (`20`, not `20.0`).
pub fn offset_secs(offset: Duration) -> f64 {
    offset.as_millis() as f64 / 1000.0
}
