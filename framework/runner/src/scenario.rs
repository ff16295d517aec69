use std::time::Duration;

use crate::config::{seconds, ConfigError};

/// Periods of the standard experiment, in seconds.
pub const DEFAULT_PERIODS: [u64; 7] = [0, 20, 10, 5, 4, 2, 1];

/// Offsets in tags and the audit file have millisecond resolution, so shorter non-zero periods
/// would produce indistinguishable markers.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// One phase pattern of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    /// 1-based position in the configured list. Appears in marker tags as `f<index>`.
    pub index: usize,
    /// Time between periodic markers. Zero means the run only has start and end markers.
    pub period: Duration,
}

impl Scenario {
    /// Offsets of the periodic markers in a run of `duration`: every multiple of the period up to
    /// and including `duration`.
    pub fn periodic_offsets(&self, duration: Duration) -> Vec<Duration> {
        if self.period.is_zero() {
            return Vec::new();
        }

        std::iter::successors(Some(self.period), |offset| offset.checked_add(self.period))
            .take_while(|offset| *offset <= duration)
            .collect()
    }

    /// Number of markers a complete run dispatches: start, periodic markers and end.
    pub fn marker_count(&self, duration: Duration) -> usize {
        2 + self.periodic_offsets(duration).len()
    }
}

/// Parse a scenario list.
///
/// Accepts `default` (also `std` or `standard`), an inclusive integer range `start:end:step`, or
/// a comma separated list of seconds. Scenarios are numbered from 1 in the order given.
pub fn parse_scenarios(input: &str) -> Result<Vec<Scenario>, ConfigError> {
    let trimmed = input.trim();
    let invalid = |reason: String| ConfigError::ScenarioList {
        input: input.to_string(),
        reason,
    };

    let periods = if matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "default" | "std" | "standard"
    ) {
        DEFAULT_PERIODS
            .iter()
            .map(|p| Duration::from_secs(*p))
            .collect::<Vec<_>>()
    } else if trimmed.contains(':') {
        parse_range(trimmed).map_err(invalid)?
    } else {
        trimmed
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let value = part
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("'{part}' is not a number")))?;
                let period = seconds("scenario period", value)?;
                if !period.is_zero() && period < MIN_PERIOD {
                    return Err(invalid(format!("period '{part}' is shorter than 1 ms")));
                }
                Ok(period)
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    if periods.is_empty() {
        return Err(invalid("no scenarios given".to_string()));
    }

    Ok(periods
        .into_iter()
        .enumerate()
        .map(|(i, period)| Scenario {
            index: i + 1,
            period,
        })
        .collect())
}

fn parse_range(range: &str) -> Result<Vec<Duration>, String> {
    let parts = range
        .split(':')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| format!("'{part}' is not a whole number of seconds"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [start, end, step] = parts[..] else {
        return Err("a range needs the form start:end:step".to_string());
    };
    if step == 0 {
        return Err("range step must be greater than zero".to_string());
    }
    if start > end {
        return Err(format!("range start {start} is after its end {end}"));
    }

    Ok((start..=end)
        .step_by(step as usize)
        .map(Duration::from_secs)
        .collect())
}
