use std::path::PathBuf;
use std::time::Duration;

use lockstep_dispatch::prelude::{DispatchConfig, TransportKind, UnknownTransportError};

use crate::cli::{DispatchArgs, LockstepCli, LockstepCommand, ScheduleArgs, WrapArgs};
use crate::scenario::{parse_scenarios, Scenario, MIN_PERIOD};

/// Problems with the configuration. All of them are raised before any timing begins.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    UnknownTransport(#[from] UnknownTransportError),
    #[error("invalid scenario list '{input}': {reason}")]
    ScenarioList { input: String, reason: String },
    #[error("invalid {name} '{value}', expected a non-negative number of seconds")]
    Seconds { name: &'static str, value: f64 },
    #[error("repeat count must be at least 1")]
    NoRepeats,
    #[error("phase duration must be greater than zero")]
    ZeroDuration,
    #[error("{name} must be greater than zero")]
    ZeroInterval { name: &'static str },
    #[error("{name} must be at least 1 ms")]
    BelowResolution { name: &'static str },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

/// Convert user supplied seconds into a [Duration], rejecting negatives and non-finite values.
pub(crate) fn seconds(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::Seconds { name, value })
}

/// The whole experiment, validated once at startup and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub dispatch: DispatchConfig,
    pub mode: ExperimentMode,
    pub run_summary: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentMode {
    Schedule(ScheduleConfig),
    Wrap(WrapConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub scenarios: Vec<Scenario>,
    pub repeats: u32,
    pub duration: Duration,
    pub cooldown: Duration,
    pub dry_run: bool,
    pub show_progress: bool,
}

impl ScheduleConfig {
    /// Every run of the schedule in execution order, as `(repeat, scenario)`: all scenarios of
    /// repeat 1 by ascending index, then repeat 2, and so on.
    pub fn runs(&self) -> impl Iterator<Item = (u32, &Scenario)> + '_ {
        (1..=self.repeats).flat_map(move |repeat| {
            self.scenarios
                .iter()
                .map(move |scenario| (repeat, scenario))
        })
    }

    pub fn run_count(&self) -> usize {
        self.repeats as usize * self.scenarios.len()
    }

    /// Wall-clock time the schedule takes if nothing overruns.
    pub fn planned_runtime(&self) -> Duration {
        let runs = self.run_count() as u32;
        self.duration * runs + self.cooldown * runs.saturating_sub(1)
    }

    /// Audit rows produced by a complete schedule.
    pub fn planned_markers(&self) -> usize {
        let per_repeat = self
            .scenarios
            .iter()
            .map(|scenario| scenario.marker_count(self.duration))
            .sum::<usize>();
        per_repeat * self.repeats as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrapConfig {
    /// Program followed by its arguments.
    pub command: Vec<String>,
    pub interval: Option<Duration>,
    pub tag: String,
    pub send_start_end: bool,
    /// Longest gap between two checks on the child while waiting.
    pub poll: Duration,
}

impl TryFrom<&LockstepCli> for ExperimentConfig {
    type Error = ConfigError;

    fn try_from(cli: &LockstepCli) -> Result<Self, Self::Error> {
        let mode = match &cli.command {
            LockstepCommand::Schedule(args) => ExperimentMode::Schedule(args.try_into()?),
            LockstepCommand::Wrap(args) => ExperimentMode::Wrap(args.try_into()?),
        };

        Ok(Self {
            dispatch: (&cli.dispatch).try_into()?,
            mode,
            run_summary: cli.run_summary.clone(),
        })
    }
}

impl TryFrom<&DispatchArgs> for DispatchConfig {
    type Error = ConfigError;

    fn try_from(args: &DispatchArgs) -> Result<Self, Self::Error> {
        let method = args.marker_method.parse::<TransportKind>()?;

        if args.logger_addr.trim().is_empty() && method != TransportKind::File {
            return Err(ConfigError::Empty {
                name: "logger address",
            });
        }
        if args.channel.trim().is_empty() {
            return Err(ConfigError::Empty { name: "channel" });
        }

        let timeout = seconds("marker timeout", args.marker_timeout)?;
        if timeout.is_zero() {
            return Err(ConfigError::ZeroInterval {
                name: "marker timeout",
            });
        }

        Ok(DispatchConfig {
            method,
            remote_address: args.logger_addr.trim().to_string(),
            channel: args.channel.trim().to_string(),
            marker_log: args.marker_log.clone(),
            audit_csv: args.audit_csv.clone(),
            helper: args.marker_helper.clone(),
            timeout,
        })
    }
}

impl TryFrom<&ScheduleArgs> for ScheduleConfig {
    type Error = ConfigError;

    fn try_from(args: &ScheduleArgs) -> Result<Self, Self::Error> {
        if args.repeats == 0 {
            return Err(ConfigError::NoRepeats);
        }

        let duration = seconds("phase duration", args.duration)?;
        if duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }

        Ok(ScheduleConfig {
            scenarios: parse_scenarios(&args.periods)?,
            repeats: args.repeats,
            duration,
            cooldown: seconds("cooldown", args.cooldown)?,
            dry_run: args.dry_run,
            show_progress: !args.no_progress,
        })
    }
}

impl TryFrom<&WrapArgs> for WrapConfig {
    type Error = ConfigError;

    fn try_from(args: &WrapArgs) -> Result<Self, Self::Error> {
        if args.command.is_empty() || args.command[0].trim().is_empty() {
            return Err(ConfigError::Empty { name: "command" });
        }
        if args.tag.trim().is_empty() {
            return Err(ConfigError::Empty { name: "marker tag" });
        }

        let interval = args
            .interval
            .map(|interval| seconds("marker interval", interval))
            .transpose()?;
        if interval.is_some_and(|interval| interval.is_zero()) {
            return Err(ConfigError::ZeroInterval {
                name: "marker interval",
            });
        }
        if interval.is_some_and(|interval| interval < MIN_PERIOD) {
            return Err(ConfigError::BelowResolution {
                name: "marker interval",
            });
        }
        if args.poll_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                name: "poll interval",
            });
        }

        Ok(WrapConfig {
            command: args.command.clone(),
            interval,
            tag: args.tag.trim().to_string(),
            send_start_end: !args.no_start_end,
            poll: Duration::from_millis(args.poll_ms),
        })
    }
}
