use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(about, version, long_about = None)]
pub struct LockstepCli {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// File that a one line JSON summary of the experiment is appended to.
    #[arg(long, env = "LOCKSTEP_RUN_SUMMARY", default_value = "run_summary.jsonl", global = true)]
    pub run_summary: PathBuf,

    #[command(subcommand)]
    pub command: LockstepCommand,
}

#[derive(Subcommand, Debug)]
pub enum LockstepCommand {
    /// Step through every scenario for the configured number of repeats, emitting start, periodic
    /// and end markers at fixed offsets into each run.
    Schedule(ScheduleArgs),
    /// Run a command and emit markers while it is alive.
    ///
    /// Everything after `--` is the command, for example `lockstep wrap --interval 5 -- stress-ng
    /// --cpu 4 -t 60s`.
    Wrap(WrapArgs),
}

/// Where and how markers are sent.
#[derive(Args, Debug, Clone)]
pub struct DispatchArgs {
    /// `host:port` of the remote data logger.
    #[arg(long, env = "LOGGER_ADDR", default_value = "127.0.0.1:8080", global = true)]
    pub logger_addr: String,

    /// Logger channel that markers are attached to.
    #[arg(long, env = "LOGGER_CHANNEL", default_value = "CH1", global = true)]
    pub channel: String,

    /// How markers reach the logger: `http_json`, `external_script` or `file`.
    #[arg(long, env = "MARKER_METHOD", default_value = "http_json", global = true)]
    pub marker_method: String,

    /// Log file written by the `file` transport.
    #[arg(long, env = "MARKER_LOG", default_value = "markers.log", global = true)]
    pub marker_log: PathBuf,

    /// CSV recording every dispatched marker, whatever the transport outcome.
    #[arg(long, env = "MARKER_AUDIT_CSV", default_value = "markers_audit.csv", global = true)]
    pub audit_csv: PathBuf,

    /// Helper program for the `external_script` transport, called as
    /// `<helper> <host:port> <channel> <message>`.
    #[arg(long, env = "MARKER_HELPER", default_value = "send_marker.sh", global = true)]
    pub marker_helper: PathBuf,

    /// Seconds a single delivery attempt may take.
    #[arg(long, env = "MARKER_TIMEOUT", default_value = "2", global = true)]
    pub marker_timeout: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// Periodic marker interval of each scenario, in seconds, 0 for none.
    ///
    /// Either a comma separated list (`0,20,10`), an inclusive range `start:end:step`
    /// (`0:100:10`), or `default` for `0,20,10,5,4,2,1`.
    #[arg(long, env = "SCENARIO_PERIODS", default_value = "default")]
    pub periods: String,

    /// How many times the full list of scenarios is run.
    #[arg(long, env = "REPEATS", default_value = "3")]
    pub repeats: u32,

    /// Length of every run in seconds. The end marker is sent at this offset.
    #[arg(long, env = "PHASE_DURATION", default_value = "81")]
    pub duration: f64,

    /// Pause between runs in seconds.
    #[arg(long, env = "COOLDOWN", default_value = "0")]
    pub cooldown: f64,

    /// Print the planned markers and exit without waiting or dispatching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not show a progress bar.
    ///
    /// Recommended when the output is captured to a file rather than watched.
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WrapArgs {
    /// Emit a periodic marker every this many seconds while the command runs.
    #[arg(long, env = "MARK_INTERVAL")]
    pub interval: Option<f64>,

    /// Base tag of the wrapper's markers, e.g. `<tag>_start`.
    #[arg(long, env = "MARK_TAG", default_value = "workload")]
    pub tag: String,

    /// Do not send the `<tag>_start` and `<tag>_end` markers.
    #[arg(long, env = "NO_START_END", value_parser = BoolishValueParser::new())]
    pub no_start_end: bool,

    /// Milliseconds between checks on whether the command is still running.
    #[arg(long, default_value = "200")]
    pub poll_ms: u64,

    /// The command to run, with its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}
