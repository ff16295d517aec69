use std::process::ExitStatus;

use anyhow::Context;
use lockstep_core::prelude::{offset_secs, ShutdownSignalError};
use lockstep_dispatch::prelude::Dispatcher;
use lockstep_summary_model::{append_run_summary, RunMode, RunSummary};

use crate::config::{ExperimentConfig, ExperimentMode, ScheduleConfig, WrapConfig};
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::scheduler::{plan_run, PhaseScheduler};
use crate::shutdown::start_shutdown_listener;
use crate::types::LockstepResult;
use crate::wrapper::{exit_code, WorkloadWrapper};

/// Exit code reported when the experiment is stopped by Ctrl-C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Run the configured experiment to completion and return the process exit code.
///
/// Marker delivery problems never fail the experiment, they are counted and logged. An error is
/// only returned when the experiment cannot run at all, e.g. the runtime cannot be created or
/// the wrapped command cannot be started.
pub fn run(config: &ExperimentConfig) -> LockstepResult<i32> {
    if let ExperimentMode::Schedule(schedule) = &config.mode {
        if schedule.dry_run {
            print_plan(schedule);
            return Ok(0);
        }
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);
    let executor = Executor::new(runtime, shutdown_handle.clone());

    let dispatcher = Dispatcher::from_config(&config.dispatch)?;
    let mut summary = RunSummary::new(
        nanoid::nanoid!(),
        chrono::Utc::now().timestamp(),
        run_mode(&config.mode),
        dispatcher.transport_kind().to_string(),
        dispatcher.audit().path().display().to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    log::info!(
        "Starting run {} with the {} transport, auditing to {}",
        summary.run_id,
        summary.transport,
        summary.audit_csv
    );

    // Started before any marker so that our own load shows up in the log from the beginning.
    start_monitor(shutdown_handle.new_listener()).context("Failed to start resource monitor")?;

    let outcome = match &config.mode {
        ExperimentMode::Schedule(schedule) => {
            if schedule.show_progress {
                start_progress(schedule.planned_runtime(), shutdown_handle.new_listener())
                    .context("Failed to start progress display")?;
            }
            executor
                .execute_in_place(async {
                    PhaseScheduler::new(schedule, &dispatcher).run().await;
                    Ok(None::<ExitStatus>)
                })
        }
        ExperimentMode::Wrap(wrap) => executor.execute_in_place(async {
            WorkloadWrapper::new(wrap, &dispatcher)
                .run_with_markers()
                .await
                .map(Some)
        }),
    };

    // Stops the progress and monitor threads.
    executor.shutdown_handle().shutdown();

    let stats = dispatcher.stats();
    summary.set_marker_counts(
        stats.dispatched as u64,
        stats.delivery_failures as u64,
        stats.audit_failures as u64,
    );

    let code = match outcome {
        Ok(status) => {
            let code = status.as_ref().map(exit_code).unwrap_or(0);
            if status.is_some() {
                summary.set_exit_code(code);
            }
            code
        }
        Err(e) if e.is::<ShutdownSignalError>() => {
            log::warn!(
                "Experiment interrupted after {} markers, the audit file {} holds every marker dispatched so far",
                stats.dispatched,
                summary.audit_csv
            );
            summary.set_interrupted(true);
            INTERRUPTED_EXIT_CODE
        }
        Err(e) => return Err(e),
    };

    if stats.delivery_failures > 0 {
        log::warn!(
            "{} of {} markers were not confirmed by the logger",
            stats.delivery_failures,
            stats.dispatched
        );
    }
    if stats.audit_failures > 0 {
        log::error!(
            "{} of {} markers are missing from the audit file",
            stats.audit_failures,
            stats.dispatched
        );
    }

    log::debug!("Run configuration fingerprint: {}", summary.fingerprint());
    if let Err(e) = append_run_summary(&summary, &config.run_summary) {
        log::error!(
            "Failed to write run summary to {}: {e:?}",
            config.run_summary.display()
        );
    }

    Ok(code)
}

fn run_mode(mode: &ExperimentMode) -> RunMode {
    match mode {
        ExperimentMode::Schedule(schedule) => RunMode::Schedule {
            periods: schedule
                .scenarios
                .iter()
                .map(|scenario| scenario.period.as_secs_f64())
                .collect(),
            repeats: schedule.repeats,
            duration_s: schedule.duration.as_secs_f64(),
            cooldown_s: schedule.cooldown.as_secs_f64(),
        },
        ExperimentMode::Wrap(WrapConfig {
            command,
            interval,
            tag,
            ..
        }) => RunMode::Wrap {
            command: command.clone(),
            interval_s: interval.map(|interval| interval.as_secs_f64()),
            tag: tag.clone(),
        },
    }
}

fn print_plan(schedule: &ScheduleConfig) {
    for (repeat, scenario) in schedule.runs() {
        println!(
            "# scenario f{} (period {}s), repeat {repeat}",
            scenario.index,
            offset_secs(scenario.period)
        );
        for planned in plan_run(scenario, repeat, schedule.duration) {
            println!("{:>10}s  {}", offset_secs(planned.offset), planned.tag);
        }
    }

    println!(
        "# {} runs, {} markers, about {}s",
        schedule.run_count(),
        schedule.planned_markers(),
        schedule.planned_runtime().as_secs()
    );
}
