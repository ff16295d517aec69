use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::Context;
use lockstep_core::prelude::{offset_secs, Marker, WaitDiscipline, WaitOutcome};
use lockstep_dispatch::prelude::Dispatcher;
use tokio::process::Child;
use tokio::time::Instant;

use crate::config::WrapConfig;

/// Runs one command and marks its lifetime.
///
/// Unlike the [crate::scheduler::PhaseScheduler] the total duration is unknown up front, so
/// periodic markers are only sent while the child is observed to be alive. The child is polled
/// with a non-blocking status check between wait steps.
pub struct WorkloadWrapper<'a> {
    config: &'a WrapConfig,
    dispatcher: &'a Dispatcher,
    wait: WaitDiscipline,
}

impl<'a> WorkloadWrapper<'a> {
    pub fn new(config: &'a WrapConfig, dispatcher: &'a Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            wait: WaitDiscipline::new(config.poll),
        }
    }

    /// Launch the command, emit its markers and return its exit status.
    ///
    /// A non-zero exit status is returned as is, not treated as an error. Only failing to start
    /// or to wait for the command is.
    pub async fn run_with_markers(&self) -> anyhow::Result<ExitStatus> {
        let tag = &self.config.tag;
        if self.config.send_start_end {
            self.dispatcher
                .send_marker(Marker::new(format!("{tag}_start")).with_offset(Duration::ZERO))
                .await;
        }

        let (program, args) = self
            .config
            .command
            .split_first()
            .context("No command to wrap")?;
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            // If the wrapper is interrupted the command goes down with it.
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to launch '{program}'"))?;
        let launched = Instant::now();
        log::info!(
            "Launched '{}' with PID {}",
            self.config.command.join(" "),
            child.id().map(|pid| pid.to_string()).unwrap_or_default()
        );

        if let Some(interval) = self.config.interval {
            let sent = self.mark_while_alive(&mut child, launched, interval).await;
            log::debug!("Sent {sent} periodic markers");
        }

        let status = child
            .wait()
            .await
            .context("Failed to wait for the wrapped command")?;
        let elapsed = launched.elapsed();
        if status.success() {
            log::info!("Command finished after {}s", offset_secs(elapsed));
        } else {
            log::warn!("Command exited with {status} after {}s", offset_secs(elapsed));
        }

        if self.config.send_start_end {
            self.dispatcher
                .send_marker(Marker::new(format!("{tag}_end")).with_offset(elapsed))
                .await;
        }

        Ok(status)
    }

    /// Send `<tag>_t<elapsed>` at every multiple of `interval` since launch for as long as the
    /// child is running. Returns how many were sent.
    async fn mark_while_alive(
        &self,
        child: &mut Child,
        launched: Instant,
        interval: Duration,
    ) -> usize {
        let mut sent = 0;
        let mut offset = Duration::ZERO;

        loop {
            offset += interval;
            let outcome = self
                .wait
                .wait_until_or_stop(launched + offset, || has_exited(child))
                .await;

            // Still running at the target instant?
            if outcome == WaitOutcome::Stopped || has_exited(child) {
                break;
            }

            self.dispatcher
                .send_marker(
                    Marker::new(format!("{}_t{}", self.config.tag, offset_secs(offset)))
                        .with_offset(offset),
                )
                .await;
            sent += 1;
        }

        sent
    }
}

fn has_exited(child: &mut Child) -> bool {
    match child.try_wait() {
        Ok(Some(_)) => true,
        Ok(None) => false,
        Err(e) => {
            log::warn!("Could not check on the wrapped command, assuming it has exited: {e}");
            true
        }
    }
}

/// Exit code to report for the wrapped command. Death by signal maps to `128 + signal` as
/// shells do.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
