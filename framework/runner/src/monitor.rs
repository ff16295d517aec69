use lockstep_core::prelude::ShutdownListener;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Share of the whole machine above which our own CPU usage is reported.
const HIGH_CPU_PERCENT: f32 = 10.0;

/// Monitor the resource usage of the lockstep process and report high usage.
///
/// This never stops the experiment. A power measurement taken while the marker process itself
/// keeps the CPU busy is skewed though, so the user gets a warning to re-check the setup.
///
/// The CPU usage for the process is collected every [sysinfo::MINIMUM_CPU_UPDATE_INTERVAL] and
/// checked against all available cores.
pub(crate) fn start_monitor(mut shutdown_listener: ShutdownListener) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu_all();
            let cpu_count = sys.cpus().len().max(1);

            loop {
                if shutdown_listener.should_shutdown() {
                    break;
                }

                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[this_process_pid]),
                    true,
                    ProcessRefreshKind::nothing().with_cpu(),
                );

                let Some(process) = sys.process(this_process_pid) else {
                    log::debug!("No process information for ourselves, stopping the monitor");
                    break;
                };

                let usage = (process.cpu_usage() / (cpu_count * 100) as f32) * 100.0;
                if usage > HIGH_CPU_PERCENT {
                    log::warn!(
                        "High CPU usage detected. Lockstep is using {usage:.2}% of the CPU, with {cpu_count} available cores. Power readings may include this overhead"
                    );
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        })?;

    Ok(())
}
