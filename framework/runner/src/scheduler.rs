use std::time::Duration;

use lockstep_core::prelude::{offset_secs, Marker, WaitDiscipline};
use lockstep_dispatch::prelude::Dispatcher;
use tokio::time::Instant;

use crate::config::ScheduleConfig;
use crate::scenario::Scenario;

/// Wake-ups later than this are reported, they usually mean the machine was suspended or
/// heavily loaded.
pub const OVERRUN_WARNING: Duration = Duration::from_millis(250);

/// A marker a run will dispatch, at its offset from the start of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMarker {
    pub tag: String,
    pub offset: Duration,
}

/// The markers of one run in dispatch order: `start_f<i>_r<r>` at zero, `t<offset>_f<i>_r<r>` for
/// every periodic offset and `end_f<i>_r<r>` at `duration`.
pub fn plan_run(scenario: &Scenario, repeat: u32, duration: Duration) -> Vec<PlannedMarker> {
    let run = format!("f{}_r{repeat}", scenario.index);

    let mut plan = Vec::with_capacity(scenario.marker_count(duration));
    plan.push(PlannedMarker {
        tag: format!("start_{run}"),
        offset: Duration::ZERO,
    });
    plan.extend(
        scenario
            .periodic_offsets(duration)
            .into_iter()
            .map(|offset| PlannedMarker {
                tag: format!("t{}_{run}", offset_secs(offset)),
                offset,
            }),
    );
    plan.push(PlannedMarker {
        tag: format!("end_{run}"),
        offset: duration,
    });

    plan
}

/// Drives the configured scenarios through their repeats, one run at a time.
///
/// Runs go in repeat-major order: every scenario of repeat 1 by ascending index, then repeat 2,
/// and so on. Within a run each marker waits for its absolute target `run start + offset`, so a
/// slow delivery only delays the marker it belongs to and never shifts the rest of the run.
pub struct PhaseScheduler<'a> {
    config: &'a ScheduleConfig,
    dispatcher: &'a Dispatcher,
    wait: WaitDiscipline,
}

impl<'a> PhaseScheduler<'a> {
    pub fn new(config: &'a ScheduleConfig, dispatcher: &'a Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            wait: WaitDiscipline::default(),
        }
    }

    /// Execute the whole schedule and return the number of runs completed.
    pub async fn run(&self) -> usize {
        let total = self.config.run_count();
        log::info!(
            "Starting {total} runs ({} scenarios x {} repeats), about {}s in total",
            self.config.scenarios.len(),
            self.config.repeats,
            self.config.planned_runtime().as_secs()
        );

        let mut completed = 0;
        for (repeat, scenario) in self.config.runs() {
            if completed > 0 && !self.config.cooldown.is_zero() {
                log::info!("Cooling down for {:?}", self.config.cooldown);
                self.wait.pause(self.config.cooldown).await;
            }

            log::info!(
                "Run {}/{total}: scenario f{} (period {}s), repeat {repeat}",
                completed + 1,
                scenario.index,
                offset_secs(scenario.period)
            );
            self.run_once(scenario, repeat).await;
            completed += 1;
        }

        log::info!("Schedule complete after {completed} runs");
        completed
    }

    /// Execute a single run: start marker, periodic markers, end marker.
    pub async fn run_once(&self, scenario: &Scenario, repeat: u32) {
        let start_epoch = Instant::now();

        for planned in plan_run(scenario, repeat, self.config.duration) {
            let lag = self.wait.wait_until(start_epoch + planned.offset).await;
            if lag > OVERRUN_WARNING {
                log::warn!("Marker [{}] is {lag:?} late, sending it now", planned.tag);
            }

            self.dispatcher
                .send_marker(
                    Marker::new(planned.tag)
                        .with_scenario(scenario.index)
                        .with_repeat(repeat)
                        .with_offset(planned.offset),
                )
                .await;
        }
    }
}
