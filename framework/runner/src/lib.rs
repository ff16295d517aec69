mod cli;
mod config;
mod executor;
mod init;
mod monitor;
mod progress;
mod run;
mod scenario;
mod scheduler;
mod shutdown;
mod types;
mod wrapper;

pub mod prelude {
    pub use crate::cli::{DispatchArgs, LockstepCli, LockstepCommand, ScheduleArgs, WrapArgs};
    pub use crate::config::{
        ConfigError, ExperimentConfig, ExperimentMode, ScheduleConfig, WrapConfig,
    };
    pub use crate::executor::Executor;
    pub use crate::init::init;
    pub use crate::run::{run, INTERRUPTED_EXIT_CODE};
    pub use crate::scenario::{parse_scenarios, Scenario, DEFAULT_PERIODS, MIN_PERIOD};
    pub use crate::scheduler::{plan_run, PhaseScheduler, PlannedMarker, OVERRUN_WARNING};
    pub use crate::types::LockstepResult;
    pub use crate::wrapper::{exit_code, WorkloadWrapper};
}
