use clap::Parser;

use crate::cli::LockstepCli;

/// Initialise logging and parse the command line.
///
/// Logging defaults to `info` so that failed marker deliveries are visible on stderr without
/// setting `RUST_LOG`.
pub fn init() -> LockstepCli {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    LockstepCli::parse()
}
