use lockstep_runner::prelude::*;

fn main() -> LockstepResult<()> {
    let cli = init();
    let config = ExperimentConfig::try_from(&cli)?;
    log::debug!("Configuration: {config:?}");

    let code = run(&config)?;
    if code != 0 {
        log::debug!("Exiting with code {code}");
        std::process::exit(code);
    }

    Ok(())
}
