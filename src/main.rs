use std::process::ExitCode;

use anyhow::Result;
use surf_bootstrap::bootstrap::run_install;
use surf_bootstrap::input::TerminalInput;
use surf_bootstrap::settings::Settings;
use surf_bootstrap::shell::{SessionEnv, SystemRunner};
use surf_bootstrap::{BootstrapError, logging, ui};

fn run() -> Result<()> {
    let settings = Settings::load()?;
    let mut runner = SystemRunner::new();
    let mut input = TerminalInput::new();

    run_install(&mut runner, &mut input, &settings, SessionEnv::from_parent())?;
    Ok(())
}

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<BootstrapError>() {
            Some(bootstrap) => {
                ui::fatal(bootstrap);
                ExitCode::from(bootstrap.exit_code() as u8)
            }
            None => {
                ui::error(format!("{:#}", err));
                ExitCode::FAILURE
            }
        },
    }
}
