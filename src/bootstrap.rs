//! The one-shot install flow: validate, provision, install, configure.

use tracing::info;

use crate::configure::{ConfigureOutcome, configure};
use crate::error::Result;
use crate::input::InputProvider;
use crate::install::{Manifest, install_dependencies};
use crate::provision::{ActiveEnvironment, ProvisionOutcome, activate, ensure_venv};
use crate::settings::Settings;
use crate::shell::{CommandRunner, SessionEnv};
use crate::ui;
use crate::validate::{ValidationReport, validate_environment};

/// Everything a successful install did
#[derive(Debug, Clone)]
pub struct InstallSummary {
    pub validation: ValidationReport,
    pub provision: ProvisionOutcome,
    pub environment: ActiveEnvironment,
    pub manifest: Manifest,
    pub configuration: ConfigureOutcome,
}

/// Run the full install against `settings`.
///
/// Stops at the first fatal error. Validation runs before anything is
/// written, so a too-old interpreter leaves the project untouched.
pub fn run_install<R, I>(
    runner: &mut R,
    input: &mut I,
    settings: &Settings,
    mut env: SessionEnv,
) -> Result<InstallSummary>
where
    R: CommandRunner + ?Sized,
    I: InputProvider + ?Sized,
{
    ui::heading("Checking requirements");
    let validation = validate_environment(runner, &env, &settings.tools, &settings.applications)?;

    ui::heading("Setting up the Python environment");
    let venv = settings.venv_path();
    let provision = ensure_venv(runner, &env, settings.base_python(), &venv)?;
    let environment = activate(&mut env, &venv)?;
    ui::success(format!("Activated {}", environment.root.display()));

    ui::heading("Installing dependencies");
    let manifest = install_dependencies(runner, &env, &environment, &settings.manifest_path())?;

    ui::heading("Configuring API keys");
    let configuration = configure(
        input,
        &settings.config_path(),
        &settings.template_path(),
        &settings.credentials,
    )?;

    info!(
        ?provision,
        updated = configuration.updated.len(),
        skipped = configuration.skipped.len(),
        "install finished"
    );
    print_next_steps(settings, &validation);

    Ok(InstallSummary {
        validation,
        provision,
        environment,
        manifest,
        configuration,
    })
}

fn print_next_steps(settings: &Settings, validation: &ValidationReport) {
    ui::heading("Installation complete");
    let warnings = validation.warnings();
    if !warnings.is_empty() {
        ui::warning(format!("Optional components missing: {}", warnings.join(", ")));
    }
    ui::info("Start the assistant with `surf-run`");
    ui::detail(format!(
        "Edit {} at any time to change API keys and settings",
        settings.config_path().display()
    ));
    ui::detail("Grant microphone and accessibility permissions when macOS asks");
}
