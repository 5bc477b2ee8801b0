//! Creating and activating the isolated Python environment.
//!
//! Activation does what sourcing `bin/activate` would do to a shell, applied
//! to the [`SessionEnv`] every later child inherits: `VIRTUAL_ENV` is set,
//! the environment's `bin` goes to the front of PATH and `PYTHONHOME` is
//! dropped.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{BootstrapError, Result};
use crate::shell::{CommandRequest, CommandRunner, EnvValue, SessionEnv, resolve_program_path};
use crate::ui;

/// Whether this run created the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    Reused,
}

/// Paths inside an activated environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEnvironment {
    pub root: PathBuf,
    pub python: PathBuf,
}

impl ActiveEnvironment {
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }
}

/// Create the environment at `venv` with `base_python -m venv` unless the
/// directory already exists.
pub fn ensure_venv<R: CommandRunner + ?Sized>(
    runner: &mut R,
    env: &SessionEnv,
    base_python: &str,
    venv: &Path,
) -> Result<ProvisionOutcome> {
    if venv.exists() {
        if !venv.is_dir() {
            return Err(BootstrapError::Provisioning {
                path: venv.to_path_buf(),
                reason: "path exists but is not a directory".to_string(),
            });
        }
        ui::info(format!(
            "Virtual environment {} already exists, skipping creation",
            venv.display()
        ));
        return Ok(ProvisionOutcome::Reused);
    }

    ui::info(format!("Creating virtual environment {}", venv.display()));
    let request = CommandRequest::new(base_python)
        .args(["-m", "venv"])
        .arg(venv.to_string_lossy());
    let result = runner.run(&request, env)?;

    if !result.success() {
        return Err(BootstrapError::Provisioning {
            path: venv.to_path_buf(),
            reason: format!("`{}` exited with status {}", request, result.exit_code),
        });
    }
    if !venv.is_dir() {
        return Err(BootstrapError::Provisioning {
            path: venv.to_path_buf(),
            reason: format!("`{}` succeeded but created nothing", request),
        });
    }

    info!(path = %venv.display(), "created virtual environment");
    ui::success("Virtual environment created");
    Ok(ProvisionOutcome::Created)
}

/// Activate `venv` for every child spawned with `env` from now on.
///
/// `env` is only modified once activation has been verified: `VIRTUAL_ENV`
/// names the environment and `python` on the new PATH lives inside it.
pub fn activate(env: &mut SessionEnv, venv: &Path) -> Result<ActiveEnvironment> {
    let provisioning = |reason: String| BootstrapError::Provisioning {
        path: venv.to_path_buf(),
        reason,
    };

    let root = venv
        .canonicalize()
        .map_err(|e| provisioning(format!("cannot resolve directory: {}", e)))?;
    let bin = root.join("bin");

    if !bin.join("activate").is_file() {
        return Err(provisioning(
            "activation script bin/activate is missing; delete the directory and re-run the installer"
                .to_string(),
        ));
    }

    let mut activated = env.clone();
    activated.set("VIRTUAL_ENV", EnvValue::FilePath(root.clone()));
    activated.prepend_path(&bin);
    activated.unset("PYTHONHOME");

    let python = verify_activation(&activated, &root).map_err(provisioning)?;

    *env = activated;
    debug!(root = %root.display(), python = %python.display(), "activated");
    Ok(ActiveEnvironment { root, python })
}

fn verify_activation(env: &SessionEnv, root: &Path) -> std::result::Result<PathBuf, String> {
    match env.get("VIRTUAL_ENV") {
        Some(EnvValue::FilePath(marker)) if marker == root => {}
        other => return Err(format!("VIRTUAL_ENV points at {:?}", other)),
    }

    let python = resolve_program_path("python", env)
        .map_err(|e| format!("no interpreter after activation ({})", e))?;
    if !python.starts_with(root) {
        return Err(format!(
            "`python` resolves to {} instead of the environment",
            python.display()
        ));
    }
    Ok(python)
}
