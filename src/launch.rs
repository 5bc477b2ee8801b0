//! Pre-flight checks and hand-off to the assistant's main process.
//!
//! [`prepare_launch`] does everything that can fail or ask a question and
//! returns a [`Handoff`]; [`Handoff::exec`] then replaces this process.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::keys;
use crate::config::{ConfigView, EnvDocument, ensure_config_file};
use crate::error::{BootstrapError, Result};
use crate::input::InputProvider;
use crate::install::{Manifest, pip_request};
use crate::provision::{ActiveEnvironment, activate};
use crate::settings::{Necessity, RuntimeProbe, Settings};
use crate::shell::{CommandRequest, CommandRunner, EnvValue, SessionEnv, replace_process};
use crate::ui;

/// Numeric libraries in the assistant oversubscribe the CPU unless pinned
pub const THREAD_LIMIT_VARS: &[&str] = &[
    "OMP_NUM_THREADS",
    "MKL_NUM_THREADS",
    "OPENBLAS_NUM_THREADS",
    "VECLIB_MAXIMUM_THREADS",
    "NUMEXPR_NUM_THREADS",
    "PYTORCH_NUM_THREADS",
];

/// The process to become, and the environment it gets
#[derive(Debug, Clone)]
pub struct Handoff {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: SessionEnv,
    /// Optional capabilities that will be unavailable
    pub degraded: Vec<String>,
}

impl Handoff {
    /// Replace the current process. Only returns if execve fails.
    pub fn exec(self) -> Result<Infallible> {
        info!(program = %self.program.display(), args = ?self.args, "handing off");
        replace_process(&self.program, &self.args, &self.env)
    }
}

/// Check the environment, libraries and config, then describe the hand-off.
pub fn prepare_launch<R, I>(
    runner: &mut R,
    input: &mut I,
    settings: &Settings,
    mut env: SessionEnv,
) -> Result<Handoff>
where
    R: CommandRunner + ?Sized,
    I: InputProvider + ?Sized,
{
    let venv = settings.venv_path();
    if !venv.is_dir() {
        return Err(BootstrapError::Provisioning {
            path: venv,
            reason: "not found; run surf-install first".to_string(),
        });
    }
    let active = activate(&mut env, &venv)?;
    ui::success(format!("Using environment {}", active.root.display()));

    let config_path = settings.config_path();
    ensure_config_file(&config_path, &settings.template_path())?;

    let manifest = load_manifest(&settings.manifest_path());
    let mut degraded = Vec::new();
    for probe in &settings.probes {
        if !ensure_probe(runner, input, &env, &active, &manifest, probe)? {
            degraded.push(format!("{} ({})", probe.module, probe.purpose));
        }
    }

    let entry = settings.entry_script_path();
    if !entry.is_file() {
        return Err(BootstrapError::Exec {
            program: entry.display().to_string(),
            reason: "entry script not found".to_string(),
        });
    }

    let doc = EnvDocument::load(&config_path)?;
    // Fallbacks first so a placeholder in the file can't shadow them
    apply_credential_fallbacks(&mut env, &doc);
    overlay_config(&mut env, &config_path);
    for var in THREAD_LIMIT_VARS {
        env.set_default(var, "1");
    }
    report_configuration(&doc);

    if !degraded.is_empty() {
        ui::warning("Starting with reduced functionality:");
        for capability in &degraded {
            ui::detail(capability);
        }
    }

    Ok(Handoff {
        program: active.python.clone(),
        args: vec![entry.to_string_lossy().into_owned()],
        env,
        degraded,
    })
}

fn load_manifest(path: &Path) -> Manifest {
    match Manifest::load(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            // Only used to look up pins; bare package names still work
            debug!(error = %e, "no manifest for pinned installs");
            Manifest::default()
        }
    }
}

/// Whether `module` imports in the environment's interpreter
pub fn probe_module<R: CommandRunner + ?Sized>(
    runner: &mut R,
    env: &SessionEnv,
    active: &ActiveEnvironment,
    module: &str,
) -> Result<bool> {
    let request = CommandRequest::new(active.python.to_string_lossy())
        .arg("-c")
        .arg(format!("import {}", module));
    let output = runner.capture(&request, env)?;
    debug!(module, exit_code = output.exit_code, "probed");
    Ok(output.success())
}

/// Make sure `probe` is importable, offering to install it. Returns false
/// when an optional library stays missing.
fn ensure_probe<R, I>(
    runner: &mut R,
    input: &mut I,
    env: &SessionEnv,
    active: &ActiveEnvironment,
    manifest: &Manifest,
    probe: &RuntimeProbe,
) -> Result<bool>
where
    R: CommandRunner + ?Sized,
    I: InputProvider + ?Sized,
{
    if probe_module(runner, env, active, &probe.module)? {
        return Ok(true);
    }

    ui::warning(format!(
        "{} is not installed ({})",
        probe.module, probe.purpose
    ));
    let spec = manifest.install_spec(&probe.package);
    let wanted = input.confirm(&format!("Install {} now?", spec), true)?;

    if wanted {
        let request = pip_request(active).arg(spec.as_str());
        let installed = runner.run(&request, env)?.success()
            && probe_module(runner, env, active, &probe.module)?;
        if installed {
            info!(module = %probe.module, %spec, "installed on demand");
            ui::success(format!("{} installed", probe.module));
            return Ok(true);
        }
        ui::error(format!("Could not install {}", spec));
    }

    match probe.necessity {
        Necessity::Required => Err(BootstrapError::MissingDependency {
            module: probe.module.clone(),
            purpose: probe.purpose.clone(),
        }),
        Necessity::Optional => {
            ui::warning(format!(
                "Continuing without {}; {} will be unavailable",
                probe.module, probe.purpose
            ));
            Ok(false)
        }
    }
}

/// Add the config file's entries to `env`, never replacing a variable the
/// session already has.
pub fn overlay_config(env: &mut SessionEnv, config_path: &Path) {
    let iter = match dotenvy::from_path_iter(config_path) {
        Ok(iter) => iter,
        Err(e) => {
            ui::warning(format!("Could not read {}: {}", config_path.display(), e));
            return;
        }
    };

    for item in iter {
        match item {
            Ok((key, value)) => {
                if env.contains_key(&key) {
                    debug!(%key, "kept existing variable");
                    continue;
                }
                env.set(key, EnvValue::String(value));
            }
            Err(e) => warn!(path = %config_path.display(), error = %e, "skipped config line"),
        }
    }
}

fn apply_credential_fallbacks(env: &mut SessionEnv, doc: &EnvDocument) {
    let view = ConfigView::new(doc);
    if view.credential(keys::GEMINI_API_KEY).is_none()
        && let Some(google) = view.credential(keys::GOOGLE_API_KEY)
        && env.set_default(keys::GEMINI_API_KEY, google)
    {
        debug!("using GOOGLE_API_KEY for Gemini");
    }
}

fn report_configuration(doc: &EnvDocument) {
    let view = ConfigView::new(doc);
    let use_api = view.flag(keys::USE_OPENAI_API);

    let transcription = if use_api {
        let model = view.get(keys::OPENAI_TRANSCRIPTION_MODEL).unwrap_or_default();
        format!("OpenAI API ({})", model)
    } else {
        let model = view.get(keys::WHISPER_MODEL).unwrap_or_default();
        format!("local Whisper ({})", model)
    };
    ui::info(format!("Transcription: {}", transcription));
    ui::info(format!(
        "Target IDE: {}",
        view.get(keys::DEFAULT_IDE).unwrap_or_default()
    ));

    if use_api && view.credential(keys::OPENAI_API_KEY).is_none() {
        ui::warning("USE_OPENAI_API is true but OPENAI_API_KEY is not set");
    }
    for key in [keys::ANTHROPIC_API_KEY, keys::GEMINI_API_KEY] {
        let fallback =
            key == keys::GEMINI_API_KEY && view.credential(keys::GOOGLE_API_KEY).is_some();
        if view.credential(key).is_none() && !fallback {
            ui::warning(format!("{} is not set; related features are disabled", key));
        }
    }

    info!(
        use_openai_api = use_api,
        audio_device = view.get(keys::AUDIO_DEVICE_INDEX).unwrap_or_default(),
        max_recording = view.get(keys::MAX_RECORDING_TIME).unwrap_or_default(),
        "configuration loaded"
    );
}
