//! Installing the pinned dependency manifest into the active environment.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{BootstrapError, Result};
use crate::provision::ActiveEnvironment;
use crate::shell::{CommandRequest, CommandRunner, SessionEnv};
use crate::ui;

/// One line of `requirements.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Distribution name as written
    pub name: String,
    /// The full specifier line, e.g. `openai-whisper==20231117`
    pub spec: String,
}

/// The dependency manifest, parsed just far enough to look packages up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub path: PathBuf,
    pub requirements: Vec<Requirement>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| BootstrapError::Installation {
            manifest: path.to_path_buf(),
            reason: format!("cannot read manifest: {}", e),
        })?;
        Ok(Self::parse(path, &text))
    }

    pub fn parse(path: &Path, text: &str) -> Self {
        let requirements = text
            .lines()
            .filter_map(|line| {
                let line = strip_comment(line).trim();
                // Options (-r, --index-url, ...) and blanks carry no package
                if line.is_empty() || line.starts_with('-') {
                    return None;
                }
                requirement_name(line).map(|name| Requirement {
                    name,
                    spec: line.to_string(),
                })
            })
            .collect();

        Self {
            path: path.to_path_buf(),
            requirements,
        }
    }

    /// Find a package by name using pip's normalisation (case, `-`/`_`/`.`)
    pub fn find(&self, package: &str) -> Option<&Requirement> {
        let wanted = normalize(package);
        self.requirements.iter().find(|r| normalize(&r.name) == wanted)
    }

    /// Specifier to pass to pip for `package`: the pinned line if listed
    pub fn install_spec(&self, package: &str) -> String {
        self.find(package)
            .map(|r| r.spec.clone())
            .unwrap_or_else(|| package.to_string())
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// pip only starts a comment at the beginning of a line or after whitespace,
/// so `#egg=` fragments in URLs survive
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (index, c) in line.char_indices() {
        if c == '#' && previous.is_none_or(char::is_whitespace) {
            return &line[..index];
        }
        previous = Some(c);
    }
    line
}

fn requirement_name(line: &str) -> Option<String> {
    let name: String = line
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();

    // `git+https://...` and bare URLs name their package in the egg fragment
    if line[name.len()..].starts_with(['+', ':']) {
        let (_, egg) = line.split_once("#egg=")?;
        let egg = egg.split(['&', ' ', '[']).next().unwrap_or_default();
        return (!egg.is_empty()).then(|| egg.to_string());
    }
    (!name.is_empty()).then_some(name)
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase().replace(['_', '.'], "-")
}

/// `python -m pip install ...` through the environment's interpreter
pub fn pip_request(active: &ActiveEnvironment) -> CommandRequest {
    CommandRequest::new(active.python.to_string_lossy()).args(["-m", "pip", "install"])
}

/// Upgrade pip, then install everything in `manifest`. Any failure is fatal.
pub fn install_dependencies<R: CommandRunner + ?Sized>(
    runner: &mut R,
    env: &SessionEnv,
    active: &ActiveEnvironment,
    manifest: &Path,
) -> Result<Manifest> {
    let parsed = Manifest::load(manifest)?;
    debug!(path = %manifest.display(), packages = parsed.len(), "loaded manifest");

    ui::info("Upgrading pip");
    let upgrade = pip_request(active).args(["--upgrade", "pip"]);
    run_step(runner, env, &upgrade, manifest)?;

    ui::info(format!(
        "Installing {} packages from {}",
        parsed.len(),
        manifest.display()
    ));
    let install = pip_request(active).arg("-r").arg(manifest.to_string_lossy());
    run_step(runner, env, &install, manifest)?;

    info!(packages = parsed.len(), "dependencies installed");
    ui::success("Dependencies installed");
    Ok(parsed)
}

fn run_step<R: CommandRunner + ?Sized>(
    runner: &mut R,
    env: &SessionEnv,
    request: &CommandRequest,
    manifest: &Path,
) -> Result<()> {
    let result = runner.run(request, env)?;
    if result.success() {
        return Ok(());
    }
    Err(BootstrapError::Installation {
        manifest: manifest.to_path_buf(),
        reason: format!("`{}` exited with status {}", request, result.exit_code),
    })
}
