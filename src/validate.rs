//! Toolchain checks run before anything is written to disk.

use std::path::PathBuf;

use semver::Version;
use tracing::{debug, info};

use crate::error::{BootstrapError, Result};
use crate::settings::{ApplicationRequirement, Necessity, ToolRequirement};
use crate::shell::{CommandRequest, CommandRunner, SessionEnv};
use crate::ui;

/// Outcome of checking one tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Found {
        path: PathBuf,
        version: Option<Version>,
    },
    Missing,
    TooOld {
        path: PathBuf,
        found: Version,
    },
    UnknownVersion {
        path: PathBuf,
    },
}

impl CheckStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Found { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub display_name: String,
    pub necessity: Necessity,
    pub status: CheckStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub checks: Vec<ToolCheck>,
    /// Optional applications that were not found
    pub missing_applications: Vec<String>,
}

impl ValidationReport {
    /// Optional tools or applications that failed their check
    pub fn warnings(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.status.is_ok())
            .map(|c| c.display_name.as_str())
            .chain(self.missing_applications.iter().map(String::as_str))
            .collect()
    }
}

/// Check every tool, stopping at the first required one that fails.
///
/// Optional tools that fail only produce a warning. Nothing is written.
pub fn validate_environment<R: CommandRunner + ?Sized>(
    runner: &mut R,
    env: &SessionEnv,
    tools: &[ToolRequirement],
    applications: &[ApplicationRequirement],
) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    for tool in tools {
        let status = check_tool(runner, env, tool)?;
        debug!(tool = %tool.program, ?status, "checked tool");

        match (&status, tool.necessity) {
            (CheckStatus::Found { path, version }, _) => {
                let version = version
                    .as_ref()
                    .map(|v| format!(" {}", v))
                    .unwrap_or_default();
                ui::success(format!(
                    "{}{} found at {}",
                    tool.display_name,
                    version,
                    path.display()
                ));
            }
            (_, Necessity::Required) => return Err(failure(tool, &status)),
            (_, Necessity::Optional) => {
                let err = failure(tool, &status);
                ui::warning(format!("{} (optional)", err));
                if let Some(hint) = &tool.install_hint {
                    ui::detail(hint);
                }
            }
        }

        report.checks.push(ToolCheck {
            display_name: tool.display_name.clone(),
            necessity: tool.necessity,
            status,
        });
    }

    for app in applications {
        if app.candidates.iter().any(|p| p.exists()) {
            continue;
        }
        match app.necessity {
            Necessity::Required => {
                return Err(BootstrapError::Environment {
                    tool: app.display_name.clone(),
                    problem: "is not installed".to_string(),
                    hint: Some(format!(
                        "Expected one of: {}",
                        app.candidates
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                });
            }
            Necessity::Optional => {
                ui::warning(format!("{} was not found", app.display_name));
                report.missing_applications.push(app.display_name.clone());
            }
        }
    }

    info!(checks = report.checks.len(), "environment validated");
    Ok(report)
}

fn check_tool<R: CommandRunner + ?Sized>(
    runner: &mut R,
    env: &SessionEnv,
    tool: &ToolRequirement,
) -> Result<CheckStatus> {
    let path = match runner.resolve(&tool.program, env) {
        Ok(path) => path,
        Err(e) => {
            debug!(tool = %tool.program, error = %e, "not on PATH");
            return Ok(CheckStatus::Missing);
        }
    };

    let Some(minimum) = &tool.minimum else {
        // Version is informational only; don't fail if it can't be read
        let version = read_version(runner, env, tool).ok().flatten();
        return Ok(CheckStatus::Found { path, version });
    };

    match read_version(runner, env, tool)? {
        None => Ok(CheckStatus::UnknownVersion { path }),
        Some(found) if found < *minimum => Ok(CheckStatus::TooOld { path, found }),
        Some(found) => Ok(CheckStatus::Found {
            path,
            version: Some(found),
        }),
    }
}

fn read_version<R: CommandRunner + ?Sized>(
    runner: &mut R,
    env: &SessionEnv,
    tool: &ToolRequirement,
) -> Result<Option<Version>> {
    let request = CommandRequest::new(tool.program.clone()).args(tool.version_args.iter().cloned());
    let output = runner.capture(&request, env)?;
    if !output.success() {
        return Ok(None);
    }
    Ok(parse_version(&output.output))
}

fn failure(tool: &ToolRequirement, status: &CheckStatus) -> BootstrapError {
    let minimum = tool
        .minimum
        .as_ref()
        .map(|m| format!(" (minimum {})", m))
        .unwrap_or_default();

    let problem = match status {
        CheckStatus::Missing => format!("was not found on PATH{}", minimum),
        CheckStatus::TooOld { found, .. } => format!("{} is too old{}", found, minimum),
        CheckStatus::UnknownVersion { path } => {
            format!("at {} did not report a version{}", path.display(), minimum)
        }
        CheckStatus::Found { .. } => "is fine".to_string(),
    };

    BootstrapError::Environment {
        tool: tool.display_name.clone(),
        problem,
        hint: tool.install_hint.clone(),
    }
}

/// First `N.N[.N]` in `text`, ignoring any suffix (`3.12.0rc1` is 3.12.0)
pub fn parse_version(text: &str) -> Option<Version> {
    text.split(|c: char| c.is_whitespace() || c == '(' || c == ',')
        .find_map(|token| {
            let token = token.strip_prefix('v').unwrap_or(token);
            let numeric: String = token
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            let parts: Vec<u64> = numeric
                .split('.')
                .map_while(|p| p.parse().ok())
                .collect();
            match parts.as_slice() {
                [major, minor] => Some(Version::new(*major, *minor, 0)),
                [major, minor, patch, ..] => Some(Version::new(*major, *minor, *patch)),
                _ => None,
            }
        })
}
