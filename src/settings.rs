//! Paths, version floors and checklists the bootstrapper works with.
//!
//! Defaults are compiled in. A `surf-bootstrap.toml` next to the project may
//! rename files or raise the Python floor; nothing else is configurable.

use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;
use tracing::debug;

use crate::config::keys;
use crate::error::{BootstrapError, Result};

pub const SETTINGS_FILE: &str = "surf-bootstrap.toml";

/// Whether a failed check stops the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Necessity {
    Required,
    Optional,
}

/// An external program the install needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    pub program: String,
    pub display_name: String,
    pub version_args: Vec<String>,
    pub minimum: Option<Version>,
    pub necessity: Necessity,
    pub install_hint: Option<String>,
}

/// An application bundle that must (or should) be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRequirement {
    pub display_name: String,
    /// Any one of these existing satisfies the requirement
    pub candidates: Vec<PathBuf>,
    pub necessity: Necessity,
}

/// A yes/no question that decides whether a credential is needed at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGate {
    pub flag_key: String,
    pub question: String,
    pub default: bool,
}

/// One entry of the credential checklist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPrompt {
    pub key: String,
    pub explanation: String,
    pub link: Option<String>,
    pub gate: Option<FeatureGate>,
    /// Other keys that, when they hold a real value, satisfy this one
    pub alternates: Vec<String>,
}

/// A Python module the main process cannot start (well) without
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProbe {
    pub module: String,
    pub package: String,
    pub purpose: String,
    pub necessity: Necessity,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub project_root: PathBuf,
    pub venv_dir: String,
    pub manifest: String,
    pub config_file: String,
    pub template_file: String,
    pub entry_script: String,
    pub tools: Vec<ToolRequirement>,
    pub applications: Vec<ApplicationRequirement>,
    pub credentials: Vec<CredentialPrompt>,
    pub probes: Vec<RuntimeProbe>,
}

/// Overrides accepted from `surf-bootstrap.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    venv_dir: Option<String>,
    manifest: Option<String>,
    config_file: Option<String>,
    template_file: Option<String>,
    entry_script: Option<String>,
    min_python: Option<String>,
}

impl Settings {
    /// Built-in defaults rooted at `project_root`
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            venv_dir: "supersurf_env".to_string(),
            manifest: "requirements.txt".to_string(),
            config_file: ".env".to_string(),
            template_file: ".env.example".to_string(),
            entry_script: "run_mac_app.py".to_string(),
            tools: default_tools(),
            applications: default_applications(),
            credentials: default_credentials(),
            probes: default_probes(),
        }
    }

    /// Defaults for the current directory, with `surf-bootstrap.toml` applied
    pub fn load() -> Result<Self> {
        let root = std::env::current_dir()
            .map_err(|e| BootstrapError::io("determining the project directory", e))?;
        Self::load_from(&root)
    }

    pub fn load_from(project_root: &Path) -> Result<Self> {
        let mut settings = Self::new(project_root);
        let path = project_root.join(SETTINGS_FILE);
        if !path.is_file() {
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| BootstrapError::io(format!("reading {}", path.display()), e))?;
        let file: SettingsFile =
            toml::from_str(&content).map_err(|e| BootstrapError::Configuration {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        settings.apply(file, &path)?;
        debug!(path = %path.display(), "applied settings overrides");
        Ok(settings)
    }

    fn apply(&mut self, file: SettingsFile, path: &Path) -> Result<()> {
        if let Some(v) = file.venv_dir {
            self.venv_dir = v;
        }
        if let Some(v) = file.manifest {
            self.manifest = v;
        }
        if let Some(v) = file.config_file {
            self.config_file = v;
        }
        if let Some(v) = file.template_file {
            self.template_file = v;
        }
        if let Some(v) = file.entry_script {
            self.entry_script = v;
        }
        if let Some(raw) = file.min_python {
            let minimum = crate::validate::parse_version(&raw).ok_or_else(|| {
                BootstrapError::Configuration {
                    path: path.to_path_buf(),
                    reason: format!("min_python `{}` is not a version", raw),
                }
            })?;
            if let Some(python) = self.tools.iter_mut().find(|t| t.program == "python3") {
                python.minimum = Some(minimum);
            }
        }
        Ok(())
    }

    pub fn venv_path(&self) -> PathBuf {
        self.project_root.join(&self.venv_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_root.join(&self.manifest)
    }

    pub fn config_path(&self) -> PathBuf {
        self.project_root.join(&self.config_file)
    }

    pub fn template_path(&self) -> PathBuf {
        self.project_root.join(&self.template_file)
    }

    pub fn entry_script_path(&self) -> PathBuf {
        self.project_root.join(&self.entry_script)
    }

    /// Interpreter used to create the isolated environment
    pub fn base_python(&self) -> &str {
        self.tools
            .iter()
            .find(|t| t.program.starts_with("python"))
            .map(|t| t.program.as_str())
            .unwrap_or("python3")
    }
}

fn default_tools() -> Vec<ToolRequirement> {
    vec![
        ToolRequirement {
            program: "python3".to_string(),
            display_name: "Python".to_string(),
            version_args: vec!["--version".to_string()],
            minimum: Some(Version::new(3, 8, 0)),
            necessity: Necessity::Required,
            install_hint: Some("Install it with `brew install python3` or from python.org".to_string()),
        },
        ToolRequirement {
            program: "pip3".to_string(),
            display_name: "pip".to_string(),
            version_args: vec!["--version".to_string()],
            minimum: None,
            necessity: Necessity::Required,
            install_hint: Some("Run `python3 -m ensurepip --upgrade`".to_string()),
        },
        ToolRequirement {
            program: "ffmpeg".to_string(),
            display_name: "FFmpeg".to_string(),
            version_args: vec!["-version".to_string()],
            minimum: None,
            necessity: Necessity::Optional,
            install_hint: Some("Install it with `brew install ffmpeg` for local Whisper transcription".to_string()),
        },
    ]
}

#[cfg(target_os = "macos")]
fn default_applications() -> Vec<ApplicationRequirement> {
    vec![ApplicationRequirement {
        display_name: "A supported IDE (Cursor or Windsurf)".to_string(),
        candidates: vec![
            PathBuf::from("/Applications/Cursor.app"),
            PathBuf::from("/Applications/Windsurf.app"),
        ],
        necessity: Necessity::Optional,
    }]
}

#[cfg(not(target_os = "macos"))]
fn default_applications() -> Vec<ApplicationRequirement> {
    Vec::new()
}

fn default_credentials() -> Vec<CredentialPrompt> {
    vec![
        CredentialPrompt {
            key: keys::OPENAI_API_KEY.to_string(),
            explanation: "An OpenAI API key enables fast cloud transcription with Whisper.".to_string(),
            link: Some("https://platform.openai.com/api-keys".to_string()),
            gate: Some(FeatureGate {
                flag_key: keys::USE_OPENAI_API.to_string(),
                question: "Use the OpenAI Whisper API for transcription (paid)?".to_string(),
                default: false,
            }),
            alternates: Vec::new(),
        },
        CredentialPrompt {
            key: keys::ANTHROPIC_API_KEY.to_string(),
            explanation: "An Anthropic API key lets Claude Computer Use locate UI elements on screen.".to_string(),
            link: Some("https://console.anthropic.com/settings/keys".to_string()),
            gate: None,
            alternates: Vec::new(),
        },
        CredentialPrompt {
            key: keys::GEMINI_API_KEY.to_string(),
            explanation: "A Gemini API key is used to analyse screenshots of the IDE.".to_string(),
            link: Some("https://aistudio.google.com/app/apikey".to_string()),
            gate: None,
            alternates: vec![keys::GOOGLE_API_KEY.to_string()],
        },
    ]
}

fn default_probes() -> Vec<RuntimeProbe> {
    vec![
        RuntimeProbe {
            module: "rumps".to_string(),
            package: "rumps".to_string(),
            purpose: "menu bar interface".to_string(),
            necessity: Necessity::Required,
        },
        RuntimeProbe {
            module: "pyaudio".to_string(),
            package: "pyaudio".to_string(),
            purpose: "microphone capture".to_string(),
            necessity: Necessity::Required,
        },
        RuntimeProbe {
            module: "dotenv".to_string(),
            package: "python-dotenv".to_string(),
            purpose: "configuration loading".to_string(),
            necessity: Necessity::Required,
        },
        RuntimeProbe {
            module: "pynput".to_string(),
            package: "pynput".to_string(),
            purpose: "global keyboard shortcuts".to_string(),
            necessity: Necessity::Optional,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_rooted_at_project() {
        let settings = Settings::new("/work/surf");
        assert_eq!(settings.venv_path(), PathBuf::from("/work/surf/supersurf_env"));
        assert_eq!(settings.config_path(), PathBuf::from("/work/surf/.env"));
        assert_eq!(settings.template_path(), PathBuf::from("/work/surf/.env.example"));
        assert_eq!(settings.base_python(), "python3");
    }

    #[test]
    fn settings_file_overrides_names_and_python_floor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "venv_dir = \"venv\"\nentry_script = \"supercode_app.py\"\nmin_python = \"3.10\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path()).unwrap();
        assert_eq!(settings.venv_path(), dir.path().join("venv"));
        assert_eq!(settings.entry_script, "supercode_app.py");
        let python = settings.tools.iter().find(|t| t.program == "python3").unwrap();
        assert_eq!(python.minimum, Some(Version::new(3, 10, 0)));
    }

    #[test]
    fn unknown_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "colour = \"blue\"\n").unwrap();

        let err = Settings::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, BootstrapError::Configuration { .. }));
    }

    #[test]
    fn only_the_paid_transcription_key_is_gated() {
        let settings = Settings::new(".");
        let gated: Vec<_> = settings
            .credentials
            .iter()
            .filter(|c| c.gate.is_some())
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(gated, vec![keys::OPENAI_API_KEY]);
    }
}
