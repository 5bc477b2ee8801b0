#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use surf_bootstrap::Result;
use surf_bootstrap::settings::Settings;
use surf_bootstrap::shell::{
    CapturedOutput, CommandRequest, CommandRunner, EnvValue, ExecResult, ProgramResolutionError,
    SessionEnv,
};
use tempfile::TempDir;

pub const REQUIREMENTS: &str = "\
rumps==0.4.0
pyaudio==0.2.14
python-dotenv==1.0.1
openai-whisper
pynput>=1.7
";

pub const TEMPLATE: &str = "\
# SuperSurf configuration
USE_OPENAI_API=false
OPENAI_API_KEY=your_openai_api_key_here
ANTHROPIC_API_KEY=your_anthropic_api_key_here
GEMINI_API_KEY=your_gemini_api_key_here
WHISPER_MODEL=base
DEFAULT_IDE=windsurf
";

/// Stands in for python, pip and friends. Nothing real is ever executed.
#[derive(Debug, Default)]
pub struct FakeRunner {
    /// Tools on PATH and the banner their version flag prints
    pub tools: HashMap<String, String>,
    /// Modules importable in the environment
    pub modules: HashSet<String>,
    /// pip specifiers that install successfully, and the module each provides
    pub installable: HashMap<String, String>,
    /// Exit code for `pip install --upgrade pip` and `pip install -r`
    pub pip_exit: u8,
    pub runs: Vec<CommandRequest>,
    pub captures: Vec<CommandRequest>,
}

impl FakeRunner {
    /// A machine with a recent Python, pip and ffmpeg
    pub fn healthy() -> Self {
        let mut runner = Self::default();
        runner.tools.insert("python3".into(), "Python 3.11.4".into());
        runner
            .tools
            .insert("pip3".into(), "pip 23.1 from /usr/lib (python 3.11)".into());
        runner.tools.insert("ffmpeg".into(), "ffmpeg version 6.0".into());
        runner
    }

    /// Every probed module already importable
    pub fn with_all_modules(mut self) -> Self {
        for module in ["rumps", "pyaudio", "dotenv", "pynput"] {
            self.modules.insert(module.into());
        }
        self
    }

    pub fn without_module(mut self, module: &str) -> Self {
        self.modules.remove(module);
        self
    }

    pub fn venv_creations(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.args.iter().any(|a| a == "venv"))
            .count()
    }

    pub fn pip_installs(&self) -> Vec<&CommandRequest> {
        self.runs
            .iter()
            .filter(|r| r.args.iter().any(|a| a == "pip"))
            .collect()
    }
}

impl CommandRunner for FakeRunner {
    fn resolve(
        &self,
        program: &str,
        _env: &SessionEnv,
    ) -> std::result::Result<PathBuf, ProgramResolutionError> {
        if self.tools.contains_key(program) {
            Ok(PathBuf::from("/usr/bin").join(program))
        } else {
            Err(ProgramResolutionError::NotFound(program.to_string()))
        }
    }

    fn run(&mut self, request: &CommandRequest, _env: &SessionEnv) -> Result<ExecResult> {
        self.runs.push(request.clone());
        let args: Vec<&str> = request.args.iter().map(String::as_str).collect();

        let exit_code = match args.as_slice() {
            ["-m", "venv", dir] => {
                make_venv(Path::new(dir));
                0
            }
            ["-m", "pip", "install", "--upgrade", "pip"] | ["-m", "pip", "install", "-r", _] => {
                self.pip_exit
            }
            ["-m", "pip", "install", spec] => match self.installable.get(*spec) {
                Some(module) => {
                    self.modules.insert(module.clone());
                    0
                }
                None => 1,
            },
            _ => 127,
        };
        Ok(ExecResult { exit_code })
    }

    fn capture(&mut self, request: &CommandRequest, _env: &SessionEnv) -> Result<CapturedOutput> {
        self.captures.push(request.clone());

        if let Some(banner) = self.tools.get(&request.program) {
            return Ok(CapturedOutput {
                exit_code: 0,
                output: banner.clone(),
            });
        }

        let imported = match request.args.as_slice() {
            [flag, code] if flag == "-c" => code
                .strip_prefix("import ")
                .is_some_and(|module| self.modules.contains(module)),
            _ => false,
        };
        Ok(CapturedOutput {
            exit_code: if imported { 0 } else { 1 },
            output: if imported {
                String::new()
            } else {
                "ModuleNotFoundError".to_string()
            },
        })
    }
}

/// The files `python -m venv` would leave behind that activation relies on
pub fn make_venv(root: &Path) {
    let bin = root.join("bin");
    fs::create_dir_all(&bin).unwrap();
    fs::write(bin.join("activate"), "# activate\n").unwrap();
    fs::write(bin.join("python"), "#!/bin/sh\n").unwrap();
    fs::set_permissions(bin.join("python"), fs::Permissions::from_mode(0o755)).unwrap();
}

/// A fresh checkout of the assistant in a temporary directory
pub struct Checkout {
    pub dir: TempDir,
}

impl Checkout {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), REQUIREMENTS).unwrap();
        fs::write(dir.path().join(".env.example"), TEMPLATE).unwrap();
        fs::write(dir.path().join("run_mac_app.py"), "print('hi')\n").unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> Settings {
        Settings::load_from(self.root()).unwrap()
    }

    pub fn env_file(&self) -> String {
        fs::read_to_string(self.root().join(".env")).unwrap()
    }

    pub fn venv(&self) -> PathBuf {
        self.root().join("supersurf_env")
    }

    /// Entries in the project directory, sorted
    pub fn listing(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn session() -> SessionEnv {
    let mut env = SessionEnv::new();
    env.set("PATH", EnvValue::String("/usr/bin:/bin".into()));
    env.set("HOME", EnvValue::String("/home/tester".into()));
    env
}
