use std::collections::HashMap;
use std::ffi::CString;
use std::path::{Path, PathBuf};

/// Represents a value stored in the session environment
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    String(String),
    List(Vec<EnvValue>),
    FilePath(PathBuf),
}

impl EnvValue {
    /// Recursively convert an EnvValue to the string handed to child processes
    pub(crate) fn to_string_repr(&self) -> String {
        match self {
            EnvValue::String(s) => s.clone(),
            EnvValue::List(items) => items
                .iter()
                .map(|item| item.to_string_repr())
                .collect::<Vec<_>>()
                .join(":"),
            EnvValue::FilePath(path) => path.to_string_lossy().to_string(),
        }
    }

    /// Parse an inherited value. Only search-path variables are split into
    /// lists; everything else is kept verbatim so children see exactly what
    /// the parent saw.
    fn parse_from_string(key: &str, s: &str) -> EnvValue {
        if is_search_path(key) {
            return EnvValue::List(
                s.split(':')
                    .map(|dir| EnvValue::FilePath(PathBuf::from(dir)))
                    .collect(),
            );
        }
        EnvValue::String(s.to_string())
    }
}

fn is_search_path(key: &str) -> bool {
    matches!(key, "PATH" | "MANPATH")
}

/// The variables handed to every child process this tool spawns.
///
/// Activation of the isolated environment mutates this value instead of the
/// real process environment, so a failed activation never leaks into the
/// parent and tests can build one from scratch.
#[derive(Debug, Clone, Default)]
pub struct SessionEnv {
    env_vars: HashMap<String, EnvValue>,
}

impl SessionEnv {
    /// Create a new empty session environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session environment initialized from the parent process
    pub fn from_parent() -> Self {
        let mut env = Self::new();
        for (key, value) in std::env::vars() {
            let parsed = EnvValue::parse_from_string(&key, &value);
            env.env_vars.insert(key, parsed);
        }

        // HOME is either inherited from the parent, or retrieved from the user database
        if !env.contains_key("HOME")
            && let Some(path) = home::home_dir()
            && !path.as_os_str().is_empty()
        {
            env.set("HOME", EnvValue::FilePath(path));
        }

        // Default path is /usr/bin:/bin (and /usr/sbin:/sbin on macOS)
        if !env.contains_key("PATH") {
            let mut default_paths = vec![
                EnvValue::FilePath(PathBuf::from("/usr/bin")),
                EnvValue::FilePath(PathBuf::from("/bin")),
            ];

            #[cfg(target_os = "macos")]
            {
                default_paths.push(EnvValue::FilePath(PathBuf::from("/usr/sbin")));
                default_paths.push(EnvValue::FilePath(PathBuf::from("/sbin")));
            }

            env.set("PATH", EnvValue::List(default_paths));
        }

        env
    }

    /// Get an environment variable value
    pub fn get(&self, key: &str) -> Option<&EnvValue> {
        self.env_vars.get(key)
    }

    /// Get a variable rendered as the string a child would see
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.env_vars.get(key).map(EnvValue::to_string_repr)
    }

    /// Set an environment variable
    pub fn set(&mut self, key: impl Into<String>, value: EnvValue) {
        self.env_vars.insert(key.into(), value);
    }

    /// Set a variable only if it is not already present. Returns true if it was set.
    pub fn set_default(&mut self, key: &str, value: &str) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.set(key, EnvValue::String(value.to_string()));
        true
    }

    /// Remove an environment variable
    pub fn unset(&mut self, key: &str) -> Option<EnvValue> {
        self.env_vars.remove(key)
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.env_vars.contains_key(key)
    }

    /// Get the number of environment variables
    pub fn len(&self) -> usize {
        self.env_vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.env_vars.is_empty()
    }

    /// PATH directories in search order.
    ///
    /// Supports both the List and String variants; an unset PATH yields the
    /// conventional default.
    pub fn path_dirs(&self) -> Vec<PathBuf> {
        match self.get("PATH") {
            Some(EnvValue::List(items)) => items
                .iter()
                .map(|item| PathBuf::from(item.to_string_repr()))
                .collect(),
            Some(EnvValue::String(s)) => s.split(':').map(PathBuf::from).collect(),
            Some(EnvValue::FilePath(p)) => vec![p.clone()],
            None => vec![
                PathBuf::from("/usr/local/bin"),
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin"),
            ],
        }
    }

    /// Put `dir` at the front of PATH, removing any other occurrence of it
    pub fn prepend_path(&mut self, dir: &Path) {
        let mut dirs: Vec<EnvValue> = self
            .path_dirs()
            .into_iter()
            .filter(|existing| existing != dir)
            .map(EnvValue::FilePath)
            .collect();
        dirs.insert(0, EnvValue::FilePath(dir.to_path_buf()));
        self.set("PATH", EnvValue::List(dirs));
    }

    /// Convert environment to Vec<CString> in "KEY=VALUE" format for execve
    pub fn to_envp(&self) -> Vec<CString> {
        self.env_vars
            .iter()
            .filter_map(|(key, value)| {
                CString::new(format!("{}={}", key, value.to_string_repr())).ok()
            })
            .collect()
    }
}
