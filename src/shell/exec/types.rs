use std::fmt;

/// A program invocation: name (or path) plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: u8,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of a run whose stdout and stderr were collected (interleaved, as a
/// terminal would show them) instead of shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub exit_code: u8,
    pub output: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Why a program name did not resolve to something runnable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramResolutionError {
    /// Not in any session PATH directory
    NotFound(String),
    /// A path (contains `/`) that does not exist
    NoSuchFile(String),
    /// Exists but no execute bit is set
    PermissionDenied(String),
}

impl ProgramResolutionError {
    pub fn message(&self) -> &str {
        match self {
            ProgramResolutionError::NotFound(msg)
            | ProgramResolutionError::NoSuchFile(msg)
            | ProgramResolutionError::PermissionDenied(msg) => msg,
        }
    }
}

impl fmt::Display for ProgramResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

