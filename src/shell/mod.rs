pub mod env;
pub mod exec;

// Re-export commonly used types and functions
pub use env::{EnvValue, SessionEnv};
pub use exec::{
    CapturedOutput, CommandRequest, CommandRunner, ExecResult, ProgramResolutionError,
    SystemRunner, replace_process, resolve_program_path,
};
