mod capture;
mod resolution;
mod types;

use std::convert::Infallible;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::libc::c_int;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execve, fork};
use tracing::debug;

pub use resolution::resolve_program_path;
pub use types::{CapturedOutput, CommandRequest, ExecResult, ProgramResolutionError};

use crate::error::{BootstrapError, Result};
use crate::shell::env::SessionEnv;

/// Everything the bootstrap flows need from the operating system's process
/// layer. The real implementation forks and execs; tests substitute a fake.
pub trait CommandRunner {
    /// Locate a program the way a shell would, using the session PATH
    fn resolve(
        &self,
        program: &str,
        env: &SessionEnv,
    ) -> std::result::Result<PathBuf, ProgramResolutionError> {
        resolve_program_path(program, env)
    }

    /// Run a program in the foreground with the terminal attached
    fn run(&mut self, request: &CommandRequest, env: &SessionEnv) -> Result<ExecResult>;

    /// Run a program with stdout and stderr collected
    fn capture(&mut self, request: &CommandRequest, env: &SessionEnv) -> Result<CapturedOutput>;
}

/// Runs programs with fork/execve, passing the session environment
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, request: &CommandRequest, env: &SessionEnv) -> Result<ExecResult> {
        let prepared = PreparedExec::new(&*self, request, env)?;
        debug!(command = %request, path = %prepared.path_display(), "running");

        let guard = InterruptGuard::install()?;
        let result = match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => wait_for_child(child, &request.program),
            Ok(ForkResult::Child) => prepared.exec_in_child(),
            Err(e) => Err(BootstrapError::Exec {
                program: request.program.clone(),
                reason: format!("fork failed: {}", e),
            }),
        };
        guard.check()?;
        result
    }

    fn capture(&mut self, request: &CommandRequest, env: &SessionEnv) -> Result<CapturedOutput> {
        let prepared = PreparedExec::new(&*self, request, env)?;
        debug!(command = %request, path = %prepared.path_display(), "capturing");

        let guard = InterruptGuard::install()?;
        let result = capture::run_captured(&prepared, &request.program);
        guard.check()?;
        result
    }
}

/// Replace the current process with `program` (the launcher hand-off).
///
/// Only returns if execve itself fails.
pub fn replace_process(program: &Path, args: &[String], env: &SessionEnv) -> Result<Infallible> {
    let request = CommandRequest::new(program.to_string_lossy()).args(args.iter().cloned());
    let prepared = PreparedExec::from_path(program.to_path_buf(), &request, env)?;
    debug!(command = %request, "handing off");

    match execve(&prepared.path, &prepared.argv, &prepared.envp) {
        Ok(never) => match never {},
        Err(e) => Err(BootstrapError::Exec {
            program: request.program,
            reason: e.to_string(),
        }),
    }
}

/// Everything execve needs, built before forking so the child does no
/// allocation-heavy work and errors surface in the parent.
pub(crate) struct PreparedExec {
    path: CString,
    argv: Vec<CString>,
    envp: Vec<CString>,
}

impl PreparedExec {
    fn new<R: CommandRunner + ?Sized>(
        runner: &R,
        request: &CommandRequest,
        env: &SessionEnv,
    ) -> Result<Self> {
        let path = runner
            .resolve(&request.program, env)
            .map_err(|e| BootstrapError::Exec {
                program: request.program.clone(),
                reason: e.message().to_string(),
            })?;
        Self::from_path(path, request, env)
    }

    fn from_path(path: PathBuf, request: &CommandRequest, env: &SessionEnv) -> Result<Self> {
        let nul_error = |what: &str| BootstrapError::Exec {
            program: request.program.clone(),
            reason: format!("{} contains a null byte", what),
        };

        let path = CString::new(path.to_string_lossy().as_bytes())
            .map_err(|_| nul_error("program path"))?;

        // argv[0] is the program name as given, not the full path
        let mut argv = Vec::with_capacity(request.args.len() + 1);
        argv.push(CString::new(request.program.as_str()).map_err(|_| nul_error("program name"))?);
        for arg in &request.args {
            argv.push(CString::new(arg.as_str()).map_err(|_| nul_error("argument"))?);
        }

        Ok(Self {
            path,
            argv,
            envp: env.to_envp(),
        })
    }

    fn path_display(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Exec the prepared program in a forked child (never returns)
    pub(crate) fn exec_in_child(&self) -> ! {
        if let Err(err) = execve(&self.path, &self.argv, &self.envp) {
            eprintln!("Failed to execute {}: {}", self.path_display(), err);
        }
        std::process::exit(127);
    }
}

/// Wait for a child and convert its status to an ExecResult
pub(crate) fn wait_for_child(child: Pid, program: &str) -> Result<ExecResult> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_pid, exit_code)) => {
                return Ok(ExecResult {
                    exit_code: exit_code as u8,
                });
            }
            Ok(WaitStatus::Signaled(_pid, signal, _core_dump)) => {
                return Ok(ExecResult {
                    exit_code: 128 + (signal as i32) as u8,
                });
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => {
                return Err(BootstrapError::Exec {
                    program: program.to_string(),
                    reason: format!("waitpid failed: {}", e),
                });
            }
        }
    }
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn record_interrupt(_signal: c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Keeps SIGINT from killing this process while a child runs in the
/// foreground. The child still receives the interrupt; afterwards the flow
/// stops with [`BootstrapError::Interrupted`]. Dropping the guard puts the
/// previous disposition back, so Ctrl-C at a later prompt behaves normally.
struct InterruptGuard {
    previous: SigAction,
}

impl InterruptGuard {
    fn install() -> Result<Self> {
        INTERRUPTED.store(false, Ordering::SeqCst);
        // A caught signal is reset to the default in the child on execve
        let action = SigAction::new(
            SigHandler::Handler(record_interrupt),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        let previous = unsafe { sigaction(Signal::SIGINT, &action) }
            .map_err(|e| BootstrapError::io("failed to install SIGINT handler", e.into()))?;
        Ok(Self { previous })
    }

    fn check(&self) -> Result<()> {
        if INTERRUPTED.load(Ordering::SeqCst) {
            return Err(BootstrapError::Interrupted);
        }
        Ok(())
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Err(e) = unsafe { sigaction(Signal::SIGINT, &self.previous) } {
            debug!(error = %e, "failed to restore SIGINT disposition");
        }
    }
}
