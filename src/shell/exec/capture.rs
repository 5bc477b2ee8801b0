use std::fs::File;
use std::io::Read;
use std::os::unix::io::AsRawFd;

use nix::libc;
use nix::unistd::{ForkResult, fork, pipe};

use super::types::CapturedOutput;
use super::{PreparedExec, wait_for_child};
use crate::error::{BootstrapError, Result};

/// Run a prepared program with stdout and stderr sent into one pipe
pub(super) fn run_captured(prepared: &PreparedExec, program: &str) -> Result<CapturedOutput> {
    let (read_end, write_end) = pipe().map_err(|e| BootstrapError::Exec {
        program: program.to_string(),
        reason: format!("failed to create pipe: {}", e),
    })?;

    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            // Parent: close the write end so EOF arrives when the child exits
            drop(write_end);

            // Drain before waiting so a chatty child can't block on a full pipe
            let mut bytes = Vec::new();
            let read_result = File::from(read_end).read_to_end(&mut bytes);
            let status = wait_for_child(child, program)?;
            read_result.map_err(|e| BootstrapError::io(format!("reading output of {}", program), e))?;

            Ok(CapturedOutput {
                exit_code: status.exit_code,
                output: String::from_utf8_lossy(&bytes).into_owned(),
            })
        }
        Ok(ForkResult::Child) => {
            drop(read_end);
            unsafe {
                libc::dup2(write_end.as_raw_fd(), 1); // stdout
                libc::dup2(write_end.as_raw_fd(), 2); // stderr
            }
            drop(write_end);

            prepared.exec_in_child();
        }
        Err(e) => Err(BootstrapError::Exec {
            program: program.to_string(),
            reason: format!("fork failed: {}", e),
        }),
    }
}
