use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::super::env::SessionEnv;
use super::types::ProgramResolutionError;

/// Find `program` the way `execvp` would, but against the session PATH
/// rather than this process's own.
///
/// A name containing `/` is used as-is. Otherwise the first executable file
/// in the PATH directories wins; empty entries are ignored.
pub fn resolve_program_path(
    program: &str,
    env: &SessionEnv,
) -> Result<PathBuf, ProgramResolutionError> {
    if program.contains('/') {
        let path = PathBuf::from(program);

        if !path.exists() {
            return Err(ProgramResolutionError::NoSuchFile(format!(
                "{}: No such file or directory",
                program
            )));
        }

        if !is_executable(&path) {
            return Err(ProgramResolutionError::PermissionDenied(format!(
                "{}: Permission denied",
                program
            )));
        }

        return Ok(path);
    }

    for dir in env.path_dirs() {
        if dir.as_os_str().is_empty() {
            continue;
        }

        let candidate = dir.join(program);
        if candidate.is_file() && is_executable(&candidate) {
            return Ok(candidate);
        }
    }

    Err(ProgramResolutionError::NotFound(format!(
        "{}: command not found",
        program
    )))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::env::EnvValue;
    use std::fs;

    fn write_script(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn env_with_dirs(dirs: &[&Path]) -> SessionEnv {
        let mut env = SessionEnv::new();
        env.set(
            "PATH",
            EnvValue::List(
                dirs.iter()
                    .map(|d| EnvValue::FilePath(d.to_path_buf()))
                    .collect(),
            ),
        );
        env
    }

    #[test]
    fn first_match_on_path_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let expected = write_script(first.path(), "python3", 0o755);
        write_script(second.path(), "python3", 0o755);

        let env = env_with_dirs(&[first.path(), second.path()]);
        assert_eq!(resolve_program_path("python3", &env).unwrap(), expected);
    }

    #[test]
    fn non_executable_files_are_skipped() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_script(first.path(), "pip3", 0o644);
        let expected = write_script(second.path(), "pip3", 0o755);

        let env = env_with_dirs(&[first.path(), second.path()]);
        assert_eq!(resolve_program_path("pip3", &env).unwrap(), expected);
    }

    #[test]
    fn missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_with_dirs(&[dir.path()]);
        let err = resolve_program_path("ffmpeg", &env).unwrap_err();
        assert!(matches!(err, ProgramResolutionError::NotFound(_)));
        assert_eq!(err.to_string(), "ffmpeg: command not found");
    }

    #[test]
    fn literal_path_must_be_executable() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "run.sh", 0o644);
        let err = resolve_program_path(script.to_str().unwrap(), &SessionEnv::new()).unwrap_err();
        assert!(matches!(err, ProgramResolutionError::PermissionDenied(_)));
    }
}
