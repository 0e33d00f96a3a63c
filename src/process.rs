use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Empty command line")]
    EmptyCommand,
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Working directory does not exist: {0}")]
    MissingWorkingDirectory(PathBuf),
}

/// A fully assembled command line and where to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program followed by its arguments.
    pub command_line: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(command_line: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Invocation {
            command_line,
            cwd: cwd.into(),
        }
    }

    /// The command line as a single space-joined string, for diagnostics.
    pub fn display_command(&self) -> String {
        self.command_line.join(" ")
    }
}

/// Everything observed about one run of the tool under test.
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    pub invocation: Invocation,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub started: SystemTime,
    pub finished: SystemTime,
    pub duration: Duration,
}

impl InvocationRecord {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs the tool to completion and captures its output verbatim.
///
/// Blocks until the process exits. There is no timeout; long runs are only
/// flagged afterwards by the caller.
pub fn run(invocation: &Invocation) -> Result<InvocationRecord, ProcessError> {
    let (program, args) = invocation
        .command_line
        .split_first()
        .ok_or(ProcessError::EmptyCommand)?;

    if !invocation.cwd.is_dir() {
        return Err(ProcessError::MissingWorkingDirectory(
            invocation.cwd.clone(),
        ));
    }

    info!(
        "Running {} in {}",
        invocation.display_command(),
        invocation.cwd.display()
    );

    let started = SystemTime::now();
    let clock = Instant::now();

    let output = Command::new(resolve_program(program))
        .args(args)
        .current_dir(&invocation.cwd)
        .output()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    let duration = clock.elapsed();
    let finished = SystemTime::now();

    debug!(
        "{} exited with {:?} after {:.3}s",
        program,
        output.status.code(),
        duration.as_secs_f64()
    );

    Ok(InvocationRecord {
        invocation: invocation.clone(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status: output.status.code(),
        started,
        finished,
        duration,
    })
}

/// Relative program paths containing a separator are resolved against the
/// caller's working directory, not the child's.
fn resolve_program(program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative()
        && path.components().count() > 1
        && let Ok(current) = std::env::current_dir()
    {
        return current.join(path);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str, cwd: &Path) -> Invocation {
        Invocation::new(
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            cwd,
        )
    }

    #[test]
    #[cfg(unix)]
    fn run_captures_stdout_stderr_and_status() {
        let temp = TempDir::new().unwrap();

        let record = run(&sh("echo out; echo err >&2; exit 3", temp.path())).unwrap();

        assert_eq!(record.stdout, "out\n");
        assert_eq!(record.stderr, "err\n");
        assert_eq!(record.status, Some(3));
        assert!(!record.success());
        assert!(record.finished >= record.started);
    }

    #[test]
    #[cfg(unix)]
    fn run_uses_working_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();

        let record = run(&sh("touch made-here", &temp.path().join("sub"))).unwrap();

        assert!(record.success());
        assert!(temp.path().join("sub/made-here").exists());
    }

    #[test]
    #[cfg(unix)]
    fn run_measures_duration() {
        let temp = TempDir::new().unwrap();

        let record = run(&sh("sleep 0.2", temp.path())).unwrap();

        assert!(record.duration >= Duration::from_millis(200));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let temp = TempDir::new().unwrap();
        let invocation = Invocation::new(
            vec!["buildward-definitely-not-installed".to_string()],
            temp.path(),
        );

        let result = run(&invocation);

        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[test]
    fn empty_command_line_is_rejected() {
        let temp = TempDir::new().unwrap();

        let result = run(&Invocation::new(Vec::new(), temp.path()));

        assert!(matches!(result, Err(ProcessError::EmptyCommand)));
    }

    #[test]
    fn missing_working_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        let invocation = Invocation::new(vec!["true".to_string()], temp.path().join("nope"));

        let result = run(&invocation);

        assert!(matches!(
            result,
            Err(ProcessError::MissingWorkingDirectory(_))
        ));
    }

    #[test]
    fn display_command_joins_arguments() {
        let invocation = Invocation::new(
            vec!["bjam".to_string(), "-d0".to_string(), "toolset=gcc".to_string()],
            "/tmp",
        );

        assert_eq!(invocation.display_command(), "bjam -d0 toolset=gcc");
    }
}
