use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::errors::SubprocessError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs build tools and the server in the foreground, sharing this
/// process's terminal.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

#[derive(Debug)]
pub struct ProcessOutcome {
    pub program: String,
    pub status: ExitStatus,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn ensure_success(self) -> Result<Self, SubprocessError> {
        if self.success() {
            return Ok(self);
        }
        Err(SubprocessError::Failed {
            program: self.program,
            code: self.status.code(),
        })
    }
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn run(
        &self,
        command: &[String],
        working_dir: &Path,
    ) -> Result<ProcessOutcome, SubprocessError> {
        let (program, args) = command.split_first().ok_or(SubprocessError::Empty)?;
        debug!(
            program = %program,
            args = ?args,
            cwd = %working_dir.display(),
            "running command"
        );

        let child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SubprocessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let status = match self.timeout {
            Some(timeout) => wait_with_timeout(child, program, timeout)?,
            None => wait(child, program)?,
        };
        debug!(program = %program, code = ?status.code(), "command finished");

        Ok(ProcessOutcome {
            program: program.clone(),
            status,
        })
    }
}

fn wait(mut child: Child, program: &str) -> Result<ExitStatus, SubprocessError> {
    child.wait().map_err(|source| SubprocessError::Wait {
        program: program.to_string(),
        source,
    })
}

fn wait_with_timeout(
    mut child: Child,
    program: &str,
    timeout: Duration,
) -> Result<ExitStatus, SubprocessError> {
    let deadline = Instant::now() + timeout;
    loop {
        let polled = child.try_wait().map_err(|source| SubprocessError::Wait {
            program: program.to_string(),
            source,
        })?;
        if let Some(status) = polled {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            warn!(program, timeout_secs = timeout.as_secs(), "command timed out, killing it");
            let _ = child.kill();
            let _ = child.wait();
            return Err(SubprocessError::TimedOut {
                program: program.to_string(),
                timeout,
            });
        }
        sleep(POLL_INTERVAL);
    }
}
