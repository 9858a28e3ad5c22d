//! External process invocation
//!
//! The benchmark never calls `std::process` directly; it goes through a
//! [`ToolInvoker`] so runs can be scripted in tests without the aligners
//! installed.

use crate::error::BenchError;
use log::debug;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a running child is polled while a time limit applies
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Program plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ToolCommand {
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

    /// Base name of the program, for log tags
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of one finished process
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub elapsed: Duration,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`BenchError::ExternalTool`]
    pub fn check(self, command: &ToolCommand) -> Result<Invocation, BenchError> {
        if self.success() {
            Ok(self)
        } else {
            Err(BenchError::ExternalTool {
                command: command.to_string(),
                code: self.code,
                stderr: self.stderr,
            })
        }
    }
}

/// Synchronous capability to run an external command to completion
pub trait ToolInvoker: Sync {
    fn invoke(&self, command: &ToolCommand) -> Result<Invocation, BenchError>;
}

/// Runs commands as child processes, optionally bounded by a wall-clock limit
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        ProcessInvoker { timeout }
    }

    fn wait(
        &self,
        child: &mut std::process::Child,
        command: &ToolCommand,
        started: Instant,
    ) -> Result<ExitStatus, BenchError> {
        let process_error = |source| BenchError::Process {
            command: command.to_string(),
            source,
        };

        let Some(limit) = self.timeout else {
            return child.wait().map_err(process_error);
        };

        loop {
            if let Some(status) = child.try_wait().map_err(process_error)? {
                return Ok(status);
            }
            if started.elapsed() >= limit {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BenchError::Timeout {
                    command: command.to_string(),
                    limit,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ToolInvoker for ProcessInvoker {
    fn invoke(&self, command: &ToolCommand) -> Result<Invocation, BenchError> {
        debug!("[{}] Running: {}", command.name(), command);

        let started = Instant::now();
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BenchError::Process {
                command: command.to_string(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty child cannot block on a full pipe
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait(&mut child, command, started)?;
        let elapsed = started.elapsed();

        Ok(Invocation {
            stdout: collect(stdout),
            stderr: collect(stderr),
            code: status.code(),
            elapsed,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display_quotes_spaced_args() {
        let cmd = ToolCommand::new("/usr/bin/blastn")
            .arg("-outfmt")
            .arg("6 qseqid sseqid")
            .args(["-task", "blastn"]);
        assert_eq!(
            cmd.to_string(),
            "/usr/bin/blastn -outfmt '6 qseqid sseqid' -task blastn"
        );
        assert_eq!(cmd.name(), "blastn");
    }

    #[test]
    fn test_check_non_zero_exit() {
        let cmd = ToolCommand::new("lastz");
        let inv = Invocation {
            stdout: String::new(),
            stderr: "bad option".to_string(),
            code: Some(1),
            elapsed: Duration::from_millis(5),
        };
        match inv.check(&cmd).unwrap_err() {
            BenchError::ExternalTool { command, code, stderr } => {
                assert_eq!(command, "lastz");
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "bad option");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_process_captures_output() {
        let invoker = ProcessInvoker::default();
        let cmd = ToolCommand::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let inv = invoker.invoke(&cmd).unwrap();
        assert_eq!(inv.stdout, "out\n");
        assert_eq!(inv.stderr, "err\n");
        assert_eq!(inv.code, Some(3));
        assert!(!inv.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_timeout() {
        let invoker = ProcessInvoker::new(Some(Duration::from_millis(100)));
        let cmd = ToolCommand::new("sh").args(["-c", "sleep 5"]);
        let err = invoker.invoke(&cmd).unwrap_err();
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_missing_program() {
        let invoker = ProcessInvoker::default();
        let err = invoker
            .invoke(&ToolCommand::new("/nonexistent/alnbench/aligner"))
            .unwrap_err();
        assert_eq!(err.kind(), "process");
    }
}
