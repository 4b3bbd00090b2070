//! Running external tools.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

use super::command::ToolCommand;
use crate::cancel::CancelHandle;

/// Captured result of a finished tool process.
///
/// A non-zero exit code is reported here; it is up to the caller to treat
/// it as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: i32,
    /// stdout and stderr lines, in the order they were read.
    pub output: String,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last `n` non-empty output lines.
    pub fn tail(&self, n: usize) -> Vec<&str> {
        let lines: Vec<&str> = self
            .output
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let skip = lines.len().saturating_sub(n);
        lines[skip..].to_vec()
    }
}

/// The tool could not be run to completion.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{program} not found (is it installed and on PATH?)")]
    NotFound { program: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Lost track of {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

impl ToolError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled { .. })
    }
}

/// Runs tool commands. Implemented by [`ProcessRunner`] and by fakes in tests.
pub trait ToolRunner: Send + Sync {
    /// Run `command` to completion, or until `cancel` fires.
    fn invoke(&self, command: &ToolCommand, cancel: &CancelHandle) -> Result<ToolOutput, ToolError>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(25),
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// How often the child is checked for exit and cancellation.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl ToolRunner for ProcessRunner {
    fn invoke(&self, command: &ToolCommand, cancel: &CancelHandle) -> Result<ToolOutput, ToolError> {
        let program = command.tool_name().to_string();
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled { program });
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("Running: {}", command);
        let started = Instant::now();

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ToolError::NotFound {
                program: command.program.clone(),
            },
            _ => ToolError::Spawn {
                program: program.clone(),
                source: e,
            },
        })?;

        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, Arc::clone(&lines)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, Arc::clone(&lines)));
        }

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                join_readers(readers);
                tracing::debug!("Killed {} after cancellation", program);
                return Err(ToolError::Cancelled { program });
            }

            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    let _ = child.kill();
                    join_readers(readers);
                    return Err(ToolError::Wait { program, source: e });
                }
            }
        };

        join_readers(readers);
        let output = lines.lock().join("\n");

        Ok(ToolOutput {
            // Killed by a signal
            exit_code: status.code().unwrap_or(-1),
            output,
            duration: started.elapsed(),
        })
    }
}

fn spawn_reader<R>(stream: R, lines: Arc<Mutex<Vec<String>>>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for chunk in reader.split(b'\n') {
            match chunk {
                Ok(bytes) => {
                    let line = String::from_utf8_lossy(&bytes);
                    lines.lock().push(line.trim_end_matches('\r').to_string());
                }
                Err(_) => break,
            }
        }
    })
}

fn join_readers(readers: Vec<JoinHandle<()>>) {
    for reader in readers {
        let _ = reader.join();
    }
}
