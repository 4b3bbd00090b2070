//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Track → Step → Tool

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::tools::ToolError;

/// Run-level error that stops every job from starting.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A destination directory could not be created.
    #[error("Cannot create destination {}: {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// There is nothing to run.
    #[error("No track jobs to run")]
    NoJobs,
}

impl PipelineError {
    pub fn destination(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Destination {
            path: path.into(),
            source,
        }
    }
}

/// Error from a pipeline step; ends the job at the step's stage.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// The tool could not be started.
    #[error(transparent)]
    ToolInvocation(ToolError),

    /// The tool ran and reported failure.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    ToolExecution {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Filesystem {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Tags could not be written.
    #[error("Tagging failed: {0}")]
    Tagging(String),

    /// Cancellation stopped the step.
    #[error("Cancelled")]
    Cancelled,
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create a tool execution error.
    pub fn tool_failed(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn filesystem(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Filesystem {
            operation: operation.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StepError::Cancelled)
    }
}

impl From<ToolError> for StepError {
    fn from(err: ToolError) -> Self {
        if err.is_cancelled() {
            StepError::Cancelled
        } else {
            StepError::ToolInvocation(err)
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
