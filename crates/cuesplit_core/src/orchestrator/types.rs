//! Core types for the orchestrator pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cancel::CancelHandle;
use crate::config::ToolSettings;
use crate::logging::RunLogger;
use crate::models::{LoudnessReport, Stage, TrackJob};
use crate::tagging::TagWriter;
use crate::tools::{ToolCommand, ToolError, ToolOutput, ToolRunner};

/// Read-only context passed to pipeline steps for one track job.
///
/// Shared resources are borrowed from the pipeline; mutable state goes in
/// `JobState`.
pub struct Context<'a> {
    /// The job being processed.
    pub job: &'a TrackJob,
    /// External tool locations.
    pub tools: &'a ToolSettings,
    pub runner: &'a dyn ToolRunner,
    pub tagger: &'a dyn TagWriter,
    /// Run logger shared by all workers.
    pub logger: &'a RunLogger,
    pub cancel: &'a CancelHandle,
    /// Resized cover to embed, when enabled and found.
    pub cover: Option<&'a Path>,
    /// Whether the Analyze stage runs rsgain.
    pub replay_gain: bool,
}

impl Context<'_> {
    /// Short label for log lines (`02 Paranoid Android`).
    pub fn label(&self) -> String {
        format!("{:02} {}", self.job.index(), self.job.track.title)
    }

    /// Run a tool, logging the command line and its output.
    pub fn run_tool(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        self.logger.command(&command.to_string());
        let output = self.runner.invoke(command, self.cancel)?;
        self.logger.tool_output(&output.output);
        Ok(output)
    }

    /// Delete the job's output file, if any. A job that does not finish
    /// leaves nothing in the destination directory.
    pub fn discard_output(&self) {
        let path = &self.job.destination_path;
        if !path.exists() {
            return;
        }
        match fs::remove_file(path) {
            Ok(()) => self.logger.debug(&format!("Removed {}", path.display())),
            Err(e) => self.logger.warn(&format!(
                "Could not remove unfinished output {}: {}",
                path.display(),
                e
            )),
        }
    }
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// Steps add their own section and leave earlier sections alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    /// Stage currently being worked on.
    pub stage: Stage,
    /// Extraction results (from Extract step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractOutput>,
    /// Set once tags were written.
    #[serde(default)]
    pub tagged: bool,
    /// ReplayGain scan values (from Analyze step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loudness: Option<LoudnessReport>,
}

impl JobState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Extract,
            extract: None,
            tagged: false,
            loudness: None,
        }
    }

    /// Path of the extracted output file.
    pub fn output_path(&self) -> Option<&Path> {
        self.extract.as_ref().map(|e| e.output_path.as_path())
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}

/// Output from the Extract step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOutput {
    /// Encoded track file.
    pub output_path: PathBuf,
    /// ffmpeg command that produced it.
    pub command: String,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (configuration says so, not an error).
    Skipped(String),
}
