//! Job and run results.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::enums::{JobOutcome, RunStatus, Stage};
use super::job::TrackJob;

/// ReplayGain scan values for one file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoudnessReport {
    /// Integrated loudness in LUFS.
    pub loudness_lufs: f64,
    /// Gain to reach the reference level, in dB.
    pub gain_db: f64,
    /// Sample peak (linear, 1.0 = full scale).
    pub peak: f64,
}

/// Terminal state of one track job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Track ordinal.
    pub index: u32,
    /// Output file the job targeted.
    pub destination: PathBuf,
    /// Stage the job ended at (`Done` on success).
    pub stage: Stage,
    pub outcome: JobOutcome,
    /// Loudness values, when the Analyze stage ran and its output was readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loudness: Option<LoudnessReport>,
    /// Wall time spent on the job.
    pub elapsed: Duration,
}

impl JobResult {
    /// Job finished every stage.
    pub fn done(job: &TrackJob, loudness: Option<LoudnessReport>, elapsed: Duration) -> Self {
        Self {
            index: job.index(),
            destination: job.destination_path.clone(),
            stage: Stage::Done,
            outcome: JobOutcome::Success,
            loudness,
            elapsed,
        }
    }

    /// Job failed at `stage`.
    pub fn failed(job: &TrackJob, stage: Stage, reason: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            index: job.index(),
            destination: job.destination_path.clone(),
            stage,
            outcome: JobOutcome::Failed(reason.into()),
            loudness: None,
            elapsed,
        }
    }

    /// Job stopped by cancellation at `stage`.
    pub fn cancelled(job: &TrackJob, stage: Stage, elapsed: Duration) -> Self {
        Self {
            index: job.index(),
            destination: job.destination_path.clone(),
            stage,
            outcome: JobOutcome::Cancelled,
            loudness: None,
            elapsed,
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done && self.outcome.is_success()
    }
}

/// Outcome of one pipeline run over a cuesheet's jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub jobs: Vec<TrackJob>,
    /// Results keyed by track ordinal.
    pub results: BTreeMap<u32, JobResult>,
    pub status: RunStatus,
    /// Resized cover written next to the tracks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<PathBuf>,
    /// Non-fatal problems (cover, album gain).
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Pre-run failure that stopped every job from starting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
    /// Cancellation was requested during the run.
    #[serde(default)]
    pub cancelled: bool,
}

impl PipelineRun {
    /// A run that is about to start.
    pub fn new(jobs: Vec<TrackJob>) -> Self {
        Self {
            jobs,
            results: BTreeMap::new(),
            status: RunStatus::Running,
            cover: None,
            warnings: Vec::new(),
            fatal_error: None,
            cancelled: false,
        }
    }

    /// A run that failed before any job started.
    pub fn fatal(jobs: Vec<TrackJob>, error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            fatal_error: Some(error.into()),
            ..Self::new(jobs)
        }
    }

    /// Aggregate status from the recorded results.
    pub fn compute_status(&self) -> RunStatus {
        if self.fatal_error.is_some() {
            return RunStatus::Failed;
        }
        let done = self.done_count();
        if !self.jobs.is_empty() && done == self.jobs.len() {
            RunStatus::Succeeded
        } else if done == 0 {
            RunStatus::Failed
        } else {
            RunStatus::PartiallyFailed
        }
    }

    pub fn done_count(&self) -> usize {
        self.results.values().filter(|r| r.is_done()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .values()
            .filter(|r| matches!(r.outcome, JobOutcome::Failed(_)))
            .count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.results
            .values()
            .filter(|r| r.outcome == JobOutcome::Cancelled)
            .count()
    }

    /// Output files of jobs that reached Done, in track order.
    pub fn successful_outputs(&self) -> Vec<PathBuf> {
        self.results
            .values()
            .filter(|r| r.is_done())
            .map(|r| r.destination.clone())
            .collect()
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        if let Some(err) = &self.fatal_error {
            return format!("{}: {}", self.status, err);
        }
        format!(
            "{}: {}/{} tracks done, {} failed, {} cancelled",
            self.status,
            self.done_count(),
            self.jobs.len(),
            self.failed_count(),
            self.cancelled_count()
        )
    }
}
