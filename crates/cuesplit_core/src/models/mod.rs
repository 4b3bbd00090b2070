//! Data models for the cuesheet splitter.
//!
//! - Enums for output formats, encoder quality, job stages and outcomes
//! - Track jobs (one output file per cuesheet track)
//! - Per-job and per-run results

mod enums;
mod job;
mod results;

pub use enums::{parse_quality, EncodeProfile, JobOutcome, OutputFormat, Quality, RunStatus, Stage};
pub use job::{AlbumInfo, TrackJob, TrackTags};
pub use results::{JobResult, LoudnessReport, PipelineRun};
