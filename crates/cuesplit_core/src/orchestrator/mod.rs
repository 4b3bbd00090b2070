//! Pipeline orchestrator for running track jobs.
//!
//! Every track job runs the same sequence of steps on one worker thread.
//! Each step validates its input, executes, and validates its output.
//!
//! # Architecture
//!
//! ```text
//! JobPipeline
//!     ├── prepare destinations, copy cover
//!     ├── workers (one job at a time each)
//!     │     ├── Step: Extract
//!     │     ├── Step: Tag
//!     │     └── Step: Analyze
//!     └── album gain (optional)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cuesplit_core::orchestrator::{ChannelSink, JobPipeline};
//!
//! let (tx, rx) = crossbeam_channel::unbounded();
//! let pipeline = JobPipeline::new(settings.pipeline, settings.tools, runner)
//!     .with_sink(Arc::new(ChannelSink(tx)));
//!
//! let run = pipeline.run(jobs, 4);
//! println!("{}", run.summary());
//! ```

mod errors;
mod pipeline;
mod status;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::JobPipeline;
pub use status::{ChannelSink, NullSink, StatusEvent, StatusSink, TrackState, TracingSink};
pub use step::PipelineStep;
pub use steps::{AnalyzeStep, ExtractStep, TagStep};
pub use types::{Context, ExtractOutput, JobState, StepOutcome};
