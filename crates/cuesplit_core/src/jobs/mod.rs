//! Turning cuesheets into track jobs and running them.
//!
//! This module provides:
//! - `SplitRequest` / `plan_jobs`: one `TrackJob` per cuesheet track
//! - `SplitSession`: load, probe, plan, run and post-process a cuesheet
//! - `BatchSummary`: outcome of several cuesheets processed in sequence

mod planner;
mod session;

pub use planner::{plan_jobs, resolve_source, SplitRequest};
pub use session::{BatchFailure, BatchSummary, SessionError, SplitReport, SplitSession};
