//! The unit of work a job is made of.

use super::errors::StepResult;
use super::types::{Context, JobState, StepOutcome};
use crate::models::Stage;

/// One stage of a track job.
///
/// The pipeline calls `validate_input`, then `execute`, then
/// `validate_output` (only after [`StepOutcome::Success`]). Any error ends
/// the job at this step's [`Stage`]; a cancelled error ends it `Cancelled`.
///
/// ```ignore
/// struct ChecksumStep;
///
/// impl PipelineStep for ChecksumStep {
///     fn name(&self) -> &str { "Checksum" }
///     fn stage(&self) -> Stage { Stage::Analyze }
///
///     fn validate_input(&self, _ctx: &Context<'_>, state: &JobState) -> StepResult<()> {
///         match state.output_path().is_some() {
///             true => Ok(()),
///             false => Err(StepError::invalid_input("Nothing extracted")),
///         }
///     }
///
///     fn execute(&self, ctx: &Context<'_>, state: &mut JobState) -> StepResult<StepOutcome> {
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context<'_>, _state: &JobState) -> StepResult<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Short name used in failure reasons ("Extract: ...").
    fn name(&self) -> &str;

    fn stage(&self) -> Stage;

    /// Preconditions: source readable, earlier steps' output present.
    fn validate_input(&self, ctx: &Context<'_>, state: &JobState) -> StepResult<()>;

    /// Do the work and record what it produced in `state`.
    fn execute(&self, ctx: &Context<'_>, state: &mut JobState) -> StepResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context<'_>, state: &JobState) -> StepResult<()>;

    /// Phase title in the run log.
    fn description(&self) -> &str {
        self.name()
    }
}
