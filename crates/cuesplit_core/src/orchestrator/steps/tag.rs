//! Tag step - writes cuesheet metadata onto the extracted file.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::models::Stage;

/// Tag step; replaces whatever tags the file carries.
pub struct TagStep;

impl TagStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TagStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for TagStep {
    fn name(&self) -> &str {
        "Tag"
    }

    fn stage(&self) -> Stage {
        Stage::Tag
    }

    fn description(&self) -> &str {
        "Write title, artist, album and track number tags"
    }

    fn validate_input(&self, _ctx: &Context<'_>, state: &JobState) -> StepResult<()> {
        match state.output_path() {
            Some(path) if path.is_file() => Ok(()),
            Some(path) => Err(StepError::invalid_input(format!(
                "Extracted file disappeared: {}",
                path.display()
            ))),
            None => Err(StepError::invalid_input("Extract step has not completed")),
        }
    }

    fn execute(&self, ctx: &Context<'_>, state: &mut JobState) -> StepResult<StepOutcome> {
        let path = state
            .output_path()
            .ok_or_else(|| StepError::invalid_input("Extract step has not completed"))?;

        let tags = ctx.job.tags();
        ctx.tagger
            .write_tags(path, &tags, ctx.cover)
            .map_err(|e| StepError::Tagging(e.to_string()))?;

        ctx.logger.debug(&format!(
            "Tagged {} ({} / {} / {}/{})",
            path.display(),
            tags.artist,
            tags.album,
            tags.track_number,
            tags.track_total
        ));
        state.tagged = true;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context<'_>, state: &JobState) -> StepResult<()> {
        if state.tagged {
            Ok(())
        } else {
            Err(StepError::invalid_output("Tags were not written"))
        }
    }
}
