//! Extract step - cuts one track out of the source image with ffmpeg.
//!
//! ffmpeg seeks to the track start, stops after the track duration (or at
//! the end of the image for the last track) and encodes straight into the
//! destination file. A failed run never leaves a partial output behind.

use std::fs;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, ExtractOutput, JobState, StepOutcome};
use crate::models::Stage;
use crate::tools::ffmpeg::extract_command;

/// Lines of ffmpeg output quoted in a failure message.
const ERROR_TAIL_LINES: usize = 5;

/// Extract step for producing the encoded track file.
pub struct ExtractStep;

impl ExtractStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ExtractStep {
    fn name(&self) -> &str {
        "Extract"
    }

    fn stage(&self) -> Stage {
        Stage::Extract
    }

    fn description(&self) -> &str {
        "Cut and encode the track from the source image"
    }

    fn validate_input(&self, ctx: &Context<'_>, _state: &JobState) -> StepResult<()> {
        let source = &ctx.job.source_path;
        if !source.is_file() {
            return Err(StepError::invalid_input(format!(
                "Source audio not found: {}",
                source.display()
            )));
        }

        match ctx.job.destination_path.parent() {
            Some(dir) if dir.is_dir() => Ok(()),
            _ => Err(StepError::invalid_input(format!(
                "Destination directory missing for {}",
                ctx.job.destination_path.display()
            ))),
        }
    }

    fn execute(&self, ctx: &Context<'_>, state: &mut JobState) -> StepResult<StepOutcome> {
        let command = extract_command(ctx.tools, ctx.job);
        let command_line = command.to_string();

        let output = match ctx.run_tool(&command) {
            Ok(output) => output,
            Err(e) => {
                ctx.discard_output();
                return Err(e.into());
            }
        };

        if !output.success() {
            ctx.discard_output();
            ctx.logger.show_tail("ffmpeg");
            return Err(StepError::tool_failed(
                command.tool_name(),
                output.exit_code,
                output.tail(ERROR_TAIL_LINES).join("\n"),
            ));
        }

        ctx.logger.info(&format!(
            "Extracted {} in {:.1}s",
            ctx.label(),
            output.duration.as_secs_f64()
        ));

        state.extract = Some(ExtractOutput {
            output_path: ctx.job.destination_path.clone(),
            command: command_line,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context<'_>, state: &JobState) -> StepResult<()> {
        let path = state
            .output_path()
            .ok_or_else(|| StepError::invalid_output("Extraction did not record an output"))?;

        let size = fs::metadata(path)
            .map_err(|e| StepError::filesystem(format!("reading {}", path.display()), e))?
            .len();

        if size == 0 {
            ctx.discard_output();
            return Err(StepError::invalid_output(format!(
                "Output file is empty: {}",
                path.display()
            )));
        }

        ctx.logger.debug(&format!("{}: {} bytes", path.display(), size));
        Ok(())
    }
}
