//! Analyze step - ReplayGain scan with rsgain.
//!
//! rsgain writes the track gain tags itself; the scan report is kept in
//! the job state so the run report can show loudness values.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::models::Stage;
use crate::tools::rsgain::{track_gain_command, track_report};

const ERROR_TAIL_LINES: usize = 5;

/// Analyze step; skipped when ReplayGain is disabled.
pub struct AnalyzeStep;

impl AnalyzeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnalyzeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AnalyzeStep {
    fn name(&self) -> &str {
        "Analyze"
    }

    fn stage(&self) -> Stage {
        Stage::Analyze
    }

    fn description(&self) -> &str {
        "Compute and store ReplayGain metadata"
    }

    fn validate_input(&self, _ctx: &Context<'_>, state: &JobState) -> StepResult<()> {
        if !state.tagged {
            return Err(StepError::invalid_input("Tag step has not completed"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context<'_>, state: &mut JobState) -> StepResult<StepOutcome> {
        if !ctx.replay_gain {
            return Ok(StepOutcome::Skipped("ReplayGain disabled".to_string()));
        }

        let path = state
            .output_path()
            .ok_or_else(|| StepError::invalid_input("Extract step has not completed"))?;

        let command = track_gain_command(ctx.tools, path);
        let output = ctx.run_tool(&command)?;
        if !output.success() {
            ctx.logger.show_tail("rsgain");
            return Err(StepError::tool_failed(
                command.tool_name(),
                output.exit_code,
                output.tail(ERROR_TAIL_LINES).join("\n"),
            ));
        }

        state.loudness = track_report(&output.output);
        match &state.loudness {
            Some(report) => ctx.logger.info(&format!(
                "{}: {:.2} LUFS, gain {:+.2} dB",
                ctx.label(),
                report.loudness_lufs,
                report.gain_db
            )),
            None => ctx
                .logger
                .debug(&format!("{}: no loudness row in rsgain output", ctx.label())),
        }
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context<'_>, _state: &JobState) -> StepResult<()> {
        Ok(())
    }
}
