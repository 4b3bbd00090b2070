//! Job pipeline: runs every track job through its steps on a worker pool.
//!
//! Before the workers start, the pipeline creates the destination
//! directories and copies the cover. Each worker pulls jobs from a shared
//! queue and runs all stages of a job before claiming the next one. After
//! the workers finish, an optional album gain pass runs over the
//! successful tracks.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::errors::{PipelineError, StepResult};
use super::status::{NullSink, StatusEvent, StatusSink, TrackState};
use super::step::PipelineStep;
use super::steps::{AnalyzeStep, ExtractStep, TagStep};
use super::types::{Context, JobState, StepOutcome};
use crate::cancel::CancelHandle;
use crate::config::{auto_concurrency, PipelineSettings, ToolSettings};
use crate::cover::{find_cover, write_resized_cover};
use crate::logging::{LogConfig, RunLogger};
use crate::models::{JobResult, PipelineRun, Stage, TrackJob};
use crate::tagging::{LoftyTagWriter, TagWriter};
use crate::tools::rsgain::{album_gain_command, album_report};
use crate::tools::ToolRunner;

/// Runs track jobs through Extract, Tag and Analyze.
pub struct JobPipeline {
    settings: PipelineSettings,
    tools: ToolSettings,
    /// Steps run in order for every job.
    steps: Vec<Box<dyn PipelineStep>>,
    runner: Arc<dyn ToolRunner>,
    tagger: Arc<dyn TagWriter>,
    sink: Arc<dyn StatusSink>,
    logger: Arc<RunLogger>,
    cancel: CancelHandle,
}

impl JobPipeline {
    /// Create a pipeline with the standard steps.
    pub fn new(settings: PipelineSettings, tools: ToolSettings, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            settings,
            tools,
            steps: vec![
                Box::new(ExtractStep::new()),
                Box::new(TagStep::new()),
                Box::new(AnalyzeStep::new()),
            ],
            runner,
            tagger: Arc::new(LoftyTagWriter),
            sink: Arc::new(NullSink),
            logger: Arc::new(RunLogger::detached("pipeline", LogConfig::default(), None)),
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_tagger(mut self, tagger: Arc<dyn TagWriter>) -> Self {
        self.tagger = tagger;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_logger(mut self, logger: Arc<RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Share an existing cancellation handle.
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops the run: no new jobs start and running tools are killed.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run `jobs` on `concurrency` workers (0 picks a value from the CPU count).
    ///
    /// Every job ends with exactly one terminal result.
    pub fn run(&self, jobs: Vec<TrackJob>, concurrency: usize) -> PipelineRun {
        if jobs.is_empty() {
            return PipelineRun::fatal(jobs, PipelineError::NoJobs.to_string());
        }

        let mut run = PipelineRun::new(jobs);
        let total = run.jobs.len();

        self.logger.phase("Preparing destination");
        if let Err(e) = self.prepare_destinations(&run.jobs) {
            self.logger.error(&e.to_string());
            tracing::error!("{}", e);
            let mut failed = PipelineRun::fatal(run.jobs, e.to_string());
            failed.cancelled = self.cancel.is_cancelled();
            return failed;
        }

        run.cover = self.prepare_cover(&run.jobs, &mut run.warnings);
        let embedded_cover = if self.settings.embed_cover {
            run.cover.clone()
        } else {
            None
        };

        for job in &run.jobs {
            self.notify(job, TrackState::Queued);
        }

        let workers = worker_count(concurrency, total);
        self.logger
            .phase(&format!("Splitting {} tracks on {} workers", total, workers));
        tracing::info!("Splitting {} tracks on {} workers", total, workers);

        run.results = self.run_workers(&run.jobs, workers, embedded_cover.as_deref());
        run.cancelled = self.cancel.is_cancelled();

        if self.settings.album_gain && !run.cancelled {
            if let Some(warning) = self.album_gain(&run.successful_outputs()) {
                self.logger.warn(&warning);
                run.warnings.push(warning);
            }
        }

        run.status = run.compute_status();
        self.logger.info(&run.summary());
        tracing::info!("{}: {}", self.logger.name(), run.summary());
        self.logger.flush();
        run
    }

    /// Create every destination directory once, before any job starts.
    fn prepare_destinations(&self, jobs: &[TrackJob]) -> Result<(), PipelineError> {
        let dirs: BTreeSet<&Path> = jobs
            .iter()
            .filter_map(|job| job.destination_path.parent())
            .collect();

        for dir in dirs {
            fs::create_dir_all(dir).map_err(|e| PipelineError::destination(dir, e))?;
            self.logger.debug(&format!("Destination ready: {}", dir.display()));
        }
        Ok(())
    }

    /// Copy a resized cover next to the tracks. Problems become run warnings.
    fn prepare_cover(&self, jobs: &[TrackJob], warnings: &mut Vec<String>) -> Option<PathBuf> {
        if !self.settings.copy_cover {
            return None;
        }

        let first = jobs.first()?;
        let source_dir = first.source_path.parent()?;
        let dest_dir = first.destination_path.parent()?;

        let Some(cover) = find_cover(source_dir) else {
            self.logger
                .info(&format!("No cover image in {}", source_dir.display()));
            return None;
        };

        if same_dir(source_dir, dest_dir) {
            let warning = format!(
                "Cover not copied: output folder is the source folder {}",
                source_dir.display()
            );
            self.logger.warn(&warning);
            warnings.push(warning);
            return None;
        }

        match write_resized_cover(&cover, dest_dir, self.settings.cover_size) {
            Ok(path) => {
                self.logger.info(&format!(
                    "Cover {} -> {}",
                    cover.display(),
                    path.display()
                ));
                Some(path)
            }
            Err(e) => {
                let warning = format!("Cover not copied: {}", e);
                self.logger.warn(&warning);
                warnings.push(warning);
                None
            }
        }
    }

    fn run_workers(
        &self,
        jobs: &[TrackJob],
        workers: usize,
        cover: Option<&Path>,
    ) -> BTreeMap<u32, JobResult> {
        let (tx, rx) = crossbeam_channel::unbounded::<&TrackJob>();
        for job in jobs {
            let _ = tx.send(job);
        }
        drop(tx);

        let results = Mutex::new(BTreeMap::new());
        let finished = AtomicUsize::new(0);
        let total = jobs.len();

        thread::scope(|scope| {
            for worker in 0..workers {
                let rx = rx.clone();
                let results = &results;
                let finished = &finished;
                scope.spawn(move || {
                    tracing::debug!("Worker {} started", worker);
                    for job in rx.iter() {
                        let result = if self.cancel.is_cancelled() {
                            self.notify(job, TrackState::Cancelled);
                            JobResult::cancelled(job, Stage::Extract, Duration::ZERO)
                        } else {
                            self.run_job(job, cover)
                        };
                        results.lock().insert(result.index, result);

                        let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                        self.logger.progress(done, total);
                    }
                    tracing::debug!("Worker {} finished", worker);
                });
            }
        });

        results.into_inner()
    }

    /// Run all steps of one job.
    ///
    /// Executes each step in order:
    /// 1. Check for cancellation
    /// 2. Run `validate_input`
    /// 3. Run `execute`
    /// 4. Run `validate_output` (if execute returned Success)
    ///
    /// A job that ends Failed or Cancelled has its output removed.
    fn run_job(&self, job: &TrackJob, cover: Option<&Path>) -> JobResult {
        let started = Instant::now();
        let ctx = Context {
            job,
            tools: &self.tools,
            runner: self.runner.as_ref(),
            tagger: self.tagger.as_ref(),
            logger: &self.logger,
            cancel: &self.cancel,
            cover,
            replay_gain: self.settings.replay_gain,
        };
        let mut state = JobState::new();
        let label = ctx.label();

        for step in &self.steps {
            state.stage = step.stage();

            if self.cancel.is_cancelled() {
                self.logger
                    .warn(&format!("{}: cancelled before '{}'", label, step.name()));
                ctx.discard_output();
                self.notify(job, TrackState::Cancelled);
                return JobResult::cancelled(job, state.stage, started.elapsed());
            }

            self.notify(job, TrackState::entering(step.stage()));
            self.logger.phase(&format!("{} - {}", label, step.description()));

            if let Err(e) = self.run_step(step.as_ref(), &ctx, &mut state) {
                if e.is_cancelled() {
                    self.logger
                        .warn(&format!("{}: cancelled during '{}'", label, step.name()));
                    ctx.discard_output();
                    self.notify(job, TrackState::Cancelled);
                    return JobResult::cancelled(job, state.stage, started.elapsed());
                }

                let reason = format!("{}: {}", step.name(), e);
                self.logger.error(&format!("{}: {}", label, reason));
                ctx.discard_output();
                self.notify(job, TrackState::Failed(reason.clone()));
                return JobResult::failed(job, state.stage, reason, started.elapsed());
            }
        }

        state.stage = Stage::Done;
        self.notify(job, TrackState::Done);
        JobResult::done(job, state.loudness, started.elapsed())
    }

    fn run_step(
        &self,
        step: &dyn PipelineStep,
        ctx: &Context<'_>,
        state: &mut JobState,
    ) -> StepResult<()> {
        let step_name = step.name();

        ctx.logger
            .debug(&format!("Validating input for '{}'", step_name));
        step.validate_input(ctx, state)?;

        ctx.logger.debug(&format!("Executing '{}'", step_name));
        match step.execute(ctx, state)? {
            StepOutcome::Success => {
                ctx.logger
                    .debug(&format!("Validating output for '{}'", step_name));
                step.validate_output(ctx, state)?;
                ctx.logger
                    .success(&format!("{}: {} completed", ctx.label(), step_name));
            }
            StepOutcome::Skipped(reason) => {
                ctx.logger
                    .info(&format!("{}: {} skipped: {}", ctx.label(), step_name, reason));
            }
        }
        Ok(())
    }

    /// Album gain over the finished tracks. Returns a warning on failure.
    fn album_gain(&self, outputs: &[PathBuf]) -> Option<String> {
        if outputs.is_empty() {
            return None;
        }

        self.logger.phase("Album gain");
        let command = album_gain_command(&self.tools, outputs);
        self.logger.command(&command.to_string());

        match self.runner.invoke(&command, &self.cancel) {
            Ok(output) if output.success() => {
                self.logger.tool_output(&output.output);
                if let Some(report) = album_report(&output.output) {
                    self.logger.success(&format!(
                        "Album: {:.2} LUFS, gain {:+.2} dB",
                        report.loudness_lufs, report.gain_db
                    ));
                }
                None
            }
            Ok(output) => {
                self.logger.tool_output(&output.output);
                Some(format!(
                    "Album gain failed with exit code {}: {}",
                    output.exit_code,
                    output.tail(3).join(" | ")
                ))
            }
            Err(e) => Some(format!("Album gain failed: {}", e)),
        }
    }

    fn notify(&self, job: &TrackJob, state: TrackState) {
        self.sink.notify(StatusEvent {
            index: job.index(),
            title: job.track.title.clone(),
            state,
        });
    }
}

/// Workers to start for `total` jobs.
fn worker_count(concurrency: usize, total: usize) -> usize {
    let wanted = if concurrency == 0 {
        let cores = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        auto_concurrency(cores)
    } else {
        concurrency
    };
    wanted.clamp(1, total.max(1))
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
