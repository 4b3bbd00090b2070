//! Split sessions: one cuesheet, or a batch of them, end to end.
//!
//! A session owns the settings and collaborators for a batch and runs
//! each cuesheet through: load → resolve source → probe → plan →
//! pipeline → hooks. Cuesheets are processed one after another; the
//! parallelism lives inside the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::planner::{plan_jobs, resolve_source, SplitRequest};
use crate::cancel::CancelHandle;
use crate::config::Settings;
use crate::cuesheet::{load_cuesheet, CuesheetError};
use crate::hooks::{run_hooks, CommandTemplate, HookError, HookResult, HookScope};
use crate::logging::{LogCallback, LogConfig, RunLogger};
use crate::models::{AlbumInfo, PipelineRun, RunStatus};
use crate::orchestrator::{JobPipeline, NullSink, StatusSink};
use crate::tagging::{LoftyTagWriter, TagWriter};
use crate::tools::{probe_media, MediaInfo, ProbeError, ToolRunner};

/// Failure that stops a cuesheet before any job starts.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{}: {source}", path.display())]
    Cuesheet {
        path: PathBuf,
        #[source]
        source: CuesheetError,
    },

    #[error("{}: cuesheet does not name an audio file", cuesheet.display())]
    NoSourceFile { cuesheet: PathBuf },

    #[error("Audio image not found: {}", audio.display())]
    MissingSource { audio: PathBuf },

    #[error("Cannot probe {}: {source}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },

    #[error("Invalid encoding settings: {0}")]
    Encoding(String),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("Cancelled before start")]
    Cancelled,
}

/// Everything that happened to one cuesheet.
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub cuesheet: PathBuf,
    pub source: PathBuf,
    pub album: AlbumInfo,
    pub media: MediaInfo,
    pub run: PipelineRun,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl SplitReport {
    pub fn is_success(&self) -> bool {
        self.run.status == RunStatus::Succeeded
    }
}

/// A cuesheet that failed before its pipeline ran.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub cuesheet: PathBuf,
    pub error: String,
}

/// Outcome of a batch of cuesheets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub reports: Vec<SplitReport>,
    pub failures: Vec<BatchFailure>,
    pub cancelled: bool,
}

impl BatchSummary {
    /// Cuesheets whose every track was produced.
    pub fn ok_count(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    /// Cuesheets that failed outright or produced only some tracks.
    pub fn error_count(&self) -> usize {
        self.failures.len() + self.reports.iter().filter(|r| !r.is_success()).count()
    }

    pub fn is_success(&self) -> bool {
        self.error_count() == 0 && self.ok_count() > 0
    }

    /// `"N split(s) OK, M with errors"`.
    pub fn message(&self) -> String {
        format!(
            "{} split(s) OK, {} with errors",
            self.ok_count(),
            self.error_count()
        )
    }

    /// Serialize for `--report` output.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

type SharedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Runs cuesheets through planning, the job pipeline and hooks.
///
/// # Example
///
/// ```ignore
/// let session = SplitSession::new(settings, Arc::new(ProcessRunner::new()))?
///     .with_sink(Arc::new(TracingSink));
/// let summary = session.split_batch(&cuesheets);
/// println!("{}", summary.message());
/// ```
pub struct SplitSession {
    settings: Settings,
    request: SplitRequest,
    runner: Arc<dyn ToolRunner>,
    tagger: Arc<dyn TagWriter>,
    sink: Arc<dyn StatusSink>,
    cancel: CancelHandle,
    log_callback: Option<SharedCallback>,
    hook: Option<(CommandTemplate, HookScope)>,
}

impl SplitSession {
    /// Create a session from settings.
    ///
    /// Fails when the encoding settings or the hook template are invalid.
    pub fn new(settings: Settings, runner: Arc<dyn ToolRunner>) -> Result<Self, SessionError> {
        let profile = settings.encoding.profile().map_err(SessionError::Encoding)?;
        let mut request = SplitRequest::new(&settings.paths.output_folder, profile);
        request.resample_lossy = settings.encoding.resample_lossy;

        let hook = if settings.hooks.is_enabled() {
            let template = CommandTemplate::parse(&settings.hooks.post_command)?;
            Some((template, settings.hooks.scope))
        } else {
            None
        };

        Ok(Self {
            settings,
            request,
            runner,
            tagger: Arc::new(LoftyTagWriter),
            sink: Arc::new(NullSink),
            cancel: CancelHandle::new(),
            log_callback: None,
            hook,
        })
    }

    pub fn with_tagger(mut self, tagger: Arc<dyn TagWriter>) -> Self {
        self.tagger = tagger;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Receive every run log line (for a GUI log pane or console echo).
    pub fn with_log_callback(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.log_callback = Some(Arc::new(callback));
        self
    }

    /// Cut from `source` instead of the cuesheet's `FILE` entry.
    pub fn with_source_override(mut self, source: impl Into<PathBuf>) -> Self {
        self.request.source_override = Some(source.into());
        self
    }

    pub fn request(&self) -> &SplitRequest {
        &self.request
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Split one cuesheet.
    pub fn split(&self, cuesheet_path: &Path) -> Result<SplitReport, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        let logger = Arc::new(self.create_logger(cuesheet_path));
        let result = self.split_with_logger(cuesheet_path, &logger);
        if let Err(e) = &result {
            logger.error(&e.to_string());
        }
        logger.flush();
        result
    }

    fn split_with_logger(
        &self,
        cuesheet_path: &Path,
        logger: &Arc<RunLogger>,
    ) -> Result<SplitReport, SessionError> {
        logger.phase("Reading cuesheet");
        logger.info(&format!("Cuesheet: {}", cuesheet_path.display()));
        let mut sheet = load_cuesheet(cuesheet_path).map_err(|source| SessionError::Cuesheet {
            path: cuesheet_path.to_path_buf(),
            source,
        })?;
        logger.info(&format!(
            "'{}' by '{}', {} tracks",
            sheet.title,
            sheet.performer,
            sheet.len()
        ));

        let source = resolve_source(cuesheet_path, &sheet, self.request.source_override.as_deref())
            .ok_or_else(|| SessionError::NoSourceFile {
                cuesheet: cuesheet_path.to_path_buf(),
            })?;
        if !source.is_file() {
            return Err(SessionError::MissingSource { audio: source });
        }

        logger.phase("Probing source");
        let media = probe_media(self.runner.as_ref(), &self.settings.tools, &source, &self.cancel)
            .map_err(|e| SessionError::Probe {
                path: source.clone(),
                source: e,
            })?;
        logger.info(&format!(
            "Source: {} ({}, {} Hz, {} bit)",
            source.display(),
            media.codec.as_deref().unwrap_or("unknown codec"),
            media.sample_rate.map(|r| r.to_string()).unwrap_or_else(|| "?".into()),
            media.bits_per_sample.map(|b| b.to_string()).unwrap_or_else(|| "?".into()),
        ));
        if let Some(duration) = media.duration {
            sheet.resolve_last_end(duration);
        }

        let jobs = plan_jobs(&sheet, &source, &self.request, &media);
        logger.info(&format!(
            "Output: {} as {}",
            jobs.first()
                .and_then(|j| j.destination_path.parent())
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            self.request.profile.format
        ));

        let pipeline = JobPipeline::new(
            self.settings.pipeline.clone(),
            self.settings.tools.clone(),
            Arc::clone(&self.runner),
        )
        .with_tagger(Arc::clone(&self.tagger))
        .with_sink(Arc::clone(&self.sink))
        .with_logger(Arc::clone(logger))
        .with_cancel(self.cancel.clone());

        let run = pipeline.run(jobs, self.settings.pipeline.concurrency);

        let hooks = match &self.hook {
            Some((template, scope)) if !run.cancelled => run_hooks(
                self.runner.as_ref(),
                template,
                *scope,
                &run,
                cuesheet_path,
                logger,
                &self.cancel,
            ),
            _ => Vec::new(),
        };

        Ok(SplitReport {
            cuesheet: cuesheet_path.to_path_buf(),
            source,
            album: AlbumInfo::from(&sheet),
            media,
            run,
            hooks,
            log_file: logger.log_path().map(Path::to_path_buf),
        })
    }

    /// Split several cuesheets one after another.
    ///
    /// A failing cuesheet is recorded and the batch moves on. After
    /// cancellation the remaining cuesheets are not started.
    pub fn split_batch(&self, cuesheets: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let total = cuesheets.len();

        for (i, path) in cuesheets.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("Batch cancelled at cuesheet {}/{}", i + 1, total);
                summary.cancelled = true;
                break;
            }

            tracing::info!("Processing cuesheet {}/{}: {}", i + 1, total, path.display());
            match self.split(path) {
                Ok(report) => {
                    tracing::info!("{}: {}", path.display(), report.run.summary());
                    summary.cancelled |= report.run.cancelled;
                    summary.reports.push(report);
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    summary.failures.push(BatchFailure {
                        cuesheet: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!("{}", summary.message());
        summary
    }

    /// Per-cuesheet log file, or a detached logger when file logs are off
    /// or the log folder is unusable.
    fn create_logger(&self, cuesheet_path: &Path) -> RunLogger {
        let name = cuesheet_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "cuesheet".to_string());
        let config = LogConfig::from(&self.settings.logging);

        if self.settings.logging.run_logs {
            match RunLogger::new(&name, &self.settings.paths.logs_folder, config.clone(), self.callback()) {
                Ok(logger) => return logger,
                Err(e) => tracing::warn!(
                    "Cannot create log file in {}: {}",
                    self.settings.paths.logs_folder,
                    e
                ),
            }
        }
        RunLogger::detached(name, config, self.callback())
    }

    fn callback(&self) -> Option<LogCallback> {
        self.log_callback.as_ref().map(|cb| {
            let cb = Arc::clone(cb);
            Box::new(move |line: &str| cb(line)) as LogCallback
        })
    }
}
