//! cue-splitter - Main entry point
//!
//! Handles:
//! - Configuration loading and command-line overrides
//! - Application-level logging initialization
//! - Running the cuesheets and printing track status
//! - Ctrl-C: first press cancels the split, second press exits

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};

use cuesplit_core::cancel::CancelHandle;
use cuesplit_core::config::{ConfigManager, ConfigSection, Settings};
use cuesplit_core::hooks::HookScope;
use cuesplit_core::jobs::{BatchSummary, SplitSession};
use cuesplit_core::logging::{init_tracing_with_file, LogLevel};
use cuesplit_core::models::{EncodeProfile, OutputFormat};
use cuesplit_core::orchestrator::{StatusEvent, StatusSink, TrackState};
use cuesplit_core::tools::ProcessRunner;

/// Command-line arguments for cue-splitter
#[derive(Parser, Debug)]
#[command(name = "cue-splitter")]
#[command(about = "Split a cuesheet + audio image into tagged per-track files")]
#[command(version)]
struct Args {
    /// Cuesheets to split, processed one after another
    #[arg(required = true)]
    cuesheets: Vec<PathBuf>,

    /// Root folder for <Artist>/<Album> output
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Output format: ogg, mp3 or flac
    #[arg(short, long)]
    codec: Option<OutputFormat>,

    /// Encoder quality (ogg: -1..10, mp3: V0..V9 or 320k, flac: 0..8)
    #[arg(short, long)]
    quality: Option<String>,

    /// Tracks encoded in parallel (0 = based on CPU count)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Settings file to use instead of the default one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Audio image to cut from instead of the cuesheet's FILE entry
    #[arg(long)]
    source: Option<PathBuf>,

    /// Skip the ReplayGain scan
    #[arg(long)]
    no_replaygain: bool,

    /// Skip the album gain pass over the produced tracks
    #[arg(long)]
    no_album_gain: bool,

    /// Embed the resized cover into every track
    #[arg(long)]
    embed_cover: bool,

    /// Do not copy a cover image next to the tracks
    #[arg(long)]
    no_cover: bool,

    /// Command run after splitting, e.g. "beet import -q {dir}"
    #[arg(long)]
    post_command: Option<String>,

    /// Run the post command per_file or per_source
    #[arg(long)]
    hook_scope: Option<HookScope>,

    /// Write a JSON report of the batch to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Prints track state changes to stdout.
struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn notify(&self, event: StatusEvent) {
        match &event.state {
            TrackState::Queued => {}
            TrackState::Failed(reason) => {
                println!("  [{:02}] {} - FAILED: {}", event.index, event.title, reason)
            }
            state => println!("  [{:02}] {} - {}", event.index, event.title, state),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool> {
    if args.source.is_some() && args.cuesheets.len() > 1 {
        bail!("--source can only be used with a single cuesheet");
    }

    // Load configuration first (needed for logs directory path)
    let config_path = args.config.clone().unwrap_or_else(ConfigManager::default_path);
    let mut config_manager = ConfigManager::new(&config_path);
    if let Err(e) = config_manager.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }

    let mut settings = config_manager.settings().clone();
    apply_overrides(&mut settings, &args)?;

    let level = match args.verbose {
        0 => settings.logging.level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    let _log_guard = init_tracing_with_file(level, &PathBuf::from(&settings.paths.logs_folder));

    tracing::info!("cue-splitter starting");
    tracing::info!("Config: {}", config_path.display());
    tracing::info!("Core version: {}", cuesplit_core::version());

    if let Err(e) = config_manager.ensure_dirs_exist() {
        tracing::warn!("Failed to create directories: {}", e);
    }

    remember_last_dir(&mut config_manager, &args.cuesheets);

    let mut session = SplitSession::new(settings, Arc::new(ProcessRunner::new()))
        .context("Invalid settings")?
        .with_sink(Arc::new(ConsoleSink));
    if let Some(source) = &args.source {
        session = session.with_source_override(source);
    }
    if let Err(e) = ctrlc::set_handler(interrupt_action(session.cancel_handle())) {
        tracing::warn!("Cannot install Ctrl-C handler: {}", e);
    }

    let summary = session.split_batch(&args.cuesheets);
    print_summary(&summary);

    if let Some(path) = &args.report {
        let json = summary.to_json().context("Failed to serialize report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(summary.is_success())
}

/// Ctrl-C handler body. The split is cancelled so running tools are killed
/// and unfinished tracks removed; a second press exits immediately.
fn interrupt_action(cancel: CancelHandle) -> impl FnMut() + Send + 'static {
    move || {
        if cancel.is_cancelled() {
            eprintln!("Interrupted again, exiting.");
            std::process::exit(130);
        }
        eprintln!("Cancelling, waiting for running tracks to stop...");
        cancel.cancel();
    }
}

/// Apply command-line flags on top of the loaded settings (not saved).
fn apply_overrides(settings: &mut Settings, args: &Args) -> Result<()> {
    if let Some(dir) = &args.output_dir {
        settings.paths.output_folder = dir.to_string_lossy().into_owned();
    }

    let format = args.codec.unwrap_or(settings.encoding.format);
    match &args.quality {
        Some(quality) => {
            let profile = EncodeProfile::parse(format, quality).map_err(anyhow::Error::msg)?;
            settings.encoding.set_profile(profile);
        }
        None => settings.encoding.format = format,
    }

    if let Some(jobs) = args.jobs {
        settings.pipeline.concurrency = jobs;
    }
    if args.no_replaygain {
        settings.pipeline.replay_gain = false;
    }
    if args.no_album_gain {
        settings.pipeline.album_gain = false;
    }
    if args.embed_cover {
        settings.pipeline.embed_cover = true;
    }
    if args.no_cover {
        settings.pipeline.copy_cover = false;
    }
    if let Some(command) = &args.post_command {
        settings.hooks.post_command = command.clone();
    }
    if let Some(scope) = args.hook_scope {
        settings.hooks.scope = scope;
    }
    Ok(())
}

/// Store the folder of the last cuesheet in the settings file.
fn remember_last_dir(config_manager: &mut ConfigManager, cuesheets: &[PathBuf]) {
    let Some(dir) = cuesheets.last().and_then(|p| p.parent()) else {
        return;
    };
    let dir = dir.to_string_lossy().into_owned();
    if dir.is_empty() || config_manager.settings().paths.last_cuesheet_dir == dir {
        return;
    }

    config_manager.settings_mut().paths.last_cuesheet_dir = dir;
    if let Err(e) = config_manager.update_section(ConfigSection::Paths) {
        tracing::warn!("Failed to save last cuesheet folder: {}", e);
    }
}

fn print_summary(summary: &BatchSummary) {
    println!();
    for report in &summary.reports {
        println!("{}: {}", report.cuesheet.display(), report.run.summary());
        for warning in &report.run.warnings {
            println!("  warning: {}", warning);
        }
        for hook in report.hooks.iter().filter(|h| !h.success()) {
            println!(
                "  post command failed for {}: {}",
                hook.target.display(),
                hook.error
                    .clone()
                    .unwrap_or_else(|| format!("exit code {:?}", hook.exit_code))
            );
        }
    }
    for failure in &summary.failures {
        println!("{}: {}", failure.cuesheet.display(), failure.error);
    }
    if summary.cancelled {
        println!("Cancelled.");
    }
    println!("{}", summary.message());
}
