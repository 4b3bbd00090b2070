//! Post-processing commands run after a split.
//!
//! A hook is a command template such as `beet import -q {dir}`. The
//! template is split into words once, then placeholders are filled per
//! call; the result runs directly, without a shell, so titles with quotes
//! or `$` cannot change the command.
//!
//! Placeholders: `{file}`, `{dir}`, `{title}`, `{artist}`, `{album}`,
//! `{track}`, `{source}`, `{cuesheet}`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::CancelHandle;
use crate::logging::RunLogger;
use crate::models::{PipelineRun, TrackJob};
use crate::tools::{ToolCommand, ToolRunner};

/// When the hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookScope {
    /// Once per successfully produced track file.
    #[default]
    PerFile,
    /// Once per cuesheet, after all tracks.
    PerSource,
}

impl fmt::Display for HookScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookScope::PerFile => write!(f, "per_file"),
            HookScope::PerSource => write!(f, "per_source"),
        }
    }
}

impl FromStr for HookScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "per_file" | "file" => Ok(HookScope::PerFile),
            "per_source" | "source" | "per_cuesheet" => Ok(HookScope::PerSource),
            other => Err(format!("unknown hook scope '{}'", other)),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("Hook command is empty")]
    Empty,

    #[error("Unterminated {0} quote in hook command")]
    UnterminatedQuote(char),

    #[error("Hook command ends with a lone backslash")]
    TrailingEscape,
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct HookVars {
    pub file: Option<PathBuf>,
    pub dir: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub track: Option<u32>,
    pub source: PathBuf,
    pub cuesheet: PathBuf,
}

impl HookVars {
    /// Values for one finished track.
    pub fn for_track(job: &TrackJob, cuesheet: &Path) -> Self {
        Self {
            file: Some(job.destination_path.clone()),
            dir: job
                .destination_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            title: job.track.title.clone(),
            artist: job.track.performer.clone(),
            album: job.album.title.clone(),
            track: Some(job.index()),
            source: job.source_path.clone(),
            cuesheet: cuesheet.to_path_buf(),
        }
    }

    /// Values for a whole cuesheet; track-level placeholders render empty.
    pub fn for_album(job: &TrackJob, cuesheet: &Path) -> Self {
        Self {
            file: None,
            title: String::new(),
            artist: job.album.performer.clone(),
            track: None,
            ..Self::for_track(job, cuesheet)
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        let value = match name {
            "file" => self
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "dir" => self.dir.display().to_string(),
            "title" => self.title.clone(),
            "artist" => self.artist.clone(),
            "album" => self.album.clone(),
            "track" => self.track.map(|n| format!("{:02}", n)).unwrap_or_default(),
            "source" => self.source.display().to_string(),
            "cuesheet" => self.cuesheet.display().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// A parsed hook command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    words: Vec<String>,
}

impl CommandTemplate {
    /// Split `template` into words with shell-like quoting.
    ///
    /// Single quotes keep everything literal; inside double quotes a
    /// backslash escapes `"` and `\`; outside quotes a backslash escapes
    /// the next character.
    pub fn parse(template: &str) -> Result<Self, HookError> {
        let mut words = Vec::new();
        let mut current = String::new();
        let mut in_word = false;
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '\'' => {
                    in_word = true;
                    loop {
                        match chars.next() {
                            Some('\'') => break,
                            Some(c) => current.push(c),
                            None => return Err(HookError::UnterminatedQuote('\'')),
                        }
                    }
                }
                '"' => {
                    in_word = true;
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some('\\') => match chars.next() {
                                Some(c @ ('"' | '\\')) => current.push(c),
                                Some(c) => {
                                    current.push('\\');
                                    current.push(c);
                                }
                                None => return Err(HookError::UnterminatedQuote('"')),
                            },
                            Some(c) => current.push(c),
                            None => return Err(HookError::UnterminatedQuote('"')),
                        }
                    }
                }
                '\\' => {
                    in_word = true;
                    current.push(chars.next().ok_or(HookError::TrailingEscape)?);
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    in_word = true;
                    current.push(c);
                }
            }
        }
        if in_word {
            words.push(current);
        }

        match words.first() {
            Some(program) if !program.is_empty() => Ok(Self { words }),
            _ => Err(HookError::Empty),
        }
    }

    pub fn program(&self) -> &str {
        &self.words[0]
    }

    /// Fill placeholders. Unknown `{names}` are kept as written.
    pub fn render(&self, vars: &HookVars) -> ToolCommand {
        let mut words = self.words.iter().map(|w| substitute(w, vars));
        let program = words.next().unwrap_or_default();
        ToolCommand::new(program).args(words)
    }
}

fn substitute(word: &str, vars: &HookVars) -> String {
    let mut out = String::with_capacity(word.len());
    let mut rest = word;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => match vars.lookup(&after[..close]) {
                Some(value) => {
                    out.push_str(&value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            },
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Outcome of one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResult {
    /// File or cuesheet the hook ran for.
    pub target: PathBuf,
    /// Command line as logged.
    pub command: String,
    /// Exit code, when the command ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run the hook for a finished pipeline run.
///
/// Hooks run one after another. Failures are logged and returned; they
/// never change the run's status.
pub fn run_hooks(
    runner: &dyn ToolRunner,
    template: &CommandTemplate,
    scope: HookScope,
    run: &PipelineRun,
    cuesheet: &Path,
    logger: &RunLogger,
    cancel: &CancelHandle,
) -> Vec<HookResult> {
    let done: Vec<&TrackJob> = run
        .jobs
        .iter()
        .filter(|job| run.results.get(&job.index()).is_some_and(|r| r.is_done()))
        .collect();

    let calls: Vec<(PathBuf, HookVars)> = match scope {
        HookScope::PerFile => done
            .iter()
            .map(|job| (job.destination_path.clone(), HookVars::for_track(job, cuesheet)))
            .collect(),
        HookScope::PerSource => done
            .first()
            .map(|job| (cuesheet.to_path_buf(), HookVars::for_album(job, cuesheet)))
            .into_iter()
            .collect(),
    };

    if calls.is_empty() {
        return Vec::new();
    }

    logger.phase("Post-processing");
    let mut results = Vec::with_capacity(calls.len());
    for (target, vars) in calls {
        if cancel.is_cancelled() {
            logger.warn("Post-processing cancelled");
            break;
        }

        let command = template.render(&vars);
        let command_line = command.to_string();
        logger.command(&command_line);

        let result = match runner.invoke(&command, cancel) {
            Ok(output) => {
                logger.tool_output(&output.output);
                if !output.success() {
                    logger.warn(&format!(
                        "Hook exited with code {} for {}",
                        output.exit_code,
                        target.display()
                    ));
                }
                HookResult {
                    target,
                    command: command_line,
                    exit_code: Some(output.exit_code),
                    error: None,
                }
            }
            Err(e) => {
                logger.error(&format!("Hook failed for {}: {}", target.display(), e));
                HookResult {
                    target,
                    command: command_line,
                    exit_code: None,
                    error: Some(e.to_string()),
                }
            }
        };
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::models::{JobResult, RunStatus, Stage};
    use crate::testing::{sample_jobs, FakeRunner};
    use std::ffi::OsString;
    use std::time::Duration;

    fn words(template: &str) -> Vec<String> {
        CommandTemplate::parse(template).unwrap().words
    }

    #[test]
    fn splits_with_quotes() {
        assert_eq!(words("beet import -q {dir}"), ["beet", "import", "-q", "{dir}"]);
        assert_eq!(
            words(r#"notify "Split done: {album}" 'it''s'"#),
            ["notify", "Split done: {album}", "its"]
        );
        assert_eq!(words(r#"echo a\ b "x\"y" ''"#), ["echo", "a b", "x\"y", ""]);
    }

    #[test]
    fn rejects_bad_templates() {
        assert_eq!(CommandTemplate::parse("   "), Err(HookError::Empty));
        assert_eq!(
            CommandTemplate::parse("echo 'open"),
            Err(HookError::UnterminatedQuote('\''))
        );
        assert_eq!(
            CommandTemplate::parse("echo \"open"),
            Err(HookError::UnterminatedQuote('"'))
        );
        assert_eq!(CommandTemplate::parse("echo \\"), Err(HookError::TrailingEscape));
    }

    #[test]
    fn renders_placeholders_without_shell() {
        let dir = tempfile::tempdir().unwrap();
        let job = &sample_jobs(dir.path(), 2)[1];
        let template = CommandTemplate::parse("tag-it --file={file} {track} \"{artist} - {title}\" {unknown}").unwrap();

        let cmd = template.render(&HookVars::for_track(job, Path::new("/music/album.cue")));

        assert_eq!(cmd.program, "tag-it");
        assert_eq!(
            cmd.args[0],
            OsString::from(format!("--file={}", job.destination_path.display()))
        );
        assert_eq!(cmd.args[1], OsString::from("02"));
        assert_eq!(cmd.args[2], OsString::from("Radiohead - Song 2"));
        assert_eq!(cmd.args[3], OsString::from("{unknown}"));
    }

    #[test]
    fn album_vars_leave_track_fields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let job = &sample_jobs(dir.path(), 1)[0];
        let vars = HookVars::for_album(job, Path::new("a.cue"));
        assert_eq!(substitute("[{file}][{track}][{album}]", &vars), "[][][OK Computer]");
    }

    #[test]
    fn parses_scope() {
        assert_eq!("per-file".parse::<HookScope>().unwrap(), HookScope::PerFile);
        assert_eq!("per_source".parse::<HookScope>().unwrap(), HookScope::PerSource);
        assert!("sometimes".parse::<HookScope>().is_err());
        assert_eq!(HookScope::default(), HookScope::PerFile);
    }

    fn finished_run(root: &Path) -> PipelineRun {
        let jobs = sample_jobs(root, 3);
        let mut run = PipelineRun::new(jobs.clone());
        run.results.insert(1, JobResult::done(&jobs[0], None, Duration::ZERO));
        run.results.insert(
            2,
            JobResult::failed(&jobs[1], Stage::Extract, "boom", Duration::ZERO),
        );
        run.results.insert(3, JobResult::done(&jobs[2], None, Duration::ZERO));
        run.status = run.compute_status();
        run
    }

    #[test]
    fn per_file_hook_runs_for_each_success() {
        let dir = tempfile::tempdir().unwrap();
        let run = finished_run(dir.path());
        let runner = FakeRunner::new();
        let logger = RunLogger::detached("hooks", LogConfig::default(), None);
        let template = CommandTemplate::parse("post {file}").unwrap();

        let results = run_hooks(
            &runner,
            &template,
            HookScope::PerFile,
            &run,
            Path::new("album.cue"),
            &logger,
            &CancelHandle::new(),
        );

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(HookResult::success));
        assert_eq!(results[0].target, run.jobs[0].destination_path);
        assert_eq!(results[1].target, run.jobs[2].destination_path);
        assert_eq!(runner.calls_to("post"), 2);
    }

    #[test]
    fn per_source_hook_runs_once_and_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let run = finished_run(dir.path());
        let runner = FakeRunner::new().fail_program("post");
        let logger = RunLogger::detached("hooks", LogConfig::default(), None);
        let template = CommandTemplate::parse("post {dir}").unwrap();

        let results = run_hooks(
            &runner,
            &template,
            HookScope::PerSource,
            &run,
            Path::new("album.cue"),
            &logger,
            &CancelHandle::new(),
        );

        assert_eq!(results.len(), 1);
        assert!(!results[0].success());
        assert_eq!(results[0].exit_code, Some(1));
        assert_eq!(run.status, RunStatus::PartiallyFailed);
    }
}
