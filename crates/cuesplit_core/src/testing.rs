//! Test doubles for driving the pipeline without external tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;

use crate::cancel::CancelHandle;
use crate::cuesheet::CuesheetTrack;
use crate::models::{AlbumInfo, EncodeProfile, TrackJob, TrackTags};
use crate::naming::{album_dir, track_file_name};
use crate::orchestrator::{StatusEvent, StatusSink, TrackState};
use crate::tagging::{TagError, TagWriter};
use crate::tools::{ToolCommand, ToolError, ToolOutput, ToolRunner};

/// ffprobe JSON for a 5 minute 44.1 kHz / 16 bit FLAC image.
pub(crate) const PROBE_JSON: &str = r#"{
    "streams": [
        {
            "codec_name": "flac",
            "sample_rate": "44100",
            "channels": 2,
            "bits_per_raw_sample": "16",
            "duration": "300.000000"
        }
    ],
    "format": {
        "format_name": "flac",
        "duration": "300.000000"
    }
}"#;

const RSGAIN_HEADER: &str =
    "Filename\tLoudness (LUFS)\tGain (dB)\tPeak\t Peak (dB)\tPeak Type\tClipping Adjustment?";

/// Fake [`ToolRunner`] that imitates ffmpeg, ffprobe and rsgain.
///
/// ffmpeg writes a small file at the destination; everything else returns
/// canned output. Every command is recorded.
pub(crate) struct FakeRunner {
    calls: Mutex<Vec<ToolCommand>>,
    fail_extract: Vec<PathBuf>,
    fail_all_extracts: bool,
    cancel_extract: Option<PathBuf>,
    cancel_gain: Option<PathBuf>,
    fail_album_gain: bool,
    fail_programs: Vec<String>,
    probe_output: String,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_extract: Vec::new(),
            fail_all_extracts: false,
            cancel_extract: None,
            cancel_gain: None,
            fail_album_gain: false,
            fail_programs: Vec::new(),
            probe_output: PROBE_JSON.to_string(),
        }
    }

    /// ffmpeg exits 1 when writing `destination`.
    pub fn fail_extract_of(mut self, destination: &Path) -> Self {
        self.fail_extract.push(destination.to_path_buf());
        self
    }

    pub fn fail_all_extracts(mut self) -> Self {
        self.fail_all_extracts = true;
        self
    }

    /// Fire the cancel handle while extracting `destination`, as if the user
    /// pressed stop mid-encode.
    pub fn cancel_during_extract_of(mut self, destination: &Path) -> Self {
        self.cancel_extract = Some(destination.to_path_buf());
        self
    }

    /// Fire the cancel handle while scanning `destination`, after it was
    /// encoded and tagged.
    pub fn cancel_during_gain_of(mut self, destination: &Path) -> Self {
        self.cancel_gain = Some(destination.to_path_buf());
        self
    }

    pub fn fail_album_gain(mut self) -> Self {
        self.fail_album_gain = true;
        self
    }

    /// Any command whose program is `program` exits 1.
    pub fn fail_program(mut self, program: &str) -> Self {
        self.fail_programs.push(program.to_string());
        self
    }

    pub fn with_probe_output(mut self, output: &str) -> Self {
        self.probe_output = output.to_string();
        self
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().clone()
    }

    /// Number of recorded commands for a tool name.
    pub fn calls_to(&self, tool: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.tool_name() == tool).count()
    }

    fn ffmpeg(&self, command: &ToolCommand, cancel: &CancelHandle) -> Result<ToolOutput, ToolError> {
        let dest = command
            .args
            .last()
            .map(PathBuf::from)
            .unwrap_or_default();

        if self.cancel_extract.as_ref() == Some(&dest) {
            cancel.cancel();
            return Err(ToolError::Cancelled {
                program: command.program.clone(),
            });
        }

        if self.fail_all_extracts || self.fail_extract.contains(&dest) {
            // ffmpeg leaves a truncated file behind on failure
            let _ = fs::write(&dest, b"");
            return Ok(output(1, "Invalid data found when processing input"));
        }

        fs::write(&dest, b"encoded audio").map_err(|source| ToolError::Spawn {
            program: command.program.clone(),
            source,
        })?;
        Ok(output(0, ""))
    }

    fn rsgain(&self, command: &ToolCommand, cancel: &CancelHandle) -> Result<ToolOutput, ToolError> {
        let album = command.has_arg("-a");
        if album && self.fail_album_gain {
            return Ok(output(1, "Error: unsupported file type"));
        }
        if let Some(target) = &self.cancel_gain {
            if command.args.iter().any(|arg| Path::new(arg) == target.as_path()) {
                cancel.cancel();
                return Err(ToolError::Cancelled {
                    program: command.program.clone(),
                });
            }
        }

        let mut report = vec![RSGAIN_HEADER.to_string()];
        let files = command
            .args
            .iter()
            .map(Path::new)
            .filter(|p| p.extension().is_some());
        for file in files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            report.push(format!("{}\t-9.50\t-8.50\t0.977000\t-0.20\tSample\tN", name));
        }
        if album {
            report.push("Album\t-9.10\t-8.90\t0.990000\t-0.09\tSample\tN".to_string());
        }
        Ok(output(0, &report.join("\n")))
    }
}

impl ToolRunner for FakeRunner {
    fn invoke(&self, command: &ToolCommand, cancel: &CancelHandle) -> Result<ToolOutput, ToolError> {
        self.calls.lock().push(command.clone());

        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled {
                program: command.program.clone(),
            });
        }
        if self.fail_programs.iter().any(|p| p == &command.program) {
            return Ok(output(1, "command failed"));
        }

        match command.tool_name() {
            "ffmpeg" => self.ffmpeg(command, cancel),
            "ffprobe" => Ok(output(0, &self.probe_output)),
            "rsgain" => self.rsgain(command, cancel),
            _ => Ok(output(0, "ok")),
        }
    }
}

fn output(exit_code: i32, text: &str) -> ToolOutput {
    ToolOutput {
        exit_code,
        output: text.to_string(),
        duration: Duration::from_millis(5),
    }
}

/// Fake [`TagWriter`] that records what would have been written.
#[derive(Default)]
pub(crate) struct FakeTagWriter {
    tagged: Mutex<Vec<(PathBuf, TrackTags)>>,
    covers: Mutex<Vec<Option<PathBuf>>>,
    fail_on: Option<PathBuf>,
}

impl FakeTagWriter {
    pub fn failing_on(path: &Path) -> Self {
        Self {
            fail_on: Some(path.to_path_buf()),
            ..Self::default()
        }
    }

    pub fn tagged(&self) -> Vec<(PathBuf, TrackTags)> {
        self.tagged.lock().clone()
    }

    pub fn covers(&self) -> Vec<Option<PathBuf>> {
        self.covers.lock().clone()
    }
}

impl TagWriter for FakeTagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags, cover: Option<&Path>) -> Result<(), TagError> {
        if self.fail_on.as_deref() == Some(path) {
            return Err(TagError::Cover {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "unsupported file"),
            });
        }
        self.tagged.lock().push((path.to_path_buf(), tags.clone()));
        self.covers.lock().push(cover.map(Path::to_path_buf));
        Ok(())
    }
}

/// Status sink that keeps every event.
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }

    /// States reported for one track, in arrival order.
    pub fn states_for(&self, index: u32) -> Vec<TrackState> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.index == index)
            .map(|e| e.state.clone())
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn notify(&self, event: StatusEvent) {
        self.events.lock().push(event);
    }
}

/// Cuesheet text with `tracks` one-minute tracks.
pub(crate) fn sample_cuesheet(tracks: u32) -> String {
    let mut text = String::from(
        "REM GENRE Rock\nREM DATE 1997\nPERFORMER \"Radiohead\"\nTITLE \"OK Computer\"\nFILE \"album.flac\" WAVE\n",
    );
    for n in 1..=tracks {
        text.push_str(&format!(
            "  TRACK {:02} AUDIO\n    TITLE \"Song {}\"\n    INDEX 01 {:02}:00:00\n",
            n,
            n,
            n - 1
        ));
    }
    text
}

/// `count` Ogg jobs cut from `<root>/source/album.flac` into `<root>/out`.
///
/// Creates the source file; destination directories are left to the pipeline.
pub(crate) fn sample_jobs(root: &Path, count: u32) -> Vec<TrackJob> {
    let source_dir = root.join("source");
    fs::create_dir_all(&source_dir).unwrap();
    let source = source_dir.join("album.flac");
    fs::write(&source, b"fLaC").unwrap();

    let album = AlbumInfo {
        performer: "Radiohead".to_string(),
        title: "OK Computer".to_string(),
        genre: Some("Rock".to_string()),
        date: Some("1997".to_string()),
    };
    let profile = EncodeProfile::default();
    let dir = album_dir(&root.join("out"), &album.performer, &album.title);

    (1..=count)
        .map(|index| {
            let title = format!("Song {}", index);
            let start = Duration::from_secs(u64::from(index - 1) * 60);
            let end = (index < count).then(|| Duration::from_secs(u64::from(index) * 60));
            TrackJob {
                destination_path: dir.join(track_file_name(index, &title, profile.format)),
                track: CuesheetTrack {
                    index,
                    number: index,
                    title,
                    performer: album.performer.clone(),
                    start,
                    end,
                },
                album: album.clone(),
                source_path: source.clone(),
                profile,
                track_total: count,
                resample_to: None,
            }
        })
        .collect()
}
