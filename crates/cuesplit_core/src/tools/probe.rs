//! Source image probing with ffprobe.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::command::ToolCommand;
use super::runner::{ToolError, ToolRunner};
use crate::cancel::CancelHandle;
use crate::config::ToolSettings;

/// Audio properties of a source image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: Option<Duration>,
    pub sample_rate: Option<u32>,
    pub bits_per_sample: Option<u32>,
    pub channels: Option<u32>,
    /// Audio codec (`flac`, `ape`, `pcm_s16le`, ...).
    pub codec: Option<String>,
    /// Container format (`flac`, `wav`, `aiff`, ...).
    pub format_name: Option<String>,
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("ffprobe failed with exit code {exit_code}: {message}")]
    Failed { exit_code: i32, message: String },

    #[error("Unreadable ffprobe output: {0}")]
    Parse(String),

    #[error("No audio stream found")]
    NoAudio,
}

#[derive(Deserialize)]
struct ProbeJson {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    sample_rate: Option<String>,
    bits_per_sample: Option<u32>,
    bits_per_raw_sample: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// ffprobe command reporting the first audio stream and the container as JSON.
pub fn probe_command(tools: &ToolSettings, path: &Path) -> ToolCommand {
    ToolCommand::new(&tools.ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            "-select_streams",
            "a:0",
        ])
        .arg(path)
}

/// Probe `path` for duration and sample format.
pub fn probe_media(
    runner: &dyn ToolRunner,
    tools: &ToolSettings,
    path: &Path,
    cancel: &CancelHandle,
) -> Result<MediaInfo, ProbeError> {
    let output = runner.invoke(&probe_command(tools, path), cancel)?;
    if !output.success() {
        return Err(ProbeError::Failed {
            exit_code: output.exit_code,
            message: output.tail(5).join("\n"),
        });
    }

    let info = parse_probe_output(&output.output)?;
    tracing::debug!(
        "Probed {}: codec={:?} rate={:?} bits={:?} duration={:?}",
        path.display(),
        info.codec,
        info.sample_rate,
        info.bits_per_sample,
        info.duration
    );
    Ok(info)
}

/// Parse ffprobe JSON output.
///
/// Stray lines around the JSON object (warnings on stderr) are ignored.
pub fn parse_probe_output(text: &str) -> Result<MediaInfo, ProbeError> {
    let start = text
        .find('{')
        .ok_or_else(|| ProbeError::Parse("no JSON object".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ProbeError::Parse("unterminated JSON object".to_string()))?;

    let json: ProbeJson =
        serde_json::from_str(&text[start..=end]).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let stream = json.streams.into_iter().next().ok_or(ProbeError::NoAudio)?;

    let bits_per_sample = stream
        .bits_per_raw_sample
        .as_deref()
        .and_then(|s| s.parse().ok())
        .or(stream.bits_per_sample)
        .filter(|bits| *bits > 0);

    let duration = json
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(stream.duration.as_deref())
        .and_then(parse_seconds);

    Ok(MediaInfo {
        duration,
        sample_rate: stream.sample_rate.as_deref().and_then(|s| s.parse().ok()),
        bits_per_sample,
        channels: stream.channels,
        codec: stream.codec_name,
        format_name: json.format.and_then(|f| f.format_name),
    })
}

fn parse_seconds(text: &str) -> Option<Duration> {
    let secs: f64 = text.trim().parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}
