//! Core enums used throughout the application.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output audio format for the split tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Ogg Vorbis (lossy, Vorbis comments).
    #[default]
    Ogg,
    /// MP3 (lossy, ID3v2 tags).
    Mp3,
    /// FLAC (lossless, mirrors the source bit depth and sample rate).
    Flac,
}

impl OutputFormat {
    /// File extension used for output files (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Ogg => "ogg",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Flac => "flac",
        }
    }

    /// Whether the format discards audio information.
    pub fn is_lossy(&self) -> bool {
        !matches!(self, OutputFormat::Flac)
    }

    /// Default encoder quality for this format.
    pub fn default_quality(&self) -> Quality {
        match self {
            OutputFormat::Ogg => Quality::OggScale(6),
            OutputFormat::Mp3 => Quality::Mp3Vbr(1),
            OutputFormat::Flac => Quality::FlacLevel(5),
        }
    }

    /// Get all available formats.
    pub fn all() -> &'static [OutputFormat] {
        &[OutputFormat::Ogg, OutputFormat::Mp3, OutputFormat::Flac]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Ogg => write!(f, "OGG"),
            OutputFormat::Mp3 => write!(f, "MP3"),
            OutputFormat::Flac => write!(f, "FLAC"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ogg" | "vorbis" => Ok(OutputFormat::Ogg),
            "mp3" => Ok(OutputFormat::Mp3),
            "flac" => Ok(OutputFormat::Flac),
            other => Err(format!("unknown output format '{}' (expected ogg, mp3 or flac)", other)),
        }
    }
}

/// Encoder quality target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Quality {
    /// Vorbis `-qscale:a` value, -1 to 10 (6 is roughly 192 kbps).
    OggScale(i8),
    /// LAME VBR preset, V0 (best) to V9.
    Mp3Vbr(u8),
    /// Constant bit rate in kbps.
    Mp3Cbr(u16),
    /// FLAC compression level, 0 to 8.
    FlacLevel(u8),
}

impl Quality {
    /// Check that this quality applies to `format`.
    pub fn matches(&self, format: OutputFormat) -> bool {
        matches!(
            (self, format),
            (Quality::OggScale(_), OutputFormat::Ogg)
                | (Quality::Mp3Vbr(_), OutputFormat::Mp3)
                | (Quality::Mp3Cbr(_), OutputFormat::Mp3)
                | (Quality::FlacLevel(_), OutputFormat::Flac)
        )
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::OggScale(q) => write!(f, "{}", q),
            Quality::Mp3Vbr(v) => write!(f, "V{}", v),
            Quality::Mp3Cbr(k) => write!(f, "{}k", k),
            Quality::FlacLevel(l) => write!(f, "{}", l),
        }
    }
}

/// Parse a user-supplied quality string for the given format.
///
/// Accepts the labels the old quality dropdown used (`"V 1 (225 kbps)"`,
/// `"b 320 (320 kbps)"`) as well as short forms (`"V1"`, `"320k"`, `"6"`).
pub fn parse_quality(format: OutputFormat, text: &str) -> Result<Quality, String> {
    // Drop any "(225 kbps)" style annotation.
    let head = text.split('(').next().unwrap_or("").trim();
    let compact: String = head.chars().filter(|c| !c.is_whitespace()).collect();
    let lower = compact.to_ascii_lowercase();

    if lower.is_empty() {
        return Ok(format.default_quality());
    }

    match format {
        OutputFormat::Ogg => {
            let q: i8 = lower
                .parse()
                .map_err(|_| format!("invalid Vorbis quality '{}'", text))?;
            if !(-1..=10).contains(&q) {
                return Err(format!("Vorbis quality {} out of range (-1 to 10)", q));
            }
            Ok(Quality::OggScale(q))
        }
        OutputFormat::Mp3 => {
            if let Some(rest) = lower.strip_prefix('v') {
                let v: u8 = rest
                    .parse()
                    .map_err(|_| format!("invalid MP3 VBR preset '{}'", text))?;
                if v > 9 {
                    return Err(format!("MP3 VBR preset V{} out of range (V0 to V9)", v));
                }
                return Ok(Quality::Mp3Vbr(v));
            }

            let digits = lower
                .trim_start_matches('b')
                .trim_end_matches("kbps")
                .trim_end_matches('k');
            let value: u16 = digits
                .parse()
                .map_err(|_| format!("invalid MP3 quality '{}'", text))?;

            // A single digit is a VBR preset, anything larger a bit rate.
            if value <= 9 && !lower.starts_with('b') && !lower.ends_with('k') {
                return Ok(Quality::Mp3Vbr(value as u8));
            }
            if !(8..=320).contains(&value) {
                return Err(format!("MP3 bit rate {} kbps out of range (8 to 320)", value));
            }
            Ok(Quality::Mp3Cbr(value))
        }
        OutputFormat::Flac => {
            let level: u8 = lower
                .parse()
                .map_err(|_| format!("invalid FLAC compression level '{}'", text))?;
            if level > 8 {
                return Err(format!("FLAC compression level {} out of range (0 to 8)", level));
            }
            Ok(Quality::FlacLevel(level))
        }
    }
}

/// Output format plus encoder quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeProfile {
    pub format: OutputFormat,
    pub quality: Quality,
}

impl EncodeProfile {
    /// Build a profile, rejecting a quality that belongs to another format.
    pub fn new(format: OutputFormat, quality: Quality) -> Result<Self, String> {
        if !quality.matches(format) {
            return Err(format!("quality {} does not apply to {}", quality, format));
        }
        Ok(Self { format, quality })
    }

    /// Parse `quality` for `format`.
    pub fn parse(format: OutputFormat, quality: &str) -> Result<Self, String> {
        Self::new(format, parse_quality(format, quality)?)
    }
}

impl Default for EncodeProfile {
    fn default() -> Self {
        let format = OutputFormat::default();
        Self {
            format,
            quality: format.default_quality(),
        }
    }
}

/// Ordered processing stage of a track job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Cut and encode the track from the source image.
    Extract,
    /// Write metadata onto the produced file.
    Tag,
    /// Compute and store ReplayGain metadata.
    Analyze,
    /// All stages completed.
    Done,
}

impl Stage {
    /// The stage that follows this one.
    pub fn next(&self) -> Stage {
        match self {
            Stage::Extract => Stage::Tag,
            Stage::Tag => Stage::Analyze,
            Stage::Analyze | Stage::Done => Stage::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => write!(f, "Extract"),
            Stage::Tag => write!(f, "Tag"),
            Stage::Analyze => write!(f, "Analyze"),
            Stage::Done => write!(f, "Done"),
        }
    }
}

/// Terminal outcome of a track job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Success,
    Failed(String),
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }
}

/// Aggregate status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Jobs are still in flight.
    Running,
    /// Every job reached Done.
    Succeeded,
    /// Some jobs reached Done, others did not.
    PartiallyFailed,
    /// Fatal pre-run error, or no job reached Done.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::PartiallyFailed => write!(f, "partially failed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}
