//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::hooks::HookScope;
use crate::logging::{LogConfig, LogLevel};
use crate::models::{parse_quality, EncodeProfile, OutputFormat, Quality};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Output format and encoder quality.
    #[serde(default)]
    pub encoding: EncodingSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Worker pool and per-run side tasks.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Post-processing command.
    #[serde(default)]
    pub hooks: HookSettings,
}

/// Path configuration for output and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for split albums.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Folder of the last cuesheet opened.
    #[serde(default)]
    pub last_cuesheet_dir: String,
}

fn default_output_folder() -> String {
    dirs::audio_dir()
        .map(|dir| dir.join("cue-splitter"))
        .unwrap_or_else(|| PathBuf::from("split_output"))
        .to_string_lossy()
        .into_owned()
}

fn default_logs_folder() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("cue-splitter").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".logs"))
        .to_string_lossy()
        .into_owned()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
            last_cuesheet_dir: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level for the application log (RUST_LOG overrides).
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format (tool output only shown on errors).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show after a failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Prefix log lines with the time of day.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Write one log file per cuesheet into the logs folder.
    #[serde(default = "default_true")]
    pub run_logs: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
            run_logs: true,
        }
    }
}

impl From<&LoggingSettings> for LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            compact: settings.compact,
            progress_step: settings.progress_step,
            error_tail: settings.error_tail as usize,
            show_timestamps: settings.show_timestamps,
        }
    }
}

/// Output format and per-format quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// Output format: ogg, mp3 or flac.
    #[serde(default)]
    pub format: OutputFormat,

    /// Vorbis quality, -1 to 10.
    #[serde(default = "default_ogg_quality")]
    pub ogg_quality: i8,

    /// MP3 quality: VBR preset ("V0".."V9") or bit rate ("320k").
    #[serde(default = "default_mp3_quality")]
    pub mp3_quality: String,

    /// FLAC compression level, 0 to 8.
    #[serde(default = "default_flac_compression")]
    pub flac_compression: u8,

    /// Resample lossy outputs to 44.1 kHz when the source differs.
    #[serde(default = "default_true")]
    pub resample_lossy: bool,
}

fn default_ogg_quality() -> i8 {
    6
}

fn default_mp3_quality() -> String {
    "V1".to_string()
}

fn default_flac_compression() -> u8 {
    5
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            ogg_quality: default_ogg_quality(),
            mp3_quality: default_mp3_quality(),
            flac_compression: default_flac_compression(),
            resample_lossy: true,
        }
    }
}

impl EncodingSettings {
    /// Build the encode profile for the configured format.
    pub fn profile(&self) -> Result<EncodeProfile, String> {
        self.profile_for(self.format)
    }

    /// Build the encode profile for `format` from its configured quality.
    pub fn profile_for(&self, format: OutputFormat) -> Result<EncodeProfile, String> {
        let quality = match format {
            OutputFormat::Ogg => parse_quality(format, &self.ogg_quality.to_string())?,
            OutputFormat::Mp3 => parse_quality(format, &self.mp3_quality)?,
            OutputFormat::Flac => parse_quality(format, &self.flac_compression.to_string())?,
        };
        EncodeProfile::new(format, quality)
    }

    /// Store `profile` as the configured format and quality.
    pub fn set_profile(&mut self, profile: EncodeProfile) {
        self.format = profile.format;
        match profile.quality {
            Quality::OggScale(q) => self.ogg_quality = q,
            Quality::Mp3Vbr(_) | Quality::Mp3Cbr(_) => self.mp3_quality = profile.quality.to_string(),
            Quality::FlacLevel(l) => self.flac_compression = l,
        }
    }
}

/// External tool executables (names on PATH or absolute paths).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    #[serde(default = "default_rsgain")]
    pub rsgain: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_rsgain() -> String {
    "rsgain".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            rsgain: default_rsgain(),
        }
    }
}

/// Worker pool and side-task settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Parallel track jobs; 0 picks a value from the CPU count.
    #[serde(default)]
    pub concurrency: usize,

    /// Run the per-track ReplayGain analysis.
    #[serde(default = "default_true")]
    pub replay_gain: bool,

    /// Run an album gain pass over all finished tracks.
    #[serde(default = "default_true")]
    pub album_gain: bool,

    /// Copy a resized cover image next to the tracks.
    #[serde(default = "default_true")]
    pub copy_cover: bool,

    /// Longest side of the copied cover, in pixels.
    #[serde(default = "default_cover_size")]
    pub cover_size: u32,

    /// Also embed the resized cover into each track.
    #[serde(default)]
    pub embed_cover: bool,
}

fn default_cover_size() -> u32 {
    500
}

/// Upper bound for automatic concurrency.
const MAX_AUTO_CONCURRENCY: usize = 8;

/// Cores left free for the system when picking concurrency automatically.
const RESERVED_CORES: usize = 4;

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: 0,
            replay_gain: true,
            album_gain: true,
            copy_cover: true,
            cover_size: default_cover_size(),
            embed_cover: false,
        }
    }
}

/// Concurrency picked for `cores` logical CPUs.
pub fn auto_concurrency(cores: usize) -> usize {
    cores
        .saturating_sub(RESERVED_CORES)
        .clamp(1, MAX_AUTO_CONCURRENCY)
}

/// Post-processing command run after a split.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookSettings {
    /// Command template, e.g. `beet import -q {dir}`. Empty disables the hook.
    #[serde(default)]
    pub post_command: String,

    /// Run once per output file or once per cuesheet.
    #[serde(default)]
    pub scope: HookScope,
}

impl HookSettings {
    pub fn is_enabled(&self) -> bool {
        !self.post_command.trim().is_empty()
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Encoding,
    Tools,
    Pipeline,
    Hooks,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Encoding => "encoding",
            ConfigSection::Tools => "tools",
            ConfigSection::Pipeline => "pipeline",
            ConfigSection::Hooks => "hooks",
        }
    }

    /// All sections in file order.
    pub fn all() -> &'static [ConfigSection] {
        &[
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Encoding,
            ConfigSection::Tools,
            ConfigSection::Pipeline,
            ConfigSection::Hooks,
        ]
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Encoding => "Output format and encoder quality",
            ConfigSection::Tools => "External tools (names on PATH or absolute paths)",
            ConfigSection::Pipeline => "Track jobs, ReplayGain and cover handling",
            ConfigSection::Hooks => "Command run after each split ({file} {dir} {title} {artist} {album} {track} {source} {cuesheet})",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[encoding]"));
        assert!(toml.contains("format = \"ogg\""));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[encoding]\nformat = \"mp3\"\nmp3_quality = \"320k\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.encoding.format, OutputFormat::Mp3);
        assert!(parsed.logging.compact);
        assert_eq!(parsed.pipeline.cover_size, 500);
        assert_eq!(parsed.tools.rsgain, "rsgain");
        assert_eq!(parsed.hooks.scope, HookScope::PerFile);
    }

    #[test]
    fn encoding_builds_profiles() {
        let mut encoding = EncodingSettings::default();
        assert_eq!(encoding.profile().unwrap().quality, Quality::OggScale(6));

        encoding.mp3_quality = "b 256 (256 kbps)".to_string();
        let profile = encoding.profile_for(OutputFormat::Mp3).unwrap();
        assert_eq!(profile.quality, Quality::Mp3Cbr(256));

        encoding.flac_compression = 12;
        assert!(encoding.profile_for(OutputFormat::Flac).is_err());
    }

    #[test]
    fn set_profile_round_trips() {
        let mut encoding = EncodingSettings::default();
        encoding.set_profile(EncodeProfile::new(OutputFormat::Mp3, Quality::Mp3Vbr(0)).unwrap());
        assert_eq!(encoding.format, OutputFormat::Mp3);
        assert_eq!(encoding.profile().unwrap().quality, Quality::Mp3Vbr(0));
    }

    #[test]
    fn auto_concurrency_bounds() {
        assert_eq!(auto_concurrency(1), 1);
        assert_eq!(auto_concurrency(4), 1);
        assert_eq!(auto_concurrency(8), 4);
        assert_eq!(auto_concurrency(64), 8);
    }

    #[test]
    fn gain_passes_default_on() {
        assert!(PipelineSettings::default().album_gain);

        let pipeline: PipelineSettings = toml::from_str("concurrency = 2\n").unwrap();
        assert!(pipeline.replay_gain);
        assert!(pipeline.album_gain);
    }

    #[test]
    fn logging_settings_convert() {
        let mut logging = LoggingSettings::default();
        logging.error_tail = 7;
        let config = LogConfig::from(&logging);
        assert_eq!(config.error_tail, 7);
        assert!(config.compact);
    }
}
