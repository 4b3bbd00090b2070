//! ffmpeg command construction for track extraction.

use crate::config::ToolSettings;
use crate::cuesheet::format_seconds;
use crate::models::{EncodeProfile, Quality, TrackJob};

use super::command::ToolCommand;

/// Sample rate lossy outputs are converted to.
pub const LOSSY_SAMPLE_RATE: u32 = 44_100;

/// Build the ffmpeg command that cuts one track out of the source image
/// and encodes it straight into the destination file.
///
/// Source metadata is not copied; tags are written afterwards from the
/// cuesheet only.
pub fn extract_command(tools: &ToolSettings, job: &TrackJob) -> ToolCommand {
    let mut cmd = ToolCommand::new(&tools.ffmpeg)
        .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"])
        .arg(&job.source_path)
        .args(["-map", "0:a:0", "-map_metadata", "-1"])
        .args(codec_args(&job.profile));

    if let Some(rate) = job.resample_to {
        cmd = cmd.arg("-ar").arg(rate.to_string());
    }

    cmd = cmd.arg("-ss").arg(format_seconds(job.track.start));
    if let Some(duration) = job.track.duration() {
        cmd = cmd.arg("-t").arg(format_seconds(duration));
    }

    cmd.arg(&job.destination_path)
}

/// Encoder arguments for a profile (always stereo).
pub fn codec_args(profile: &EncodeProfile) -> Vec<String> {
    let mut args: Vec<String> = Vec::with_capacity(6);
    match profile.quality {
        Quality::OggScale(q) => {
            args.extend(["-c:a".into(), "libvorbis".into(), "-qscale:a".into(), q.to_string()]);
        }
        Quality::Mp3Vbr(v) => {
            args.extend(["-c:a".into(), "libmp3lame".into(), "-qscale:a".into(), v.to_string()]);
        }
        Quality::Mp3Cbr(kbps) => {
            args.extend(["-c:a".into(), "libmp3lame".into(), "-b:a".into(), format!("{}k", kbps)]);
        }
        Quality::FlacLevel(level) => {
            args.extend([
                "-c:a".into(),
                "flac".into(),
                "-compression_level".into(),
                level.to_string(),
            ]);
        }
    }
    args.extend(["-ac".into(), "2".into()]);
    args
}

/// Sample rate a job should be converted to, given the probed source rate.
///
/// FLAC mirrors the source; lossy formats are brought to 44.1 kHz when
/// `resample_lossy` is set and the source differs (or is unknown).
pub fn resample_target(
    profile: &EncodeProfile,
    source_rate: Option<u32>,
    resample_lossy: bool,
) -> Option<u32> {
    if !profile.format.is_lossy() || !resample_lossy {
        return None;
    }
    match source_rate {
        Some(LOSSY_SAMPLE_RATE) => None,
        _ => Some(LOSSY_SAMPLE_RATE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuesheet::CuesheetTrack;
    use crate::models::{AlbumInfo, OutputFormat};
    use std::ffi::OsStr;
    use std::path::PathBuf;
    use std::time::Duration;

    fn job(profile: EncodeProfile, end: Option<Duration>) -> TrackJob {
        TrackJob {
            track: CuesheetTrack {
                index: 2,
                number: 2,
                title: "Paranoid Android".to_string(),
                performer: "Radiohead".to_string(),
                start: Duration::from_millis(284_573),
                end,
            },
            album: AlbumInfo {
                performer: "Radiohead".to_string(),
                title: "OK Computer".to_string(),
                genre: None,
                date: None,
            },
            source_path: PathBuf::from("/music/OK Computer/CDImage.flac"),
            destination_path: PathBuf::from("/out/02_Paranoid_Android.ogg"),
            profile,
            track_total: 12,
            resample_to: None,
        }
    }

    #[test]
    fn cuts_with_start_and_duration() {
        let cmd = extract_command(
            &ToolSettings::default(),
            &job(EncodeProfile::default(), Some(Duration::from_millis(667_800))),
        );

        assert_eq!(cmd.program, "ffmpeg");
        assert_eq!(cmd.arg_after("-i"), Some(OsStr::new("/music/OK Computer/CDImage.flac")));
        assert_eq!(cmd.arg_after("-ss"), Some(OsStr::new("284.573000000")));
        assert_eq!(cmd.arg_after("-t"), Some(OsStr::new("383.227000000")));
        assert_eq!(cmd.arg_after("-c:a"), Some(OsStr::new("libvorbis")));
        assert_eq!(cmd.arg_after("-qscale:a"), Some(OsStr::new("6")));
        assert_eq!(
            cmd.args.last().map(|a| a.as_os_str()),
            Some(OsStr::new("/out/02_Paranoid_Android.ogg"))
        );
    }

    #[test]
    fn open_ended_track_has_no_duration() {
        let cmd = extract_command(&ToolSettings::default(), &job(EncodeProfile::default(), None));
        assert!(!cmd.has_arg("-t"));
    }

    #[test]
    fn mp3_cbr_uses_bitrate() {
        let profile = EncodeProfile::new(OutputFormat::Mp3, Quality::Mp3Cbr(320)).unwrap();
        let args = codec_args(&profile);
        assert!(args.contains(&"libmp3lame".to_string()));
        assert!(args.contains(&"320k".to_string()));
    }

    #[test]
    fn resamples_only_lossy() {
        let ogg = EncodeProfile::default();
        let flac = EncodeProfile::new(OutputFormat::Flac, Quality::FlacLevel(5)).unwrap();

        assert_eq!(resample_target(&ogg, Some(96_000), true), Some(44_100));
        assert_eq!(resample_target(&ogg, Some(44_100), true), None);
        assert_eq!(resample_target(&ogg, None, true), Some(44_100));
        assert_eq!(resample_target(&ogg, Some(96_000), false), None);
        assert_eq!(resample_target(&flac, Some(96_000), true), None);
    }

    #[test]
    fn resample_flag_is_passed() {
        let mut job = job(EncodeProfile::default(), None);
        job.resample_to = Some(44_100);
        let cmd = extract_command(&ToolSettings::default(), &job);
        assert_eq!(cmd.arg_after("-ar"), Some(OsStr::new("44100")));
    }
}
