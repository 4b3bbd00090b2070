//! Job planning: turns a parsed cuesheet into track jobs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cuesheet::Cuesheet;
use crate::models::{AlbumInfo, EncodeProfile, TrackJob};
use crate::naming::{album_dir, track_file_name};
use crate::tools::ffmpeg::resample_target;
use crate::tools::MediaInfo;

/// What to produce, shared by every cuesheet of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRequest {
    /// Root of the `<Artist>/<Album>` tree.
    pub output_root: PathBuf,
    pub profile: EncodeProfile,
    /// Convert lossy outputs to 44.1 kHz when the source differs.
    pub resample_lossy: bool,
    /// Use this audio image instead of the cuesheet's `FILE` entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_override: Option<PathBuf>,
}

impl SplitRequest {
    pub fn new(output_root: impl Into<PathBuf>, profile: EncodeProfile) -> Self {
        Self {
            output_root: output_root.into(),
            profile,
            resample_lossy: true,
            source_override: None,
        }
    }
}

/// Audio image a cuesheet refers to.
///
/// The `FILE` entry is taken relative to the cuesheet's directory unless it
/// is absolute. Returns `None` when the cuesheet names no file and there is
/// no override.
pub fn resolve_source(cuesheet_path: &Path, sheet: &Cuesheet, source_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = source_override {
        return Some(path.to_path_buf());
    }

    let file = sheet.file.as_deref()?;
    let base = cuesheet_path.parent().unwrap_or_else(|| Path::new(""));
    Some(base.join(file))
}

/// Build one job per cuesheet track.
///
/// `cuesheet` should already have its last end resolved from the probed
/// duration; an open last track is cut to the end of the image.
pub fn plan_jobs(
    cuesheet: &Cuesheet,
    source: &Path,
    request: &SplitRequest,
    media: &MediaInfo,
) -> Vec<TrackJob> {
    let album = AlbumInfo::from(cuesheet);
    let dir = album_dir(&request.output_root, &album.performer, &album.title);
    let resample_to = resample_target(&request.profile, media.sample_rate, request.resample_lossy);
    let track_total = cuesheet.tracks.len() as u32;

    cuesheet
        .tracks
        .iter()
        .map(|track| TrackJob {
            destination_path: dir.join(track_file_name(
                track.index,
                &track.title,
                request.profile.format,
            )),
            track: track.clone(),
            album: album.clone(),
            source_path: source.to_path_buf(),
            profile: request.profile,
            track_total,
            resample_to,
        })
        .collect()
}
