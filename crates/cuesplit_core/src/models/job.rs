//! Track job definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::EncodeProfile;
use crate::cuesheet::{Cuesheet, CuesheetTrack};

/// Album-level metadata shared by every job of a cuesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    pub performer: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl From<&Cuesheet> for AlbumInfo {
    fn from(sheet: &Cuesheet) -> Self {
        Self {
            performer: sheet.performer.clone(),
            title: sheet.title.clone(),
            genre: sheet.genre.clone(),
            date: sheet.date.clone(),
        }
    }
}

/// Work needed to produce one output file.
///
/// Built once by the planner and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackJob {
    /// Cuesheet track this job extracts.
    pub track: CuesheetTrack,
    /// Album fields for tagging.
    pub album: AlbumInfo,
    /// Audio image the track is cut from (read-only).
    pub source_path: PathBuf,
    /// Final output file.
    pub destination_path: PathBuf,
    /// Output format and encoder quality.
    pub profile: EncodeProfile,
    /// Number of tracks on the album.
    pub track_total: u32,
    /// Sample rate to convert to, when the source rate does not suit the format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resample_to: Option<u32>,
}

impl TrackJob {
    /// Ordinal of the track (1..N); the job's key in run results.
    pub fn index(&self) -> u32 {
        self.track.index
    }

    /// Tags written onto the output file.
    ///
    /// Derived only from cuesheet data, so re-running a job writes the same tags.
    pub fn tags(&self) -> TrackTags {
        TrackTags {
            title: self.track.title.clone(),
            artist: self.track.performer.clone(),
            album_artist: self.album.performer.clone(),
            album: self.album.title.clone(),
            genre: self.album.genre.clone(),
            date: self.album.date.clone(),
            track_number: self.track.index,
            track_total: self.track_total,
        }
    }
}

/// Metadata written onto an output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album_artist: String,
    pub album: String,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub track_number: u32,
    pub track_total: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn job() -> TrackJob {
        TrackJob {
            track: CuesheetTrack {
                index: 2,
                number: 2,
                title: "Paranoid Android".to_string(),
                performer: "Radiohead".to_string(),
                start: Duration::from_secs(284),
                end: Some(Duration::from_secs(667)),
            },
            album: AlbumInfo {
                performer: "Radiohead".to_string(),
                title: "OK Computer".to_string(),
                genre: Some("Alternative".to_string()),
                date: Some("1997".to_string()),
            },
            source_path: PathBuf::from("/music/ok.flac"),
            destination_path: PathBuf::from("/out/Radiohead/OK Computer/02_Paranoid_Android.ogg"),
            profile: EncodeProfile::default(),
            track_total: 12,
            resample_to: None,
        }
    }

    #[test]
    fn tags_come_from_cuesheet_fields() {
        let tags = job().tags();
        assert_eq!(tags.title, "Paranoid Android");
        assert_eq!(tags.album_artist, "Radiohead");
        assert_eq!(tags.track_number, 2);
        assert_eq!(tags.track_total, 12);
        assert_eq!(tags.date.as_deref(), Some("1997"));
    }

    #[test]
    fn tags_are_stable_across_calls() {
        let job = job();
        assert_eq!(job.tags(), job.tags());
        assert_eq!(job.clone().tags(), job.tags());
    }
}
