//! Cuesheet types and error definitions.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One audio track described by a cuesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuesheetTrack {
    /// Ordinal position, 1..N.
    pub index: u32,
    /// Number declared by the `TRACK nn` line.
    pub number: u32,
    /// Track title.
    pub title: String,
    /// Track performer (album performer when the track has none).
    pub performer: String,
    /// Start offset in the source image (`INDEX 01`).
    pub start: Duration,
    /// End offset; the next track's start, or `None` for an open-ended last track.
    pub end: Option<Duration>,
}

impl CuesheetTrack {
    /// Track length, if the end is known.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_sub(self.start))
    }
}

/// Parsed album-level cuesheet with its ordered tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cuesheet {
    /// Album performer.
    pub performer: String,
    /// Album title.
    pub title: String,
    /// `REM GENRE`, if present.
    pub genre: Option<String>,
    /// `REM DATE`, kept only when it is a plain number.
    pub date: Option<String>,
    /// Audio image named by the `FILE` line.
    pub file: Option<String>,
    /// Tracks in playback order.
    pub tracks: Vec<CuesheetTrack>,
}

impl Cuesheet {
    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if there are no tracks.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Close the last track at the end of the source image.
    ///
    /// Leaves the track open when `total` does not lie after its start,
    /// so the extractor simply reads to the end of the image.
    pub fn resolve_last_end(&mut self, total: Duration) {
        if let Some(last) = self.tracks.last_mut() {
            if last.end.is_none() && total > last.start {
                last.end = Some(total);
            }
        }
    }
}

/// Errors that can occur while reading a cuesheet.
#[derive(Error, Debug)]
pub enum CuesheetError {
    /// The cuesheet file could not be read.
    #[error("Failed to read cuesheet: {0}")]
    Read(#[from] io::Error),

    /// The cuesheet content is not usable.
    #[error("Malformed cuesheet{}: {reason}", line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
    Malformed { line: Option<usize>, reason: String },
}

impl CuesheetError {
    /// Create a malformed error that is not tied to a line.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            line: None,
            reason: reason.into(),
        }
    }

    /// Create a malformed error pointing at a 1-based line number.
    pub fn malformed_at(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line: Some(line),
            reason: reason.into(),
        }
    }

    /// Whether this is a content error rather than an I/O error.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Result type for cuesheet operations.
pub type CuesheetResult<T> = Result<T, CuesheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn track(index: u32, start: u64, end: Option<u64>) -> CuesheetTrack {
        CuesheetTrack {
            index,
            number: index,
            title: format!("Song {}", index),
            performer: "Artist".to_string(),
            start: Duration::from_secs(start),
            end: end.map(Duration::from_secs),
        }
    }

    #[test]
    fn resolve_last_end_closes_open_track() {
        let mut sheet = Cuesheet {
            performer: "Artist".to_string(),
            title: "Album".to_string(),
            genre: None,
            date: None,
            file: None,
            tracks: vec![track(1, 0, Some(100)), track(2, 100, None)],
        };

        sheet.resolve_last_end(Duration::from_secs(250));
        assert_eq!(sheet.tracks[1].end, Some(Duration::from_secs(250)));
        assert_eq!(sheet.tracks[1].duration(), Some(Duration::from_secs(150)));
    }

    #[test]
    fn resolve_last_end_ignores_short_total() {
        let mut sheet = Cuesheet {
            performer: "Artist".to_string(),
            title: "Album".to_string(),
            genre: None,
            date: None,
            file: None,
            tracks: vec![track(1, 120, None)],
        };

        sheet.resolve_last_end(Duration::from_secs(60));
        assert_eq!(sheet.tracks[0].end, None);
    }

    #[test]
    fn malformed_error_mentions_line() {
        let err = CuesheetError::malformed_at(12, "invalid timestamp '1:2'");
        let msg = err.to_string();
        assert!(msg.contains("line 12"));
        assert!(msg.contains("invalid timestamp"));
        assert!(err.is_malformed());
    }
}
