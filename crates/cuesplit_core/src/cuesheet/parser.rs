//! Cuesheet text parsing.
//!
//! Handles the single-file album cuesheet layout produced by rippers:
//!
//! ```text
//! REM GENRE Rock
//! REM DATE 1997
//! PERFORMER "Radiohead"
//! TITLE "OK Computer"
//! FILE "CDImage.flac" WAVE
//!   TRACK 01 AUDIO
//!     TITLE "Airbag"
//!     PERFORMER "Radiohead"
//!     INDEX 01 00:00:00
//!   TRACK 02 AUDIO
//!     TITLE "Paranoid Android"
//!     INDEX 00 04:42:50
//!     INDEX 01 04:44:43
//! ```

use std::time::Duration;

use super::timestamp::parse_timestamp;
use super::types::{Cuesheet, CuesheetError, CuesheetResult, CuesheetTrack};

/// Marker some rippers append to album titles of high-resolution images.
const HD_AUDIO_MARKER: &str = "[HDAudio]";

/// Track being collected between `TRACK` lines.
struct PendingTrack {
    line: usize,
    number: u32,
    is_audio: bool,
    title: Option<String>,
    performer: Option<String>,
    start: Option<Duration>,
}

/// Track that passed validation but may still need the album performer.
struct ParsedTrack {
    number: u32,
    title: String,
    performer: Option<String>,
    start: Duration,
}

/// Parse cuesheet text.
///
/// Fails with [`CuesheetError::Malformed`] when the album performer or title
/// is missing, no audio track is present, a track lacks its title or
/// `INDEX 01`, any timestamp is invalid, or track numbers / start times are
/// not strictly increasing. Nothing is returned on failure.
pub fn parse(text: &str) -> CuesheetResult<Cuesheet> {
    let mut performer: Option<String> = None;
    let mut title: Option<String> = None;
    let mut genre: Option<String> = None;
    let mut date: Option<String> = None;
    let mut file: Option<String> = None;

    let mut current: Option<PendingTrack> = None;
    let mut parsed: Vec<ParsedTrack> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (keyword, rest) = split_keyword(line);
        match keyword.to_ascii_uppercase().as_str() {
            "REM" => {
                if current.is_some() {
                    continue;
                }
                let (field, value) = split_keyword(rest);
                match field.to_ascii_uppercase().as_str() {
                    "GENRE" => genre = non_empty(unquote(value)),
                    "DATE" => {
                        let value = unquote(value);
                        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                            date = Some(value);
                        }
                    }
                    _ => {}
                }
            }
            "PERFORMER" => {
                let value = non_empty(unquote(rest));
                match current.as_mut() {
                    Some(track) => track.performer = value,
                    None if performer.is_none() => performer = value,
                    None => {}
                }
            }
            "TITLE" => {
                let value = unquote(rest);
                match current.as_mut() {
                    Some(track) => track.title = non_empty(value),
                    None if title.is_none() => {
                        title = non_empty(value.replace(HD_AUDIO_MARKER, "").trim().to_string());
                    }
                    None => {}
                }
            }
            "FILE" => {
                if file.is_some() {
                    return Err(CuesheetError::malformed_at(
                        line_no,
                        "more than one FILE entry (only single-file images are supported)",
                    ));
                }
                file = non_empty(parse_file_name(rest));
            }
            "TRACK" => {
                if let Some(track) = current.take() {
                    push_track(&mut parsed, track)?;
                }
                current = Some(parse_track_line(line_no, rest)?);
            }
            "INDEX" => {
                let (number, stamp) = split_keyword(rest);
                let offset = parse_timestamp(stamp).ok_or_else(|| {
                    CuesheetError::malformed_at(line_no, format!("invalid timestamp '{}'", stamp))
                })?;
                let number: u32 = number.parse().map_err(|_| {
                    CuesheetError::malformed_at(line_no, format!("invalid INDEX number '{}'", number))
                })?;
                if number == 1 {
                    if let Some(track) = current.as_mut() {
                        track.start = Some(offset);
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(track) = current.take() {
        push_track(&mut parsed, track)?;
    }

    let performer = performer.ok_or_else(|| CuesheetError::malformed("missing album PERFORMER"))?;
    let title = title.ok_or_else(|| CuesheetError::malformed("missing album TITLE"))?;
    if parsed.is_empty() {
        return Err(CuesheetError::malformed("no audio tracks found"));
    }

    let starts: Vec<Duration> = parsed.iter().map(|t| t.start).collect();
    let tracks = parsed
        .into_iter()
        .enumerate()
        .map(|(i, t)| CuesheetTrack {
            index: (i + 1) as u32,
            number: t.number,
            title: t.title,
            performer: t.performer.unwrap_or_else(|| performer.clone()),
            start: t.start,
            end: starts.get(i + 1).copied(),
        })
        .collect();

    Ok(Cuesheet {
        performer,
        title,
        genre,
        date,
        file,
        tracks,
    })
}

/// Validate a finished track and append it.
fn push_track(parsed: &mut Vec<ParsedTrack>, track: PendingTrack) -> CuesheetResult<()> {
    if !track.is_audio {
        tracing::debug!("Skipping non-audio track {}", track.number);
        return Ok(());
    }

    let title = track.title.ok_or_else(|| {
        CuesheetError::malformed_at(track.line, format!("track {:02} has no TITLE", track.number))
    })?;
    let start = track.start.ok_or_else(|| {
        CuesheetError::malformed_at(track.line, format!("track {:02} has no INDEX 01", track.number))
    })?;

    if let Some(prev) = parsed.last() {
        if track.number <= prev.number {
            return Err(CuesheetError::malformed_at(
                track.line,
                format!("track number {:02} does not follow {:02}", track.number, prev.number),
            ));
        }
        if start <= prev.start {
            return Err(CuesheetError::malformed_at(
                track.line,
                format!("track {:02} does not start after track {:02}", track.number, prev.number),
            ));
        }
    }

    parsed.push(ParsedTrack {
        number: track.number,
        title,
        performer: track.performer,
        start,
    });
    Ok(())
}

/// Parse the arguments of a `TRACK nn AUDIO` line.
fn parse_track_line(line_no: usize, rest: &str) -> CuesheetResult<PendingTrack> {
    let (number, kind) = split_keyword(rest);
    let number: u32 = number
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| CuesheetError::malformed_at(line_no, format!("invalid track number '{}'", number)))?;

    Ok(PendingTrack {
        line: line_no,
        number,
        is_audio: kind.is_empty() || kind.eq_ignore_ascii_case("AUDIO"),
        title: None,
        performer: None,
        start: None,
    })
}

/// Extract the file name from `FILE "name.flac" WAVE` or `FILE name.flac WAVE`.
fn parse_file_name(rest: &str) -> String {
    let rest = rest.trim();
    if let Some(quoted) = rest.strip_prefix('"') {
        return match quoted.find('"') {
            Some(end) => quoted[..end].to_string(),
            None => quoted.trim().to_string(),
        };
    }

    // Unquoted: the last word is the file type when there is more than one.
    match rest.rsplit_once(char::is_whitespace) {
        Some((name, _kind)) => name.trim().to_string(),
        None => rest.to_string(),
    }
}

/// Split off the first whitespace-delimited word.
fn split_keyword(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    }
}

/// Remove one pair of surrounding quotes.
fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote) {
            let inner = inner.strip_suffix(quote).unwrap_or(inner);
            return inner.trim().to_string();
        }
    }
    value.to_string()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALBUM: &str = r#"REM GENRE "Alternative"
REM DATE 1997
REM COMMENT "ExactAudioCopy v1.6"
PERFORMER "Radiohead"
TITLE "OK Computer [HDAudio]"
FILE "CDImage.flac" WAVE
  TRACK 01 AUDIO
    TITLE "Airbag"
    PERFORMER "Radiohead"
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    TITLE "Paranoid Android"
    INDEX 00 04:42:50
    INDEX 01 04:44:43
  TRACK 03 AUDIO
    TITLE "Subterranean Homesick Alien"
    PERFORMER "Thom & Co"
    INDEX 01 11:07:60
"#;

    #[test]
    fn parses_album_fields() {
        let sheet = parse(ALBUM).unwrap();
        assert_eq!(sheet.performer, "Radiohead");
        assert_eq!(sheet.title, "OK Computer");
        assert_eq!(sheet.genre.as_deref(), Some("Alternative"));
        assert_eq!(sheet.date.as_deref(), Some("1997"));
        assert_eq!(sheet.file.as_deref(), Some("CDImage.flac"));
    }

    #[test]
    fn yields_ordered_tracks_with_derived_ends() {
        let sheet = parse(ALBUM).unwrap();
        assert_eq!(sheet.len(), 3);

        for (i, track) in sheet.tracks.iter().enumerate() {
            assert_eq!(track.index, (i + 1) as u32);
        }
        for pair in sheet.tracks.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert_eq!(pair[0].end, Some(pair[1].start));
        }
        assert_eq!(sheet.tracks[2].end, None);
    }

    #[test]
    fn uses_index_01_not_pregap() {
        let sheet = parse(ALBUM).unwrap();
        assert_eq!(sheet.tracks[1].start, parse_timestamp("04:44:43").unwrap());
    }

    #[test]
    fn track_performer_falls_back_to_album() {
        let sheet = parse(ALBUM).unwrap();
        assert_eq!(sheet.tracks[1].performer, "Radiohead");
        assert_eq!(sheet.tracks[2].performer, "Thom & Co");
    }

    #[test]
    fn malformed_timestamp_fails_whole_parse() {
        let text = ALBUM.replace("INDEX 01 04:44:43", "INDEX 01 04:4x:43");
        let err = parse(&text).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("04:4x:43"));
    }

    #[test]
    fn oversized_minutes_are_malformed() {
        let text = ALBUM.replace("INDEX 01 11:07:60", "INDEX 01 307445734561825861:00:00");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, CuesheetError::Malformed { line: Some(18), .. }), "{:?}", err);
    }

    #[test]
    fn missing_performer_is_malformed() {
        // Track 01 keeps its own performer; the album-level one is still required
        let text = ALBUM.replace("PERFORMER \"Radiohead\"\nTITLE", "TITLE");
        let err = parse(&text).unwrap_err();
        assert!(err.to_string().contains("PERFORMER"));
    }

    #[test]
    fn missing_title_is_malformed() {
        let text = ALBUM.replace("TITLE \"OK Computer [HDAudio]\"\n", "");
        assert!(parse(&text).unwrap_err().to_string().contains("TITLE"));
    }

    #[test]
    fn non_increasing_starts_are_malformed() {
        let text = ALBUM.replace("INDEX 01 11:07:60", "INDEX 01 01:00:00");
        let err = parse(&text).unwrap_err();
        assert!(err.to_string().contains("does not start after"));
    }

    #[test]
    fn track_without_index_is_malformed() {
        let text = ALBUM.replace("    INDEX 01 11:07:60\n", "");
        assert!(parse(&text).unwrap_err().to_string().contains("INDEX 01"));
    }

    #[test]
    fn no_tracks_is_malformed() {
        let text = "PERFORMER \"A\"\nTITLE \"B\"\nFILE \"x.flac\" WAVE\n";
        assert!(parse(text).unwrap_err().to_string().contains("no audio tracks"));
    }

    #[test]
    fn multiple_files_are_rejected() {
        let text = ALBUM.replace(
            "  TRACK 02 AUDIO",
            "FILE \"second.flac\" WAVE\n  TRACK 02 AUDIO",
        );
        assert!(parse(&text).unwrap_err().to_string().contains("more than one FILE"));
    }

    #[test]
    fn skips_data_tracks() {
        let text = ALBUM.replace("TRACK 03 AUDIO", "TRACK 03 MODE1/2352");
        let sheet = parse(&text).unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.tracks[1].end, None);
    }

    #[test]
    fn non_numeric_date_is_dropped() {
        let text = ALBUM.replace("REM DATE 1997", "REM DATE \"unknown\"");
        assert_eq!(parse(&text).unwrap().date, None);
    }

    #[test]
    fn unquoted_file_name_drops_type() {
        assert_eq!(parse_file_name("my album.wav WAVE"), "my album.wav");
        assert_eq!(parse_file_name("\"CDImage.ape\" WAVE"), "CDImage.ape");
        assert_eq!(parse_file_name("image.flac"), "image.flac");
    }

    #[test]
    fn single_track_album() {
        let text = "PERFORMER \"A\"\nTITLE \"B\"\nFILE \"x.flac\" WAVE\nTRACK 01 AUDIO\nTITLE \"Only\"\nINDEX 01 00:00:00\n";
        let sheet = parse(text).unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.tracks[0].performer, "A");
        assert_eq!(sheet.tracks[0].end, None);
    }

    #[test]
    fn windows_line_endings() {
        let text = ALBUM.replace('\n', "\r\n");
        assert_eq!(parse(&text).unwrap().len(), 3);
    }
}
