//! Cuesheet reading.
//!
//! A cuesheet describes an album stored as one audio image: album fields,
//! then a list of tracks with their start offsets.

mod encoding;
mod parser;
mod timestamp;
mod types;

use std::path::Path;

pub use encoding::decode_cuesheet_bytes;
pub use parser::parse;
pub use timestamp::{format_seconds, parse_timestamp, FRAMES_PER_SECOND};
pub use types::{Cuesheet, CuesheetError, CuesheetResult, CuesheetTrack};

/// Read and parse a cuesheet file.
pub fn load_cuesheet(path: &Path) -> CuesheetResult<Cuesheet> {
    let bytes = std::fs::read(path)?;
    let text = decode_cuesheet_bytes(&bytes);
    let sheet = parse(&text)?;
    tracing::debug!(
        "Parsed cuesheet {}: '{}' by '{}', {} tracks",
        path.display(),
        sheet.title,
        sheet.performer,
        sheet.len()
    );
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_latin1_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("album.cue");
        let mut bytes = b"PERFORMER \"Bj\xF6rk\"\nTITLE \"Post\"\nFILE \"post.flac\" WAVE\n".to_vec();
        bytes.extend_from_slice(b"TRACK 01 AUDIO\nTITLE \"Army of Me\"\nINDEX 01 00:00:00\n");
        std::fs::write(&path, bytes).unwrap();

        let sheet = load_cuesheet(&path).unwrap();
        assert_eq!(sheet.performer, "Björk");
        assert_eq!(sheet.tracks[0].performer, "Björk");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_cuesheet(&dir.path().join("nope.cue")).unwrap_err();
        assert!(!err.is_malformed());
    }
}
