//! Text decoding for cuesheet files.
//!
//! Rippers write cuesheets as UTF-8 (often with a BOM), UTF-16 with a BOM,
//! or in the Windows code page of the ripping machine. Anything without a
//! BOM that is not valid UTF-8 is decoded as Windows-1252, which covers
//! EAC's legacy output including curly quotes and dashes.

use encoding_rs::{Encoding, WINDOWS_1252};

/// Decode raw cuesheet bytes into text.
pub fn decode_cuesheet_bytes(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            tracing::warn!("Cuesheet has invalid {} sequences", encoding.name());
        }
        return text.into_owned();
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!("Cuesheet is not valid UTF-8, decoding as {}", WINDOWS_1252.name());
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bom() {
        let bytes = b"\xEF\xBB\xBFTITLE \"Album\"";
        assert_eq!(decode_cuesheet_bytes(bytes), "TITLE \"Album\"");
    }

    #[test]
    fn keeps_utf8() {
        let text = "PERFORMER \"Sigur Rós\"";
        assert_eq!(decode_cuesheet_bytes(text.as_bytes()), text);
    }

    #[test]
    fn falls_back_to_windows_1252() {
        let bytes = b"TITLE \"Canci\xF3n\"";
        assert_eq!(decode_cuesheet_bytes(bytes), "TITLE \"Canción\"");
    }

    #[test]
    fn keeps_curly_quotes_from_legacy_rips() {
        assert_eq!(decode_cuesheet_bytes(b"TITLE \"Don\x92t\""), "TITLE \"Don\u{2019}t\"");
        assert_eq!(
            decode_cuesheet_bytes(b"TITLE \"\x93Heroes\x94 \x96 1977\""),
            "TITLE \"\u{201C}Heroes\u{201D} \u{2013} 1977\""
        );
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "TITLE \"Ørsted\"".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_cuesheet_bytes(&bytes), "TITLE \"Ørsted\"");
    }
}
