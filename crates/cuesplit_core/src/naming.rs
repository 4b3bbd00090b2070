//! Output path naming.
//!
//! Tracks land in `<root>/<Artist>/<Album>/<NN>_<Title>.<ext>`. Directory
//! names keep their spelling but lose characters that filesystems reject;
//! file names are additionally folded to plain ASCII with underscores so
//! they survive portable players and tag tools.

use std::path::{Path, PathBuf};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::OutputFormat;

/// Longest directory component we create, in characters.
const MAX_COMPONENT_CHARS: usize = 120;

/// Longest file stem, in bytes. Leaves room for `NN_` and the extension
/// within the usual 255 byte file name limit.
const MAX_STEM_BYTES: usize = 200;

/// Make `name` usable as a single directory component.
///
/// Returns `fallback` when nothing usable is left.
pub fn sanitize_component(name: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            ':' | '/' | '\\' => out.push('-'),
            '!' => {}
            '?' | '*' | '<' | '>' | '|' | '"' => out.push('_'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    let trimmed = out.trim().trim_end_matches('.').trim_end();
    let capped: String = trimmed.chars().take(MAX_COMPONENT_CHARS).collect();
    let capped = capped.trim_end().trim_end_matches('.');

    if capped.is_empty() || capped == "." || capped == ".." {
        fallback.to_string()
    } else {
        capped.to_string()
    }
}

/// Turn a track title into a file stem: accents stripped, no spaces or
/// shell-unfriendly characters, at most `MAX_STEM_BYTES` bytes.
pub fn clean_file_stem(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.nfc() {
        match c {
            ' ' | '?' | ':' | '@' | '&' | '%' | '$' | '#' | '|' | '>' | '<' | '~' | '`'
            | '"' | '/' | '\\' | '*' => out.push('_'),
            '¿' | '¡' | '°' | '´' | '¨' => out.push('_'),
            c if c.is_control() => {}
            c if c.is_whitespace() => out.push('_'),
            c if c.is_ascii() => out.push(c),
            c => fold_char(c, &mut out),
        }
    }

    let stem = truncate_at_char(out.trim_matches('.'), MAX_STEM_BYTES).trim_end_matches('.');
    if stem.is_empty() {
        "Track".to_string()
    } else {
        stem.to_string()
    }
}

/// `NN_Title.ext` for a track ordinal.
pub fn track_file_name(index: u32, title: &str, format: OutputFormat) -> String {
    format!("{:02}_{}.{}", index, clean_file_stem(title), format.extension())
}

/// `<root>/<Artist>/<Album>`.
pub fn album_dir(root: &Path, performer: &str, album: &str) -> PathBuf {
    root.join(sanitize_component(performer, "Unknown Artist"))
        .join(sanitize_component(album, "Unknown Album"))
}

/// Latin letters lose their accents; other scripts are kept as written.
fn fold_char(c: char, out: &mut String) {
    if let Some(plain) = fold_letter(c) {
        out.push_str(plain);
        return;
    }
    let base = c.nfd().next().unwrap_or(c);
    if base.is_ascii() {
        out.push(base);
    } else if !(is_combining_mark(c) && ('\u{0300}'..='\u{036F}').contains(&c)) {
        out.push(c);
    }
}

/// Letters that carry no combining mark after decomposition.
fn fold_letter(c: char) -> Option<&'static str> {
    let plain = match c {
        'Æ' => "AE",
        'æ' => "ae",
        'Ð' | 'Đ' => "D",
        'ð' | 'đ' => "d",
        'Ħ' => "H",
        'ħ' => "h",
        'ı' => "i",
        'Ĳ' => "IJ",
        'ĳ' => "ij",
        'ĸ' => "k",
        'Ŀ' | 'Ł' => "L",
        'ŀ' | 'ł' => "l",
        'Ŋ' => "N",
        'ŉ' | 'ŋ' => "n",
        'Ø' => "O",
        'ø' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'ß' => "ss",
        'ſ' => "s",
        'Þ' => "TH",
        'þ' => "th",
        'Ŧ' => "T",
        'ŧ' => "t",
        _ => return None,
    };
    Some(plain)
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
fn truncate_at_char(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
