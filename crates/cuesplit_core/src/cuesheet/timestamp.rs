//! Cuesheet timestamp parsing.
//!
//! Cuesheets address positions as `MM:SS:FF` where `FF` counts CD frames
//! (75 per second). Some rippers write milliseconds instead (`MM:SS:nnn`)
//! or a decimal fraction (`MM:SS.nnnnnn`); all three are accepted.

use std::time::Duration;

/// CD frames per second.
pub const FRAMES_PER_SECOND: u64 = 75;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Parse a cuesheet timestamp into an offset from the start of the image.
///
/// Returns `None` for anything that is not a valid timestamp.
pub fn parse_timestamp(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (minutes, rest) = text.split_once(':')?;
    let minutes: u64 = parse_digits(minutes)?;

    let (seconds, nanos) = if let Some((seconds, tail)) = rest.split_once(':') {
        let seconds = parse_digits(seconds)?;
        let nanos = match tail.len() {
            // Frames.
            2 => {
                let frames = parse_digits(tail)?;
                if frames >= FRAMES_PER_SECOND {
                    return None;
                }
                (frames * NANOS_PER_SECOND + FRAMES_PER_SECOND / 2) / FRAMES_PER_SECOND
            }
            // Milliseconds.
            3 => parse_digits(tail)? * 1_000_000,
            _ => return None,
        };
        (seconds, nanos)
    } else if let Some((seconds, fraction)) = rest.split_once('.') {
        (parse_digits(seconds)?, parse_fraction(fraction)?)
    } else {
        return None;
    };

    if seconds >= 60 {
        return None;
    }

    let total = minutes.checked_mul(60)?.checked_add(seconds)?;
    Some(Duration::new(total, nanos as u32))
}

/// Format an offset as `SECONDS.NNNNNNNNN` for ffmpeg's `-ss` / `-t`.
pub fn format_seconds(duration: Duration) -> String {
    format!("{}.{:09}", duration.as_secs(), duration.subsec_nanos())
}

fn parse_digits(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse a decimal fraction (digits after the dot) into nanoseconds.
fn parse_fraction(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut nanos = 0u64;
    let mut scale = NANOS_PER_SECOND / 10;
    for b in text.bytes().take(9) {
        nanos += (b - b'0') as u64 * scale;
        scale /= 10;
    }
    Some(nanos)
}
