//! ReplayGain analysis with rsgain.
//!
//! rsgain scans the file and writes the ReplayGain tags itself; with `-O`
//! it also prints a tab-separated report:
//!
//! ```text
//! Filename	Loudness (LUFS)	Gain (dB)	Peak	 Peak (dB)	Peak Type	Clipping Adjustment?
//! 01_Airbag.ogg	-8.61	-9.39	1.053585	0.45	Sample	N
//! Album	-9.12	-8.88	1.064013	0.54	Sample	N
//! ```

use std::path::{Path, PathBuf};

use super::command::ToolCommand;
use crate::config::ToolSettings;
use crate::models::LoudnessReport;

/// Row name rsgain uses for the album summary.
const ALBUM_ROW: &str = "Album";

/// Scan one file and write track gain tags.
pub fn track_gain_command(tools: &ToolSettings, path: &Path) -> ToolCommand {
    ToolCommand::new(&tools.rsgain)
        .args(["custom", "-s", "i", "-O"])
        .arg(path)
}

/// Scan finished tracks together and write track and album gain tags.
pub fn album_gain_command(tools: &ToolSettings, paths: &[PathBuf]) -> ToolCommand {
    ToolCommand::new(&tools.rsgain)
        .args(["custom", "-a", "-s", "i", "-O"])
        .args(paths)
}

/// Parse every result row of a scan report.
///
/// Lines that do not look like result rows are skipped.
pub fn parse_scan_output(text: &str) -> Vec<(String, LoudnessReport)> {
    text.lines().filter_map(parse_row).collect()
}

/// Loudness of the first file in a scan report.
pub fn track_report(text: &str) -> Option<LoudnessReport> {
    parse_scan_output(text)
        .into_iter()
        .find(|(name, _)| name != ALBUM_ROW)
        .map(|(_, report)| report)
}

/// Album summary row of a scan report.
pub fn album_report(text: &str) -> Option<LoudnessReport> {
    parse_scan_output(text)
        .into_iter()
        .find(|(name, _)| name == ALBUM_ROW)
        .map(|(_, report)| report)
}

fn parse_row(line: &str) -> Option<(String, LoudnessReport)> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < 4 {
        return None;
    }

    let report = LoudnessReport {
        loudness_lufs: fields[1].parse().ok()?,
        gain_db: fields[2].parse().ok()?,
        peak: fields[3].parse().ok()?,
    };
    Some((fields[0].to_string(), report))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "Filename\tLoudness (LUFS)\tGain (dB)\tPeak\t Peak (dB)\tPeak Type\tClipping Adjustment?\n\
01_Airbag.ogg\t-8.61\t-9.39\t1.053585\t0.45\tSample\tN\n\
02_Paranoid_Android.ogg\t-9.40\t-8.60\t0.988\t-0.10\tSample\tN\n\
Album\t-9.12\t-8.88\t1.064013\t0.54\tSample\tN\n";

    #[test]
    fn skips_header_and_reads_rows() {
        let rows = parse_scan_output(REPORT);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].0, "02_Paranoid_Android.ogg");
        assert_eq!(rows[1].1.gain_db, -8.60);
    }

    #[test]
    fn picks_track_and_album_rows() {
        assert_eq!(track_report(REPORT).unwrap().loudness_lufs, -8.61);
        assert_eq!(album_report(REPORT).unwrap().peak, 1.064013);
    }

    #[test]
    fn silent_track_parses_infinity() {
        let report = track_report("silence.ogg\t-inf\t0.00\t0.000000\t-inf\tSample\tN").unwrap();
        assert!(report.loudness_lufs.is_infinite());
    }

    #[test]
    fn unreadable_output_gives_nothing() {
        assert!(track_report("rsgain: error opening file").is_none());
    }

    #[test]
    fn album_command_lists_files() {
        let files = vec![PathBuf::from("/o/01.ogg"), PathBuf::from("/o/02.ogg")];
        let cmd = album_gain_command(&ToolSettings::default(), &files);
        assert!(cmd.has_arg("-a"));
        assert_eq!(cmd.args.len(), 7);
    }
}
