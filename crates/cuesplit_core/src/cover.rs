//! Album cover discovery and resizing.
//!
//! Rippers leave the scanned cover next to the audio image. A copy scaled
//! down to fit `max_side` x `max_side` is written as `cover.jpg` next to the
//! split tracks, where players pick it up.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::ImageFormat;
use thiserror::Error;

/// Cover file names looked for next to the source, in order of preference.
pub const COVER_CANDIDATES: &[&str] = &["cover.front.jpg", "cover.jpg", "cover.jpeg", "cover.png"];

/// Name of the cover written into the album folder.
pub const COVER_FILE_NAME: &str = "cover.jpg";

#[derive(Error, Debug)]
pub enum CoverError {
    #[error("Cannot decode cover {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Cannot write cover {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Find the cover image in `source_dir`.
///
/// Names are matched without regard to case (`Cover.JPG` counts).
pub fn find_cover(source_dir: &Path) -> Option<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(source_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    COVER_CANDIDATES.iter().find_map(|candidate| {
        entries
            .iter()
            .find(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(candidate))
            })
            .cloned()
    })
}

/// Write `source` into `dest_dir` as a JPEG no larger than `max_side` on either side.
///
/// Smaller images keep their size. Returns the written path.
pub fn write_resized_cover(source: &Path, dest_dir: &Path, max_side: u32) -> Result<PathBuf, CoverError> {
    let img = image::open(source).map_err(|e| CoverError::Decode {
        path: source.to_path_buf(),
        source: e,
    })?;

    let img = if img.width() > max_side || img.height() > max_side {
        img.resize(max_side, max_side, FilterType::Lanczos3)
    } else {
        img
    };

    let dest = dest_dir.join(COVER_FILE_NAME);
    img.to_rgb8()
        .save_with_format(&dest, ImageFormat::Jpeg)
        .map_err(|e| CoverError::Encode {
            path: dest.clone(),
            source: e,
        })?;

    tracing::debug!(
        "Cover {} written as {} ({}x{})",
        source.display(),
        dest.display(),
        img.width(),
        img.height()
    );
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::tempdir;

    #[test]
    fn prefers_front_cover() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cover.jpg"), b"x").unwrap();
        fs::write(dir.path().join("Cover.Front.JPG"), b"x").unwrap();

        let found = find_cover(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "Cover.Front.JPG");
    }

    #[test]
    fn no_cover_is_none() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("back.jpg"), b"x").unwrap();
        assert!(find_cover(dir.path()).is_none());
        assert!(find_cover(&dir.path().join("missing")).is_none());
    }

    #[test]
    fn shrinks_to_fit_keeping_aspect() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let path = src.path().join("cover.png");
        RgbImage::from_pixel(1000, 600, image::Rgb([200, 30, 30]))
            .save(&path)
            .unwrap();

        let written = write_resized_cover(&path, out.path(), 500).unwrap();
        assert_eq!(written, out.path().join("cover.jpg"));

        let resized = image::open(&written).unwrap();
        assert_eq!((resized.width(), resized.height()), (500, 300));
    }

    #[test]
    fn small_cover_keeps_size() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        let path = src.path().join("cover.png");
        RgbImage::new(120, 80).save(&path).unwrap();

        let written = write_resized_cover(&path, out.path(), 500).unwrap();
        let copy = image::open(&written).unwrap();
        assert_eq!((copy.width(), copy.height()), (120, 80));
    }

    #[test]
    fn broken_cover_is_decode_error() {
        let src = tempdir().unwrap();
        let path = src.path().join("cover.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = write_resized_cover(&path, src.path(), 500).unwrap_err();
        assert!(matches!(err, CoverError::Decode { .. }));
    }
}
