//! Tag writing for output files.
//!
//! Tags are rebuilt from scratch on every run: the existing primary tag is
//! dropped and a new one is filled from [`TrackTags`], so repeated runs
//! produce the same metadata.

use std::io;
use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::error::LoftyError;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use thiserror::Error;

use crate::models::TrackTags;

#[derive(Error, Debug)]
pub enum TagError {
    #[error("Cannot tag {}: {source}", path.display())]
    Lofty {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },

    #[error("Cannot read cover {}: {source}", path.display())]
    Cover {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes metadata onto a finished output file.
pub trait TagWriter: Send + Sync {
    /// Replace the file's tags with `tags`, embedding `cover` when given.
    fn write_tags(&self, path: &Path, tags: &TrackTags, cover: Option<&Path>) -> Result<(), TagError>;
}

/// [`TagWriter`] backed by lofty (Vorbis comments for Ogg/FLAC, ID3v2 for MP3).
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagWriter;

impl TagWriter for LoftyTagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags, cover: Option<&Path>) -> Result<(), TagError> {
        let lofty_err = |source| TagError::Lofty {
            path: path.to_path_buf(),
            source,
        };

        let mut tagged_file = Probe::open(path)
            .and_then(|probe| probe.read())
            .map_err(lofty_err)?;

        let tag_type = tagged_file.primary_tag_type();
        tagged_file.remove(tag_type);

        let mut tag = Tag::new(tag_type);
        fill_tag(&mut tag, tags);

        if let Some(cover_path) = cover {
            let data = std::fs::read(cover_path).map_err(|source| TagError::Cover {
                path: cover_path.to_path_buf(),
                source,
            })?;
            tag.push_picture(Picture::new_unchecked(
                PictureType::CoverFront,
                Some(MimeType::Jpeg),
                None,
                data,
            ));
        }

        tagged_file.insert_tag(tag);
        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(lofty_err)?;

        tracing::debug!("Tagged {}", path.display());
        Ok(())
    }
}

fn fill_tag(tag: &mut Tag, tags: &TrackTags) {
    tag.set_title(tags.title.clone());
    tag.set_artist(tags.artist.clone());
    tag.set_album(tags.album.clone());
    tag.insert_text(ItemKey::AlbumArtist, tags.album_artist.clone());
    tag.set_track(tags.track_number);
    tag.set_track_total(tags.track_total);
    if let Some(genre) = &tags.genre {
        tag.set_genre(genre.clone());
    }
    if let Some(date) = &tags.date {
        tag.insert_text(ItemKey::RecordingDate, date.clone());
    }
}
