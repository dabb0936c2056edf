use crate::error::{ErrorKind, Result};
use crate::models::MediaMetadata;
use lofty::{Accessor, AudioFile, ItemKey, PictureType, Probe, Tag, TaggedFile, TaggedFileExt};
use std::borrow::Cow;
use std::io::{Read, Seek};
use tracing::instrument;

/// Read tags and stream properties from an audio file.
///
/// The format is sniffed from the content, not the file name. Every tag in the
/// file is consulted, primary tag first, and each field takes the first
/// non-blank value found. This is blocking I/O: run it on a blocking thread.
#[instrument(level = "debug", skip(reader))]
pub fn read_media<R: Read + Seek>(reader: R) -> Result<MediaMetadata> {
    let probe = Probe::new(reader).guess_file_type().map_err(|e| ErrorKind::Io(e.to_string()))?;
    if probe.file_type().is_none() {
        exn::bail!(ErrorKind::UnsupportedFormat);
    }
    let tagged_file = probe.read().map_err(|e| ErrorKind::Decode(e.to_string()))?;
    Ok(metadata(&tagged_file))
}

fn metadata(file: &TaggedFile) -> MediaMetadata {
    let tags: Vec<&Tag> = file.primary_tag().into_iter().chain(file.tags()).collect();
    let duration = file.properties().duration().as_secs_f64();
    MediaMetadata {
        title: first_text(&tags, |tag| tag.title()),
        artist: first_text(&tags, |tag| tag.artist()),
        album: first_text(&tags, |tag| tag.album()),
        author: first_text(&tags, |tag| tag.get_string(&ItemKey::AlbumArtist).map(Cow::Borrowed)),
        artwork: artwork(&tags),
        duration: if duration.is_finite() { duration } else { 0.0 },
    }
}

fn first_text<'a>(tags: &[&'a Tag], read: impl Fn(&'a Tag) -> Option<Cow<'a, str>>) -> Option<String> {
    tags.iter().copied().find_map(|tag| read(tag).and_then(present))
}

/// Blank is the same as missing.
fn present(value: Cow<'_, str>) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Front cover from any tag wins over whatever picture comes first.
fn artwork(tags: &[&Tag]) -> Option<Vec<u8>> {
    let pictures: Vec<_> = tags.iter().flat_map(|tag| tag.pictures()).collect();
    let picture = pictures
        .iter()
        .find(|picture| matches!(picture.pic_type(), PictureType::CoverFront))
        .or_else(|| pictures.first())?;
    Some(picture.data().to_vec())
}
